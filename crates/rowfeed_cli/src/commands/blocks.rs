//! Blocks command implementation.

use rowfeed_core::{compute_block, leftover_rows, Block, BlockAllocation, FileServer};
use serde::Serialize;

/// The block plan of a file.
#[derive(Debug, Serialize)]
pub struct BlockPlan {
    /// File name.
    pub file: String,
    /// Number of data rows.
    pub rows: usize,
    /// Number of workers.
    pub workers: usize,
    /// Block of each worker, in ordinal order.
    pub blocks: Vec<WorkerBlock>,
    /// Data rows no worker receives.
    pub leftover: usize,
}

/// The block of one worker.
#[derive(Debug, Serialize)]
pub struct WorkerBlock {
    /// 1-based worker number.
    pub ordinal: usize,
    /// File lines the worker owns.
    #[serde(flatten)]
    pub block: Block,
    /// Lines of the block past the end of the file.
    pub missing: usize,
}

/// Computes the plan without printing it.
pub fn collect(
    server: &FileServer,
    file: &str,
    workers: usize,
    header: bool,
    allocation: BlockAllocation,
) -> Result<BlockPlan, Box<dyn std::error::Error>> {
    let rows = server.row_count_of(file, header)?;
    server.close_all()?;

    let head = usize::from(header);
    let last_line = rows + head;
    let mut blocks = Vec::with_capacity(workers);
    let mut served = 0;
    for ordinal in 1..=workers {
        let block = compute_block(rows, ordinal, workers, allocation, head)?;
        let present = last_line.saturating_sub(block.start).min(block.len());
        served += present;
        blocks.push(WorkerBlock {
            ordinal,
            block,
            missing: block.len() - present,
        });
    }

    let leftover = match allocation {
        BlockAllocation::Auto => leftover_rows(rows, workers),
        BlockAllocation::Explicit(_) => rows.saturating_sub(served),
    };
    Ok(BlockPlan {
        file: file.to_string(),
        rows,
        workers,
        blocks,
        leftover,
    })
}

/// Runs the blocks command.
pub fn run(
    server: &FileServer,
    file: &str,
    workers: usize,
    header: bool,
    allocation: BlockAllocation,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let plan = collect(server, file, workers, header, allocation)?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&plan)?),
        _ => print_text_output(&plan),
    }
    Ok(())
}

fn print_text_output(plan: &BlockPlan) {
    println!("Block plan for {}", plan.file);
    println!("  Data rows: {}", plan.rows);
    println!("  Workers:   {}", plan.workers);
    println!();
    for worker in &plan.blocks {
        print!(
            "  worker {:>3}: lines {}..={} ({} rows)",
            worker.ordinal,
            worker.block.start,
            worker.block.end,
            worker.block.len()
        );
        if worker.missing > 0 {
            print!(", {} past end of file", worker.missing);
        }
        println!();
    }
    println!();
    println!("  Unassigned rows: {}", plan.leftover);
}
