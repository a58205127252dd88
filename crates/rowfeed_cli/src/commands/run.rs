//! Run command implementation.

use rowfeed_core::{DataSet, DataSetConfig, FileServer, StatsSnapshot};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use tracing::info;

const GROUP: &str = "rowfeed";

/// How the workers are driven.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Number of worker threads.
    pub workers: usize,
    /// Iterations per worker.
    pub iterations: usize,
    /// Base seed for random selection; worker `n` uses `seed + n`.
    pub seed: Option<u64>,
}

/// Everything the workers received.
#[derive(Debug, Serialize)]
pub struct RunReport {
    /// Per-worker results, in ordinal order.
    pub workers: Vec<WorkerReport>,
    /// Server statistics after the run.
    pub stats: StatsSnapshot,
}

/// Rows received by one worker.
#[derive(Debug, Serialize)]
pub struct WorkerReport {
    /// Worker name.
    pub name: String,
    /// Alias the worker read through.
    pub alias: Option<String>,
    /// Rows in the order received.
    pub rows: Vec<RowReport>,
    /// Why the worker stopped early, if it did.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stopped: Option<String>,
}

/// One received row.
#[derive(Debug, Serialize)]
pub struct RowReport {
    /// File-line index, for indexed reads.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    /// Row fields.
    pub fields: Vec<String>,
    /// Whether the row was bound to variables.
    pub bound: bool,
}

/// Loads a data set configuration from a JSON file.
pub fn load_config(path: &Path) -> Result<DataSetConfig, Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(path)?;
    let config: DataSetConfig = serde_json::from_str(&text)?;
    Ok(config)
}

/// Runs the workers and returns their rows.
pub fn collect(
    server: Arc<FileServer>,
    config: DataSetConfig,
    options: &RunOptions,
) -> Result<RunReport, Box<dyn std::error::Error>> {
    if options.workers == 0 {
        return Err("at least one worker is required".into());
    }
    let data_set = DataSet::new(Arc::clone(&server), config)?;
    info!(
        file = data_set.config().filename.as_str(),
        workers = options.workers,
        iterations = options.iterations,
        "starting run"
    );

    let results: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = (1..=options.workers)
            .map(|ordinal| {
                let data_set = &data_set;
                let server = &server;
                scope.spawn(move || drive_worker(server, data_set, ordinal, options))
            })
            .collect();
        handles.into_iter().map(|handle| handle.join()).collect()
    });

    let mut workers = Vec::with_capacity(results.len());
    for result in results {
        workers.push(result.map_err(|_| "worker thread panicked")?);
    }

    server.close_all()?;
    Ok(RunReport {
        workers,
        stats: server.stats().snapshot(),
    })
}

fn drive_worker(
    server: &FileServer,
    data_set: &DataSet,
    ordinal: usize,
    options: &RunOptions,
) -> WorkerReport {
    let mut worker = server.worker(format!("{GROUP} 1-{ordinal}"), GROUP, options.workers);
    if let Some(seed) = options.seed {
        worker = worker.with_seed(seed.wrapping_add(ordinal as u64));
    }

    let mut rows = Vec::with_capacity(options.iterations);
    let mut stopped = None;
    for _ in 0..options.iterations {
        match data_set.next_row(&mut worker) {
            Ok(row) => rows.push(RowReport {
                line: row.line,
                fields: row.fields,
                bound: row.bind,
            }),
            Err(e) => {
                stopped = Some(e.to_string());
                break;
            }
        }
    }

    WorkerReport {
        name: worker.name().to_string(),
        alias: data_set.alias(&worker).map(str::to_string),
        rows,
        stopped,
    }
}

/// Runs the run command.
pub fn run(
    server: Arc<FileServer>,
    config: DataSetConfig,
    options: &RunOptions,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let report = collect(server, config, options)?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        _ => print_text_output(&report),
    }
    Ok(())
}

fn print_text_output(report: &RunReport) {
    for worker in &report.workers {
        match &worker.alias {
            Some(alias) => println!("{} ({alias})", worker.name),
            None => println!("{}", worker.name),
        }
        for row in &worker.rows {
            let marker = if row.bound { ' ' } else { '*' };
            match row.line {
                Some(line) => println!("  {marker}[{line}] {}", row.fields.join(" | ")),
                None => println!("  {marker}{}", row.fields.join(" | ")),
            }
        }
        if let Some(reason) = &worker.stopped {
            println!("  stopped: {reason}");
        }
    }

    let stats = &report.stats;
    println!();
    println!("Statistics:");
    println!("  Sequential rows: {}", stats.sequential_rows);
    println!("  Unique rows:     {}", stats.unique_rows);
    println!("  Random rows:     {}", stats.random_rows);
    println!("  Recycles:        {}", stats.recycles);
    println!("  Unbound reads:   {}", stats.frozen_reads);
    println!("  Degraded rows:   {}", stats.degraded_rows);
    println!("  Aborted workers: {}", stats.aborted_workers);
}

#[cfg(test)]
mod tests {
    use super::*;
    use rowfeed_core::{BlockAllocation, OutOfValuesPolicy, SelectionMode};
    use tempfile::tempdir;

    #[test]
    fn unique_workers_get_disjoint_rows() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("d.csv"), "id\n1\n2\n3\n4\n5\n6\n").unwrap();
        let server = Arc::new(FileServer::with_base(dir.path()));
        let config = DataSetConfig::new("d.csv")
            .selection(SelectionMode::Unique)
            .out_of_values(OutOfValuesPolicy::AbortThread)
            .block_allocation(BlockAllocation::Auto);
        let options = RunOptions {
            workers: 3,
            iterations: 5,
            seed: None,
        };

        let report = collect(server, config, &options).unwrap();
        let mut seen: Vec<String> = report
            .workers
            .iter()
            .flat_map(|w| w.rows.iter().map(|r| r.fields[0].clone()))
            .collect();
        seen.sort();
        assert_eq!(seen, ["1", "2", "3", "4", "5", "6"]);
        assert!(report.workers.iter().all(|w| w.stopped.is_some()));
        assert_eq!(report.stats.aborted_workers, 3);
    }

    #[test]
    fn loads_json_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ds.json");
        std::fs::write(&path, r#"{"filename": "d.csv", "selectRow": "random"}"#).unwrap();
        let config = load_config(&path).unwrap();
        assert_eq!(config.select_row, SelectionMode::Random);
    }
}
