//! Concurrent worker harness.
//!
//! Spawns real threads against one data set, the way a load generator
//! would, and records what each worker received.

use rowfeed_core::{CoreError, DataSet, FileServer, Row};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Configuration for a concurrent run.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Number of worker threads.
    pub workers: usize,
    /// Iterations per worker.
    pub iterations: usize,
    /// Group name; workers are named `"<group> 1-<n>"`.
    pub group: String,
    /// Base seed for random selection.
    pub seed: Option<u64>,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            iterations: 100,
            group: "stress".to_string(),
            seed: None,
        }
    }
}

/// What one worker received.
#[derive(Debug)]
pub struct WorkerRun {
    /// 1-based worker number.
    pub ordinal: usize,
    /// Rows received, in order.
    pub rows: Vec<Row>,
    /// The error that stopped the worker, if any.
    pub stopped: Option<CoreError>,
}

impl WorkerRun {
    /// Returns the first field of every bound row.
    pub fn bound_keys(&self) -> Vec<String> {
        self.rows
            .iter()
            .filter(|row| row.bind)
            .filter_map(|row| row.fields.first().cloned())
            .collect()
    }
}

/// Result of a concurrent run.
#[derive(Debug)]
pub struct StressTestResult {
    /// Per-worker results, in ordinal order.
    pub workers: Vec<WorkerRun>,
    /// Wall-clock duration.
    pub duration: Duration,
}

impl StressTestResult {
    /// Total rows received by all workers.
    pub fn total_rows(&self) -> usize {
        self.workers.iter().map(|w| w.rows.len()).sum()
    }

    /// Rows per second.
    pub fn rows_per_second(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            self.total_rows() as f64 / secs
        } else {
            0.0
        }
    }

    /// First fields of every bound row of every worker.
    pub fn all_bound_keys(&self) -> Vec<String> {
        self.workers.iter().flat_map(WorkerRun::bound_keys).collect()
    }

    /// Prints a summary of the run.
    pub fn print_summary(&self, name: &str) {
        println!("\n=== {} ===", name);
        println!("Workers: {}", self.workers.len());
        println!("Rows: {}", self.total_rows());
        println!("Duration: {:?}", self.duration);
        println!("Throughput: {:.2} rows/sec", self.rows_per_second());
    }
}

/// Drives `config.workers` threads over `data_set`.
///
/// Each worker calls `next_row` up to `config.iterations` times and stops
/// at the first error.
pub fn run_workers(
    server: &Arc<FileServer>,
    data_set: &DataSet,
    config: &StressConfig,
) -> StressTestResult {
    let start = Instant::now();
    let workers = thread::scope(|scope| {
        let handles: Vec<_> = (1..=config.workers)
            .map(|ordinal| {
                scope.spawn(move || {
                    let name = format!("{} 1-{ordinal}", config.group);
                    let mut worker = server.worker(name, config.group.as_str(), config.workers);
                    if let Some(seed) = config.seed {
                        worker = worker.with_seed(seed + ordinal as u64);
                    }

                    let mut rows = Vec::with_capacity(config.iterations);
                    let mut stopped = None;
                    for _ in 0..config.iterations {
                        match data_set.next_row(&mut worker) {
                            Ok(row) => rows.push(row),
                            Err(e) => {
                                stopped = Some(e);
                                break;
                            }
                        }
                    }
                    WorkerRun {
                        ordinal,
                        rows,
                        stopped,
                    }
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("worker thread panicked"))
            .collect()
    });

    StressTestResult {
        workers,
        duration: start.elapsed(),
    }
}
