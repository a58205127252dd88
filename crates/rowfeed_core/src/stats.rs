//! Server statistics.
//!
//! Counters are atomic and can be read while workers are running.
//!
//! # Usage
//!
//! ```rust,ignore
//! let server = FileServer::new();
//! // ... run workers ...
//! let stats = server.stats().snapshot();
//! println!("unique rows: {}", stats.unique_rows);
//! ```

use crate::config::SelectionMode;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters shared by every data set of one server.
#[derive(Debug, Default)]
pub struct ServerStats {
    /// Rows delivered by sequential reads.
    sequential_rows: AtomicU64,
    /// Rows delivered by unique-mode reads.
    unique_rows: AtomicU64,
    /// Rows delivered by random reads.
    random_rows: AtomicU64,
    /// Cyclic wrap-arounds of unique-mode blocks.
    recycles: AtomicU64,
    /// Rows replaced by an empty row after a failure.
    degraded_rows: AtomicU64,
    /// Reads made with frozen or exhausted data, not bound.
    frozen_reads: AtomicU64,
    /// Workers stopped by the abort policy.
    aborted_workers: AtomicU64,
    /// Data sets initialised.
    initialisations: AtomicU64,
}

impl ServerStats {
    /// Creates a new stats instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a delivered row.
    pub(crate) fn record_row(&self, mode: SelectionMode) {
        let counter = match mode {
            SelectionMode::Sequential => &self.sequential_rows,
            SelectionMode::Unique => &self.unique_rows,
            SelectionMode::Random => &self.random_rows,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a wrap-around.
    pub(crate) fn record_recycle(&self) {
        self.recycles.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a degraded row.
    pub(crate) fn record_degraded(&self) {
        self.degraded_rows.fetch_add(1, Ordering::Relaxed);
    }

    /// Records an unbound read of frozen data.
    pub(crate) fn record_frozen_read(&self) {
        self.frozen_reads.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a worker stopped by the abort policy.
    pub(crate) fn record_abort(&self) {
        self.aborted_workers.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a data set initialisation.
    pub(crate) fn record_initialisation(&self) {
        self.initialisations.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the rows delivered in sequential mode.
    pub fn sequential_rows(&self) -> u64 {
        self.sequential_rows.load(Ordering::Relaxed)
    }

    /// Returns the rows delivered in unique mode.
    pub fn unique_rows(&self) -> u64 {
        self.unique_rows.load(Ordering::Relaxed)
    }

    /// Returns the rows delivered in random mode.
    pub fn random_rows(&self) -> u64 {
        self.random_rows.load(Ordering::Relaxed)
    }

    /// Returns the total rows delivered in any mode.
    pub fn rows(&self) -> u64 {
        self.sequential_rows() + self.unique_rows() + self.random_rows()
    }

    /// Returns the number of wrap-arounds.
    pub fn recycles(&self) -> u64 {
        self.recycles.load(Ordering::Relaxed)
    }

    /// Returns the number of degraded rows.
    ///
    /// A non-zero value means I/O or parse failures were swallowed;
    /// the log has the details.
    pub fn degraded_rows(&self) -> u64 {
        self.degraded_rows.load(Ordering::Relaxed)
    }

    /// Returns the number of unbound frozen reads.
    pub fn frozen_reads(&self) -> u64 {
        self.frozen_reads.load(Ordering::Relaxed)
    }

    /// Returns the number of aborted workers.
    pub fn aborted_workers(&self) -> u64 {
        self.aborted_workers.load(Ordering::Relaxed)
    }

    /// Returns the number of data set initialisations.
    pub fn initialisations(&self) -> u64 {
        self.initialisations.load(Ordering::Relaxed)
    }

    /// Returns a snapshot of all stats.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            sequential_rows: self.sequential_rows(),
            unique_rows: self.unique_rows(),
            random_rows: self.random_rows(),
            recycles: self.recycles(),
            degraded_rows: self.degraded_rows(),
            frozen_reads: self.frozen_reads(),
            aborted_workers: self.aborted_workers(),
            initialisations: self.initialisations(),
        }
    }
}

/// A point-in-time copy of [`ServerStats`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct StatsSnapshot {
    /// Rows delivered in sequential mode.
    pub sequential_rows: u64,
    /// Rows delivered in unique mode.
    pub unique_rows: u64,
    /// Rows delivered in random mode.
    pub random_rows: u64,
    /// Wrap-arounds.
    pub recycles: u64,
    /// Degraded rows.
    pub degraded_rows: u64,
    /// Unbound frozen reads.
    pub frozen_reads: u64,
    /// Aborted workers.
    pub aborted_workers: u64,
    /// Data set initialisations.
    pub initialisations: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_stats_are_zero() {
        let stats = ServerStats::new();
        assert_eq!(stats.rows(), 0);
        assert_eq!(stats.snapshot(), StatsSnapshot::default());
    }

    #[test]
    fn rows_are_counted_per_mode() {
        let stats = ServerStats::new();
        stats.record_row(SelectionMode::Sequential);
        stats.record_row(SelectionMode::Unique);
        stats.record_row(SelectionMode::Unique);
        stats.record_row(SelectionMode::Random);

        assert_eq!(stats.sequential_rows(), 1);
        assert_eq!(stats.unique_rows(), 2);
        assert_eq!(stats.random_rows(), 1);
        assert_eq!(stats.rows(), 4);
    }

    #[test]
    fn snapshot_serializes() {
        let stats = ServerStats::new();
        stats.record_abort();
        stats.record_degraded();
        let json = serde_json::to_value(stats.snapshot()).unwrap();
        assert_eq!(json["aborted_workers"], 1);
        assert_eq!(json["degraded_rows"], 1);
    }

    #[test]
    fn concurrent_updates() {
        use std::sync::Arc;
        use std::thread;

        let stats = Arc::new(ServerStats::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let s = Arc::clone(&stats);
                thread::spawn(move || {
                    for _ in 0..100 {
                        s.record_row(SelectionMode::Random);
                        s.record_recycle();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(stats.random_rows(), 800);
        assert_eq!(stats.recycles(), 800);
    }
}
