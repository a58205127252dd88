//! # rowfeed Core
//!
//! Concurrent row selection over delimited data files.
//!
//! Many worker threads draw rows from shared files. Each data set decides
//! how a worker gets its next row (sequentially through a shared cursor,
//! from its own block of rows, or at random), what happens when rows run
//! out, and which workers share a cursor.
//!
//! ## Components
//!
//! - [`FileServer`] - registry, row-count cache and statistics for a run
//! - [`DataSet`] - row selection for one configured file
//! - [`WorkerContext`] - state a single worker owns
//! - [`partition`] - block planning for unique selection
//! - [`DataSetConfig`] - configuration with closed mode enums
//!
//! ## Example
//!
//! ```no_run
//! use rowfeed_core::{DataSet, DataSetConfig, FileServer, Variables};
//! use std::sync::Arc;
//!
//! let server = Arc::new(FileServer::new());
//! let data = DataSet::new(Arc::clone(&server), DataSetConfig::new("users.csv"))?;
//!
//! let mut worker = server.worker("Users 1-1", "Users", 1);
//! let mut vars = Variables::new();
//! for _ in 0..3 {
//!     data.iteration_start(&mut worker, &mut vars)?;
//! }
//! server.close_all()?;
//! # Ok::<(), rowfeed_core::CoreError>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod binder;
mod config;
mod data_set;
mod error;
pub mod partition;
mod server;
mod stats;
mod worker;

pub use binder::{bind, VariableSink, Variables};
pub use config::{
    BlockAllocation, DataSetConfig, OutOfValuesPolicy, SelectionMode, ShareMode, UpdateMode,
};
pub use data_set::{DataSet, Row};
pub use error::{CoreError, CoreResult};
pub use partition::{advance, compute_block, leftover_rows, Block, PartitionState, Step};
pub use server::FileServer;
pub use stats::{ServerStats, StatsSnapshot};
pub use worker::{parse_ordinal, WorkerContext, WorkerIdentity};

/// Version of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
