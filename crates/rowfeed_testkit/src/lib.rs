//! # rowfeed Testkit
//!
//! Test utilities for rowfeed.
//!
//! This crate provides:
//! - Temporary data files wired to a file server
//! - Property-based test generators using proptest
//! - A concurrent worker harness
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rowfeed_testkit::prelude::*;
//!
//! #[test]
//! fn test_with_file() {
//!     let csv = TempCsv::new("users.csv", "id,name\n1,ann\n");
//!     let data = csv.data_set(DataSetConfig::new("users.csv"));
//!     // ... drive workers
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::stress::*;
    pub use rowfeed_core::{
        BlockAllocation, DataSet, DataSetConfig, OutOfValuesPolicy, SelectionMode, ShareMode,
        UpdateMode, Variables,
    };
}

pub use fixtures::*;
pub use generators::*;
pub use stress::*;
