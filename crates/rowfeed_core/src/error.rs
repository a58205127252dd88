//! Error types for rowfeed core.

use crate::config::OutOfValuesPolicy;
use rowfeed_storage::StorageError;
use std::io;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur while serving rows.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Storage error.
    #[error("storage error: {0}")]
    Storage(StorageError),

    /// Row tokenizing error.
    #[error("codec error: {0}")]
    Codec(#[from] rowfeed_codec::CodecError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The data set is misconfigured.
    #[error("configuration error: {message}")]
    Configuration {
        /// Description of the problem.
        message: String,
    },

    /// A read was attempted on an alias that was never reserved.
    #[error("file never reserved: {alias}")]
    NotReserved {
        /// The alias used.
        alias: String,
    },

    /// A worker used up its block under the abort policy.
    #[error("end of block: {filename} (alias {alias}) configured with out-of-values policy {policy}")]
    EndOfBlock {
        /// The configured file name.
        filename: String,
        /// The alias the worker reads through.
        alias: String,
        /// The policy that caused the stop.
        policy: OutOfValuesPolicy,
    },

    /// A sequential reader reached end of file under the abort policy.
    #[error("end of file: {filename} (alias {alias}) configured with out-of-values policy {policy}")]
    EndOfFile {
        /// The configured file name.
        filename: String,
        /// The alias the worker reads through.
        alias: String,
        /// The policy that caused the stop.
        policy: OutOfValuesPolicy,
    },
}

impl From<StorageError> for CoreError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotReserved { alias } => Self::NotReserved { alias },
            StorageError::EmptyFilename => Self::configuration("filename must not be empty"),
            StorageError::UnsupportedEncoding { label } => {
                Self::configuration(format!("unsupported file encoding: {label}"))
            }
            other => Self::Storage(other),
        }
    }
}

impl CoreError {
    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Returns whether this error terminates the worker that hit it.
    ///
    /// Everything else raised while reading a row is logged and turned
    /// into an empty row.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Configuration { .. }
                | Self::NotReserved { .. }
                | Self::EndOfBlock { .. }
                | Self::EndOfFile { .. }
        )
    }

    /// Returns whether the worker stopped because its data ran out.
    #[must_use]
    pub fn is_end_of_data(&self) -> bool {
        matches!(self, Self::EndOfBlock { .. } | Self::EndOfFile { .. })
    }
}
