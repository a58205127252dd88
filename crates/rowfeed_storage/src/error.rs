//! Error types for storage operations.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The alias was never reserved.
    #[error("file never reserved: {alias}")]
    NotReserved {
        /// The alias that was looked up.
        alias: String,
    },

    /// A file name was empty.
    #[error("filename must not be empty")]
    EmptyFilename,

    /// The header line of a file could not be read.
    #[error("could not read file header line for file {path}: {reason}")]
    HeaderUnavailable {
        /// The resolved file path.
        path: PathBuf,
        /// Why the header is unavailable.
        reason: String,
    },

    /// The file entry is already serving a different kind of access.
    #[error("file {alias} already in use for {held} access")]
    AlreadyInUse {
        /// The alias of the entry.
        alias: String,
        /// The access pattern currently held.
        held: &'static str,
    },

    /// The base directory cannot change while handles are open.
    #[error("files are still open, cannot change base directory")]
    FilesStillOpen,

    /// The path is not a readable regular file.
    #[error("file {path} must exist and be readable")]
    NotReadable {
        /// The resolved file path.
        path: PathBuf,
    },

    /// The configured encoding label is unknown.
    #[error("unsupported encoding: {label}")]
    UnsupportedEncoding {
        /// The label as configured.
        label: String,
    },
}

impl StorageError {
    /// Creates a not-reserved error.
    pub fn not_reserved(alias: impl Into<String>) -> Self {
        Self::NotReserved {
            alias: alias.into(),
        }
    }

    /// Creates a header unavailable error.
    pub fn header_unavailable(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::HeaderUnavailable {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
