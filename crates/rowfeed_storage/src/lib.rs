//! # rowfeed Storage
//!
//! Shared, thread-safe access to delimited data files.
//!
//! This crate is the I/O layer of rowfeed. It knows about files, aliases,
//! encodings and lines, but nothing about selection modes or fields.
//!
//! ## Design Principles
//!
//! - Files are reserved once under an alias and opened lazily
//! - One registry-wide lock serialises all file operations
//! - Each alias owns one read cursor; independent cursors need distinct aliases
//! - Indexed reads are cold scans that never move a cursor
//! - Handles are released only by an explicit close
//!
//! ## Components
//!
//! - [`PathResolver`] - resolves file names against a base directory
//! - [`LineReader`] - buffered, BOM-aware line reader
//! - [`FileRegistry`] - alias → file map with cursor, indexed and write access
//!
//! ## Example
//!
//! ```no_run
//! use rowfeed_storage::FileRegistry;
//!
//! let registry = FileRegistry::new();
//! registry.reserve_file("users.csv").unwrap();
//! while let Some(line) = registry.next_line("users.csv", false, false).unwrap() {
//!     println!("{line}");
//! }
//! registry.close_all().unwrap();
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod encoding;
mod entry;
mod error;
mod path;
mod reader;
mod registry;

pub use encoding::{decode_line, detect_bom, encode_text, encoding_for_label};
pub use encoding_rs::Encoding;
pub use entry::{Access, HandleState};
pub use error::{StorageError, StorageResult};
pub use path::{PathResolver, BASE_PREFIX};
pub use reader::LineReader;
pub use registry::FileRegistry;
