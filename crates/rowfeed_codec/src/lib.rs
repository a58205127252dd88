//! # rowfeed Codec
//!
//! Row tokenizing for rowfeed.
//!
//! This crate turns one line of delimited text into fields. Two modes
//! are provided:
//!
//! - **Quoted**: [`parse_line`] runs a four-state scanner that honours
//!   `"`-quoted fields and `""` escapes, and rejects stray quotes.
//! - **Raw**: [`split_raw`] splits on every delimiter occurrence.
//!
//! ## Usage
//!
//! ```
//! use rowfeed_codec::{parse_line, split_raw};
//!
//! let fields = parse_line("\"a,b\",c", ',').unwrap();
//! assert_eq!(fields, vec!["a,b", "c"]);
//!
//! assert!(parse_line("a\"\"b,c", ',').is_err());
//! assert_eq!(split_raw("x;y", ";"), vec!["x", "y"]);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod split;
mod tokenizer;

pub use error::{CodecError, CodecResult, MalformedKind};
pub use split::{
    delimiter_char, normalize_delimiter, split_names, split_raw, RowSplitter, DEFAULT_DELIMITER,
};
pub use tokenizer::{parse_line, CsvTokenizer, QUOTE};
