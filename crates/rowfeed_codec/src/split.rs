//! Unquoted splitting and delimiter handling.

use crate::error::{CodecError, CodecResult};
use crate::tokenizer::CsvTokenizer;

/// Default field delimiter.
pub const DEFAULT_DELIMITER: &str = ",";

/// Normalises a configured delimiter.
///
/// The two characters `\t` become a real tab and an empty string becomes
/// the default comma. Anything else is returned unchanged.
#[must_use]
pub fn normalize_delimiter(raw: &str) -> String {
    match raw {
        "\\t" => "\t".to_string(),
        "" => DEFAULT_DELIMITER.to_string(),
        other => other.to_string(),
    }
}

/// Returns the first character of a delimiter, as used by the quoted tokenizer.
///
/// # Errors
///
/// Returns [`CodecError::InvalidDelimiter`] for an empty delimiter.
pub fn delimiter_char(delimiter: &str) -> CodecResult<char> {
    delimiter
        .chars()
        .next()
        .ok_or_else(|| CodecError::invalid_delimiter("delimiter must not be empty"))
}

/// Splits a line on every occurrence of `delimiter`, without quote handling.
///
/// Empty fields are kept, including a trailing one, so `"a,,b,"` yields
/// four fields. An empty line yields one empty field.
#[must_use]
pub fn split_raw(line: &str, delimiter: &str) -> Vec<String> {
    if delimiter.is_empty() {
        return vec![line.to_string()];
    }
    line.split(delimiter).map(str::to_string).collect()
}

/// Splits a variable-name list and trims every name.
#[must_use]
pub fn split_names(names: &str, delimiter: &str) -> Vec<String> {
    split_raw(names, delimiter)
        .into_iter()
        .map(|name| name.trim().to_string())
        .collect()
}

/// Splits rows either with the quoted tokenizer or with [`split_raw`].
#[derive(Debug, Clone)]
pub struct RowSplitter {
    delimiter: String,
    quoted: Option<CsvTokenizer>,
}

impl RowSplitter {
    /// Creates a splitter. `delimiter` is normalised first.
    ///
    /// # Errors
    ///
    /// Never fails for a normalised delimiter; kept fallible so callers
    /// handle a delimiter the tokenizer cannot use.
    pub fn new(delimiter: &str, quoted: bool) -> CodecResult<Self> {
        let delimiter = normalize_delimiter(delimiter);
        let quoted = if quoted {
            Some(CsvTokenizer::new(delimiter_char(&delimiter)?))
        } else {
            None
        };
        Ok(Self { delimiter, quoted })
    }

    /// Returns the normalised delimiter.
    #[must_use]
    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    /// Returns whether quoted fields are honoured.
    #[must_use]
    pub fn is_quoted(&self) -> bool {
        self.quoted.is_some()
    }

    /// Splits one line.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::MalformedRow`] for quoting violations in quoted mode.
    pub fn split(&self, line: &str) -> CodecResult<Vec<String>> {
        match &self.quoted {
            Some(tokenizer) => tokenizer.parse_line(line),
            None => Ok(split_raw(line, &self.delimiter)),
        }
    }
}
