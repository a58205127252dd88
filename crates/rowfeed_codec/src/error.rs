//! Error types for the codec crate.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Why a row could not be tokenized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedKind {
    /// A quote character appeared inside an unquoted field.
    QuoteInPlainField,
    /// A single quote inside a quoted field was followed by neither a
    /// second quote nor a field terminator.
    SingleQuoteInQuotedField,
    /// The line ended inside a quoted field.
    MissingTrailingQuote,
}

impl std::fmt::Display for MalformedKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::QuoteInPlainField => "cannot have quote-char in plain field",
            Self::SingleQuoteInQuotedField => "cannot have single quote-char in quoted field",
            Self::MissingTrailingQuote => "missing trailing quote-char in quoted field",
        };
        f.write_str(text)
    }
}

/// Errors that can occur while splitting a row into fields.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The row violates the quoting rules.
    #[error("malformed row: {kind}:[{field}]")]
    MalformedRow {
        /// Which quoting rule was broken.
        kind: MalformedKind,
        /// The field text accumulated up to and including the offending character.
        field: String,
        /// Character offset in the line where the problem was detected.
        position: usize,
    },

    /// The delimiter is unusable for tokenizing.
    #[error("invalid delimiter: {message}")]
    InvalidDelimiter {
        /// Description of the problem.
        message: String,
    },
}

impl CodecError {
    /// Create a malformed row error.
    pub fn malformed(kind: MalformedKind, field: impl Into<String>, position: usize) -> Self {
        Self::MalformedRow {
            kind,
            field: field.into(),
            position,
        }
    }

    /// Create an invalid delimiter error.
    pub fn invalid_delimiter(message: impl Into<String>) -> Self {
        Self::InvalidDelimiter {
            message: message.into(),
        }
    }

    /// Returns the malformed-row kind, if this is a malformed row error.
    #[must_use]
    pub fn malformed_kind(&self) -> Option<MalformedKind> {
        match self {
            Self::MalformedRow { kind, .. } => Some(*kind),
            Self::InvalidDelimiter { .. } => None,
        }
    }
}
