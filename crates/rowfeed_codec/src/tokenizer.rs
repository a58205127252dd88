//! Quoted-field row tokenizer.
//!
//! The scanner is a four-state machine:
//!
//! ```text
//! Initial ──quote──▶ Quoted ──quote──▶ EmbeddedQuote ──quote──▶ Quoted
//!    │                                     │
//!    └──other──▶ Plain                     └──delim/EOL──▶ Initial
//! ```
//!
//! `Plain` rejects any quote character. `EmbeddedQuote` accepts a doubled
//! quote (emitting one literal quote) or a field terminator, and rejects
//! everything else.

use crate::error::{CodecError, CodecResult, MalformedKind};

/// The quoting character.
pub const QUOTE: char = '"';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Initial,
    Plain,
    Quoted,
    EmbeddedQuote,
}

/// Splits one line into fields honouring quoted fields.
///
/// - `"a,b",c` yields `["a,b", "c"]`
/// - `"say ""hi"""` yields `[r#"say "hi""#]`
/// - an empty line yields a single empty field
/// - CR, LF and CRLF terminate a field; CRLF counts as one terminator
///
/// # Errors
///
/// Returns [`CodecError::MalformedRow`] when a quote appears inside an
/// unquoted field, when a lone quote inside a quoted field is followed
/// by anything but a terminator, or when a quoted field is never closed.
pub fn parse_line(line: &str, delimiter: char) -> CodecResult<Vec<String>> {
    CsvTokenizer::new(delimiter).parse_line(line)
}

/// A reusable tokenizer bound to one delimiter.
#[derive(Debug, Clone, Copy)]
pub struct CsvTokenizer {
    delimiter: char,
}

impl CsvTokenizer {
    /// Creates a tokenizer for the given delimiter.
    #[must_use]
    pub const fn new(delimiter: char) -> Self {
        Self { delimiter }
    }

    /// Returns the delimiter.
    #[must_use]
    pub const fn delimiter(&self) -> char {
        self.delimiter
    }

    #[inline]
    fn is_terminator(&self, ch: char) -> bool {
        ch == self.delimiter || ch == '\n' || ch == '\r'
    }

    /// Splits `line` into fields. See [`parse_line`].
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::MalformedRow`] on a quoting violation.
    pub fn parse_line(&self, line: &str) -> CodecResult<Vec<String>> {
        if line.is_empty() {
            return Ok(vec![String::new()]);
        }

        let chars: Vec<char> = line.chars().collect();
        let len = chars.len();
        let mut index = 0;
        let mut state = State::Initial;
        let mut fields = Vec::new();
        let mut field = String::new();
        let mut push = false;

        while index < len {
            push = false;
            let ch = chars[index];
            index += 1;

            match state {
                State::Initial => {
                    if ch == QUOTE {
                        state = State::Quoted;
                    } else if self.is_terminator(ch) {
                        push = true;
                    } else {
                        field.push(ch);
                        state = State::Plain;
                    }
                }
                State::Plain => {
                    if ch == QUOTE {
                        field.push(ch);
                        return Err(CodecError::malformed(
                            MalformedKind::QuoteInPlainField,
                            field,
                            index - 1,
                        ));
                    } else if self.is_terminator(ch) {
                        push = true;
                        state = State::Initial;
                    } else {
                        field.push(ch);
                    }
                }
                State::Quoted => {
                    if ch == QUOTE {
                        state = State::EmbeddedQuote;
                    } else {
                        field.push(ch);
                    }
                }
                State::EmbeddedQuote => {
                    if ch == QUOTE {
                        // doubled quote
                        field.push(QUOTE);
                        state = State::Quoted;
                    } else if self.is_terminator(ch) {
                        push = true;
                        state = State::Initial;
                    } else {
                        field.push(QUOTE);
                        return Err(CodecError::malformed(
                            MalformedKind::SingleQuoteInQuotedField,
                            field,
                            index - 1,
                        ));
                    }
                }
            }

            if push {
                if ch == '\r' && index < len && chars[index] == '\n' {
                    index += 1;
                }
                fields.push(std::mem::take(&mut field));
            }
        }

        if state == State::Quoted {
            return Err(CodecError::malformed(
                MalformedKind::MissingTrailingQuote,
                format!("{QUOTE}{field}"),
                len,
            ));
        }

        // Trailing data, a field opened by the last terminator, or a closed `""`.
        if !field.is_empty() || push || state == State::EmbeddedQuote {
            fields.push(field);
        }

        Ok(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> CodecResult<Vec<String>> {
        parse_line(line, ',')
    }

    #[test]
    fn plain_fields() {
        assert_eq!(parse("a,b,c").unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn quoted_field_with_delimiter() {
        assert_eq!(parse("\"a,b\",c").unwrap(), vec!["a,b", "c"]);
    }

    #[test]
    fn doubled_quote_becomes_literal() {
        assert_eq!(
            parse("\"say \"\"hi\"\"\",x").unwrap(),
            vec!["say \"hi\"", "x"]
        );
    }

    #[test]
    fn empty_line_is_one_blank_field() {
        assert_eq!(parse("").unwrap(), vec![String::new()]);
    }

    #[test]
    fn quoted_blank_is_one_blank_field() {
        assert_eq!(parse("\"\"").unwrap(), vec![String::new()]);
    }

    #[test]
    fn trailing_delimiter_keeps_empty_field() {
        assert_eq!(parse("a,").unwrap(), vec!["a", ""]);
        assert_eq!(parse(",").unwrap(), vec!["", ""]);
    }

    #[test]
    fn empty_middle_fields() {
        assert_eq!(parse("a,,c").unwrap(), vec!["a", "", "c"]);
    }

    #[test]
    fn crlf_is_one_terminator() {
        assert_eq!(parse("a,b\r\n").unwrap(), vec!["a", "b", ""]);
        assert_eq!(parse("a\r\nb").unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn lone_cr_terminates_field() {
        assert_eq!(parse("a\rb").unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn quote_in_plain_field_fails() {
        let err = parse("a\"\"b,c").unwrap_err();
        assert_eq!(err.malformed_kind(), Some(MalformedKind::QuoteInPlainField));
        match err {
            CodecError::MalformedRow {
                field, position, ..
            } => {
                assert_eq!(field, "a\"");
                assert_eq!(position, 1);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn single_quote_inside_quoted_field_fails() {
        let err = parse("\"ab\"c,d").unwrap_err();
        assert_eq!(
            err.malformed_kind(),
            Some(MalformedKind::SingleQuoteInQuotedField)
        );
    }

    #[test]
    fn unterminated_quote_fails() {
        let err = parse("\"abc").unwrap_err();
        assert_eq!(err.malformed_kind(), Some(MalformedKind::MissingTrailingQuote));
        assert!(err.to_string().contains("\"abc"));
    }

    #[test]
    fn tab_delimiter() {
        let tokenizer = CsvTokenizer::new('\t');
        assert_eq!(
            tokenizer.parse_line("x\t\"y\tz\"").unwrap(),
            vec!["x", "y\tz"]
        );
    }

    #[test]
    fn multibyte_characters() {
        assert_eq!(parse("é,\"ü,ß\"").unwrap(), vec!["é", "ü,ß"]);
    }
}
