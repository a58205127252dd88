//! Buffered line reader with encoding awareness.

use crate::encoding::{decode_line, detect_bom, unit_value, unit_width};
use crate::error::{StorageError, StorageResult};
use encoding_rs::{Encoding, UTF_8};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

const LF: u16 = 0x0A;
const CR: u16 = 0x0D;

/// One encoded unit: its raw bytes and its value.
#[derive(Debug, Clone, Copy)]
struct Unit {
    bytes: [u8; 2],
    len: usize,
    value: u16,
}

/// Reads lines from a text file.
///
/// Lines end at LF, CR or CRLF; the terminator is not returned. A final
/// line without terminator is still returned. Decoding is lossy.
#[derive(Debug)]
pub struct LineReader {
    inner: BufReader<File>,
    encoding: &'static Encoding,
    /// One unit read ahead while resolving a CR.
    pending: Option<Unit>,
    lines_read: u64,
}

impl LineReader {
    /// Opens `path`, skipping a byte-order mark if present.
    ///
    /// The configured `encoding` wins over a BOM; with no configured
    /// encoding the BOM decides, and without BOM UTF-8 is used.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotReadable`] if `path` is not a regular
    /// file, or an I/O error if opening fails.
    pub fn open(path: &Path, encoding: Option<&'static Encoding>) -> StorageResult<Self> {
        if !path.is_file() {
            return Err(StorageError::NotReadable {
                path: path.to_path_buf(),
            });
        }
        let file = File::open(path)?;
        let mut inner = BufReader::new(file);

        let detected = {
            let prefix = inner.fill_buf()?;
            detect_bom(prefix)
        };
        let encoding = match detected {
            Some((bom_encoding, bom_len)) => {
                inner.consume(bom_len);
                encoding.unwrap_or(bom_encoding)
            }
            None => encoding.unwrap_or(UTF_8),
        };

        Ok(Self {
            inner,
            encoding,
            pending: None,
            lines_read: 0,
        })
    }

    /// Returns the encoding in effect.
    #[must_use]
    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }

    /// Number of lines returned so far.
    #[must_use]
    pub fn lines_read(&self) -> u64 {
        self.lines_read
    }

    fn read_unit(&mut self) -> io::Result<Option<Unit>> {
        if let Some(unit) = self.pending.take() {
            return Ok(Some(unit));
        }
        let width = unit_width(self.encoding);
        let mut bytes = [0u8; 2];
        let mut filled = 0;
        while filled < width {
            let buf = self.inner.fill_buf()?;
            if buf.is_empty() {
                break;
            }
            let take = (width - filled).min(buf.len());
            bytes[filled..filled + take].copy_from_slice(&buf[..take]);
            self.inner.consume(take);
            filled += take;
        }
        if filled == 0 {
            return Ok(None);
        }
        // A dangling odd byte of UTF-16 is kept and decodes to U+FFFD.
        let value = if filled == width {
            unit_value(self.encoding, &bytes[..width])
        } else {
            u16::MAX
        };
        Ok(Some(Unit {
            bytes,
            len: filled,
            value,
        }))
    }

    /// Reads the next line, or `None` at end of file.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the underlying read fails.
    pub fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut raw = Vec::new();
        let mut seen_any = false;
        loop {
            match self.read_unit()? {
                None => {
                    if !seen_any {
                        return Ok(None);
                    }
                    break;
                }
                Some(Unit { value: LF, .. }) => break,
                Some(Unit { value: CR, .. }) => {
                    if let Some(next) = self.read_unit()? {
                        if next.value != LF {
                            self.pending = Some(next);
                        }
                    }
                    break;
                }
                Some(unit) => {
                    seen_any = true;
                    raw.extend_from_slice(&unit.bytes[..unit.len]);
                }
            }
        }
        self.lines_read += 1;
        Ok(Some(decode_line(self.encoding, &raw)))
    }

    /// Skips up to `count` lines, returning how many were skipped.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the underlying read fails.
    pub fn skip_lines(&mut self, count: usize) -> io::Result<usize> {
        let mut skipped = 0;
        while skipped < count {
            if self.read_line()?.is_none() {
                break;
            }
            skipped += 1;
        }
        Ok(skipped)
    }

    /// Returns whether no more data is available, without consuming any.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the underlying read fails.
    pub fn is_at_eof(&mut self) -> io::Result<bool> {
        if self.pending.is_some() {
            return Ok(false);
        }
        Ok(self.inner.fill_buf()?.is_empty())
    }

    /// Counts the remaining lines, consuming the reader.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the underlying read fails.
    pub fn count_remaining(mut self) -> io::Result<usize> {
        let mut count = 0;
        while self.read_line()?.is_some() {
            count += 1;
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn file_with(bytes: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(bytes).unwrap();
        file.flush().unwrap();
        file
    }

    fn all_lines(reader: &mut LineReader) -> Vec<String> {
        let mut lines = Vec::new();
        while let Some(line) = reader.read_line().unwrap() {
            lines.push(line);
        }
        lines
    }

    #[test]
    fn mixed_terminators() {
        let file = file_with(b"a\nb\r\nc\rd");
        let mut reader = LineReader::open(file.path(), None).unwrap();
        assert_eq!(all_lines(&mut reader), vec!["a", "b", "c", "d"]);
        assert_eq!(reader.lines_read(), 4);
    }

    #[test]
    fn blank_lines_are_kept() {
        let file = file_with(b"a\n\nb\n");
        let mut reader = LineReader::open(file.path(), None).unwrap();
        assert_eq!(all_lines(&mut reader), vec!["a", "", "b"]);
    }

    #[test]
    fn empty_file_has_no_lines() {
        let file = file_with(b"");
        let mut reader = LineReader::open(file.path(), None).unwrap();
        assert!(reader.is_at_eof().unwrap());
        assert_eq!(reader.read_line().unwrap(), None);
    }

    #[test]
    fn utf8_bom_is_skipped() {
        let file = file_with(b"\xEF\xBB\xBFid,name\n1,x\n");
        let mut reader = LineReader::open(file.path(), None).unwrap();
        assert_eq!(reader.encoding(), encoding_rs::UTF_8);
        assert_eq!(all_lines(&mut reader), vec!["id,name", "1,x"]);
    }

    #[test]
    fn utf16le_bom_selects_encoding() {
        let mut bytes = vec![0xFF, 0xFE];
        bytes.extend(crate::encoding::encode_text(encoding_rs::UTF_16LE, "h\u{e9}\r\nz\n"));
        let file = file_with(&bytes);
        let mut reader = LineReader::open(file.path(), None).unwrap();
        assert_eq!(reader.encoding(), encoding_rs::UTF_16LE);
        assert_eq!(all_lines(&mut reader), vec!["h\u{e9}", "z"]);
    }

    #[test]
    fn configured_encoding_wins() {
        let file = file_with(b"caf\xE9\n");
        let mut reader = LineReader::open(file.path(), Some(encoding_rs::WINDOWS_1252)).unwrap();
        assert_eq!(all_lines(&mut reader), vec!["caf\u{e9}"]);
    }

    #[test]
    fn multibyte_charset_lines() {
        let file = file_with(b"\x93\xFA\x96\x7B,x\r\ny\n");
        let mut reader = LineReader::open(file.path(), Some(encoding_rs::SHIFT_JIS)).unwrap();
        assert_eq!(all_lines(&mut reader), vec!["\u{65e5}\u{672c},x", "y"]);
    }

    #[test]
    fn eof_peek_does_not_consume() {
        let file = file_with(b"x\ny\n");
        let mut reader = LineReader::open(file.path(), None).unwrap();
        assert!(!reader.is_at_eof().unwrap());
        assert_eq!(reader.read_line().unwrap().as_deref(), Some("x"));
        assert!(!reader.is_at_eof().unwrap());
        assert_eq!(reader.read_line().unwrap().as_deref(), Some("y"));
        assert!(reader.is_at_eof().unwrap());
    }

    #[test]
    fn skip_and_count() {
        let file = file_with(b"h\n1\n2\n3\n");
        let mut reader = LineReader::open(file.path(), None).unwrap();
        assert_eq!(reader.skip_lines(1).unwrap(), 1);
        assert_eq!(reader.count_remaining().unwrap(), 3);
    }

    #[test]
    fn directory_is_not_readable() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            LineReader::open(dir.path(), None),
            Err(StorageError::NotReadable { .. })
        ));
    }

    proptest::proptest! {
        #[test]
        fn newline_terminated_lines_read_back(
            lines in proptest::collection::vec("[a-z0-9,\" \u{e9}]{0,10}", 0..20)
        ) {
            let mut text = String::new();
            for line in &lines {
                text.push_str(line);
                text.push('\n');
            }
            let file = file_with(text.as_bytes());
            let mut reader = LineReader::open(file.path(), None).unwrap();
            proptest::prop_assert_eq!(all_lines(&mut reader), lines.clone());

            let reader = LineReader::open(file.path(), None).unwrap();
            proptest::prop_assert_eq!(reader.count_remaining().unwrap(), lines.len());
        }
    }
}
