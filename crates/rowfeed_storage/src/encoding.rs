//! Charset labels, byte-order marks and line transcoding.
//!
//! Decoding goes through [`encoding_rs`], so any WHATWG charset label is
//! accepted. `encoding_rs` only decodes UTF-16, so writing UTF-16 is done
//! here by hand.

use crate::error::{StorageError, StorageResult};
use encoding_rs::{EncoderResult, Encoding, UTF_16BE, UTF_16LE, UTF_8};

/// Resolves a charset label such as `windows-1252` or `Shift_JIS`.
///
/// A blank label yields `None`, meaning "detect from BOM or use UTF-8".
/// A bare `utf-16` label is read big endian.
///
/// # Errors
///
/// Returns [`StorageError::UnsupportedEncoding`] for an unknown label.
pub fn encoding_for_label(label: &str) -> StorageResult<Option<&'static Encoding>> {
    let trimmed = label.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if trimmed.eq_ignore_ascii_case("utf-16") || trimmed.eq_ignore_ascii_case("utf16") {
        return Ok(Some(UTF_16BE));
    }
    Encoding::for_label_no_replacement(trimmed.as_bytes())
        .map(Some)
        .ok_or_else(|| StorageError::UnsupportedEncoding {
            label: label.to_string(),
        })
}

/// Detects a byte-order mark at the start of `prefix`.
///
/// Returns the encoding it announces and the BOM length in bytes.
#[must_use]
pub fn detect_bom(prefix: &[u8]) -> Option<(&'static Encoding, usize)> {
    Encoding::for_bom(prefix)
}

/// Width in bytes of the unit a line terminator is encoded in.
pub(crate) fn unit_width(encoding: &'static Encoding) -> usize {
    if encoding == UTF_16LE || encoding == UTF_16BE {
        2
    } else {
        1
    }
}

/// Value of one unit, for terminator detection.
pub(crate) fn unit_value(encoding: &'static Encoding, bytes: &[u8]) -> u16 {
    match bytes {
        [lo, hi] if encoding == UTF_16LE => u16::from_le_bytes([*lo, *hi]),
        [hi, lo] if encoding == UTF_16BE => u16::from_be_bytes([*hi, *lo]),
        [b, ..] => u16::from(*b),
        [] => 0,
    }
}

/// Decodes the raw bytes of one line. Malformed input is replaced, never
/// rejected.
#[must_use]
pub fn decode_line(encoding: &'static Encoding, bytes: &[u8]) -> String {
    encoding.decode_without_bom_handling(bytes).0.into_owned()
}

/// Encodes text for writing. Unmappable characters become `?`.
#[must_use]
pub fn encode_text(encoding: &'static Encoding, text: &str) -> Vec<u8> {
    if encoding == UTF_8 {
        return text.as_bytes().to_vec();
    }
    if encoding == UTF_16LE {
        return text.encode_utf16().flat_map(u16::to_le_bytes).collect();
    }
    if encoding == UTF_16BE {
        return text.encode_utf16().flat_map(u16::to_be_bytes).collect();
    }

    let mut encoder = encoding.new_encoder();
    let mut out = Vec::with_capacity(text.len());
    let mut rest = text;
    loop {
        let capacity = encoder
            .max_buffer_length_from_utf8_without_replacement(rest.len())
            .unwrap_or(rest.len() * 4)
            .max(16);
        let mut buf = vec![0u8; capacity];
        let (result, read, written) =
            encoder.encode_from_utf8_without_replacement(rest, &mut buf, true);
        out.extend_from_slice(&buf[..written]);
        rest = &rest[read..];
        match result {
            EncoderResult::InputEmpty => break,
            EncoderResult::Unmappable(_) => out.push(b'?'),
            EncoderResult::OutputFull => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::{SHIFT_JIS, WINDOWS_1252};

    #[test]
    fn labels_resolve_through_whatwg_names() {
        assert_eq!(encoding_for_label("utf-8").unwrap(), Some(UTF_8));
        assert_eq!(encoding_for_label("UTF-16LE").unwrap(), Some(UTF_16LE));
        assert_eq!(encoding_for_label("windows-1252").unwrap(), Some(WINDOWS_1252));
        assert_eq!(encoding_for_label("Shift_JIS").unwrap(), Some(SHIFT_JIS));
        assert_eq!(encoding_for_label(" latin1 ").unwrap(), Some(WINDOWS_1252));
        assert_eq!(encoding_for_label("  ").unwrap(), None);
    }

    #[test]
    fn bare_utf16_is_big_endian() {
        assert_eq!(encoding_for_label("UTF-16").unwrap(), Some(UTF_16BE));
    }

    #[test]
    fn unknown_label_fails() {
        assert!(matches!(
            encoding_for_label("EBCDIC"),
            Err(StorageError::UnsupportedEncoding { .. })
        ));
        // Labels that only map to the replacement encoding are rejected.
        assert!(matches!(
            encoding_for_label("iso-2022-kr"),
            Err(StorageError::UnsupportedEncoding { .. })
        ));
    }

    #[test]
    fn bom_detection() {
        assert_eq!(detect_bom(&[0xEF, 0xBB, 0xBF, b'a']), Some((UTF_8, 3)));
        assert_eq!(detect_bom(&[0xFF, 0xFE, b'a', 0]), Some((UTF_16LE, 2)));
        assert_eq!(detect_bom(&[0xFE, 0xFF]), Some((UTF_16BE, 2)));
        assert_eq!(detect_bom(b"abc"), None);
        assert_eq!(detect_bom(&[0xEF, 0xBB]), None);
    }

    #[test]
    fn windows_1252_decodes_high_bytes() {
        assert_eq!(decode_line(WINDOWS_1252, b"caf\xE9,\x80"), "café,€");
    }

    #[test]
    fn utf16_units_and_writing() {
        let bytes = encode_text(UTF_16LE, "hé");
        assert_eq!(bytes, vec![b'h', 0, 0xE9, 0]);
        assert_eq!(unit_width(UTF_16LE), 2);
        assert_eq!(unit_value(UTF_16LE, &bytes[..2]), u16::from(b'h'));
        assert_eq!(decode_line(UTF_16LE, &bytes), "hé");
        assert_eq!(encode_text(UTF_16BE, "h"), vec![0, b'h']);
    }

    #[test]
    fn unmappable_characters_become_question_marks() {
        assert_eq!(encode_text(WINDOWS_1252, "café€✓"), b"caf\xE9\x80?".to_vec());
    }
}
