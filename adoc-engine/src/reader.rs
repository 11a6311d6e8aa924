//! Turns the input byte stream into text the scanner can classify.
use std::io::Read;

use encoding_rs::{Encoding, UTF_8, UTF_16BE, UTF_16LE};

use crate::Error;

/// BOM (Byte Order Mark) patterns for encoding detection
const BOM_PATTERNS: &[(&[u8], &Encoding, usize, &str)] = &[
    (&[0xEF, 0xBB, 0xBF], UTF_8, 3, "UTF-8"),
    (&[0xFF, 0xFE], UTF_16LE, 2, "UTF-16 LE"),
    (&[0xFE, 0xFF], UTF_16BE, 2, "UTF-16 BE"),
];

/// Reads `reader` to the end and decodes it.
///
/// A byte order mark selects the encoding and is stripped; without one the
/// bytes are read as UTF-8 and malformed sequences become U+FFFD.
///
/// # Errors
///
/// Returns [`Error::Io`] when the reader fails.
pub fn read_source(mut reader: impl Read) -> Result<String, Error> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    Ok(decode(&bytes))
}

#[must_use]
pub fn decode(bytes: &[u8]) -> String {
    for (bom, encoding, skip, name) in BOM_PATTERNS {
        if bytes.starts_with(bom)
            && let Some(content) = bytes.get(*skip..)
        {
            let (cow, had_errors) = encoding.decode_without_bom_handling(content);
            if had_errors {
                tracing::warn!(encoding = name, "decoding encountered errors");
            }
            return cow.into_owned();
        }
    }

    let (cow, had_errors) = UTF_8.decode_without_bom_handling(bytes);
    if had_errors {
        tracing::warn!("input is not valid UTF-8, malformed sequences were replaced");
    }
    cow.into_owned()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn strips_utf8_bom() {
        assert_eq!(decode(b"\xEF\xBB\xBFhello"), "hello");
    }

    #[test]
    fn decodes_utf16_le() {
        let bytes = [0xFF, 0xFE, b'h', 0, b'i', 0];
        assert_eq!(decode(&bytes), "hi");
    }

    #[test]
    fn decodes_utf16_be() {
        let bytes = [0xFE, 0xFF, 0, b'o', 0, b'k'];
        assert_eq!(decode(&bytes), "ok");
    }

    #[test]
    #[tracing_test::traced_test]
    fn replaces_malformed_utf8() {
        assert_eq!(decode(b"a\xFFb"), "a\u{FFFD}b");
        assert!(logs_contain("not valid UTF-8"));
    }

    #[test]
    #[tracing_test::traced_test]
    fn replaces_unpaired_utf16_surrogates() {
        let bytes = [0xFF, 0xFE, b'h', 0, 0x00, 0xD8];
        assert_eq!(decode(&bytes), "h\u{FFFD}");
        assert!(logs_contain("decoding encountered errors"));
    }

    #[test]
    fn reads_from_any_reader() -> Result<(), Error> {
        let source = read_source(&b"= Title\n"[..])?;
        assert_eq!(source, "= Title\n");
        Ok(())
    }
}
