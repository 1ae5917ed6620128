//! Text encoding conversion for C source files, which may be written in
//! any of the legacy single-byte encodings this toolchain's users still
//! target (`--input-enc`/`--output-enc`, default `latin-1`).

use encoding_rs::Encoding;

use crate::error::{Error, ErrorContext, Result};

/// Resolve an encoding name (as accepted by `--input-enc`/`--output-enc`)
/// to an [`encoding_rs::Encoding`]. Accepts the usual aliases
/// (`latin-1`, `latin1`, `iso-8859-1`, `utf-8`, `ascii`, ...).
pub fn lookup(name: &str) -> Result<&'static Encoding> {
    Encoding::for_label(name.as_bytes()).ok_or_else(|| Error::ConfigError {
        message: format!("unrecognized text encoding '{name}'"),
    })
}

/// Decode `bytes` (as encoded in `enc`) to a `String`, failing on bytes
/// that encoding cannot represent.
pub fn decode(bytes: &[u8], enc: &'static Encoding, context: &ErrorContext) -> Result<String> {
    let (text, _, had_errors) = enc.decode(bytes);
    if had_errors {
        return Err(Error::ParseElf {
            context: context.clone(),
            message: format!("input is not valid {}", enc.name()),
        });
    }
    Ok(text.into_owned())
}

/// Encode `text` into `enc`'s byte representation, failing on characters
/// that encoding cannot represent (no mojibake fallback: an
/// unencodable character is a configuration error, not silently
/// replaced).
pub fn encode(text: &str, enc: &'static Encoding, context: &ErrorContext) -> Result<Vec<u8>> {
    let (bytes, _, had_unmappable) = enc.encode(text);
    if had_unmappable {
        return Err(Error::ParseElf {
            context: context.clone(),
            message: format!("output contains characters not representable in {}", enc.name()),
        });
    }
    Ok(bytes.into_owned())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn latin1_roundtrip() {
        let enc = lookup("latin-1").unwrap();
        let bytes = [0x48, 0x69, 0xe9]; // "Hi" + e-acute in Latin-1
        let text = decode(&bytes, enc, &ErrorContext::none()).unwrap();
        assert_eq!(text, "Hi\u{e9}");
        let back = encode(&text, enc, &ErrorContext::none()).unwrap();
        assert_eq!(back, bytes);
    }

    #[test]
    fn unrecognized_encoding_is_config_error() {
        assert!(lookup("not-a-real-encoding").is_err());
    }

    #[test]
    fn ascii_output_rejects_non_ascii_text() {
        let enc = lookup("ascii").unwrap();
        assert!(encode("caf\u{e9}", enc, &ErrorContext::none()).is_err());
    }
}
