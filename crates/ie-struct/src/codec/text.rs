//! Fixed-width text fields.
//!
//! Resources store names as NUL-padded Windows-1252 text. Decoding stops at
//! the first NUL; encoding pads with NULs up to the field width.

use encoding_rs::WINDOWS_1252;

/// Decodes a fixed-width text field.
pub fn decode_text(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    let (text, _) = WINDOWS_1252.decode_without_bom_handling(&bytes[..end]);
    text.into_owned()
}

/// Why text could not be stored in a fixed-width field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextError {
    /// The encoded text is longer than the field.
    TooLong(usize),
    /// The character has no Windows-1252 encoding.
    Unmappable(char),
}

/// Encodes text for a field of `width` bytes.
pub fn encode_text(text: &str, width: usize) -> Result<Vec<u8>, TextError> {
    let (encoded, _, had_errors) = WINDOWS_1252.encode(text);
    if had_errors {
        let mut buf = [0u8; 4];
        let bad = text
            .chars()
            .find(|c| WINDOWS_1252.encode(c.encode_utf8(&mut buf)).2)
            .unwrap_or(char::REPLACEMENT_CHARACTER);
        return Err(TextError::Unmappable(bad));
    }
    if encoded.len() > width {
        return Err(TextError::TooLong(encoded.len()));
    }
    let mut out = vec![0u8; width];
    out[..encoded.len()].copy_from_slice(&encoded);
    Ok(out)
}
