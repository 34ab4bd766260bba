//! Primitive field kinds and their typed values.
//!
//! A primitive field never owns bytes. Its kind fixes the byte width, and
//! the value is decoded from (or encoded into) the owning tree's buffer.

use crate::codec::primitives::{get_uint, put_uint, sign_extend};
use crate::codec::text::{TextError, decode_text, encode_text};
use crate::schema::opcode;

/// Integer width of a numeric field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Width {
    Byte = 1,
    Word = 2,
    Dword = 4,
}

impl Width {
    /// Width in bytes.
    pub fn bytes(self) -> usize {
        self as usize
    }
}

/// Layout and interpretation of a primitive field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// Signed decimal number.
    Signed(Width),
    /// Unsigned decimal number.
    Unsigned(Width),
    /// Unsigned number shown in hex.
    Hex(Width),
    /// Bit set; `labels[i]` names bit `i`.
    Flags(Width, &'static [&'static str]),
    /// Enumeration; `labels[v]` names value `v`.
    Enum(Width, &'static [&'static str]),
    /// Effect opcode: the discriminant of an effect record.
    Opcode(Width),
    /// NUL-padded text of a fixed width.
    Text(usize),
    /// 8-byte resource name; the slice lists acceptable resource types.
    ResRef(&'static [&'static str]),
    /// Index into the string table (`-1` means none).
    StrRef,
    /// IEEE 754 double.
    Double,
    /// Bytes with no known meaning.
    Raw(usize),
}

impl FieldKind {
    /// Serialized size in bytes.
    pub fn size(&self) -> usize {
        match self {
            FieldKind::Signed(w)
            | FieldKind::Unsigned(w)
            | FieldKind::Hex(w)
            | FieldKind::Flags(w, _)
            | FieldKind::Enum(w, _)
            | FieldKind::Opcode(w) => w.bytes(),
            FieldKind::Text(len) | FieldKind::Raw(len) => *len,
            FieldKind::ResRef(_) => 8,
            FieldKind::StrRef => 4,
            FieldKind::Double => 8,
        }
    }

    /// Returns the integer width for numeric kinds.
    fn int_width(&self) -> Option<(usize, bool)> {
        match self {
            FieldKind::Signed(w) => Some((w.bytes(), true)),
            FieldKind::Unsigned(w)
            | FieldKind::Hex(w)
            | FieldKind::Flags(w, _)
            | FieldKind::Enum(w, _)
            | FieldKind::Opcode(w) => Some((w.bytes(), false)),
            FieldKind::StrRef => Some((4, true)),
            _ => None,
        }
    }

    /// Decodes a value from exactly `size()` bytes.
    pub fn decode(&self, bytes: &[u8]) -> FieldValue {
        if let Some((width, signed)) = self.int_width() {
            let raw = get_uint(bytes, 0, width);
            let value = if signed { sign_extend(raw, width) } else { raw as i64 };
            return FieldValue::Int(value);
        }
        match self {
            FieldKind::Text(_) | FieldKind::ResRef(_) => FieldValue::Text(decode_text(bytes)),
            FieldKind::Double => {
                FieldValue::Double(f64::from_bits(get_uint(bytes, 0, 8)))
            }
            _ => FieldValue::Bytes(bytes.to_vec()),
        }
    }

    /// Encodes a value into `size()` bytes.
    pub fn encode(&self, value: &FieldValue) -> Result<Vec<u8>, EncodeValueError> {
        let size = self.size();
        match (self.int_width(), value) {
            (Some((width, signed)), FieldValue::Int(v)) => {
                let bits = (width * 8) as u32;
                let fits = if signed {
                    let min = -(1i64 << (bits - 1));
                    let max = (1i64 << (bits - 1)) - 1;
                    (min..=max).contains(v)
                } else {
                    // Unsigned fields also accept the signed spelling of their bit pattern.
                    let min = -(1i64 << (bits - 1));
                    let max = (1i64 << bits) - 1;
                    (min..=max).contains(v)
                };
                if !fits {
                    return Err(EncodeValueError::OutOfRange(*v));
                }
                let mut out = vec![0u8; size];
                put_uint(&mut out, 0, width, *v as u64);
                Ok(out)
            }
            (None, FieldValue::Text(text)) if matches!(self, FieldKind::Text(_) | FieldKind::ResRef(_)) => {
                encode_text(text, size).map_err(|e| match e {
                    TextError::TooLong(len) => EncodeValueError::TooLong(len),
                    TextError::Unmappable(c) => EncodeValueError::Unmappable(c),
                })
            }
            (None, FieldValue::Double(v)) if matches!(self, FieldKind::Double) => {
                Ok(v.to_le_bytes().to_vec())
            }
            (None, FieldValue::Bytes(bytes)) if matches!(self, FieldKind::Raw(_)) => {
                if bytes.len() != size {
                    return Err(EncodeValueError::TooLong(bytes.len()));
                }
                Ok(bytes.clone())
            }
            _ => Err(EncodeValueError::Mismatch),
        }
    }

    /// Formats a decoded value with its symbolic label, if any.
    pub fn describe(&self, value: &FieldValue) -> String {
        match (self, value) {
            (FieldKind::Hex(w), FieldValue::Int(v)) => {
                format!("{:#0width$x}", v, width = w.bytes() * 2 + 2)
            }
            (FieldKind::Enum(_, labels), FieldValue::Int(v)) => {
                match usize::try_from(*v).ok().and_then(|i| labels.get(i)) {
                    Some(label) if !label.is_empty() => format!("{} ({})", v, label),
                    _ => format!("{} (unknown)", v),
                }
            }
            (FieldKind::Flags(_, labels), FieldValue::Int(v)) => {
                let set: Vec<&str> = labels
                    .iter()
                    .enumerate()
                    .filter(|(bit, label)| !label.is_empty() && v & (1i64 << bit) != 0)
                    .map(|(_, label)| *label)
                    .collect();
                if set.is_empty() {
                    format!("{:#x}", v)
                } else {
                    format!("{:#x} ({})", v, set.join(" | "))
                }
            }
            (FieldKind::Opcode(_), FieldValue::Int(v)) => {
                let name = u32::try_from(*v)
                    .ok()
                    .and_then(opcode::name)
                    .unwrap_or("Unknown");
                format!("{} ({})", v, name)
            }
            (FieldKind::StrRef, FieldValue::Int(-1)) => "-1 (none)".to_string(),
            (FieldKind::ResRef(types), FieldValue::Text(t)) if !t.is_empty() && !types.is_empty() => {
                format!("{} [{}]", t, types.join("/"))
            }
            _ => value.to_string(),
        }
    }
}

/// Reasons a value cannot be encoded into a field.
#[derive(Debug, Clone, PartialEq)]
pub enum EncodeValueError {
    Mismatch,
    OutOfRange(i64),
    TooLong(usize),
    Unmappable(char),
}

/// Decoded value of a primitive field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Any numeric kind, including flags, enumerations, opcodes and string refs.
    Int(i64),
    Double(f64),
    /// Text and resource names.
    Text(String),
    Bytes(Vec<u8>),
}

impl FieldValue {
    /// Returns the integer value, if numeric.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            FieldValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the text value, if textual.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(t) => Some(t),
            _ => None,
        }
    }
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValue::Int(v) => write!(f, "{}", v),
            FieldValue::Double(v) => write!(f, "{}", v),
            FieldValue::Text(t) => write!(f, "{:?}", t),
            FieldValue::Bytes(b) => {
                for (i, byte) in b.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{:02x}", byte)?;
                }
                Ok(())
            }
        }
    }
}
