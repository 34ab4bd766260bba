//! Error types for structure decoding, encoding, editing and conversion.

use thiserror::Error;

use crate::model::StructKind;

/// The four failure categories every error in this crate falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Input shorter than a declared field, or a discriminant that cannot be resolved.
    MalformedData,
    /// Attempted removal of a structurally mandatory field.
    ImmutableField,
    /// The byte sink rejected a write.
    IoFailure,
    /// No mapping exists for the requested variant or version.
    UnsupportedVariant,
}

impl ErrorKind {
    /// Returns a short stable name for the kind (e.g. for log output).
    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::MalformedData => "malformed-data",
            ErrorKind::ImmutableField => "immutable-field",
            ErrorKind::IoFailure => "io-failure",
            ErrorKind::UnsupportedVariant => "unsupported-variant",
        }
    }
}

/// Error while reading a structure from bytes.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    #[error("unexpected end of input while reading {context} at offset {offset:#x} (need {needed} bytes, have {available})")]
    UnexpectedEof {
        context: String,
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("opcode {opcode} exceeds the maximum {max} supported by this game configuration")]
    UnknownOpcode { opcode: u32, max: u32 },

    #[error("{field} count {count} exceeds maximum {max}")]
    CountExceedsLimit {
        field: &'static str,
        count: usize,
        max: usize,
    },

    #[error("invalid {field} value {value}")]
    InvalidDiscriminant { field: &'static str, value: u32 },

    #[error("{len} trailing bytes after {kind:?} record")]
    TrailingData { kind: StructKind, len: usize },
}

impl DecodeError {
    /// Returns the failure category of this error.
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::MalformedData
    }
}

/// Error while writing a structure to a byte sink.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("write to sink failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("wrote {written} bytes for {name}, expected {expected}")]
    SizeMismatch {
        name: String,
        written: usize,
        expected: usize,
    },
}

impl EncodeError {
    /// Returns the failure category of this error.
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::IoFailure
    }
}

/// Error while editing a structure tree.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EditError {
    #[error("field {name:?} cannot be removed")]
    ImmutableField { name: String },

    #[error("node {index} does not exist in this tree")]
    UnknownNode { index: usize },

    #[error("node {name:?} is not a structure")]
    NotAStructure { name: String },

    #[error("node {name:?} is not a primitive field")]
    NotAField { name: String },

    #[error("{kind:?} cannot be added to {parent:?}")]
    NotAddable { kind: StructKind, parent: StructKind },

    #[error("insertion index {index} is outside the editable range {min}..={max}")]
    InvalidIndex { index: usize, min: usize, max: usize },

    #[error("value does not match the type of field {name:?}")]
    ValueMismatch { name: String },

    #[error("value {value} does not fit into field {name:?}")]
    ValueOutOfRange { name: String, value: i64 },

    #[error("text of {len} bytes does not fit into field {name:?} ({max} bytes)")]
    TextTooLong { name: String, len: usize, max: usize },

    #[error("character {ch:?} cannot be stored in field {name:?}")]
    UnmappableText { name: String, ch: char },

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl EditError {
    /// Returns the failure category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            EditError::ImmutableField { .. } => ErrorKind::ImmutableField,
            EditError::NotAddable { .. } => ErrorKind::UnsupportedVariant,
            _ => ErrorKind::MalformedData,
        }
    }
}

/// Error while converting a record between format versions.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConvertError {
    #[error("no conversion defined for {kind:?}")]
    UnsupportedVariant { kind: StructKind },

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Edit(#[from] EditError),
}

impl ConvertError {
    /// Returns the failure category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConvertError::UnsupportedVariant { .. } => ErrorKind::UnsupportedVariant,
            ConvertError::Decode(e) => e.kind(),
            ConvertError::Edit(e) => e.kind(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        let eof = DecodeError::UnexpectedEof {
            context: "Opcode".to_string(),
            offset: 0,
            needed: 2,
            available: 1,
        };
        assert_eq!(eof.kind(), ErrorKind::MalformedData);

        let immutable = EditError::ImmutableField {
            name: "Signature".to_string(),
        };
        assert_eq!(immutable.kind(), ErrorKind::ImmutableField);

        let convert = ConvertError::UnsupportedVariant {
            kind: StructKind::Variable,
        };
        assert_eq!(convert.kind(), ErrorKind::UnsupportedVariant);

        let io = EncodeError::Io(std::io::Error::other("disk full"));
        assert_eq!(io.kind(), ErrorKind::IoFailure);
        assert_eq!(ErrorKind::IoFailure.name(), "io-failure");
    }

    #[test]
    fn test_nested_kind() {
        let err = ConvertError::Decode(DecodeError::UnknownOpcode { opcode: 999, max: 317 });
        assert_eq!(err.kind(), ErrorKind::MalformedData);
        assert!(err.to_string().contains("999"));
    }
}
