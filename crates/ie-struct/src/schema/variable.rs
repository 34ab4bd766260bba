//! Game variables.
//!
//! A variable is a dense 84-byte record: every value slot is always present,
//! and the type tag decides which one holds the value.

use crate::codec::decode::Decoder;
use crate::codec::primitives::{get_uint, put_uint};
use crate::codec::text::{TextError, decode_text, encode_text};
use crate::config::GameConfig;
use crate::error::{DecodeError, EditError};
use crate::limits::VARIABLE_SIZE;
use crate::model::{FieldKind, NodeId, NodeRef, StructKind, Tree, Width};
use crate::schema::FieldSpec;

pub const TYPE_LABELS: &[&str] = &["Integer", "Double", "Script name", "Resource", "String reference", "Word"];

const NAME: usize = 0;
const TYPE: usize = 32;
const WORD: usize = 34;
const DWORD: usize = 36;
const INTEGER: usize = 40;
const DOUBLE: usize = 44;
const SCRIPT_NAME: usize = 52;

pub const LAYOUT: &[FieldSpec] = &[
    FieldSpec::new("Name", FieldKind::Text(32)),
    FieldSpec::new("Type", FieldKind::Enum(Width::Word, TYPE_LABELS)),
    FieldSpec::new("Reference value", FieldKind::Unsigned(Width::Word)),
    FieldSpec::new("Dword value", FieldKind::Unsigned(Width::Dword)),
    FieldSpec::new("Integer value", FieldKind::Signed(Width::Dword)),
    FieldSpec::new("Double value", FieldKind::Double),
    FieldSpec::new("Script name", FieldKind::Text(32)),
];

/// Type tag of a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum VariableType {
    Integer = 0,
    Double = 1,
    ScriptName = 2,
    ResRef = 3,
    StrRef = 4,
    Word = 5,
}

impl VariableType {
    pub fn from_u16(tag: u16) -> Option<Self> {
        match tag {
            0 => Some(VariableType::Integer),
            1 => Some(VariableType::Double),
            2 => Some(VariableType::ScriptName),
            3 => Some(VariableType::ResRef),
            4 => Some(VariableType::StrRef),
            5 => Some(VariableType::Word),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        TYPE_LABELS[self as usize]
    }
}

/// Typed value of a variable.
#[derive(Debug, Clone, PartialEq)]
pub enum VariableValue {
    Integer(i32),
    Double(f64),
    ScriptName(String),
    ResRef(String),
    StrRef(i32),
    Word(u16),
}

impl VariableValue {
    pub fn var_type(&self) -> VariableType {
        match self {
            VariableValue::Integer(_) => VariableType::Integer,
            VariableValue::Double(_) => VariableType::Double,
            VariableValue::ScriptName(_) => VariableType::ScriptName,
            VariableValue::ResRef(_) => VariableType::ResRef,
            VariableValue::StrRef(_) => VariableType::StrRef,
            VariableValue::Word(_) => VariableType::Word,
        }
    }
}

impl std::fmt::Display for VariableValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VariableValue::Integer(v) => write!(f, "{}", v),
            VariableValue::Double(v) => write!(f, "{}", v),
            VariableValue::ScriptName(s) | VariableValue::ResRef(s) => write!(f, "{:?}", s),
            VariableValue::StrRef(v) => write!(f, "#{}", v),
            VariableValue::Word(v) => write!(f, "{}", v),
        }
    }
}

/// Typed view of a variable record.
#[derive(Debug, Clone, Copy)]
pub struct Variable<'a> {
    node: NodeRef<'a>,
}

impl<'a> Variable<'a> {
    /// Wraps a node, if it is a variable.
    pub fn new(node: NodeRef<'a>) -> Option<Self> {
        (node.struct_kind() == Some(StructKind::Variable)).then_some(Self { node })
    }

    pub fn node(&self) -> NodeRef<'a> {
        self.node
    }

    /// The variable's own name (the `Name` field, not the node name).
    pub fn name(&self) -> String {
        decode_text(&self.node.bytes()[NAME..TYPE])
    }

    /// Raw type tag as stored.
    pub fn type_tag(&self) -> u16 {
        get_uint(self.node.bytes(), TYPE, 2) as u16
    }

    /// Decoded type tag; `None` for tags outside the six known types.
    pub fn var_type(&self) -> Option<VariableType> {
        VariableType::from_u16(self.type_tag())
    }

    /// Value held in the slot selected by the stored type tag.
    pub fn value(&self) -> Option<VariableValue> {
        self.var_type().map(|ty| self.slot(ty))
    }

    /// Value as `ty`, or `None` if the stored tag is a different type.
    pub fn value_as(&self, ty: VariableType) -> Option<VariableValue> {
        (self.var_type() == Some(ty)).then(|| self.slot(ty))
    }

    fn slot(&self, ty: VariableType) -> VariableValue {
        let bytes = self.node.bytes();
        match ty {
            VariableType::Integer => VariableValue::Integer(get_uint(bytes, INTEGER, 4) as u32 as i32),
            VariableType::Double => VariableValue::Double(f64::from_bits(get_uint(bytes, DOUBLE, 8))),
            VariableType::ScriptName => VariableValue::ScriptName(decode_text(&bytes[SCRIPT_NAME..VARIABLE_SIZE])),
            VariableType::ResRef => VariableValue::ResRef(decode_text(&bytes[SCRIPT_NAME..SCRIPT_NAME + 8])),
            VariableType::StrRef => VariableValue::StrRef(get_uint(bytes, DWORD, 4) as u32 as i32),
            VariableType::Word => VariableValue::Word(get_uint(bytes, WORD, 2) as u16),
        }
    }
}

/// Stores a typed value into variable `id`, updating its type tag.
///
/// Slots of other types keep their bytes.
pub fn set_variable_value(tree: &mut Tree, id: NodeId, value: &VariableValue) -> Result<(), EditError> {
    let node = tree.get(id).ok_or(EditError::UnknownNode { index: id.index() })?;
    if node.struct_kind() != Some(StructKind::Variable) {
        return Err(EditError::NotAStructure {
            name: node.name().to_string(),
        });
    }
    let mut bytes = node.bytes().to_vec();
    put_uint(&mut bytes, TYPE, 2, value.var_type() as u64);
    let text_error = |e: TextError, max: usize| text_edit_error("Script name", e, max);
    match value {
        VariableValue::Integer(v) => put_uint(&mut bytes, INTEGER, 4, *v as u32 as u64),
        VariableValue::Double(v) => put_uint(&mut bytes, DOUBLE, 8, v.to_bits()),
        VariableValue::ScriptName(s) => {
            let encoded = encode_text(s, 32).map_err(|e| text_error(e, 32))?;
            bytes[SCRIPT_NAME..VARIABLE_SIZE].copy_from_slice(&encoded);
        }
        VariableValue::ResRef(s) => {
            let encoded = encode_text(s, 8).map_err(|e| text_error(e, 8))?;
            bytes[SCRIPT_NAME..SCRIPT_NAME + 8].copy_from_slice(&encoded);
        }
        VariableValue::StrRef(v) => put_uint(&mut bytes, DWORD, 4, *v as u32 as u64),
        VariableValue::Word(v) => put_uint(&mut bytes, WORD, 2, *v as u64),
    }

    tree.overwrite(id, &bytes);
    Ok(())
}

fn text_edit_error(field: &str, error: TextError, max: usize) -> EditError {
    match error {
        TextError::TooLong(len) => EditError::TextTooLong {
            name: field.to_string(),
            len,
            max,
        },
        TextError::Unmappable(ch) => EditError::UnmappableText {
            name: field.to_string(),
            ch,
        },
    }
}

pub(crate) fn read(decoder: &mut Decoder<'_>, id: NodeId) -> Result<(), DecodeError> {
    decoder.fields(id, LAYOUT)
}

pub fn default_bytes(_config: &GameConfig) -> Vec<u8> {
    vec![0u8; VARIABLE_SIZE]
}

/// Builds variable bytes with a name and a typed value.
pub fn variable_bytes(name: &str, value: &VariableValue) -> Result<Vec<u8>, EditError> {
    let config = GameConfig::default();
    let mut bytes = default_bytes(&config);
    let encoded = encode_text(name, TYPE - NAME).map_err(|e| text_edit_error("Name", e, TYPE - NAME))?;
    bytes[NAME..TYPE].copy_from_slice(&encoded);
    let mut tree = Tree::decode(StructKind::Variable, &bytes, &config)?;
    let root = tree.root();
    set_variable_value(&mut tree, root, value)?;
    Ok(tree.to_bytes())
}
