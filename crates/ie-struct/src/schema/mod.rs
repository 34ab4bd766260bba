//! Record schemas.
//!
//! Each structure kind has a reader that emits its field list through the
//! decoder and a factory for its default bytes. Default construction always
//! goes through the same reader, so a fresh record and a decoded one have
//! identical field lists.

pub mod container;
pub mod effect;
pub mod opcode;
pub mod variable;

use crate::codec::decode::Decoder;
use crate::config::GameConfig;
use crate::error::DecodeError;
use crate::model::{FieldKind, NodeId, StructKind};

/// Name and kind of one primitive field in a static layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
}

impl FieldSpec {
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self { name, kind }
    }

    pub fn size(&self) -> usize {
        self.kind.size()
    }
}

/// Total size of a field list.
pub fn layout_size(specs: &[FieldSpec]) -> usize {
    specs.iter().map(FieldSpec::size).sum()
}

/// Reads the body of a structure whose node has already been created.
pub(crate) fn read_body(
    decoder: &mut Decoder<'_>,
    id: NodeId,
    kind: StructKind,
) -> Result<(), DecodeError> {
    match kind {
        StructKind::Variable => variable::read(decoder, id),
        StructKind::EffectV1 => effect::read_compact(decoder, id),
        StructKind::EffectV2 => effect::read_extended(decoder, id),
        StructKind::EffFile => container::read_eff_file(decoder, id),
        StructKind::EffectTable => container::read_effect_table(decoder, id),
        StructKind::VariableTable => container::read_variable_table(decoder, id),
    }
}

/// Whether the field at `local` bytes into a `kind` record selects part of
/// that record's field list.
pub(crate) fn selects_layout(kind: StructKind, local: usize) -> bool {
    match kind {
        StructKind::EffectV1 => local == 0,
        StructKind::EffectV2 => {
            local == effect::EXTENDED_OPCODE_OFFSET || local == effect::PARENT_TYPE_OFFSET
        }
        _ => false,
    }
}

/// Bytes of a default instance of `kind`.
pub fn default_bytes(kind: StructKind, config: &GameConfig) -> Vec<u8> {
    match kind {
        StructKind::Variable => variable::default_bytes(config),
        StructKind::EffectV1 => effect::default_compact(config),
        StructKind::EffectV2 => effect::default_extended(config),
        StructKind::EffFile => container::default_eff_file(config),
        StructKind::EffectTable => container::default_effect_table(config),
        StructKind::VariableTable => container::default_variable_table(config),
    }
}
