//! Structure kinds and insertion prototypes.

use crate::config::GameConfig;
use crate::error::DecodeError;
use crate::limits::{EFF_FILE_SIZE, EFFECT_V1_SIZE, EFFECT_V2_SIZE, VARIABLE_SIZE};
use crate::model::Tree;

/// Every composite structure this crate knows how to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StructKind {
    /// 84-byte game variable.
    Variable,
    /// 48-byte compact effect, embedded in items and spells.
    EffectV1,
    /// 264-byte extended effect, embedded in creatures and `EFF` files.
    EffectV2,
    /// Stand-alone `EFF V2.0` file.
    EffFile,
    /// Counted list of effects of one version.
    EffectTable,
    /// Counted list of variables.
    VariableTable,
}

impl StructKind {
    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            StructKind::Variable => "Variable",
            StructKind::EffectV1 => "Effect",
            StructKind::EffectV2 => "Effect V2",
            StructKind::EffFile => "EFF file",
            StructKind::EffectTable => "Effect table",
            StructKind::VariableTable => "Variable table",
        }
    }

    /// Returns true for record kinds that can live in a container and be
    /// added or removed at edit time.
    pub fn is_record(self) -> bool {
        matches!(
            self,
            StructKind::Variable | StructKind::EffectV1 | StructKind::EffectV2
        )
    }

    /// Returns true for containers that accept new entries.
    pub fn accepts_entries(self) -> bool {
        matches!(self, StructKind::EffectTable | StructKind::VariableTable)
    }

    /// Number of leading children that belong to the fixed schema.
    ///
    /// Entries may only be inserted at or after this index, and children
    /// before it can never be removed.
    pub fn fixed_len(self) -> usize {
        match self {
            StructKind::EffectTable => 2,
            StructKind::VariableTable => 1,
            StructKind::EffFile => 3,
            StructKind::Variable | StructKind::EffectV1 | StructKind::EffectV2 => usize::MAX,
        }
    }

    /// Serialized size for kinds whose size never changes.
    pub fn fixed_size(self) -> Option<usize> {
        match self {
            StructKind::Variable => Some(VARIABLE_SIZE),
            StructKind::EffectV1 => Some(EFFECT_V1_SIZE),
            StructKind::EffectV2 => Some(EFFECT_V2_SIZE),
            StructKind::EffFile => Some(EFF_FILE_SIZE),
            StructKind::EffectTable | StructKind::VariableTable => None,
        }
    }
}

/// Factory for a fresh default instance of an addable record kind.
#[derive(Debug, Clone, Copy)]
pub struct Prototype {
    pub kind: StructKind,
    pub label: &'static str,
    factory: fn(&GameConfig) -> Vec<u8>,
}

impl Prototype {
    pub(crate) const fn new(
        kind: StructKind,
        label: &'static str,
        factory: fn(&GameConfig) -> Vec<u8>,
    ) -> Self {
        Self {
            kind,
            label,
            factory,
        }
    }

    /// Default bytes of a new instance.
    pub fn default_bytes(&self, config: &GameConfig) -> Vec<u8> {
        (self.factory)(config)
    }

    /// Builds a detached default instance, ready for
    /// [`Tree::add_entry`](crate::model::Tree::add_entry).
    ///
    /// The instance goes through the same read path as bytes from a file, so
    /// its field list is identical to that of a decoded record.
    pub fn instantiate(&self, config: &GameConfig) -> Result<Tree, DecodeError> {
        Tree::decode(self.kind, &self.default_bytes(config), config)
    }
}
