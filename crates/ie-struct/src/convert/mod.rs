//! Conversion between the compact and extended effect formats.
//!
//! Conversion works on raw bytes: the source record is read by offset, each
//! mapped field is copied into a zero-filled target buffer with its width
//! transcoded, and the target record is then decoded through the normal
//! read path. Fields without a counterpart are dropped (extended to compact)
//! or left at their defaults (compact to extended).

use tracing::{debug, warn};

use crate::codec::decode;
use crate::codec::primitives::{get_uint, put_uint};
use crate::error::{ConvertError, EditError};
use crate::model::{FieldValue, NodeId, StructKind, Tree};
use crate::schema::effect;

/// The two effect record versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EffectVersion {
    /// 48-byte effect embedded in items and spells.
    Compact,
    /// 264-byte effect embedded in creatures and `EFF` files.
    Extended,
}

impl EffectVersion {
    pub fn kind(self) -> StructKind {
        match self {
            EffectVersion::Compact => StructKind::EffectV1,
            EffectVersion::Extended => StructKind::EffectV2,
        }
    }

    pub fn of(kind: StructKind) -> Option<Self> {
        match kind {
            StructKind::EffectV1 => Some(EffectVersion::Compact),
            StructKind::EffectV2 => Some(EffectVersion::Extended),
            _ => None,
        }
    }

    /// Value of an effect table's version field.
    pub fn table_version(self) -> i64 {
        match self {
            EffectVersion::Compact => 0,
            EffectVersion::Extended => 1,
        }
    }

    fn default_bytes(self) -> Vec<u8> {
        let config = Default::default();
        match self {
            EffectVersion::Compact => effect::default_compact(&config),
            EffectVersion::Extended => effect::default_extended(&config),
        }
    }
}

/// One mapped field: `(offset, width)` in the compact and extended records.
#[derive(Debug, Clone, Copy)]
pub struct FieldMapping {
    pub name: &'static str,
    pub compact: (usize, usize),
    pub extended: (usize, usize),
}

const fn map(name: &'static str, compact: (usize, usize), extended: (usize, usize)) -> FieldMapping {
    FieldMapping {
        name,
        compact,
        extended,
    }
}

/// Offsets and widths of every field both versions share.
pub const FIELD_MAP: &[FieldMapping] = &[
    map("Type", (0, 2), (8, 4)),
    map("Target", (2, 1), (12, 4)),
    map("Power", (3, 1), (16, 4)),
    map("Parameter 1", (4, 4), (20, 4)),
    map("Parameter 2", (8, 4), (24, 4)),
    map("Timing mode", (12, 1), (28, 2)),
    map("Dispel/Resistance", (13, 1), (84, 4)),
    map("Duration", (14, 4), (32, 4)),
    map("Probability 1", (18, 1), (36, 2)),
    map("Probability 2", (19, 1), (38, 2)),
    map("Resource", (20, 8), (40, 8)),
    map("# dice thrown", (28, 4), (48, 4)),
    map("Dice size", (32, 4), (52, 4)),
    map("Save type", (36, 4), (56, 4)),
    map("Save bonus", (40, 4), (60, 4)),
    map("Special", (44, 4), (64, 4)),
];

/// Converts effect `id` of `tree` into a detached effect of `target` version.
///
/// The result keeps the source's name and offset. Converting to the version
/// the effect already has returns a plain copy.
pub fn convert_effect(tree: &Tree, id: NodeId, target: EffectVersion) -> Result<Tree, ConvertError> {
    let node = tree
        .get(id)
        .ok_or(EditError::UnknownNode { index: id.index() })?;
    let kind = node.struct_kind().ok_or_else(|| EditError::NotAStructure {
        name: node.name().to_string(),
    })?;
    let source = EffectVersion::of(kind).ok_or(ConvertError::UnsupportedVariant { kind })?;
    if source == target {
        return Ok(tree.clone_entry(id)?);
    }

    let src = node.bytes();
    let mut dst = target.default_bytes();
    for mapping in FIELD_MAP {
        let (from, to) = match target {
            EffectVersion::Extended => (mapping.compact, mapping.extended),
            EffectVersion::Compact => (mapping.extended, mapping.compact),
        };
        copy_field(mapping.name, src, from, &mut dst, to);
    }

    let offset = node.offset();
    let (mut converted, _) =
        decode::read_structure(target.kind(), &dst, offset, offset, *tree.config())?;
    let root = converted.root();
    converted.set_name(root, node.name())?;
    debug!(
        effect = node.name(),
        from = ?source,
        to = ?target,
        "converted effect"
    );
    Ok(converted)
}

/// Converts effect `id` in place, re-laying out everything after it.
///
/// Fails with [`ConvertError::UnsupportedVariant`] when the effect's
/// container fixes its version: the body of an `EFF` file, or an entry of an
/// effect table of the other version. Whole tables change version through
/// [`convert_effect_table`].
pub fn convert_effect_in_place(tree: &mut Tree, id: NodeId, target: EffectVersion) -> Result<(), ConvertError> {
    let converted = convert_effect(tree, id, target)?;
    match tree.replace_entry(id, converted) {
        Err(EditError::NotAddable { parent, .. }) => Err(ConvertError::UnsupportedVariant { kind: parent }),
        other => Ok(other?),
    }
}

/// Converts every effect of an effect table and updates the table's version
/// field. Returns the number of converted effects.
///
/// All effects are converted before the table is touched, so a failure
/// leaves it unchanged.
pub fn convert_effect_table(tree: &mut Tree, table: NodeId, target: EffectVersion) -> Result<usize, ConvertError> {
    let node = tree
        .get(table)
        .ok_or(EditError::UnknownNode { index: table.index() })?;
    let kind = node.struct_kind().ok_or_else(|| EditError::NotAStructure {
        name: node.name().to_string(),
    })?;
    if kind != StructKind::EffectTable {
        return Err(ConvertError::UnsupportedVariant { kind });
    }
    let version = node.child("Version").map(|v| v.id());
    let entries: Vec<NodeId> = node
        .children()
        .filter(|c| c.struct_kind().and_then(EffectVersion::of).is_some())
        .map(|c| c.id())
        .collect();

    let converted = entries
        .iter()
        .map(|&id| convert_effect(tree, id, target))
        .collect::<Result<Vec<_>, _>>()?;
    if let Some(version) = version {
        tree.set_value(version, FieldValue::Int(target.table_version()))?;
    }
    for (&id, effect) in entries.iter().zip(converted) {
        tree.replace_entry(id, effect)?;
    }
    debug!(count = entries.len(), to = ?target, "converted effect table");
    Ok(entries.len())
}

fn copy_field(name: &str, src: &[u8], from: (usize, usize), dst: &mut [u8], to: (usize, usize)) {
    let (from_offset, from_width) = from;
    let (to_offset, to_width) = to;
    if from_width > 4 {
        // Resource references keep their width in both versions.
        dst[to_offset..to_offset + to_width].copy_from_slice(&src[from_offset..from_offset + from_width]);
        return;
    }
    let value = get_uint(src, from_offset, from_width);
    if to_width < from_width && value >> (to_width * 8) != 0 {
        warn!(
            field = name,
            value,
            width = to_width,
            "value truncated while narrowing effect"
        );
    }
    put_uint(dst, to_offset, to_width, value);
}
