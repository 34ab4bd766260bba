//! Container structures: the `EFF` file and the counted effect and
//! variable tables.
//!
//! Containers decide which entries may be added to them, name new entries,
//! and keep their header counters in step with their entry lists.

use crate::codec::decode::Decoder;
use crate::codec::primitives::put_uint;
use crate::codec::text::decode_text;
use crate::config::GameConfig;
use crate::error::{DecodeError, EditError};
use crate::limits::{
    EFF_SIGNATURE, EFF_VERSION, EFFECT_TABLE_HEADER_SIZE, MAX_TABLE_ENTRIES, VARIABLE_TABLE_HEADER_SIZE,
};
use crate::model::{FieldKind, FieldValue, NodeId, Prototype, StructKind, Tree, Width};
use crate::schema::effect;
use crate::schema::variable::{self, Variable};

pub const EFFECT_VERSIONS: &[&str] = &["Compact", "Extended"];

pub const COMPACT_EFFECT: Prototype = Prototype::new(StructKind::EffectV1, "Effect", effect::default_compact);
pub const EXTENDED_EFFECT: Prototype = Prototype::new(StructKind::EffectV2, "Effect V2", effect::default_extended);
pub const VARIABLE: Prototype = Prototype::new(StructKind::Variable, "Variable", variable::default_bytes);

// =============================================================================
// READERS
// =============================================================================

pub(crate) fn read_eff_file(decoder: &mut Decoder<'_>, id: NodeId) -> Result<(), DecodeError> {
    for (name, expected) in [("Signature", EFF_SIGNATURE), ("Version", EFF_VERSION)] {
        let value = decoder.peek_uint(0, 4, name)? as u32;
        if value != u32::from_le_bytes(*expected) {
            return Err(DecodeError::InvalidDiscriminant { field: name, value });
        }
        decoder.field(id, name, FieldKind::Text(4))?;
    }
    decoder.structure(Some(id), "Effect", StructKind::EffectV2)?;
    Ok(())
}

pub(crate) fn read_effect_table(decoder: &mut Decoder<'_>, id: NodeId) -> Result<(), DecodeError> {
    let count = read_count(decoder, id)?;
    let version = decoder.peek_uint(0, 4, "Version")? as u32;
    let kind = match version {
        0 => StructKind::EffectV1,
        1 => StructKind::EffectV2,
        value => return Err(DecodeError::InvalidDiscriminant { field: "Version", value }),
    };
    decoder.field(id, "Version", FieldKind::Enum(Width::Dword, EFFECT_VERSIONS))?;
    for i in 0..count {
        decoder.structure(Some(id), format!("Effect {i}"), kind)?;
    }
    Ok(())
}

pub(crate) fn read_variable_table(decoder: &mut Decoder<'_>, id: NodeId) -> Result<(), DecodeError> {
    let count = read_count(decoder, id)?;
    for i in 0..count {
        decoder.structure(Some(id), format!("Variable {i}"), StructKind::Variable)?;
    }
    Ok(())
}

fn read_count(decoder: &mut Decoder<'_>, id: NodeId) -> Result<usize, DecodeError> {
    let count = decoder.peek_uint(0, 4, "Count")? as usize;
    if count > MAX_TABLE_ENTRIES {
        return Err(DecodeError::CountExceedsLimit {
            field: "Count",
            count,
            max: MAX_TABLE_ENTRIES,
        });
    }
    decoder.field(id, "Count", FieldKind::Unsigned(Width::Dword))?;
    Ok(count)
}

// =============================================================================
// DEFAULTS
// =============================================================================

pub fn default_eff_file(config: &GameConfig) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(crate::limits::EFF_FILE_SIZE);
    bytes.extend_from_slice(EFF_SIGNATURE);
    bytes.extend_from_slice(EFF_VERSION);
    let mut body = effect::default_extended(config);
    body[..4].copy_from_slice(EFF_SIGNATURE);
    body[4..8].copy_from_slice(EFF_VERSION);
    bytes.extend_from_slice(&body);
    bytes
}

/// An empty compact effect table.
pub fn default_effect_table(_config: &GameConfig) -> Vec<u8> {
    vec![0u8; EFFECT_TABLE_HEADER_SIZE]
}

/// An empty effect table holding effects of the given version.
pub fn effect_table_bytes(extended: bool) -> Vec<u8> {
    let mut bytes = vec![0u8; EFFECT_TABLE_HEADER_SIZE];
    put_uint(&mut bytes, 4, 4, extended as u64);
    bytes
}

pub fn default_variable_table(_config: &GameConfig) -> Vec<u8> {
    vec![0u8; VARIABLE_TABLE_HEADER_SIZE]
}

// =============================================================================
// ENTRY MANAGEMENT
// =============================================================================

/// Prototypes legal for insertion into `parent`.
pub(crate) fn prototypes(tree: &Tree, parent: NodeId, kind: StructKind) -> Vec<Prototype> {
    match kind {
        StructKind::EffectTable => {
            let extended = tree
                .get(parent)
                .and_then(|p| p.child("Version"))
                .and_then(|v| v.int())
                == Some(1);
            vec![if extended { EXTENDED_EFFECT } else { COMPACT_EFFECT }]
        }
        StructKind::VariableTable => vec![VARIABLE],
        _ => Vec::new(),
    }
}

/// Gives a container the last word on an entry about to be inserted.
///
/// Returns the entry to insert, possibly renamed, or `None` to cancel.
pub(crate) fn confirm_add_entry(tree: &Tree, parent: NodeId, mut entry: Tree) -> Option<Tree> {
    let container = tree.get(parent)?;
    let prefix = match container.struct_kind()? {
        StructKind::EffectTable => "Effect",
        StructKind::VariableTable => {
            let name = Variable::new(entry.root_ref())?.name();
            let taken = !name.is_empty()
                && container
                    .children()
                    .filter_map(Variable::new)
                    .any(|v| v.name().eq_ignore_ascii_case(&name));
            if taken {
                return None;
            }
            "Variable"
        }
        _ => return Some(entry),
    };

    let mut n = container.len().saturating_sub(container.struct_kind()?.fixed_len());
    let mut name = format!("{prefix} {n}");
    while container.child(&name).is_some() {
        n += 1;
        name = format!("{prefix} {n}");
    }
    let root = entry.root();
    entry.set_name(root, name).ok()?;
    Some(entry)
}

/// Rewrites header counters to match the entry list.
pub(crate) fn sync_counters(tree: &mut Tree, parent: NodeId, kind: StructKind) -> Result<(), EditError> {
    if !kind.accepts_entries() {
        return Ok(());
    }
    let Some(count) = tree.find(parent, "Count") else {
        return Ok(());
    };
    let entries = tree
        .get(parent)
        .map_or(0, |p| p.len().saturating_sub(kind.fixed_len()));
    tree.set_value(count, FieldValue::Int(entries as i64))
}

/// Signature text of an `EFF` file tree, for display.
pub fn signature(tree: &Tree) -> Option<String> {
    let root = tree.root_ref();
    let sig = root.child("Signature")?;
    let version = root.child("Version")?;
    Some(format!("{}{}", decode_text(sig.bytes()), decode_text(version.bytes())))
}
