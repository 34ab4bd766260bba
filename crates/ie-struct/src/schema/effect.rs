//! Effect records in their compact (48-byte) and extended (264-byte) forms.
//!
//! Both forms start with the opcode; the opcode picks the parameter split
//! through [`opcode::resolve`]. The extended form also carries a parent
//! resource type that selects which resource types its parent reference
//! accepts.

use crate::codec::decode::Decoder;
use crate::codec::primitives::put_uint;
use crate::config::GameConfig;
use crate::error::DecodeError;
use crate::limits::{EFFECT_V1_SIZE, EFFECT_V2_SIZE};
use crate::model::{FieldKind, NodeId, Width};
use crate::schema::FieldSpec;
use crate::schema::opcode::{self, OpcodeDef};

pub const TARGETS: &[&str] = &[
    "None",
    "Self",
    "Preset target",
    "Party",
    "Everyone",
    "Everyone except party",
    "Caster group",
    "Target group",
    "Everyone except self",
    "Original caster",
];

pub const TIMING_MODES: &[&str] = &[
    "Instant/Limited",
    "Instant/Permanent until death",
    "Instant/While equipped",
    "Delay/Limited",
    "Delay/Permanent",
    "Delay/While equipped",
    "Limited after duration",
    "Permanent after duration",
    "Equipped after duration",
    "Instant/Permanent",
    "Instant/Limited (ticks)",
];

pub const DISPEL_FLAGS: &[&str] = &["Dispel", "Bypass resistance"];

pub const SAVE_TYPES: &[&str] = &[
    "Spell",
    "Breath weapon",
    "Paralyze/Poison/Death",
    "Rod/Staff/Wand",
    "Petrify/Polymorph",
];

pub const PARENT_TYPES: &[&str] = &["None", "Spell", "Item"];

/// Offset of the opcode in an extended effect.
pub const EXTENDED_OPCODE_OFFSET: usize = 8;
/// Offset of the parent resource type in an extended effect.
pub const PARENT_TYPE_OFFSET: usize = 136;
/// Offset of the parent resource slot in an extended effect.
pub const PARENT_SLOT_OFFSET: usize = 156;

// =============================================================================
// LAYOUTS
// =============================================================================

/// Field list of a compact effect with the given opcode.
pub fn compact_layout(opcode: u32, config: &GameConfig) -> Result<Vec<FieldSpec>, DecodeError> {
    let def = opcode::resolve(opcode, config)?;
    let mut specs = vec![
        FieldSpec::new("Type", FieldKind::Opcode(Width::Word)),
        FieldSpec::new("Target", FieldKind::Enum(Width::Byte, TARGETS)),
        FieldSpec::new("Power", FieldKind::Unsigned(Width::Byte)),
    ];
    push_params(&mut specs, def);
    specs.extend([
        FieldSpec::new("Timing mode", FieldKind::Enum(Width::Byte, TIMING_MODES)),
        FieldSpec::new("Dispel/Resistance", FieldKind::Flags(Width::Byte, DISPEL_FLAGS)),
        FieldSpec::new("Duration", FieldKind::Unsigned(Width::Dword)),
        FieldSpec::new("Probability 1", FieldKind::Unsigned(Width::Byte)),
        FieldSpec::new("Probability 2", FieldKind::Unsigned(Width::Byte)),
    ]);
    push_dice_and_saves(&mut specs, def, config);
    Ok(specs)
}

/// Field list of an extended effect with the given opcode and parent
/// resource type.
pub fn extended_layout(
    opcode: u32,
    parent_type: u32,
    config: &GameConfig,
) -> Result<Vec<FieldSpec>, DecodeError> {
    let def = opcode::resolve(opcode, config)?;
    let mut specs = vec![
        FieldSpec::new("Signature", FieldKind::Text(4)),
        FieldSpec::new("Version", FieldKind::Text(4)),
        FieldSpec::new("Type", FieldKind::Opcode(Width::Dword)),
        FieldSpec::new("Target", FieldKind::Enum(Width::Dword, TARGETS)),
        FieldSpec::new("Power", FieldKind::Unsigned(Width::Dword)),
    ];
    push_params(&mut specs, def);
    specs.extend([
        FieldSpec::new("Timing mode", FieldKind::Enum(Width::Word, TIMING_MODES)),
        FieldSpec::new("Timing unknown", FieldKind::Hex(Width::Word)),
        FieldSpec::new("Duration", FieldKind::Unsigned(Width::Dword)),
        FieldSpec::new("Probability 1", FieldKind::Unsigned(Width::Word)),
        FieldSpec::new("Probability 2", FieldKind::Unsigned(Width::Word)),
    ]);
    push_dice_and_saves(&mut specs, def, config);

    let parent_resource: &'static [&'static str] = match parent_type {
        1 => &["SPL"],
        2 => &["ITM"],
        _ => &["SPL", "ITM"],
    };
    specs.extend([
        FieldSpec::new("Primary type", FieldKind::Unsigned(Width::Dword)),
        FieldSpec::new("Unknown", FieldKind::Hex(Width::Dword)),
        FieldSpec::new("Minimum level", FieldKind::Unsigned(Width::Dword)),
        FieldSpec::new("Maximum level", FieldKind::Unsigned(Width::Dword)),
        FieldSpec::new("Dispel/Resistance", FieldKind::Flags(Width::Dword, DISPEL_FLAGS)),
        FieldSpec::new("Parameter 3", FieldKind::Signed(Width::Dword)),
        FieldSpec::new("Parameter 4", FieldKind::Signed(Width::Dword)),
        FieldSpec::new("Parameter 5", FieldKind::Signed(Width::Dword)),
        FieldSpec::new("Time applied (ticks)", FieldKind::Unsigned(Width::Dword)),
        FieldSpec::new("Resource 2", FieldKind::ResRef(&[])),
        FieldSpec::new("Resource 3", FieldKind::ResRef(&[])),
        FieldSpec::new("Caster location X", FieldKind::Signed(Width::Dword)),
        FieldSpec::new("Caster location Y", FieldKind::Signed(Width::Dword)),
        FieldSpec::new("Target location X", FieldKind::Signed(Width::Dword)),
        FieldSpec::new("Target location Y", FieldKind::Signed(Width::Dword)),
        FieldSpec::new("Parent resource type", FieldKind::Enum(Width::Dword, PARENT_TYPES)),
        FieldSpec::new("Parent resource", FieldKind::ResRef(parent_resource)),
        FieldSpec::new("Parent resource flags", FieldKind::Hex(Width::Dword)),
        FieldSpec::new("Projectile", FieldKind::Unsigned(Width::Dword)),
        FieldSpec::new("Parent resource slot", FieldKind::Signed(Width::Dword)),
        FieldSpec::new("Variable name", FieldKind::Text(32)),
        FieldSpec::new("Caster level", FieldKind::Unsigned(Width::Dword)),
        FieldSpec::new("Internal flags", FieldKind::Hex(Width::Dword)),
        FieldSpec::new("Secondary type", FieldKind::Unsigned(Width::Dword)),
        FieldSpec::new("Reserved", FieldKind::Raw(60)),
    ]);
    Ok(specs)
}

fn push_params(specs: &mut Vec<FieldSpec>, def: &OpcodeDef) {
    specs.extend_from_slice(def.param1());
    specs.extend_from_slice(def.param2());
}

fn push_dice_and_saves(specs: &mut Vec<FieldSpec>, def: &OpcodeDef, config: &GameConfig) {
    specs.push(def.resource());
    specs.extend([
        FieldSpec::new("# dice thrown", FieldKind::Unsigned(Width::Dword)),
        FieldSpec::new("Dice size", FieldKind::Unsigned(Width::Dword)),
        FieldSpec::new("Save type", FieldKind::Flags(Width::Dword, SAVE_TYPES)),
        FieldSpec::new("Save bonus", FieldKind::Signed(Width::Dword)),
    ]);
    specs.push(def.special(config));
}

// =============================================================================
// READERS
// =============================================================================

pub(crate) fn read_compact(decoder: &mut Decoder<'_>, id: NodeId) -> Result<(), DecodeError> {
    let opcode = decoder.peek_uint(0, 2, "Type")? as u32;
    let layout = compact_layout(opcode, decoder.config())?;
    decoder.fields(id, &layout)
}

pub(crate) fn read_extended(decoder: &mut Decoder<'_>, id: NodeId) -> Result<(), DecodeError> {
    let opcode = decoder.peek_uint(EXTENDED_OPCODE_OFFSET, 4, "Type")? as u32;
    // A truncated record fails below at the field that runs past the end.
    let parent_type = decoder
        .peek_uint(PARENT_TYPE_OFFSET, 4, "Parent resource type")
        .map_or(0, |v| v as u32);
    let layout = extended_layout(opcode, parent_type, decoder.config())?;
    decoder.fields(id, &layout)
}

// =============================================================================
// DEFAULTS
// =============================================================================

pub fn default_compact(_config: &GameConfig) -> Vec<u8> {
    vec![0u8; EFFECT_V1_SIZE]
}

/// All zero except the parent resource slot, which is `-1` (none).
pub fn default_extended(_config: &GameConfig) -> Vec<u8> {
    let mut bytes = vec![0u8; EFFECT_V2_SIZE];
    put_uint(&mut bytes, PARENT_SLOT_OFFSET, 4, u32::MAX as u64);
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FieldValue, StructKind, Tree};
    use crate::schema::layout_size;

    #[test]
    fn test_layout_sizes_are_fixed() {
        for opcode in [0, 7, 12, 17, 67, 146, 177, 206, 250] {
            for config in [GameConfig::classic(), GameConfig::enhanced()] {
                assert_eq!(layout_size(&compact_layout(opcode, &config).unwrap()), EFFECT_V1_SIZE);
                for parent_type in 0..3 {
                    let layout = extended_layout(opcode, parent_type, &config).unwrap();
                    assert_eq!(layout_size(&layout), EFFECT_V2_SIZE);
                }
            }
        }
    }

    #[test]
    fn test_compact_offsets() {
        let tree = Tree::new(StructKind::EffectV1, &GameConfig::classic()).unwrap();
        let root = tree.root_ref();
        let offsets: Vec<(&str, usize)> = root.children().map(|c| (c.name(), c.offset())).collect();
        assert_eq!(offsets[0], ("Type", 0));
        assert_eq!(offsets[3], ("AC value", 4));
        assert_eq!(offsets[5], ("Timing mode", 12));
        assert_eq!(root.child("Duration").unwrap().offset(), 14);
        assert_eq!(root.child("Resource").unwrap().offset(), 20);
        assert_eq!(root.child("Save bonus").unwrap().offset(), 40);
        assert_eq!(root.child("Special").unwrap().offset(), 44);
    }

    #[test]
    fn test_extended_offsets() {
        let tree = Tree::new(StructKind::EffectV2, &GameConfig::classic()).unwrap();
        let root = tree.root_ref();
        let at = |name: &str| root.child(name).unwrap().offset();
        assert_eq!(at("Type"), 8);
        assert_eq!(at("Timing mode"), 28);
        assert_eq!(at("Resource"), 40);
        assert_eq!(at("Special"), 64);
        assert_eq!(at("Dispel/Resistance"), 84);
        assert_eq!(at("Target location X"), 128);
        assert_eq!(at("Parent resource type"), 136);
        assert_eq!(at("Parent resource slot"), 156);
        assert_eq!(at("Variable name"), 160);
        assert_eq!(at("Internal flags"), 196);
        assert_eq!(at("Reserved"), 204);
        assert_eq!(root.child("Parent resource slot").unwrap().int(), Some(-1));
    }

    #[test]
    fn test_opcode_selects_parameters() {
        let mut bytes = default_compact(&GameConfig::classic());
        bytes[0] = 12;
        bytes[8..10].copy_from_slice(&1u16.to_le_bytes());
        bytes[10..12].copy_from_slice(&8u16.to_le_bytes());
        let tree = Tree::decode(StructKind::EffectV1, &bytes, &GameConfig::classic()).unwrap();
        let root = tree.root_ref();
        assert_eq!(root.child("Amount").unwrap().offset(), 4);
        let mode = root.child("Mode").unwrap();
        assert_eq!(mode.offset(), 8);
        assert_eq!(mode.describe(), "1 (Set to value)");
        let damage = root.child("Damage type").unwrap();
        assert_eq!(damage.offset(), 10);
        assert_eq!(damage.describe(), "0x8 (Fire)");
    }

    #[test]
    fn test_special_depends_on_engine() {
        let mut bytes = default_compact(&GameConfig::classic());
        bytes[0] = 12;
        let classic = Tree::decode(StructKind::EffectV1, &bytes, &GameConfig::classic()).unwrap();
        assert!(classic.root_ref().child("Special").is_some());
        let enhanced = Tree::decode(StructKind::EffectV1, &bytes, &GameConfig::enhanced()).unwrap();
        assert!(enhanced.root_ref().child("Damage flags").is_some());
        assert_eq!(classic.to_bytes(), enhanced.to_bytes());
    }

    #[test]
    fn test_unknown_opcode_rejected() {
        let mut bytes = default_compact(&GameConfig::classic());
        bytes[0..2].copy_from_slice(&999u16.to_le_bytes());
        let err = Tree::decode(StructKind::EffectV1, &bytes, &GameConfig::classic()).unwrap_err();
        assert_eq!(err, DecodeError::UnknownOpcode { opcode: 999, max: 317 });
    }

    #[test]
    fn test_parent_type_selects_resource_types() {
        let mut bytes = default_extended(&GameConfig::classic());
        put_uint(&mut bytes, PARENT_TYPE_OFFSET, 4, 2);
        let tree = Tree::decode(StructKind::EffectV2, &bytes, &GameConfig::classic()).unwrap();
        let parent = tree.root_ref().child("Parent resource").unwrap();
        assert_eq!(parent.field_kind(), Some(FieldKind::ResRef(&["ITM"])));
        assert_eq!(parent.value(), Some(FieldValue::Text(String::new())));
    }
}
