//! Layout, round-trip and conversion properties over whole trees.

use ie_struct::schema::container::{COMPACT_EFFECT, VARIABLE, effect_table_bytes};
use ie_struct::schema::effect;
use ie_struct::schema::variable::variable_bytes;
use ie_struct::{
    EditError, EffectVersion, ErrorKind, FieldKind, FieldValue, GameConfig, NodeId, StructKind, Tree, Variable,
    VariableType, VariableValue, convert_effect, convert_effect_in_place, convert_effect_table,
};
use proptest::prelude::*;

fn config() -> GameConfig {
    GameConfig::classic()
}

/// Checks offset contiguity and size additivity below `id`.
fn check_layout(tree: &Tree, id: NodeId) {
    let node = tree.get(id).unwrap();
    let mut cursor = node.offset();
    for child in node.children() {
        assert_eq!(child.offset(), cursor, "offset of {}", child.path());
        if child.is_struct() {
            check_layout(tree, child.id());
        }
        cursor += child.size();
    }
    if node.is_struct() {
        assert_eq!(node.size(), cursor - node.offset(), "size of {}", node.name());
    }
}

/// Offset, kind and value of every primitive field below `id`, in order.
fn leaves(tree: &Tree, id: NodeId) -> Vec<(usize, Option<FieldKind>, String)> {
    let node = tree.get(id).unwrap();
    if !node.is_struct() {
        return vec![(node.offset(), node.field_kind(), node.describe())];
    }
    node.children().flat_map(|c| leaves(tree, c.id())).collect()
}

// =============================================================================
// Round trips
// =============================================================================

#[test]
fn test_fixed_records_round_trip() {
    let mut compact = vec![0u8; 48];
    for (i, b) in compact.iter_mut().enumerate() {
        *b = i as u8;
    }
    // Keep the opcode inside the classic range
    compact[0] = 146;
    compact[1] = 0;

    let mut extended = effect::default_extended(&config());
    for (i, b) in extended.iter_mut().enumerate().skip(12) {
        *b = (i * 7) as u8;
    }
    extended[8..12].copy_from_slice(&177u32.to_le_bytes());

    let variable = variable_bytes("TEST", &VariableValue::Double(0.25)).unwrap();

    let mut eff = Vec::new();
    eff.extend_from_slice(b"EFF V2.0");
    eff.extend_from_slice(&extended);

    for (kind, bytes) in [
        (StructKind::Variable, variable),
        (StructKind::EffectV1, compact),
        (StructKind::EffectV2, extended),
        (StructKind::EffFile, eff),
    ] {
        let tree = Tree::decode(kind, &bytes, &config()).unwrap();
        assert_eq!(tree.size(), bytes.len(), "{kind:?}");
        let mut out = Vec::new();
        assert_eq!(tree.write(&mut out).unwrap(), bytes.len());
        assert_eq!(out, bytes, "{kind:?}");
        check_layout(&tree, tree.root());
    }
}

#[test]
fn test_read_reports_next_offset() {
    let mut input = effect_table_bytes(false);
    input[0] = 2;
    input.extend(vec![0u8; 96]);
    input.extend_from_slice(b"trailing");
    let (tree, next) = Tree::read(StructKind::EffectTable, &input, 0, &config()).unwrap();
    assert_eq!(next, 8 + 96);
    assert_eq!(tree.root_ref().len(), 4);

    let err = Tree::decode(StructKind::EffectTable, &input, &config()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedData);
}

// =============================================================================
// Variables
// =============================================================================

#[test]
fn test_variable_type_dispatch() {
    let bytes = variable_bytes("CHAPTER", &VariableValue::Integer(3)).unwrap();
    let tree = Tree::decode(StructKind::Variable, &bytes, &config()).unwrap();
    let var = Variable::new(tree.root_ref()).unwrap();
    assert_eq!(var.value(), Some(VariableValue::Integer(3)));
    assert_eq!(var.value_as(VariableType::Double), None);

    let bytes = variable_bytes("WHO", &VariableValue::ScriptName("Jaheira".into())).unwrap();
    let tree = Tree::decode(StructKind::Variable, &bytes, &config()).unwrap();
    let var = Variable::new(tree.root_ref()).unwrap();
    assert_eq!(var.value(), Some(VariableValue::ScriptName("Jaheira".into())));
}

// =============================================================================
// Conversion
// =============================================================================

#[test]
fn test_compact_extended_compact_preserves_fields() {
    let mut bytes = vec![0u8; 48];
    bytes[0] = 67;
    bytes[2] = 2;
    bytes[3] = 5;
    bytes[4..8].copy_from_slice(&3u32.to_le_bytes());
    bytes[8..12].copy_from_slice(&2u32.to_le_bytes());
    bytes[12] = 4;
    bytes[13] = 1;
    bytes[14..18].copy_from_slice(&60u32.to_le_bytes());
    bytes[18] = 100;
    bytes[19] = 0;
    bytes[20..28].copy_from_slice(b"SKELWA\0\0");
    bytes[28..32].copy_from_slice(&2u32.to_le_bytes());
    bytes[32..36].copy_from_slice(&6u32.to_le_bytes());
    bytes[36..40].copy_from_slice(&1u32.to_le_bytes());
    bytes[40..44].copy_from_slice(&(-3i32).to_le_bytes());
    bytes[44..48].copy_from_slice(&9u32.to_le_bytes());
    let source = Tree::decode(StructKind::EffectV1, &bytes, &config()).unwrap();

    let extended = convert_effect(&source, source.root(), EffectVersion::Extended).unwrap();
    assert_eq!(extended.root_ref().child("Creature").unwrap().value(), Some(FieldValue::Text("SKELWA".into())));

    let back = convert_effect(&extended, extended.root(), EffectVersion::Compact).unwrap();
    assert_eq!(back.to_bytes(), bytes);

    let again = convert_effect(&back, back.root(), EffectVersion::Extended).unwrap();
    let ext = again.to_bytes();
    assert_eq!(ext, extended.to_bytes());
    assert_eq!(again.root_ref().child("Parameter 3").unwrap().int(), Some(0));
    assert_eq!(again.root_ref().child("Caster level").unwrap().int(), Some(0));
    assert_eq!(again.root_ref().child("Parent resource slot").unwrap().int(), Some(-1));
}

#[test]
fn test_end_to_end_damage_effect() {
    let mut bytes = vec![0u8; 48];
    bytes[0..2].copy_from_slice(&12u16.to_le_bytes());
    bytes[2] = 1;
    bytes[20..28].copy_from_slice(b"FOO     ");
    let source = Tree::decode(StructKind::EffectV1, &bytes, &config()).unwrap();
    assert_eq!(source.root_ref().child("Type").unwrap().describe(), "12 (Damage)");

    let extended = convert_effect(&source, source.root(), EffectVersion::Extended).unwrap();
    let out = extended.to_bytes();
    assert_eq!(out.len(), 264);
    assert_eq!(u32::from_le_bytes(out[8..12].try_into().unwrap()), 12);
    assert_eq!(&out[40..48], b"FOO     ");
    assert_eq!(&out[128..132], &[0, 0, 0, 0]);
}

// =============================================================================
// Editing
// =============================================================================

#[test]
fn test_removal_gate() {
    let mut tree = Tree::new(StructKind::EffectTable, &config()).unwrap();
    let root = tree.root();
    tree.add_entry(root, COMPACT_EFFECT.instantiate(&config()).unwrap()).unwrap();
    let before: Vec<(String, usize)> = tree
        .root_ref()
        .children()
        .map(|c| (c.name().to_string(), c.offset()))
        .collect();

    for name in ["Count", "Version", "Effect 0.Duration"] {
        let id = tree.lookup(name).unwrap();
        assert!(!tree.get(id).unwrap().can_remove());
        let err = tree.remove_entry(id).unwrap_err();
        assert!(matches!(err, EditError::ImmutableField { .. }));
        assert_eq!(err.kind(), ErrorKind::ImmutableField);
    }

    let after: Vec<(String, usize)> = tree
        .root_ref()
        .children()
        .map(|c| (c.name().to_string(), c.offset()))
        .collect();
    assert_eq!(before, after);
    assert_eq!(tree.size(), 8 + 48);
}

#[test]
fn test_opcode_change_reresolves_parameters() {
    let mut tree = Tree::new(StructKind::EffectTable, &config()).unwrap();
    let root = tree.root();
    let effect = tree
        .add_entry(root, COMPACT_EFFECT.instantiate(&config()).unwrap())
        .unwrap()
        .unwrap();
    assert!(tree.find(effect, "AC value").is_some());

    tree.set_opcode(effect, 146).unwrap();
    assert!(tree.find(effect, "AC value").is_none());
    assert_eq!(tree.find(effect, "Spell").map(|id| tree.get(id).unwrap().offset()), Some(8 + 20));
    assert_eq!(tree.get(effect).unwrap().name(), "Effect 0");
    check_layout(&tree, root);

    // Out of range opcodes are refused and leave the effect alone
    let before = tree.to_bytes();
    assert!(tree.set_opcode(effect, 5000).is_err());
    assert_eq!(tree.to_bytes(), before);
    assert!(tree.find(effect, "Spell").is_some());
}

#[test]
fn test_replaced_entry_moves_later_siblings() {
    let mut tree = Tree::new(StructKind::VariableTable, &config()).unwrap();
    let root = tree.root();
    for name in ["A", "B", "C"] {
        let bytes = variable_bytes(name, &VariableValue::Word(1)).unwrap();
        let var = Tree::decode(StructKind::Variable, &bytes, &config()).unwrap();
        tree.add_entry(root, var).unwrap().unwrap();
    }
    let middle = tree.lookup("Variable 1").unwrap();
    let copy = tree.clone_entry(middle).unwrap();
    assert_eq!(copy.offset(), 4 + 84);
    assert_eq!(Variable::new(copy.root_ref()).unwrap().name(), "B");

    let removed = tree.remove_entry(middle).unwrap();
    assert_eq!(removed.to_bytes(), copy.to_bytes());
    let last = tree.lookup("Variable 2").unwrap();
    assert_eq!(tree.get(last).unwrap().offset(), 4 + 84);
    assert_eq!(tree.root_ref().child("Count").unwrap().int(), Some(2));
    check_layout(&tree, root);
}

// =============================================================================
// Random edit sequences
// =============================================================================

#[derive(Debug, Clone)]
enum Edit {
    Add { at: usize },
    Remove { at: usize },
    /// Convert the whole table to the other effect version.
    Toggle,
    /// Try to convert a single entry to the other effect version.
    ConvertEntry { at: usize },
}

fn edit_strategy() -> impl Strategy<Value = Edit> {
    prop_oneof![
        (0usize..8).prop_map(|at| Edit::Add { at }),
        (0usize..8).prop_map(|at| Edit::Remove { at }),
        Just(Edit::Toggle),
        (0usize..8).prop_map(|at| Edit::ConvertEntry { at }),
    ]
}

fn table_version(tree: &Tree) -> EffectVersion {
    match tree.root_ref().child("Version").unwrap().int() {
        Some(1) => EffectVersion::Extended,
        _ => EffectVersion::Compact,
    }
}

fn other(version: EffectVersion) -> EffectVersion {
    match version {
        EffectVersion::Compact => EffectVersion::Extended,
        EffectVersion::Extended => EffectVersion::Compact,
    }
}

proptest! {
    #[test]
    fn prop_layout_stays_contiguous(edits in prop::collection::vec(edit_strategy(), 1..24)) {
        let config = config();
        let mut tree = Tree::new(StructKind::EffectTable, &config).unwrap();
        let root = tree.root();

        for edit in edits {
            let entries = tree.root_ref().len() - 2;
            match edit {
                Edit::Add { at } => {
                    let index = 2 + at % (entries + 1);
                    let proto = tree.prototypes(root).unwrap()[0];
                    let entry = proto.instantiate(&config).unwrap();
                    tree.add_entries(root, index, vec![entry]).unwrap();
                }
                Edit::Remove { at } if entries > 0 => {
                    let id = tree.root_ref().child_at(2 + at % entries).unwrap().id();
                    tree.remove_entry(id).unwrap();
                }
                Edit::Toggle => {
                    let target = other(table_version(&tree));
                    let n = convert_effect_table(&mut tree, root, target).unwrap();
                    prop_assert_eq!(n, entries);
                    prop_assert_eq!(table_version(&tree), target);
                }
                Edit::ConvertEntry { at } if entries > 0 => {
                    let id = tree.root_ref().child_at(2 + at % entries).unwrap().id();
                    let before = tree.to_bytes();
                    let target = other(table_version(&tree));
                    let err = convert_effect_in_place(&mut tree, id, target).unwrap_err();
                    prop_assert_eq!(err.kind(), ErrorKind::UnsupportedVariant);
                    prop_assert_eq!(tree.to_bytes(), before);
                }
                _ => {}
            }

            check_layout(&tree, root);
            prop_assert_eq!(tree.to_bytes().len(), tree.size());
            let count = tree.root_ref().child("Count").unwrap().int().unwrap() as usize;
            prop_assert_eq!(count, tree.root_ref().len() - 2);
            let reread = Tree::decode(StructKind::EffectTable, &tree.to_bytes(), &config).unwrap();
            prop_assert_eq!(leaves(&reread, reread.root()), leaves(&tree, root));
        }
    }

    #[test]
    fn prop_variable_table_round_trips(values in prop::collection::vec(any::<i32>(), 0..12)) {
        let config = config();
        let mut tree = Tree::new(StructKind::VariableTable, &config).unwrap();
        let root = tree.root();
        for (i, value) in values.iter().enumerate() {
            let bytes = variable_bytes(&format!("V{i}"), &VariableValue::Integer(*value)).unwrap();
            let var = Tree::decode(StructKind::Variable, &bytes, &config).unwrap();
            tree.add_entry(root, var).unwrap();
        }
        let bytes = tree.to_bytes();
        let reread = Tree::decode(StructKind::VariableTable, &bytes, &config).unwrap();
        prop_assert_eq!(reread.to_bytes(), bytes);
        let read_values: Vec<Option<VariableValue>> = reread
            .root_ref()
            .children()
            .filter_map(Variable::new)
            .map(|v| v.value())
            .collect();
        let expected: Vec<Option<VariableValue>> =
            values.iter().map(|v| Some(VariableValue::Integer(*v))).collect();
        prop_assert_eq!(read_values, expected);
        prop_assert_eq!(tree.prototypes(root).unwrap()[0].kind, VARIABLE.kind);
    }
}
