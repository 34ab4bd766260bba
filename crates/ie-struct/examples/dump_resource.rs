//! Prints the field tree of an `EFF` file or effect table.
//!
//! Without an argument, builds a small effect table in memory and dumps that.

use std::fs;

use ie_struct::limits::EFF_SIGNATURE;
use ie_struct::{EffectVersion, FieldValue, GameConfig, StructKind, Tree, convert_effect};

fn sample(config: &GameConfig) -> Tree {
    let mut table = Tree::new(StructKind::EffectTable, config).expect("empty table");
    let root = table.root();
    let proto = table.prototypes(root).expect("prototypes")[0];
    let effect = table
        .add_entry(root, proto.instantiate(config).expect("default effect"))
        .expect("add effect")
        .expect("not cancelled");
    table.set_opcode(effect, 146).expect("cast spell opcode");
    let spell = table.find(effect, "Spell").expect("spell field");
    table
        .set_value(spell, FieldValue::Text("SPWI304".to_string()))
        .expect("set spell");
    table
}

fn main() {
    let config = GameConfig::classic();
    let tree = match std::env::args().nth(1) {
        Some(path) => {
            println!("Reading: {}", path);
            let data = fs::read(&path).expect("Failed to read file");
            let kind = if data.starts_with(EFF_SIGNATURE) {
                StructKind::EffFile
            } else {
                StructKind::EffectTable
            };
            Tree::decode(kind, &data, &config).expect("Failed to decode")
        }
        None => sample(&config),
    };

    println!("\n=== {} ({} bytes) ===", tree.kind().label(), tree.size());
    print!("{}", tree.dump());

    if let Some(effect) = tree.lookup("Effect 0").or_else(|| tree.lookup("Effect")) {
        for version in [EffectVersion::Compact, EffectVersion::Extended] {
            match convert_effect(&tree, effect, version) {
                Ok(converted) => println!("\nAs {:?}: {} bytes", version, converted.size()),
                Err(e) => println!("\nAs {:?}: {}", version, e),
            }
        }
    }
}
