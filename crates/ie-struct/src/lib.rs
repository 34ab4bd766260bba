//! Editable binary structures for Infinity Engine game resources.
//!
//! This crate reads fixed-layout resource records (effects, variables and
//! the containers that hold them) into an editable tree, writes them back
//! byte for byte, and converts effects between their compact and extended
//! formats.
//!
//! # Overview
//!
//! - **Trees own bytes**: a [`Tree`] holds the serialized buffer and an arena
//!   of nodes that describe it. Every node knows its name, absolute offset
//!   and size.
//! - **Layout stays contiguous**: adding, removing or resizing an entry
//!   re-lays out later siblings and every ancestor in one forward pass.
//! - **Discriminants pick schemas**: an effect's opcode selects how its
//!   parameters are split and named; a variable's type tag selects which
//!   value slot is meaningful.
//!
//! # Quick Start
//!
//! ```rust
//! use ie_struct::{EffectVersion, GameConfig, StructKind, Tree, convert_effect};
//!
//! let config = GameConfig::classic();
//!
//! // An empty compact effect table with one default effect in it
//! let mut table = Tree::new(StructKind::EffectTable, &config).unwrap();
//! let root = table.root();
//! let proto = table.prototypes(root).unwrap()[0];
//! let effect = table.add_entry(root, proto.instantiate(&config).unwrap()).unwrap().unwrap();
//! assert_eq!(table.size(), 8 + 48);
//!
//! // Widen it to the extended format
//! let extended = convert_effect(&table, effect, EffectVersion::Extended).unwrap();
//! assert_eq!(extended.size(), 264);
//!
//! // Serialize
//! let mut out = Vec::new();
//! table.write(&mut out).unwrap();
//! assert_eq!(out, table.to_bytes());
//! ```
//!
//! # Modules
//!
//! - [`model`]: the tree, node views and field kinds
//! - [`schema`]: record layouts, the opcode table and container rules
//! - [`convert`]: compact/extended effect conversion
//! - [`codec`]: little-endian primitives and Windows-1252 text
//! - [`config`]: engine selection
//! - [`error`]: error types
//! - [`limits`]: record sizes and decoding limits
//!
//! # Security
//!
//! Input is treated as untrusted: every read is bounds-checked, and table
//! counts are capped before nodes are allocated for them.

pub mod codec;
pub mod config;
pub mod convert;
pub mod error;
pub mod limits;
pub mod model;
pub mod schema;

pub use config::{Engine, GameConfig};
pub use convert::{EffectVersion, convert_effect, convert_effect_in_place, convert_effect_table};
pub use error::{ConvertError, DecodeError, EditError, EncodeError, ErrorKind};
pub use model::{FieldKind, FieldValue, NodeId, NodeRef, Prototype, StructKind, Tree, Width};
pub use schema::variable::{Variable, VariableType, VariableValue, set_variable_value};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
