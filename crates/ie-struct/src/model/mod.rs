//! In-memory structure model.
//!
//! - [`Tree`]: arena of nodes over an owned byte buffer, with the edit and
//!   re-layout engine
//! - [`NodeRef`]: read-only view of one node (name, offset, size, value)
//! - [`FieldKind`] / [`FieldValue`]: primitive field kinds and typed values
//! - [`StructKind`] / [`Prototype`]: composite kinds and insertion factories

pub mod field;
pub mod kind;
pub mod node;
pub mod tree;

pub use field::{EncodeValueError, FieldKind, FieldValue, Width};
pub use kind::{Prototype, StructKind};
pub use node::{NodeId, NodeRef};
pub use tree::Tree;
