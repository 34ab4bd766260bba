//! Arena nodes and the read-only [`NodeRef`] view.

use std::io::Write;

use crate::codec::primitives::Writer;
use crate::error::EncodeError;
use crate::model::{FieldKind, FieldValue, StructKind, Tree};

/// Handle of a node inside a [`Tree`].
///
/// Handles are never reused within one tree, so a handle to a removed node
/// stays invalid instead of silently pointing at a newer node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Position of the node in its tree's arena.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub(crate) name: String,
    /// Absolute offset from the start of the owning file.
    pub(crate) offset: usize,
    /// Owning structure. Lookup only; ownership runs from `Tree::nodes`.
    pub(crate) parent: Option<NodeId>,
    pub(crate) data: NodeData,
}

#[derive(Debug, Clone)]
pub(crate) enum NodeData {
    Field(FieldKind),
    Struct {
        kind: StructKind,
        children: Vec<NodeId>,
    },
}

impl Node {
    pub(crate) fn field(name: impl Into<String>, offset: usize, parent: NodeId, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            offset,
            parent: Some(parent),
            data: NodeData::Field(kind),
        }
    }

    pub(crate) fn structure(
        name: impl Into<String>,
        offset: usize,
        parent: Option<NodeId>,
        kind: StructKind,
    ) -> Self {
        Self {
            name: name.into(),
            offset,
            parent,
            data: NodeData::Struct {
                kind,
                children: Vec::new(),
            },
        }
    }

    pub(crate) fn children(&self) -> &[NodeId] {
        match &self.data {
            NodeData::Struct { children, .. } => children,
            NodeData::Field(_) => &[],
        }
    }
}

/// Borrowed view of one node: the Field contract as seen by callers.
#[derive(Debug, Clone, Copy)]
pub struct NodeRef<'a> {
    pub(crate) tree: &'a Tree,
    pub(crate) id: NodeId,
    pub(crate) node: &'a Node,
}

impl<'a> NodeRef<'a> {
    pub fn id(self) -> NodeId {
        self.id
    }

    pub fn name(self) -> &'a str {
        &self.node.name
    }

    /// Absolute offset from the start of the owning file.
    pub fn offset(self) -> usize {
        self.node.offset
    }

    /// Serialized size; computed from the children for structures.
    pub fn size(self) -> usize {
        self.tree.size_of(self.id)
    }

    /// Owning structure, if any.
    pub fn parent(self) -> Option<NodeId> {
        self.node.parent
    }

    pub fn is_struct(self) -> bool {
        matches!(self.node.data, NodeData::Struct { .. })
    }

    pub fn struct_kind(self) -> Option<StructKind> {
        match self.node.data {
            NodeData::Struct { kind, .. } => Some(kind),
            NodeData::Field(_) => None,
        }
    }

    pub fn field_kind(self) -> Option<FieldKind> {
        match self.node.data {
            NodeData::Field(kind) => Some(kind),
            NodeData::Struct { .. } => None,
        }
    }

    /// Children in serialization order (empty for primitive fields).
    pub fn children(self) -> impl Iterator<Item = NodeRef<'a>> {
        let tree = self.tree;
        self.node
            .children()
            .iter()
            .filter_map(move |&id| tree.get(id))
    }

    /// Number of children.
    pub fn len(self) -> usize {
        self.node.children().len()
    }

    pub fn is_empty(self) -> bool {
        self.node.children().is_empty()
    }

    /// First child with the given name.
    pub fn child(self, name: &str) -> Option<NodeRef<'a>> {
        self.children().find(|c| c.name() == name)
    }

    /// Child at a position.
    pub fn child_at(self, index: usize) -> Option<NodeRef<'a>> {
        self.node.children().get(index).and_then(|&id| self.tree.get(id))
    }

    /// Backing bytes of this node.
    pub fn bytes(self) -> &'a [u8] {
        self.tree.bytes_of(self.id)
    }

    /// Decoded value of a primitive field.
    pub fn value(self) -> Option<FieldValue> {
        self.field_kind().map(|kind| kind.decode(self.bytes()))
    }

    /// Integer value of a numeric field.
    pub fn int(self) -> Option<i64> {
        self.value().and_then(|v| v.as_int())
    }

    /// Value formatted with its symbolic label; structures show their kind.
    pub fn describe(self) -> String {
        match self.node.data {
            NodeData::Field(kind) => kind.describe(&kind.decode(self.bytes())),
            NodeData::Struct { kind, .. } => format!("<{}, {} bytes>", kind.label(), self.size()),
        }
    }

    /// Returns true if this node may be removed from its parent.
    pub fn can_remove(self) -> bool {
        self.tree.can_remove(self.id)
    }

    /// Dotted path of names from the root's first level down to this node.
    pub fn path(self) -> String {
        let mut names = vec![self.name()];
        let mut current = self.parent();
        while let Some(parent) = current.and_then(|id| self.tree.get(id)) {
            if parent.parent().is_none() {
                break;
            }
            names.push(parent.name());
            current = parent.parent();
        }
        names.reverse();
        names.join(".")
    }

    /// Writes this node's bytes: fields in list order for structures.
    pub fn write<W: Write>(self, writer: &mut Writer<W>) -> Result<(), EncodeError> {
        let start = writer.written();
        match &self.node.data {
            NodeData::Field(_) => writer.write_bytes(self.bytes())?,
            NodeData::Struct { .. } => {
                for child in self.children() {
                    child.write(writer)?;
                }
            }
        }
        let written = writer.written() - start;
        let expected = self.size();
        if written != expected {
            return Err(EncodeError::SizeMismatch {
                name: self.name().to_string(),
                written,
                expected,
            });
        }
        Ok(())
    }
}
