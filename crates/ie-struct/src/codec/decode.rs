//! Structure decoding into an arena tree.
//!
//! A [`Decoder`] walks the input with a [`Reader`], appending one node per
//! field. Schema readers in [`crate::schema`] drive it: they peek at
//! discriminants, pick a field list and hand it back here.

use tracing::debug;

use crate::codec::primitives::Reader;
use crate::config::GameConfig;
use crate::error::DecodeError;
use crate::model::node::{Node, NodeData};
use crate::model::{FieldKind, NodeId, StructKind, Tree};
use crate::schema::{self, FieldSpec};

/// Builds arena nodes while reading.
pub(crate) struct Decoder<'a> {
    reader: Reader<'a>,
    config: GameConfig,
    nodes: Vec<Option<Node>>,
}

impl<'a> Decoder<'a> {
    fn new(reader: Reader<'a>, config: GameConfig) -> Self {
        Self {
            reader,
            config,
            nodes: Vec::new(),
        }
    }

    pub(crate) fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Absolute offset of the next field.
    pub(crate) fn position(&self) -> usize {
        self.reader.position()
    }

    /// Peeks an unsigned value `rel` bytes past the cursor.
    pub(crate) fn peek_uint(&self, rel: usize, width: usize, context: &str) -> Result<u64, DecodeError> {
        self.reader.peek_uint(self.reader.position() + rel, width, context)
    }

    /// Reads one primitive field into `parent`.
    pub(crate) fn field(
        &mut self,
        parent: NodeId,
        name: impl Into<String>,
        kind: FieldKind,
    ) -> Result<NodeId, DecodeError> {
        let name = name.into();
        let offset = self.reader.position();
        self.reader.read_bytes(kind.size(), &name)?;
        Ok(self.push(parent, Node::field(name, offset, parent, kind)))
    }

    /// Reads a static field list into `parent`.
    pub(crate) fn fields(&mut self, parent: NodeId, specs: &[FieldSpec]) -> Result<(), DecodeError> {
        for spec in specs {
            self.field(parent, spec.name, spec.kind)?;
        }
        Ok(())
    }

    /// Reads a nested structure of `kind`.
    pub(crate) fn structure(
        &mut self,
        parent: Option<NodeId>,
        name: impl Into<String>,
        kind: StructKind,
    ) -> Result<NodeId, DecodeError> {
        let node = Node::structure(name, self.reader.position(), parent, kind);
        let id = match parent {
            Some(parent) => self.push(parent, node),
            None => self.alloc(node),
        };
        schema::read_body(self, id, kind)?;
        Ok(id)
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Some(node));
        id
    }

    fn push(&mut self, parent: NodeId, node: Node) -> NodeId {
        let id = self.alloc(node);
        if let Some(Some(parent)) = self.nodes.get_mut(parent.index()) {
            if let NodeData::Struct { children, .. } = &mut parent.data {
                children.push(id);
            }
        }
        id
    }
}

/// Reads a structure of `kind` at absolute `offset`, where `input[0]` sits at
/// absolute `input_base`. Returns the tree and the offset past its last byte.
pub(crate) fn read_structure(
    kind: StructKind,
    input: &[u8],
    input_base: usize,
    offset: usize,
    config: GameConfig,
) -> Result<(Tree, usize), DecodeError> {
    let mut reader = Reader::with_base(input, input_base);
    reader.seek(offset);
    let mut decoder = Decoder::new(reader, config);
    let root = decoder.structure(None, kind.label(), kind)?;
    let end = decoder.position();

    let buffer = input[offset - input_base..end - input_base].to_vec();
    debug!(
        kind = kind.label(),
        offset,
        size = buffer.len(),
        nodes = decoder.nodes.len(),
        "decoded structure"
    );
    Ok((Tree::from_parts(decoder.nodes, root, offset, buffer, config), end))
}
