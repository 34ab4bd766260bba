//! Editable structure tree.
//!
//! A [`Tree`] owns one contiguous byte buffer and an arena of nodes that
//! describe it. Primitive fields are `(offset, kind)` views into the buffer;
//! composite structures are ordered lists of child handles. The invariants
//! kept across every edit:
//!
//! - the offset of child `i` equals its parent's offset plus the sizes of
//!   children `0..i`
//! - the size of a structure is the sum of its children's sizes
//! - the buffer holds exactly the bytes of the root, starting at the root's
//!   offset
//!
//! Edits take `&mut Tree`, so a single edit always has exclusive access to
//! the whole ancestor chain it re-lays out.

use std::io::Write;
use std::ops::Range;

use tracing::{debug, trace};

use crate::codec::decode;
use crate::codec::primitives::Writer;
use crate::config::GameConfig;
use crate::error::{DecodeError, EditError, EncodeError};
use crate::model::field::EncodeValueError;
use crate::model::node::{Node, NodeData};
use crate::model::{FieldKind, FieldValue, NodeId, NodeRef, Prototype, StructKind};
use crate::schema::{self, container};

/// An editable structure together with the bytes it describes.
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<Option<Node>>,
    root: NodeId,
    /// Absolute offset of `buffer[0]`.
    base: usize,
    buffer: Vec<u8>,
    config: GameConfig,
}

impl Tree {
    pub(crate) fn from_parts(
        nodes: Vec<Option<Node>>,
        root: NodeId,
        base: usize,
        buffer: Vec<u8>,
        config: GameConfig,
    ) -> Self {
        Self {
            nodes,
            root,
            base,
            buffer,
            config,
        }
    }

    // =========================================================================
    // Reading and writing
    // =========================================================================

    /// Reads a structure of `kind` starting at absolute `offset` of `input`.
    ///
    /// Returns the tree and the offset immediately past the last byte
    /// consumed, which callers chain into the next read.
    pub fn read(
        kind: StructKind,
        input: &[u8],
        offset: usize,
        config: &GameConfig,
    ) -> Result<(Tree, usize), DecodeError> {
        decode::read_structure(kind, input, 0, offset, *config)
    }

    /// Reads a structure that must span all of `input`.
    pub fn decode(kind: StructKind, input: &[u8], config: &GameConfig) -> Result<Tree, DecodeError> {
        let (tree, end) = Self::read(kind, input, 0, config)?;
        if end != input.len() {
            return Err(DecodeError::TrailingData {
                kind,
                len: input.len() - end,
            });
        }
        Ok(tree)
    }

    /// Builds a default instance of `kind` by reading its default bytes.
    pub fn new(kind: StructKind, config: &GameConfig) -> Result<Tree, DecodeError> {
        Self::decode(kind, &schema::default_bytes(kind, config), config)
    }

    /// Writes the whole tree to `sink`; returns the number of bytes written.
    pub fn write<W: Write>(&self, sink: W) -> Result<usize, EncodeError> {
        let mut writer = Writer::new(sink);
        self.root_ref().write(&mut writer)?;
        writer.flush()?;
        Ok(writer.written())
    }

    /// Serialized bytes of the whole tree.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.buffer.clone()
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Kind of the root structure.
    pub fn kind(&self) -> StructKind {
        match self.n(self.root).data {
            NodeData::Struct { kind, .. } => kind,
            // Decoders only ever create structure roots.
            NodeData::Field(_) => unreachable!("tree root is a primitive field"),
        }
    }

    /// Absolute offset of the root.
    pub fn offset(&self) -> usize {
        self.base
    }

    /// Serialized size of the root.
    pub fn size(&self) -> usize {
        self.size_of(self.root)
    }

    /// Number of live nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    /// View of a node, or `None` for a stale or foreign handle.
    pub fn get(&self, id: NodeId) -> Option<NodeRef<'_>> {
        let node = self.nodes.get(id.index())?.as_ref()?;
        Some(NodeRef {
            tree: self,
            id,
            node,
        })
    }

    /// View of the root.
    pub fn root_ref(&self) -> NodeRef<'_> {
        NodeRef {
            tree: self,
            id: self.root,
            node: self.n(self.root),
        }
    }

    /// Looks up a child of `parent` by name.
    pub fn find(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.get(parent)?.child(name).map(|c| c.id())
    }

    /// Looks up a node by a dotted path of names below the root,
    /// e.g. `"Effect 0.Type"`.
    pub fn lookup(&self, path: &str) -> Option<NodeId> {
        path.split('.')
            .try_fold(self.root, |id, name| self.find(id, name))
    }

    /// Deepest primitive field covering an absolute offset.
    pub fn find_at(&self, offset: usize) -> Option<NodeId> {
        let mut current = self.root;
        loop {
            let node = self.get(current)?;
            if !node.is_struct() {
                return Some(current);
            }
            current = node
                .children()
                .find(|c| (c.offset()..c.offset() + c.size()).contains(&offset))?
                .id();
        }
    }

    /// Entry prototypes that may be added to `parent`.
    pub fn prototypes(&self, parent: NodeId) -> Result<Vec<Prototype>, EditError> {
        let kind = self.struct_kind(parent)?;
        Ok(container::prototypes(self, parent, kind))
    }

    /// Multi-line listing of every primitive field with offset and value.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            let Some(node) = self.get(id) else { continue };
            if node.is_struct() {
                let children: Vec<NodeId> = node.children().map(|c| c.id()).collect();
                stack.extend(children.into_iter().rev());
            } else {
                out.push_str(&format!(
                    "{:#06x} {:<40} {}\n",
                    node.offset(),
                    node.path(),
                    node.describe()
                ));
            }
        }
        out
    }

    // =========================================================================
    // Field edits
    // =========================================================================

    /// Renames a node.
    pub fn set_name(&mut self, id: NodeId, name: impl Into<String>) -> Result<(), EditError> {
        self.node_mut(id)?.name = name.into();
        Ok(())
    }

    /// Moves a detached tree to a new absolute offset.
    ///
    /// Only the tree's own nodes move; there is no owner to re-lay out.
    pub fn set_offset(&mut self, offset: usize) {
        let delta = offset as isize - self.base as isize;
        self.base = offset;
        self.shift_subtree(self.root, delta);
    }

    /// Stores a new value into a primitive field.
    ///
    /// Writing a field that selects part of its record's layout (an effect
    /// opcode, or the parent resource type of an extended effect) re-reads
    /// the owning record; handles to that record's fields are invalidated,
    /// the record's own handle is kept. The tree is left unchanged on error.
    pub fn set_value(&mut self, id: NodeId, value: FieldValue) -> Result<(), EditError> {
        let node = self.node(id)?;
        let NodeData::Field(kind) = node.data else {
            return Err(EditError::NotAField {
                name: node.name.clone(),
            });
        };
        let bytes = kind.encode(&value).map_err(|e| match e {
            EncodeValueError::Mismatch => EditError::ValueMismatch {
                name: node.name.clone(),
            },
            EncodeValueError::OutOfRange(value) => EditError::ValueOutOfRange {
                name: node.name.clone(),
                value,
            },
            EncodeValueError::TooLong(len) => EditError::TextTooLong {
                name: node.name.clone(),
                len,
                max: kind.size(),
            },
            EncodeValueError::Unmappable(ch) => EditError::UnmappableText {
                name: node.name.clone(),
                ch,
            },
        })?;

        let range = self.range(id);
        let Some(record) = node.parent else {
            self.buffer[range].copy_from_slice(&bytes);
            return Ok(());
        };
        let record_kind = self.struct_kind(record)?;
        let record_range = self.range(record);
        let local = range.start - record_range.start;
        if !matches!(kind, FieldKind::Opcode(_)) && !schema::selects_layout(record_kind, local) {
            self.buffer[range].copy_from_slice(&bytes);
            return Ok(());
        }

        // Resolve the new schema against patched bytes before committing.
        let mut patched = self.buffer[record_range].to_vec();
        patched[local..local + bytes.len()].copy_from_slice(&bytes);
        let record_offset = self.n(record).offset;
        let (fresh, _) =
            decode::read_structure(record_kind, &patched, record_offset, record_offset, self.config)?;
        debug!(
            record = %self.n(record).name,
            field = %self.n(id).name,
            value = ?value.as_int(),
            "re-resolved record layout"
        );
        self.replace_contents(record, fresh);
        Ok(())
    }

    /// Writes an effect opcode, re-resolving the effect's parameter fields.
    pub fn set_opcode(&mut self, effect: NodeId, opcode: u32) -> Result<(), EditError> {
        let node = self.node(effect)?;
        let field = node
            .children()
            .iter()
            .copied()
            .find(|&c| matches!(self.n(c).data, NodeData::Field(FieldKind::Opcode(_))))
            .ok_or_else(|| EditError::NotAStructure {
                name: node.name.clone(),
            })?;
        self.set_value(field, FieldValue::Int(opcode as i64))
    }

    /// Overwrites the bytes of a node with a same-sized replacement.
    pub(crate) fn overwrite(&mut self, id: NodeId, bytes: &[u8]) {
        let range = self.range(id);
        debug_assert_eq!(range.len(), bytes.len());
        self.buffer[range].copy_from_slice(bytes);
    }

    // =========================================================================
    // Structural edits
    // =========================================================================

    /// Appends an entry to a container.
    ///
    /// Returns `Ok(None)` when the container's add hook cancelled the
    /// insertion.
    pub fn add_entry(&mut self, parent: NodeId, entry: Tree) -> Result<Option<NodeId>, EditError> {
        let index = self.node(parent)?.children().len();
        Ok(self.add_entries(parent, index, vec![entry])?.into_iter().next())
    }

    /// Inserts entries into a container starting at `index`.
    ///
    /// Every entry kind is validated before anything is inserted. Entries
    /// the add hook cancels are skipped; the handles of inserted entries are
    /// returned in order.
    pub fn add_entries(
        &mut self,
        parent: NodeId,
        index: usize,
        entries: Vec<Tree>,
    ) -> Result<Vec<NodeId>, EditError> {
        let parent_kind = self.struct_kind(parent)?;
        let len = self.n(parent).children().len();
        let min = parent_kind.fixed_len();
        if !parent_kind.accepts_entries() || index < min || index > len {
            return Err(EditError::InvalidIndex {
                index,
                min: min.min(len),
                max: len,
            });
        }

        let allowed = container::prototypes(self, parent, parent_kind);
        for entry in &entries {
            let kind = entry.kind();
            if !allowed.iter().any(|p| p.kind == kind) {
                return Err(EditError::NotAddable {
                    kind,
                    parent: parent_kind,
                });
            }
        }

        let mut added = Vec::with_capacity(entries.len());
        let mut at = index;
        for entry in entries {
            let Some(entry) = container::confirm_add_entry(self, parent, entry) else {
                debug!(parent = %self.n(parent).name, "add hook cancelled entry");
                continue;
            };
            let id = self.graft(parent, at, entry);
            debug!(
                parent = %self.n(parent).name,
                entry = %self.n(id).name,
                index = at,
                "added entry"
            );
            added.push(id);
            at += 1;
        }

        if !added.is_empty() {
            container::sync_counters(self, parent, parent_kind)?;
        }
        Ok(added)
    }

    /// Removes an entry and returns it as a detached tree.
    ///
    /// Fails with [`EditError::ImmutableField`] for structurally mandatory
    /// nodes, leaving the tree unchanged.
    pub fn remove_entry(&mut self, id: NodeId) -> Result<Tree, EditError> {
        let name = self.node(id)?.name.clone();
        if !self.can_remove(id) {
            return Err(EditError::ImmutableField { name });
        }
        let Some((parent, index)) = self.position(id) else {
            return Err(EditError::ImmutableField { name });
        };

        let detached = self.clone_entry(id)?;
        let range = self.range(id);
        self.splice_bytes(range, &[]);
        self.free_subtree(id);
        if let NodeData::Struct { children, .. } = &mut self.n_mut(parent).data {
            children.remove(index);
        }
        self.relayout(parent, index);
        debug!(parent = %self.n(parent).name, entry = %name, index, "removed entry");

        let parent_kind = self.struct_kind(parent)?;
        container::sync_counters(self, parent, parent_kind)?;
        Ok(detached)
    }

    /// Copies a structure and everything below it into a detached tree.
    ///
    /// The copy keeps names, values and offsets but has no parent. Detached
    /// trees are always rooted at a structure, so a primitive field fails
    /// with [`EditError::NotAStructure`]; copy its value through
    /// [`NodeRef::value`] or [`NodeRef::bytes`] instead.
    pub fn clone_entry(&self, id: NodeId) -> Result<Tree, EditError> {
        let node = self.node(id)?;
        if !matches!(node.data, NodeData::Struct { .. }) {
            return Err(EditError::NotAStructure {
                name: node.name.clone(),
            });
        }
        let mut nodes = Vec::new();
        let root = self.copy_into(id, None, &mut nodes);
        let range = self.range(id);
        Ok(Tree::from_parts(
            nodes,
            root,
            node.offset,
            self.buffer[range].to_vec(),
            self.config,
        ))
    }

    /// Replaces the contents of structure `id` with a detached tree, keeping
    /// the handle, name and position of `id`.
    ///
    /// Later siblings and ancestors are re-laid out when the size changes.
    /// A replacement of another kind must be one the parent container offers
    /// as a prototype; otherwise [`EditError::NotAddable`] is returned and
    /// the tree is left unchanged.
    pub fn replace_entry(&mut self, id: NodeId, replacement: Tree) -> Result<(), EditError> {
        let kind = self.struct_kind(id)?;
        let new_kind = replacement.kind();
        if new_kind != kind {
            if let Some(parent) = self.n(id).parent {
                let parent_kind = self.struct_kind(parent)?;
                let allowed = container::prototypes(self, parent, parent_kind);
                if !allowed.iter().any(|p| p.kind == new_kind) {
                    return Err(EditError::NotAddable {
                        kind: new_kind,
                        parent: parent_kind,
                    });
                }
            }
        }
        self.replace_contents(id, replacement);
        Ok(())
    }

    // =========================================================================
    // Layout engine
    // =========================================================================

    /// Recomputes offsets of `parent`'s children from index `from` onward,
    /// then repeats in each ancestor starting after the structure that
    /// changed.
    fn relayout(&mut self, parent: NodeId, from: usize) {
        let mut parent = parent;
        let mut from = from;
        loop {
            let children = self.n(parent).children().to_vec();
            let from_index = from.min(children.len());
            let mut cursor = self.n(parent).offset
                + children[..from_index]
                    .iter()
                    .map(|&c| self.size_of(c))
                    .sum::<usize>();
            for &child in &children[from_index..] {
                let current = self.n(child).offset;
                if current != cursor {
                    let delta = cursor as isize - current as isize;
                    trace!(node = %self.n(child).name, from = current, to = cursor, "relayout");
                    self.shift_subtree(child, delta);
                }
                cursor += self.size_of(child);
            }
            match self.position(parent) {
                Some((grand, index)) => {
                    parent = grand;
                    from = index + 1;
                }
                None => break,
            }
        }
    }

    fn shift_subtree(&mut self, id: NodeId, delta: isize) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let node = self.n_mut(current);
            node.offset = (node.offset as isize + delta) as usize;
            stack.extend_from_slice(node.children());
        }
    }

    /// Inserts a detached tree as child `index` of `parent`.
    fn graft(&mut self, parent: NodeId, index: usize, entry: Tree) -> NodeId {
        let at = self.insert_offset(parent, index);
        let Tree {
            nodes,
            root,
            base,
            buffer,
            ..
        } = entry;
        let rel = at - self.base;
        self.splice_bytes(rel..rel, &buffer);
        let id = self.import(nodes, root, base, at, None, Some(parent));
        if let NodeData::Struct { children, .. } = &mut self.n_mut(parent).data {
            children.insert(index, id);
        }
        self.relayout(parent, index + 1);
        id
    }

    pub(crate) fn replace_contents(&mut self, id: NodeId, replacement: Tree) {
        let old_range = self.range(id);
        let old_size = old_range.len();
        let at = self.n(id).offset;
        let name = self.n(id).name.clone();
        let parent = self.n(id).parent;
        let Tree {
            nodes,
            root,
            base,
            buffer,
            ..
        } = replacement;
        let new_size = buffer.len();

        self.splice_bytes(old_range, &buffer);
        for child in self.n(id).children().to_vec() {
            self.free_subtree(child);
        }
        self.import(nodes, root, base, at, Some(id), parent);
        self.n_mut(id).name = name;

        if new_size != old_size {
            if let Some((parent, index)) = self.position(id) {
                self.relayout(parent, index + 1);
            }
        }
    }

    /// Moves nodes of another arena into this one, shifting offsets from
    /// `from_base` to `at`. The imported root takes the slot `reuse` when
    /// given.
    fn import(
        &mut self,
        nodes: Vec<Option<Node>>,
        root: NodeId,
        from_base: usize,
        at: usize,
        reuse: Option<NodeId>,
        parent: Option<NodeId>,
    ) -> NodeId {
        let delta = at as isize - from_base as isize;
        let mut map: Vec<Option<NodeId>> = vec![None; nodes.len()];
        for (i, node) in nodes.iter().enumerate() {
            if node.is_some() {
                map[i] = Some(match reuse {
                    Some(slot) if i == root.index() => slot,
                    _ => self.alloc(),
                });
            }
        }
        let remap = |id: NodeId| map.get(id.index()).copied().flatten();
        let mut new_root = root;
        for (i, node) in nodes.into_iter().enumerate() {
            let (Some(mut node), Some(new_id)) = (node, map[i]) else {
                continue;
            };
            node.offset = (node.offset as isize + delta) as usize;
            node.parent = if i == root.index() {
                parent
            } else {
                node.parent.and_then(remap)
            };
            if let NodeData::Struct { children, .. } = &mut node.data {
                *children = children.iter().filter_map(|&c| remap(c)).collect();
            }
            if i == root.index() {
                new_root = new_id;
            }
            self.nodes[new_id.index()] = Some(node);
        }
        new_root
    }

    fn copy_into(&self, id: NodeId, parent: Option<NodeId>, out: &mut Vec<Option<Node>>) -> NodeId {
        let node = self.n(id);
        let new_id = NodeId(out.len() as u32);
        out.push(None);
        let data = match &node.data {
            NodeData::Field(kind) => NodeData::Field(*kind),
            NodeData::Struct { kind, children } => NodeData::Struct {
                kind: *kind,
                children: children
                    .iter()
                    .map(|&c| self.copy_into(c, Some(new_id), out))
                    .collect(),
            },
        };
        out[new_id.index()] = Some(Node {
            name: node.name.clone(),
            offset: node.offset,
            parent,
            data,
        });
        new_id
    }

    fn free_subtree(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.get_mut(current.index()).and_then(Option::take) {
                stack.extend_from_slice(node.children());
            }
        }
    }

    fn alloc(&mut self) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(None);
        id
    }

    fn splice_bytes(&mut self, range: Range<usize>, bytes: &[u8]) {
        let tail = self.buffer.split_off(range.end);
        self.buffer.truncate(range.start);
        self.buffer.extend_from_slice(bytes);
        self.buffer.extend_from_slice(&tail);
    }

    // =========================================================================
    // Internal accessors
    // =========================================================================

    /// Returns true if `id` is an entry of a container, past its fixed schema.
    pub(crate) fn can_remove(&self, id: NodeId) -> bool {
        let Some(node) = self.get(id) else {
            return false;
        };
        let is_record = node.struct_kind().is_some_and(StructKind::is_record);
        match (is_record, self.position(id)) {
            (true, Some((parent, index))) => self
                .get(parent)
                .and_then(|p| p.struct_kind())
                .is_some_and(|kind| kind.accepts_entries() && index >= kind.fixed_len()),
            _ => false,
        }
    }

    pub(crate) fn size_of(&self, id: NodeId) -> usize {
        match &self.n(id).data {
            NodeData::Field(kind) => kind.size(),
            NodeData::Struct { children, .. } => children.iter().map(|&c| self.size_of(c)).sum(),
        }
    }

    pub(crate) fn bytes_of(&self, id: NodeId) -> &[u8] {
        &self.buffer[self.range(id)]
    }

    /// Buffer range of a node.
    fn range(&self, id: NodeId) -> Range<usize> {
        let start = self.n(id).offset - self.base;
        start..start + self.size_of(id)
    }

    /// Absolute offset where child `index` of `parent` starts.
    fn insert_offset(&self, parent: NodeId, index: usize) -> usize {
        let children = self.n(parent).children();
        match index.checked_sub(1).and_then(|i| children.get(i)) {
            Some(&prev) => self.n(prev).offset + self.size_of(prev),
            None => self.n(parent).offset,
        }
    }

    /// Parent and index within it.
    fn position(&self, id: NodeId) -> Option<(NodeId, usize)> {
        let parent = self.n(id).parent?;
        let index = self.n(parent).children().iter().position(|&c| c == id)?;
        Some((parent, index))
    }

    fn struct_kind(&self, id: NodeId) -> Result<StructKind, EditError> {
        let node = self.node(id)?;
        match node.data {
            NodeData::Struct { kind, .. } => Ok(kind),
            NodeData::Field(_) => Err(EditError::NotAStructure {
                name: node.name.clone(),
            }),
        }
    }

    fn node(&self, id: NodeId) -> Result<&Node, EditError> {
        self.nodes
            .get(id.index())
            .and_then(Option::as_ref)
            .ok_or(EditError::UnknownNode { index: id.index() })
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, EditError> {
        self.nodes
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .ok_or(EditError::UnknownNode { index: id.index() })
    }

    /// Live node behind a handle taken from this tree's own links.
    fn n(&self, id: NodeId) -> &Node {
        match self.nodes.get(id.index()) {
            Some(Some(node)) => node,
            _ => panic!("dangling internal node handle {}", id.index()),
        }
    }

    fn n_mut(&mut self, id: NodeId) -> &mut Node {
        match self.nodes.get_mut(id.index()) {
            Some(Some(node)) => node,
            _ => panic!("dangling internal node handle {}", id.index()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::limits::{EFFECT_V1_SIZE, VARIABLE_SIZE};

    fn config() -> GameConfig {
        GameConfig::classic()
    }

    fn assert_contiguous(tree: &Tree, id: NodeId) {
        let node = tree.get(id).unwrap();
        let mut cursor = node.offset();
        let mut total = 0;
        for child in node.children() {
            assert_eq!(child.offset(), cursor, "offset of {}", child.path());
            assert_eq!(child.parent(), Some(id));
            if child.is_struct() {
                assert_contiguous(tree, child.id());
            }
            cursor += child.size();
            total += child.size();
        }
        if node.is_struct() {
            assert_eq!(node.size(), total);
        }
    }

    fn effect_table(count: usize) -> Tree {
        let mut tree = Tree::new(StructKind::EffectTable, &config()).unwrap();
        let root = tree.root();
        for _ in 0..count {
            let proto = tree.prototypes(root).unwrap()[0];
            let entry = proto.instantiate(&config()).unwrap();
            tree.add_entry(root, entry).unwrap().unwrap();
        }
        tree
    }

    #[test]
    fn test_add_relayouts_and_counts() {
        let tree = effect_table(3);
        let root = tree.root_ref();
        assert_eq!(root.len(), 5);
        assert_eq!(tree.size(), 8 + 3 * EFFECT_V1_SIZE);
        assert_eq!(tree.to_bytes().len(), tree.size());
        assert_eq!(root.child("Count").unwrap().int(), Some(3));
        assert_eq!(root.child_at(4).unwrap().offset(), 8 + 2 * EFFECT_V1_SIZE);
        assert_contiguous(&tree, tree.root());
    }

    #[test]
    fn test_insert_in_middle_shifts_later_siblings() {
        let mut tree = effect_table(2);
        let root = tree.root();
        let last = tree.lookup("Effect 1").unwrap();
        let duration = tree.find(last, "Duration").unwrap();
        tree.set_value(duration, FieldValue::Int(60)).unwrap();

        let proto = tree.prototypes(root).unwrap()[0];
        let added = tree
            .add_entries(root, 2, vec![proto.instantiate(&config()).unwrap()])
            .unwrap();
        assert_eq!(added.len(), 1);
        assert_eq!(tree.get(added[0]).unwrap().offset(), 8);

        // The old second entry moved by one record, and its bytes moved with it
        let moved = tree.get(last).unwrap();
        assert_eq!(moved.offset(), 8 + 2 * EFFECT_V1_SIZE);
        assert_eq!(tree.get(duration).unwrap().int(), Some(60));
        assert_contiguous(&tree, root);
    }

    #[test]
    fn test_remove_entry() {
        let mut tree = effect_table(3);
        let first = tree.lookup("Effect 0").unwrap();
        let detached = tree.remove_entry(first).unwrap();
        assert_eq!(detached.size(), EFFECT_V1_SIZE);
        assert!(detached.root_ref().parent().is_none());

        assert_eq!(tree.root_ref().len(), 4);
        assert_eq!(tree.root_ref().child("Count").unwrap().int(), Some(2));
        assert_eq!(tree.size(), 8 + 2 * EFFECT_V1_SIZE);
        assert!(tree.get(first).is_none());
        assert_contiguous(&tree, tree.root());
    }

    #[test]
    fn test_remove_mandatory_field_fails() {
        let mut tree = effect_table(1);
        let count = tree.lookup("Count").unwrap();
        let before = tree.to_bytes();
        let err = tree.remove_entry(count).unwrap_err();
        assert!(matches!(err, EditError::ImmutableField { .. }));
        assert_eq!(tree.to_bytes(), before);

        let opcode = tree.lookup("Effect 0.Type").unwrap();
        assert!(tree.remove_entry(opcode).is_err());
        assert_eq!(tree.root_ref().len(), 3);
    }

    #[test]
    fn test_insert_before_fixed_schema_rejected() {
        let mut tree = effect_table(0);
        let root = tree.root();
        let entry = Tree::new(StructKind::EffectV1, &config()).unwrap();
        let err = tree.add_entries(root, 1, vec![entry]).unwrap_err();
        assert!(matches!(err, EditError::InvalidIndex { index: 1, .. }));
    }

    #[test]
    fn test_wrong_kind_rejected_without_changes() {
        let mut tree = effect_table(1);
        let root = tree.root();
        let good = Tree::new(StructKind::EffectV1, &config()).unwrap();
        let bad = Tree::new(StructKind::Variable, &config()).unwrap();
        let err = tree.add_entries(root, 3, vec![good, bad]).unwrap_err();
        assert!(matches!(
            err,
            EditError::NotAddable {
                kind: StructKind::Variable,
                ..
            }
        ));
        assert_eq!(tree.root_ref().len(), 3);
    }

    #[test]
    fn test_clone_entry_is_detached() {
        let tree = effect_table(2);
        let second = tree.lookup("Effect 1").unwrap();
        let copy = tree.clone_entry(second).unwrap();
        assert_eq!(copy.offset(), 8 + EFFECT_V1_SIZE);
        assert_eq!(copy.root_ref().name(), "Effect 1");
        assert!(copy.root_ref().parent().is_none());
        assert_eq!(copy.to_bytes(), tree.get(second).unwrap().bytes());
    }

    #[test]
    fn test_clone_primitive_field_rejected() {
        let tree = effect_table(1);
        let duration = tree.lookup("Effect 0.Duration").unwrap();
        let err = tree.clone_entry(duration).unwrap_err();
        assert!(matches!(err, EditError::NotAStructure { .. }));
        assert_eq!(tree.get(duration).unwrap().value(), Some(FieldValue::Int(0)));
    }

    #[test]
    fn test_replace_with_other_kind_rejected() {
        let mut tree = effect_table(2);
        let first = tree.lookup("Effect 0").unwrap();
        let before = tree.to_bytes();
        let extended = Tree::new(StructKind::EffectV2, &config()).unwrap();
        let err = tree.replace_entry(first, extended).unwrap_err();
        assert!(matches!(
            err,
            EditError::NotAddable {
                kind: StructKind::EffectV2,
                parent: StructKind::EffectTable,
            }
        ));
        assert_eq!(tree.to_bytes(), before);

        let mut eff = Tree::new(StructKind::EffFile, &config()).unwrap();
        let body = eff.lookup("Effect").unwrap();
        let compact = Tree::new(StructKind::EffectV1, &config()).unwrap();
        assert!(eff.replace_entry(body, compact).is_err());
        assert_eq!(Some(eff.size()), StructKind::EffFile.fixed_size());
    }

    #[test]
    fn test_parent_type_write_reresolves_record() {
        let mut tree = Tree::new(StructKind::EffectV2, &config()).unwrap();
        let root = tree.root();
        let parent_type = tree.lookup("Parent resource type").unwrap();
        tree.set_value(parent_type, FieldValue::Int(2)).unwrap();

        let live = tree.lookup("Parent resource").unwrap();
        assert_eq!(tree.get(live).unwrap().field_kind(), Some(FieldKind::ResRef(&["ITM"])));
        let reread = Tree::decode(StructKind::EffectV2, &tree.to_bytes(), &config()).unwrap();
        assert_eq!(reread.dump(), tree.dump());
        let kinds = |t: &Tree| t.root_ref().children().map(|c| c.field_kind()).collect::<Vec<_>>();
        assert_eq!(kinds(&reread), kinds(&tree));
        assert_eq!(tree.root(), root);

        // Plain fields keep their handles
        let power = tree.lookup("Power").unwrap();
        tree.set_value(power, FieldValue::Int(3)).unwrap();
        assert_eq!(tree.get(power).unwrap().int(), Some(3));
    }

    #[test]
    fn test_set_offset_moves_detached_tree() {
        let mut tree = Tree::new(StructKind::Variable, &config()).unwrap();
        tree.set_offset(0x40);
        assert_eq!(tree.offset(), 0x40);
        let ty = tree.lookup("Type").unwrap();
        assert_eq!(tree.get(ty).unwrap().offset(), 0x40 + 32);
        assert_eq!(tree.size(), VARIABLE_SIZE);
    }

    #[test]
    fn test_set_value_errors() {
        let mut tree = Tree::new(StructKind::Variable, &config()).unwrap();
        let name = tree.lookup("Name").unwrap();
        let err = tree.set_value(name, FieldValue::Int(3)).unwrap_err();
        assert!(matches!(err, EditError::ValueMismatch { .. }));
        let err = tree
            .set_value(name, FieldValue::Text("X".repeat(33)))
            .unwrap_err();
        assert!(matches!(err, EditError::TextTooLong { len: 33, max: 32, .. }));
        let before = tree.to_bytes();
        let err = tree
            .set_value(name, FieldValue::Text("\u{65e5}".into()))
            .unwrap_err();
        assert_eq!(
            err,
            EditError::UnmappableText {
                name: "Name".into(),
                ch: '\u{65e5}'
            }
        );
        assert_eq!(tree.to_bytes(), before);
        let err = tree.set_value(tree.root(), FieldValue::Int(0)).unwrap_err();
        assert!(matches!(err, EditError::NotAField { .. }));
    }

    #[test]
    fn test_find_at() {
        let tree = effect_table(2);
        let id = tree.find_at(8 + EFFECT_V1_SIZE).unwrap();
        assert_eq!(tree.get(id).unwrap().path(), "Effect 1.Type");
        assert!(tree.find_at(10_000).is_none());
    }

    #[test]
    fn test_write_matches_buffer() {
        let tree = effect_table(2);
        let mut out = Vec::new();
        let written = tree.write(&mut out).unwrap();
        assert_eq!(written, tree.size());
        assert_eq!(out, tree.to_bytes());
    }

    #[test]
    fn test_write_propagates_sink_errors() {
        struct Broken;
        impl Write for Broken {
            fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
                Err(std::io::Error::other("sink closed"))
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }
        let tree = effect_table(1);
        let err = tree.write(Broken).unwrap_err();
        assert!(matches!(err, EncodeError::Io(_)));
    }

    #[test]
    fn test_dump_lists_fields() {
        let tree = effect_table(1);
        let dump = tree.dump();
        assert!(dump.starts_with("0x0000 Count"));
        assert!(dump.contains("Effect 0.Type"));
    }
}
