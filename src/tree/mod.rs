//! The offset-addressable node tree and its insertion engine.
//!
//! A [`crate::Tree`] is an arena of nodes over one [`crate::ByteBuffer`]. Every node covers a
//! byte span, knows its parent, and keeps its children ordered by offset. Nodes are placed with
//! [`crate::Tree::add`] while the structure is decoded top-down, and with
//! [`crate::Tree::insert_xref`] when a field elsewhere in the file points at a structure that
//! lies somewhere below an existing node (method bodies, streams, resources, debug data).
//!
//! # Invariants
//!
//! - Siblings are sorted by start and never overlap.
//! - A node's length only grows, and a parent always encloses its children.
//! - After a full parse (with gap filling enabled) the leaves tile the root span exactly.
//!
//! # Key Components
//!
//! - [`crate::Tree`] - The arena, insertion, traversal and coverage check
//! - [`crate::tree::NodeKind`] - Closed set of node kinds and their parse hooks
//! - [`crate::tree::NodeRef`] - Borrowed view used to inspect nodes
//! - [`crate::tree::Span`] - Byte range value type

mod kind;
mod node;
mod span;

pub use kind::NodeKind;
pub use node::{Node, NodeId, NodeRef, Payload};
pub use span::Span;

use std::collections::BTreeMap;

use crate::{
    file::{io::CilIO, ByteBuffer},
    metadata::{
        streams::{HeapKind, MetadataLayout},
        tables::TableStream,
    },
    pe::ImageLayout,
    ParseConfig, Result,
};

/// Description of a node that is about to be placed.
///
/// Without an explicit start the node is appended after the last child of its parent.
#[derive(Clone, Debug)]
pub struct NewNode {
    kind: NodeKind,
    label: String,
    start: Option<usize>,
    length: usize,
}

impl NewNode {
    /// A node of `kind`, sized by the kind if the format fixes its size.
    pub fn new(kind: NodeKind, label: impl Into<String>) -> NewNode {
        NewNode {
            kind,
            label: label.into(),
            start: None,
            length: kind.fixed_size().unwrap_or(0),
        }
    }

    /// Places the node at an absolute offset.
    #[must_use]
    pub fn at(mut self, offset: usize) -> NewNode {
        self.start = Some(offset);
        self
    }

    /// Presets the length of the node.
    #[must_use]
    pub fn len(mut self, length: usize) -> NewNode {
        self.length = length;
        self
    }
}

/// One deviation from full coverage found by [`crate::Tree::check_coverage`].
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CoverageIssue {
    /// Bytes not covered by any leaf
    Gap(Span),
    /// Bytes covered by more than one leaf
    Overlap(Span),
}

/// A fully decoded image: an arena of nodes over one buffer.
pub struct Tree {
    buffer: ByteBuffer,
    nodes: Vec<Node>,
    embedded: BTreeMap<NodeId, Tree>,
    config: ParseConfig,
}

impl Tree {
    /// Creates a tree holding only a root node of `kind` that spans the whole buffer. The root
    /// is not parsed; see [`crate::Tree::parse_root`].
    pub(crate) fn with_root(
        buffer: ByteBuffer,
        kind: NodeKind,
        label: &str,
        config: ParseConfig,
    ) -> Tree {
        let span = Span::new(0, buffer.len());
        Tree {
            buffer,
            nodes: vec![Node::new(kind, label.to_string(), span, None)],
            embedded: BTreeMap::new(),
            config,
        }
    }

    /// Runs the parse hook of the root, then fills gaps if configured.
    pub(crate) fn parse_root(&mut self) -> Result<()> {
        kind::parse(self, self.root_id())?;
        if self.config.fill_gaps {
            self.fill_gaps();
        }
        Ok(())
    }

    /// The buffer all spans refer to.
    #[must_use]
    pub fn buffer(&self) -> &ByteBuffer {
        &self.buffer
    }

    /// The configuration the tree was parsed with.
    #[must_use]
    pub fn config(&self) -> &ParseConfig {
        &self.config
    }

    /// Number of nodes in the arena.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the arena holds no nodes (never the case for a parsed tree).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Id of the root node.
    #[must_use]
    pub fn root_id(&self) -> NodeId {
        NodeId(0)
    }

    /// The root node.
    #[must_use]
    pub fn root(&self) -> NodeRef<'_> {
        NodeRef::new(self, self.root_id())
    }

    /// A view of the node `id`.
    ///
    /// # Panics
    /// Panics if `id` does not belong to this tree.
    #[must_use]
    pub fn get(&self, id: NodeId) -> NodeRef<'_> {
        NodeRef::new(self, id)
    }

    pub(crate) fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    /// The tree parsed from the data of node `id` (an inflated embedded PDB), if any.
    #[must_use]
    pub fn embedded_tree(&self, id: NodeId) -> Option<&Tree> {
        self.embedded.get(&id)
    }

    /// All embedded trees with the node that owns them.
    pub fn embedded_trees(&self) -> impl Iterator<Item = (NodeRef<'_>, &Tree)> {
        self.embedded
            .iter()
            .map(|(id, tree)| (NodeRef::new(self, *id), tree))
    }

    pub(crate) fn attach_embedded(&mut self, id: NodeId, tree: Tree) {
        self.embedded.insert(id, tree);
    }

    pub(crate) fn set_len(&mut self, id: NodeId, length: usize) {
        self.nodes[id.0].span.length = length;
    }

    pub(crate) fn set_payload(&mut self, id: NodeId, payload: Payload) {
        self.nodes[id.0].payload = Some(payload);
    }

    pub(crate) fn payload(&self, id: NodeId) -> Option<&Payload> {
        self.nodes[id.0].payload.as_ref()
    }

    pub(crate) fn payload_mut(&mut self, id: NodeId) -> Option<&mut Payload> {
        self.nodes[id.0].payload.as_mut()
    }

    /// Places `new` below `parent` and runs its parse hook.
    ///
    /// An explicit start that falls inside an existing structural child descends into that
    /// child, recursively; otherwise the node becomes a child of `parent` in sorted position.
    /// After the hook the node encloses all of its children, and every ancestor is widened to
    /// enclose the node.
    ///
    /// # Errors
    /// Returns [`crate::Error::TruncatedBuffer`] if the node does not fit into the buffer,
    /// [`crate::Error::Malformed`] if it would overlap a sibling, or any error of its hook.
    pub fn add(&mut self, parent: NodeId, new: NewNode) -> Result<NodeId> {
        let (host, start) = match new.start {
            Some(start) => (
                self.descend(parent, start, None)
                    .map_err(|descent| self.descent_error(descent, start))?,
                start,
            ),
            None => (parent, self.next_offset(parent)),
        };

        self.buffer.ensure(start, new.length)?;
        let id = self.place(host, new.kind, new.label, Span::new(start, new.length));

        kind::parse(self, id)?;

        self.enclose_children(id);
        let span = self.nodes[id.0].span;
        self.buffer.ensure(span.start, span.length)?;
        self.check_siblings(id)?;
        self.widen_ancestors(id);
        Ok(id)
    }

    /// Appends a value node and returns it.
    ///
    /// # Errors
    /// See [`crate::Tree::add`].
    pub fn append(&mut self, parent: NodeId, kind: NodeKind, label: &str) -> Result<NodeId> {
        self.add(parent, NewNode::new(kind, label))
    }

    /// Appends an integer field and returns its decoded value.
    ///
    /// # Errors
    /// See [`crate::Tree::add`].
    pub fn field<T: CilIO>(&mut self, parent: NodeId, label: &str) -> Result<T> {
        let kind = match std::mem::size_of::<T>() {
            1 => NodeKind::U8,
            2 => NodeKind::U16,
            4 => NodeKind::U32,
            _ => NodeKind::U64,
        };
        let id = self.append(parent, kind, label)?;
        self.buffer.read_le::<T>(self.nodes[id.0].span.start)
    }

    /// Appends `length` opaque bytes, unless `length` is zero.
    ///
    /// # Errors
    /// See [`crate::Tree::add`].
    pub fn append_bytes(
        &mut self,
        parent: NodeId,
        label: &str,
        length: usize,
    ) -> Result<Option<NodeId>> {
        if length == 0 {
            return Ok(None);
        }
        self.add(parent, NewNode::new(NodeKind::Bytes, label).len(length))
            .map(Some)
    }

    /// Places a node discovered through a cross-reference somewhere below `ancestor`.
    ///
    /// The node's length must be known up front. Starting at `ancestor`, the insertion
    /// descends into whichever child contains the start until no child does. A node with the
    /// same span and kind that already exists is returned instead of a duplicate. If the node
    /// does not fit into the host found this way, or overlaps one of its future siblings, it is
    /// skipped with a warning and `Ok(None)` is returned.
    ///
    /// # Errors
    /// Returns [`crate::Error::TruncatedBuffer`] if the node exceeds the buffer, or any error of
    /// its parse hook.
    pub fn insert_xref(&mut self, ancestor: NodeId, new: NewNode) -> Result<Option<NodeId>> {
        let start = new.start.unwrap_or_else(|| self.next_offset(ancestor));
        let span = Span::new(start, new.length);
        self.buffer.ensure(span.start, span.length)?;

        if span.length == 0 {
            return Ok(None);
        }

        let host = match self.descend(ancestor, start, Some((new.kind, span))) {
            Ok(host) => host,
            Err(Descent::Duplicate(existing)) => {
                log::warn!(
                    "{} at {span} is referenced more than once",
                    self.nodes[existing.0].label
                );
                return Ok(Some(existing));
            }
            Err(Descent::Conflict(other)) => {
                log::warn!(
                    "skipping {} at {span} - overlaps {} at {}",
                    new.label,
                    self.nodes[other.0].label,
                    self.nodes[other.0].span
                );
                return Ok(None);
            }
        };

        let host_node = &self.nodes[host.0];
        if host.0 != 0 && !host_node.span.encloses(&span) {
            log::warn!(
                "skipping {} at {span} - extends past {} at {}",
                new.label,
                host_node.label,
                host_node.span
            );
            return Ok(None);
        }
        if let Some(sibling) = self.overlapping_sibling(host, span) {
            log::warn!(
                "skipping {} at {span} - overlaps {} at {}",
                new.label,
                self.nodes[sibling.0].label,
                self.nodes[sibling.0].span
            );
            return Ok(None);
        }

        log::trace!("inserting {} at {span}", new.label);
        let id = self.place(host, new.kind, new.label, span);
        kind::parse(self, id)?;
        self.enclose_children(id);
        self.check_siblings(id)?;
        self.widen_ancestors(id);
        Ok(Some(id))
    }

    /// Walks the parent links of `id` (starting at `id` itself) until a node of a matching kind
    /// is found.
    pub fn find_ancestor(
        &self,
        id: NodeId,
        predicate: impl Fn(NodeKind) -> bool,
    ) -> Option<NodeId> {
        let mut current = Some(id);
        while let Some(node) = current {
            if predicate(self.nodes[node.0].kind) {
                return Some(node);
            }
            current = self.nodes[node.0].parent;
        }
        None
    }

    /// The first child of `id` with the given label.
    #[must_use]
    pub fn find_child(&self, id: NodeId, label: &str) -> Option<NodeId> {
        self.nodes[id.0]
            .children
            .iter()
            .copied()
            .find(|child| self.nodes[child.0].label == label)
    }

    /// All nodes in pre-order, with their depth below the root.
    #[must_use]
    pub fn walk(&self) -> Vec<(usize, NodeRef<'_>)> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![(0_usize, self.root_id())];
        while let Some((depth, id)) = stack.pop() {
            out.push((depth, NodeRef::new(self, id)));
            for child in self.nodes[id.0].children.iter().rev() {
                stack.push((depth + 1, *child));
            }
        }
        out
    }

    /// All leaves in offset order.
    #[must_use]
    pub fn leaves(&self) -> Vec<NodeRef<'_>> {
        self.walk()
            .into_iter()
            .map(|(_, node)| node)
            .filter(NodeRef::is_leaf)
            .collect()
    }

    /// First node of the given kind in pre-order.
    #[must_use]
    pub fn find_kind(&self, kind: NodeKind) -> Option<NodeRef<'_>> {
        self.walk()
            .into_iter()
            .map(|(_, node)| node)
            .find(|node| node.kind() == kind)
    }

    /// Layout of the PE image this tree was parsed from; `None` for a metadata-only tree.
    #[must_use]
    pub fn image(&self) -> Option<&ImageLayout> {
        match self.payload(self.root_id()) {
            Some(Payload::Image(layout)) => Some(layout),
            _ => None,
        }
    }

    /// The stream directory of the (first) metadata root.
    #[must_use]
    pub fn metadata(&self) -> Option<&MetadataLayout> {
        let root = self.find_kind(NodeKind::MetadataRoot)?;
        match self.payload(root.id()) {
            Some(Payload::Metadata(layout)) => Some(layout),
            _ => None,
        }
    }

    /// The decoded table stream of the metadata root, if it has one.
    #[must_use]
    pub fn table_stream(&self) -> Option<&TableStream> {
        let layout = self.metadata()?;
        let id = layout.heap(HeapKind::Tables)?;
        match self.payload(id) {
            Some(Payload::Tables(stream)) => Some(stream),
            _ => None,
        }
    }

    /// Verifies that the leaves tile the root span: returns every gap and every overlap.
    #[must_use]
    pub fn check_coverage(&self) -> Vec<CoverageIssue> {
        let root = self.nodes[0].span;
        let mut issues = Vec::new();
        let mut cursor = root.start;

        for leaf in self.leaves() {
            let span = leaf.span();
            if span.length == 0 {
                continue;
            }
            if span.start > cursor {
                issues.push(CoverageIssue::Gap(Span::new(cursor, span.start - cursor)));
            } else if span.start < cursor {
                let end = cursor.min(span.end());
                issues.push(CoverageIssue::Overlap(Span::new(span.start, end - span.start)));
            }
            cursor = cursor.max(span.end());
        }

        if cursor < root.end() {
            issues.push(CoverageIssue::Gap(Span::new(cursor, root.end() - cursor)));
        }
        issues
    }

    fn next_offset(&self, parent: NodeId) -> usize {
        let node = &self.nodes[parent.0];
        node.children
            .last()
            .map_or(node.span.start, |last| self.nodes[last.0].span.end())
    }

    /// Finds the host for a node starting at `start` below `from`. With `xref` set, leaves that
    /// do not accept cross-referenced children and exact duplicates are reported instead of
    /// being treated as errors.
    fn descend(
        &self,
        from: NodeId,
        start: usize,
        xref: Option<(NodeKind, Span)>,
    ) -> std::result::Result<NodeId, Descent> {
        let mut host = from;
        loop {
            let Some(child) = self.covering_child(host, start) else {
                return Ok(host);
            };
            let node = &self.nodes[child.0];

            if let Some((kind, span)) = xref {
                if node.kind == kind && node.span == span {
                    return Err(Descent::Duplicate(child));
                }
                if !node.kind.accepts_xref() {
                    return Err(Descent::Conflict(child));
                }
            } else if node.kind.is_value() {
                return Err(Descent::Conflict(child));
            }
            host = child;
        }
    }

    fn descent_error(&self, descent: Descent, start: usize) -> crate::Error {
        let (Descent::Duplicate(id) | Descent::Conflict(id)) = descent;
        let node = &self.nodes[id.0];
        malformed_error!(
            "offset {:#x} lies inside {} at {}",
            start,
            node.label,
            node.span
        )
    }

    fn covering_child(&self, host: NodeId, start: usize) -> Option<NodeId> {
        let children = &self.nodes[host.0].children;
        let index = children.partition_point(|c| self.nodes[c.0].span.start <= start);
        let candidate = *children.get(index.checked_sub(1)?)?;
        self.nodes[candidate.0]
            .span
            .contains(start)
            .then_some(candidate)
    }

    fn overlapping_sibling(&self, host: NodeId, span: Span) -> Option<NodeId> {
        let children = &self.nodes[host.0].children;
        let index = children.partition_point(|c| self.nodes[c.0].span.start < span.start);
        let before = index.checked_sub(1).map(|i| children[i]);
        let after = children.get(index).copied();
        [before, after]
            .into_iter()
            .flatten()
            .find(|sibling| self.nodes[sibling.0].span.overlaps(&span))
    }

    fn place(&mut self, host: NodeId, kind: NodeKind, label: String, span: Span) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::new(kind, label, span, Some(host)));

        let nodes = &self.nodes;
        let children = &nodes[host.0].children;
        let index = children.partition_point(|c| nodes[c.0].span.start <= span.start);
        self.nodes[host.0].children.insert(index, id);
        id
    }

    fn enclose_children(&mut self, id: NodeId) {
        let end = self.nodes[id.0]
            .children
            .last()
            .map(|last| self.nodes[last.0].span.end());
        if let Some(end) = end {
            let node = &mut self.nodes[id.0];
            node.span.length = node.span.length.max(end - node.span.start);
        }
    }

    fn check_siblings(&self, id: NodeId) -> Result<()> {
        let node = &self.nodes[id.0];
        let Some(parent) = node.parent else {
            return Ok(());
        };
        let siblings = &self.nodes[parent.0].children;
        let Some(index) = siblings.iter().position(|s| *s == id) else {
            return Ok(());
        };

        let neighbours = [
            index.checked_sub(1).map(|i| siblings[i]),
            siblings.get(index + 1).copied(),
        ];
        for sibling in neighbours.into_iter().flatten() {
            let other = &self.nodes[sibling.0];
            if other.span.overlaps(&node.span) {
                return Err(malformed_error!(
                    "{} at {} overlaps {} at {}",
                    node.label,
                    node.span,
                    other.label,
                    other.span
                ));
            }
        }
        Ok(())
    }

    fn widen_ancestors(&mut self, id: NodeId) {
        let mut child = id;
        while let Some(parent) = self.nodes[child.0].parent {
            let end = self.nodes[child.0].span.end();
            let node = &mut self.nodes[parent.0];
            if node.span.end() >= end {
                break;
            }
            node.span.length = end - node.span.start;
            child = parent;
        }
    }

    /// Inserts padding leaves so that the children of every node tile its span.
    fn fill_gaps(&mut self) {
        let order: Vec<NodeId> = self.walk().into_iter().map(|(_, n)| n.id()).collect();

        for id in order.into_iter().rev() {
            if self.nodes[id.0].children.is_empty() {
                continue;
            }

            let span = self.nodes[id.0].span;
            let mut gaps = Vec::new();
            let mut cursor = span.start;
            for child in &self.nodes[id.0].children {
                let child_span = self.nodes[child.0].span;
                if child_span.start > cursor {
                    gaps.push(Span::new(cursor, child_span.start - cursor));
                }
                cursor = cursor.max(child_span.end());
            }
            if cursor < span.end() {
                gaps.push(Span::new(cursor, span.end() - cursor));
            }

            for gap in gaps {
                let bytes = self.buffer.slice(gap.start, gap.length).unwrap_or_default();
                let label = if bytes.iter().all(|b| *b == 0) {
                    "Padding"
                } else {
                    "Unparsed"
                };
                self.place(id, NodeKind::Padding, label.to_string(), gap);
            }
        }
    }
}

enum Descent {
    Duplicate(NodeId),
    Conflict(NodeId),
}

impl std::fmt::Debug for Tree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tree")
            .field("buffer", &self.buffer)
            .field("nodes", &self.nodes.len())
            .field("embedded", &self.embedded.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error::TruncatedBuffer;

    fn tree(data: Vec<u8>) -> Tree {
        Tree::with_root(
            ByteBuffer::from_mem(data),
            NodeKind::Bytes,
            "Root",
            ParseConfig::default(),
        )
    }

    #[test]
    fn append_next() {
        let mut tree = tree(vec![0x4D, 0x5A, 0x01, 0x00, 0x00, 0x00, 0xFF, 0xFF]);
        let root = tree.root_id();

        assert_eq!(tree.field::<u16>(root, "Magic").unwrap(), 0x5A4D);
        assert_eq!(tree.field::<u32>(root, "Value").unwrap(), 1);
        let rest = tree.append(root, NodeKind::U16, "Rest").unwrap();

        assert_eq!(tree.get(rest).span(), Span::new(6, 2));
        let labels: Vec<_> = tree.root().children().map(|c| c.label()).collect();
        assert_eq!(labels, vec!["Magic", "Value", "Rest"]);
    }

    #[test]
    fn add_out_of_order_and_descend() {
        let mut tree = tree(vec![0; 64]);
        let root = tree.root_id();

        let late = tree
            .add(root, NewNode::new(NodeKind::Bytes, "Late").at(32).len(16))
            .unwrap();
        let early = tree
            .add(root, NewNode::new(NodeKind::Bytes, "Early").at(0).len(8))
            .unwrap();
        let inner = tree
            .add(root, NewNode::new(NodeKind::U32, "Inner").at(36))
            .unwrap();

        let children: Vec<_> = tree.root().children().map(|c| c.id()).collect();
        assert_eq!(children, vec![early, late]);
        assert_eq!(tree.get(inner).parent().unwrap().id(), late);
    }

    #[test]
    fn overlap_is_malformed() {
        let mut tree = tree(vec![0; 16]);
        let root = tree.root_id();

        tree.add(root, NewNode::new(NodeKind::U32, "A").at(4)).unwrap();
        let result = tree.add(root, NewNode::new(NodeKind::U32, "B").at(2));
        assert!(matches!(result, Err(crate::Error::Malformed { .. })));

        let result = tree.add(root, NewNode::new(NodeKind::U16, "C").at(5));
        assert!(matches!(result, Err(crate::Error::Malformed { .. })));
    }

    #[test]
    fn truncated_node() {
        let mut tree = tree(vec![0; 6]);
        let root = tree.root_id();

        tree.field::<u32>(root, "A").unwrap();
        let result = tree.field::<u32>(root, "B");
        assert!(matches!(
            result,
            Err(TruncatedBuffer {
                offset: 4,
                length: 4,
                available: 6
            })
        ));
    }

    #[test]
    fn xref_dedupe_and_conflict() {
        let mut tree = tree(vec![0; 64]);
        let root = tree.root_id();
        let section = tree
            .add(root, NewNode::new(NodeKind::Section, "Section").at(16).len(32))
            .unwrap();

        let body = NewNode::new(NodeKind::Bytes, "Body").at(20).len(4);
        let first = tree.insert_xref(root, body.clone()).unwrap().unwrap();
        let second = tree.insert_xref(root, body).unwrap().unwrap();
        assert_eq!(first, second);
        assert_eq!(tree.get(first).parent().unwrap().id(), section);

        let clash = NewNode::new(NodeKind::Bytes, "Clash").at(14).len(8);
        assert!(tree.insert_xref(root, clash).unwrap().is_none());

        let outside = NewNode::new(NodeKind::Bytes, "Outside").at(44).len(8);
        assert!(tree.insert_xref(root, outside).unwrap().is_none());

        let past_end = NewNode::new(NodeKind::Bytes, "PastEnd").at(60).len(8);
        assert!(tree.insert_xref(root, past_end).is_err());
    }

    #[test]
    fn xref_into_opaque_bytes() {
        let mut tree = tree(vec![0; 32]);
        let root = tree.root_id();
        let blob = tree
            .add(root, NewNode::new(NodeKind::Bytes, "Payload").at(8).len(8))
            .unwrap();

        let detail = NewNode::new(NodeKind::U32, "Detail").at(8);
        let id = tree.insert_xref(root, detail).unwrap().unwrap();
        assert_eq!(tree.get(id).parent().unwrap().id(), blob);

        let nested = NewNode::new(NodeKind::U16, "Nested").at(9);
        assert!(tree.insert_xref(root, nested).unwrap().is_none());
    }

    #[test]
    fn ancestors_widen() {
        let mut tree = tree(vec![0; 32]);
        let root = tree.root_id();
        let outer = tree
            .add(root, NewNode::new(NodeKind::Bytes, "Outer").at(0).len(4))
            .unwrap();
        tree.add(outer, NewNode::new(NodeKind::U64, "Wide").at(0))
            .unwrap();

        assert_eq!(tree.get(outer).len(), 8);
    }

    #[test]
    fn gaps_and_coverage() {
        let mut data = vec![0; 16];
        data[12] = 0xAA;
        let mut tree = tree(data);
        let root = tree.root_id();

        tree.add(root, NewNode::new(NodeKind::U32, "A").at(4)).unwrap();
        assert_eq!(
            tree.check_coverage(),
            vec![
                CoverageIssue::Gap(Span::new(0, 4)),
                CoverageIssue::Gap(Span::new(8, 8))
            ]
        );

        tree.fill_gaps();
        assert!(tree.check_coverage().is_empty());
        let labels: Vec<_> = tree.root().children().map(|c| c.label()).collect();
        assert_eq!(labels, vec!["Padding", "A", "Unparsed"]);
    }

    #[test]
    fn find_ancestor_and_child() {
        let mut tree = tree(vec![0; 16]);
        let root = tree.root_id();
        let section = tree
            .add(root, NewNode::new(NodeKind::Section, "Section").at(0).len(16))
            .unwrap();
        let value = tree
            .add(section, NewNode::new(NodeKind::U32, "Value").at(4))
            .unwrap();

        assert_eq!(
            tree.find_ancestor(value, |k| k == NodeKind::Section),
            Some(section)
        );
        assert_eq!(tree.find_ancestor(value, |k| k == NodeKind::PeFile), None);
        assert_eq!(tree.find_child(section, "Value"), Some(value));
        assert_eq!(tree.root().path(&["Section", "Value"]).unwrap().id(), value);
    }
}
