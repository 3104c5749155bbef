//! Arena nodes and the borrowed [`crate::tree::NodeRef`] view used to inspect them.

use std::fmt::Write as _;

use uguid::Guid;
use widestring::U16Str;

use crate::{
    file::io::read_le,
    metadata::{streams::MetadataLayout, tables::TableStream},
    pe::ImageLayout,
    tree::{NodeKind, Span, Tree},
};

/// Stable index of a node inside its [`crate::Tree`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// The position of the node in the arena.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Decoded state that some container nodes keep for the decoders of their descendants.
#[derive(Debug)]
pub enum Payload {
    /// Section layout of a PE image, on the `PeFile` node
    Image(ImageLayout),
    /// Stream directory of a metadata root, on the `MetadataRoot` node
    Metadata(MetadataLayout),
    /// Decoded table stream, on the `#~` / `#-` heap node
    Tables(Box<TableStream>),
}

/// One node of the arena.
#[derive(Debug)]
pub struct Node {
    pub(crate) kind: NodeKind,
    pub(crate) label: String,
    pub(crate) span: Span,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) payload: Option<Payload>,
}

impl Node {
    pub(crate) fn new(kind: NodeKind, label: String, span: Span, parent: Option<NodeId>) -> Node {
        Node {
            kind,
            label,
            span,
            parent,
            children: Vec::new(),
            payload: None,
        }
    }
}

/// A borrowed view of one node together with the tree it belongs to.
///
/// ```rust,no_run
/// let tree = dotlayout::parse(dotlayout::ByteBuffer::from_file("app.dll")?)?;
/// for node in tree.root().children() {
///     println!("{} {}", node.span(), node.label());
/// }
/// # Ok::<(), dotlayout::Error>(())
/// ```
#[derive(Clone, Copy)]
pub struct NodeRef<'a> {
    tree: &'a Tree,
    id: NodeId,
}

impl<'a> NodeRef<'a> {
    pub(crate) fn new(tree: &'a Tree, id: NodeId) -> NodeRef<'a> {
        NodeRef { tree, id }
    }

    fn node(&self) -> &'a Node {
        self.tree.node(self.id)
    }

    /// The id of this node in its tree.
    #[must_use]
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The tree this node belongs to.
    #[must_use]
    pub fn tree(&self) -> &'a Tree {
        self.tree
    }

    /// The human readable label, e.g. `"NumberOfSections"` or `"Row 3"`.
    #[must_use]
    pub fn label(&self) -> &'a str {
        &self.node().label
    }

    /// The node kind.
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        self.node().kind
    }

    /// The byte range covered by this node.
    #[must_use]
    pub fn span(&self) -> Span {
        self.node().span
    }

    /// Absolute offset of the first byte.
    #[must_use]
    pub fn start(&self) -> usize {
        self.node().span.start
    }

    /// Offset one past the last byte.
    #[must_use]
    pub fn end(&self) -> usize {
        self.node().span.end()
    }

    /// Number of bytes covered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.node().span.length
    }

    /// Returns `true` for a node covering no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.node().span.length == 0
    }

    /// Returns `true` if the node has no children.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.node().children.is_empty()
    }

    /// The parent node, `None` for the root.
    #[must_use]
    pub fn parent(&self) -> Option<NodeRef<'a>> {
        self.node().parent.map(|id| NodeRef::new(self.tree, id))
    }

    /// The children, ordered by offset.
    pub fn children(&self) -> impl ExactSizeIterator<Item = NodeRef<'a>> + 'a {
        let tree = self.tree;
        self.node()
            .children
            .iter()
            .map(move |id| NodeRef::new(tree, *id))
    }

    /// The first child with the given label.
    #[must_use]
    pub fn child(&self, label: &str) -> Option<NodeRef<'a>> {
        self.children().find(|child| child.label() == label)
    }

    /// Follows a path of child labels, e.g. `["OptionalHeader", "Windows Fields", "Subsystem"]`.
    #[must_use]
    pub fn path(&self, labels: &[&str]) -> Option<NodeRef<'a>> {
        labels
            .iter()
            .try_fold(*self, |node, label| node.child(label))
    }

    /// The bytes covered by this node.
    #[must_use]
    pub fn bytes(&self) -> &'a [u8] {
        let span = self.span();
        self.tree
            .buffer()
            .data()
            .get(span.start..span.end())
            .unwrap_or_default()
    }

    /// The root of the independently parsed tree attached to this node (an inflated embedded
    /// portable PDB), if any.
    #[must_use]
    pub fn embedded(&self) -> Option<NodeRef<'a>> {
        self.tree.embedded_tree(self.id).map(Tree::root)
    }

    /// The integer value of a fixed-width or compressed integer node.
    #[must_use]
    pub fn as_u64(&self) -> Option<u64> {
        let bytes = self.bytes();
        match self.kind() {
            NodeKind::U8 => read_le::<u8>(bytes).ok().map(u64::from),
            NodeKind::U16 => read_le::<u16>(bytes).ok().map(u64::from),
            NodeKind::U32 => read_le::<u32>(bytes).ok().map(u64::from),
            NodeKind::U64 => read_le::<u64>(bytes).ok(),
            NodeKind::CompressedInt => crate::file::parser::read_compressed_uint(bytes)
                .ok()
                .map(|(value, _)| u64::from(value)),
            _ => None,
        }
    }

    /// The decoded value of a primitive node, rendered for display: integers in hex, strings
    /// quoted, GUIDs in registry format. `None` for containers and opaque bytes.
    #[must_use]
    pub fn value(&self) -> Option<String> {
        let bytes = self.bytes();
        match self.kind() {
            NodeKind::U8 => self.as_u64().map(|v| format!("{v:#04x}")),
            NodeKind::U16 => self.as_u64().map(|v| format!("{v:#06x}")),
            NodeKind::U32 => self.as_u64().map(|v| format!("{v:#010x}")),
            NodeKind::U64 => self.as_u64().map(|v| format!("{v:#018x}")),
            NodeKind::CompressedInt => self.as_u64().map(|v| v.to_string()),
            NodeKind::ZString | NodeKind::AlignedZString | NodeKind::Utf8 => {
                let text = bytes.split(|b| *b == 0).next().unwrap_or_default();
                Some(format!("{:?}", String::from_utf8_lossy(text)))
            }
            NodeKind::PrefixedString => {
                let chars = utf16_units(bytes.get(2..).unwrap_or_default());
                Some(format!("{:?}", U16Str::from_slice(&chars).to_string_lossy()))
            }
            NodeKind::Utf16 => {
                let chars = utf16_units(bytes);
                Some(format!("{:?}", U16Str::from_slice(&chars).to_string_lossy()))
            }
            NodeKind::Guid => {
                let raw: [u8; 16] = bytes.try_into().ok()?;
                Some(Guid::from_bytes(raw).to_string())
            }
            _ => None,
        }
    }

    /// A short hex rendering of the first bytes, for opaque nodes.
    #[must_use]
    pub fn hex_preview(&self, max: usize) -> String {
        let bytes = self.bytes();
        let mut out = String::with_capacity(max * 3);
        for (i, byte) in bytes.iter().take(max).enumerate() {
            if i > 0 {
                out.push(' ');
            }
            let _ = write!(out, "{byte:02x}");
        }
        if bytes.len() > max {
            out.push_str(" ..");
        }
        out
    }
}

impl std::fmt::Debug for NodeRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeRef")
            .field("label", &self.label())
            .field("kind", &self.kind())
            .field("span", &self.span())
            .finish()
    }
}

fn utf16_units(bytes: &[u8]) -> Vec<u16> {
    bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}
