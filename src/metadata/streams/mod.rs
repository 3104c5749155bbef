//! Metadata streams.
//!
//! The metadata root lists its streams in a directory of stream headers. Each stream is a
//! heap with its own entry format; the stream name decides which one:
//!
//! ## String Heaps
//! - **`#Strings`** - UTF-8 identifier strings, zero-terminated. The first entry is always empty.
//! - **`#US`** - UTF-16 user strings, each with a compressed length prefix and a terminal byte.
//!
//! ## Binary Data
//! - **`#Blob`** - Length-prefixed binary entries (signatures, custom attribute values, ...)
//! - **`#GUID`** - Sequence of 128-bit GUIDs, addressed by 1-based index
//!
//! ## Metadata Tables
//! - **`#~`** / **`#-`** - The table stream, see [`crate::metadata::tables::TableStream`]
//! - **`#Pdb`** - Portable PDB header with the row counts of the referenced type-system tables
//!
//! Streams with any other name are kept as opaque byte ranges.
//!
//! Besides the tree decoders this module offers lazy views ([`crate::metadata::streams::Strings`],
//! [`crate::metadata::streams::Blob`], [`crate::metadata::streams::Guid`],
//! [`crate::metadata::streams::UserStrings`]) that resolve heap indices from table columns.
//!
//! # References
//!
//! - ECMA-335 6th Edition, Partition II, Section 24.2.2 - Stream Headers
//! - Portable PDB v1.0 Format Specification - `#Pdb` stream

pub(crate) mod blob;
pub(crate) mod guid;
pub(crate) mod pdb;
pub(crate) mod streamheader;
pub(crate) mod strings;
pub(crate) mod tablesheader;
pub(crate) mod userstrings;

pub use blob::Blob;
pub use guid::Guid;
pub use pdb::PdbStream;
pub use streamheader::StreamHeader;
pub use strings::Strings;
pub use userstrings::UserStrings;

use crate::{
    tree::{NodeId, NodeKind, Payload, Tree},
    Result,
};

/// The kind of a metadata stream, selected by its name.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum HeapKind {
    /// `#Strings`
    Strings,
    /// `#US`
    UserStrings,
    /// `#GUID`
    Guid,
    /// `#Blob`
    Blob,
    /// `#~` or `#-`
    Tables,
    /// `#Pdb`
    Pdb,
    /// Any other name
    Unknown,
}

impl HeapKind {
    /// Maps a stream name to its kind.
    #[must_use]
    pub fn from_name(name: &str) -> HeapKind {
        match name {
            "#Strings" => HeapKind::Strings,
            "#US" => HeapKind::UserStrings,
            "#GUID" => HeapKind::Guid,
            "#Blob" => HeapKind::Blob,
            "#~" | "#-" => HeapKind::Tables,
            "#Pdb" => HeapKind::Pdb,
            _ => HeapKind::Unknown,
        }
    }

    /// Order in which streams are decoded: `#Pdb` feeds the index widths of the table stream
    /// and the table stream needs to know which heaps exist, so it comes last.
    pub(crate) fn decode_order(self) -> u8 {
        match self {
            HeapKind::Pdb => 0,
            HeapKind::Tables => 2,
            _ => 1,
        }
    }
}

/// One entry of the stream directory, with its offset made absolute.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct StreamInfo {
    /// Stream name as stored in the header
    pub name: String,
    /// Kind selected by the name
    pub kind: HeapKind,
    /// Absolute offset of the stream
    pub offset: usize,
    /// Size of the stream in bytes
    pub size: usize,
}

/// The stream directory of a metadata root, kept as payload on the `MetadataRoot` node.
#[derive(Clone, Debug, Default)]
pub struct MetadataLayout {
    /// Runtime version string of the metadata root
    pub version: String,
    /// All stream headers, in directory order
    pub streams: Vec<StreamInfo>,
    /// The decoded `#Pdb` stream of a portable PDB
    pub pdb: Option<PdbStream>,
    heaps: Vec<(HeapKind, NodeId)>,
}

impl MetadataLayout {
    pub(crate) fn new(version: String, streams: Vec<StreamInfo>) -> MetadataLayout {
        MetadataLayout {
            version,
            streams,
            pdb: None,
            heaps: Vec::new(),
        }
    }

    /// The node of the first stream of `kind`.
    #[must_use]
    pub fn heap(&self, kind: HeapKind) -> Option<NodeId> {
        self.heaps
            .iter()
            .find(|(heap, _)| *heap == kind)
            .map(|(_, id)| *id)
    }

    /// Returns `true` if the directory lists a stream of `kind`.
    #[must_use]
    pub fn has(&self, kind: HeapKind) -> bool {
        self.streams.iter().any(|stream| stream.kind == kind)
    }

    pub(crate) fn register(&mut self, kind: HeapKind, id: NodeId) {
        self.heaps.push((kind, id));
    }
}

/// The stream directory of the metadata root that contains `id`.
pub(crate) fn metadata_layout(tree: &Tree, id: NodeId) -> Option<&MetadataLayout> {
    let root = tree.find_ancestor(id, |kind| kind == NodeKind::MetadataRoot)?;
    match tree.payload(root) {
        Some(Payload::Metadata(layout)) => Some(layout),
        _ => None,
    }
}

pub(crate) fn metadata_layout_mut(tree: &mut Tree, id: NodeId) -> Option<&mut MetadataLayout> {
    let root = tree.find_ancestor(id, |kind| kind == NodeKind::MetadataRoot)?;
    match tree.payload_mut(root) {
        Some(Payload::Metadata(layout)) => Some(layout),
        _ => None,
    }
}

/// The raw bytes of the first heap of `kind` in the metadata root that contains `id`.
pub(crate) fn heap_bytes(tree: &Tree, id: NodeId, kind: HeapKind) -> Option<&[u8]> {
    let heap = metadata_layout(tree, id)?.heap(kind)?;
    Some(tree.get(heap).bytes())
}

/// Parse hook of a stream header.
pub(crate) fn parse_stream_header(tree: &mut Tree, id: NodeId) -> Result<()> {
    streamheader::parse_stream_header(tree, id)
}

/// Parse hook of a stream, dispatched on its kind.
pub(crate) fn parse_heap(tree: &mut Tree, id: NodeId, kind: HeapKind) -> Result<()> {
    match kind {
        HeapKind::Strings => strings::parse_strings_heap(tree, id),
        HeapKind::UserStrings => userstrings::parse_user_strings_heap(tree, id),
        HeapKind::Guid => guid::parse_guid_heap(tree, id),
        HeapKind::Blob => blob::parse_blob_heap(tree, id),
        HeapKind::Tables => tablesheader::parse_table_stream(tree, id),
        HeapKind::Pdb => pdb::parse_pdb_stream(tree, id),
        HeapKind::Unknown => Ok(()),
    }
}

/// Returns `true` if the heap bytes from `offset` to the end are all zero, which marks the
/// alignment padding at the end of a heap.
pub(crate) fn is_zero_tail(data: &[u8], offset: usize) -> bool {
    data.get(offset..).is_some_and(|tail| tail.iter().all(|b| *b == 0))
}
