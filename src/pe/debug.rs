//! Debug directory and its payloads.
//!
//! Each `IMAGE_DEBUG_DIRECTORY` entry points (by file offset) at a payload whose layout depends
//! on the entry type. An embedded portable PDB is inflated into a fresh buffer and parsed as an
//! independent metadata tree, which is attached to the `EmbeddedPdb` node.

use strum::FromRepr;

use crate::{
    file::ByteBuffer,
    pe::resolve_rva,
    tree::{NewNode, NodeId, NodeKind, Tree},
    utils::decompress_deflate,
    Error::BadMagic,
    Result,
};

const ENTRY_SIZE: usize = 28;

/// `RSDS`
pub const CODEVIEW_MAGIC: u32 = 0x5344_5352;
/// `MPDB`
pub const EMBEDDED_PDB_MAGIC: u32 = 0x4244_504D;

/// Debug directory entry types with a dedicated decoder or a well-known meaning.
#[derive(Clone, Copy, PartialEq, Eq, Debug, FromRepr)]
#[repr(u32)]
pub enum DebugType {
    /// CodeView record pointing at an external PDB
    CodeView = 2,
    /// Deterministic build marker, no payload
    Reproducible = 16,
    /// Deflate-compressed portable PDB
    EmbeddedPortablePdb = 17,
    /// Hash of the associated PDB
    PdbChecksum = 19,
}

/// Parse hook of the debug directory: an array of 28-byte entries.
pub(crate) fn parse_debug_directory(tree: &mut Tree, id: NodeId) -> Result<()> {
    let count = tree.get(id).len() / ENTRY_SIZE;
    for _ in 0..count {
        tree.add(id, NewNode::new(NodeKind::DebugEntry, "Debug Entry"))?;
    }
    Ok(())
}

/// Parse hook of one `IMAGE_DEBUG_DIRECTORY`; inserts its payload.
pub(crate) fn parse_debug_entry(tree: &mut Tree, id: NodeId) -> Result<()> {
    tree.append(id, NodeKind::U32, "Characteristics")?;
    tree.append(id, NodeKind::U32, "TimeDateStamp")?;
    tree.append(id, NodeKind::U16, "MajorVersion")?;
    tree.append(id, NodeKind::U16, "MinorVersion")?;
    let kind = tree.field::<u32>(id, "Type")?;
    let size = tree.field::<u32>(id, "SizeOfData")? as usize;
    let rva = tree.field::<u32>(id, "AddressOfRawData")?;
    let pointer = tree.field::<u32>(id, "PointerToRawData")? as usize;

    if size == 0 {
        return Ok(());
    }
    let offset = if pointer != 0 {
        pointer
    } else if let Some(offset) = resolve_rva(tree, id, rva) {
        offset
    } else {
        log::warn!("debug data of type {kind} has no file data");
        return Ok(());
    };
    if tree.buffer().ensure(offset, size).is_err() {
        log::warn!("debug data at {offset:#x} is truncated by end of file");
        return Ok(());
    }

    let (node_kind, label) = match DebugType::from_repr(kind) {
        Some(DebugType::CodeView) => (NodeKind::CodeView, "CodeView"),
        Some(DebugType::EmbeddedPortablePdb) => (NodeKind::EmbeddedPdb, "Embedded Portable PDB"),
        Some(DebugType::PdbChecksum) => (NodeKind::PdbChecksum, "PDB Checksum"),
        Some(DebugType::Reproducible) | None => (NodeKind::DebugData, "Debug Data"),
    };
    let root = tree.root_id();
    tree.insert_xref(root, NewNode::new(node_kind, label).at(offset).len(size))?;
    Ok(())
}

/// Parse hook of a CodeView record: `RSDS`, PDB GUID, age and PDB path.
pub(crate) fn parse_codeview(tree: &mut Tree, id: NodeId) -> Result<()> {
    let span = tree.get(id).span();
    let signature = tree.field::<u32>(id, "Signature")?;
    if signature != CODEVIEW_MAGIC || span.length < 24 {
        log::debug!("CodeView record at {:#x} is not RSDS", span.start);
        return Ok(());
    }
    tree.append(id, NodeKind::Guid, "Guid")?;
    tree.append(id, NodeKind::U32, "Age")?;
    if span.length > 24 {
        tree.append(id, NodeKind::ZString, "Path")?;
    }
    Ok(())
}

/// Parse hook of a PDB checksum record: zero-terminated algorithm name, then the checksum.
pub(crate) fn parse_pdb_checksum(tree: &mut Tree, id: NodeId) -> Result<()> {
    let span = tree.get(id).span();
    let algorithm = tree.append(id, NodeKind::ZString, "AlgorithmName")?;
    let used = tree.get(algorithm).end() - span.start;
    tree.append_bytes(id, "Checksum", span.length.saturating_sub(used))?;
    Ok(())
}

/// Parse hook of an embedded portable PDB: `MPDB`, decompressed size, deflate payload.
///
/// The payload is inflated and parsed as a standalone metadata tree, unless disabled in the
/// [`crate::ParseConfig`].
pub(crate) fn parse_embedded_pdb(tree: &mut Tree, id: NodeId) -> Result<()> {
    let span = tree.get(id).span();
    let signature = tree.field::<u32>(id, "Signature")?;
    if signature != EMBEDDED_PDB_MAGIC {
        return Err(BadMagic {
            offset: span.start,
            expected: EMBEDDED_PDB_MAGIC,
            found: signature,
        });
    }
    let expected = tree.field::<u32>(id, "UncompressedSize")? as usize;
    let Some(payload) = tree.append_bytes(id, "Compressed Data", span.length.saturating_sub(8))?
    else {
        return Ok(());
    };

    if !tree.config().decode_embedded_pdb {
        return Ok(());
    }

    let compressed = tree.get(payload);
    let inflated = decompress_deflate(
        compressed.bytes(),
        expected,
        tree.config().max_embedded_pdb_size,
        compressed.start(),
    )?;
    log::debug!(
        "embedded PDB at {:#x}: {} bytes inflated to {}",
        span.start,
        compressed.len(),
        inflated.len()
    );

    let mut pdb = Tree::with_root(
        ByteBuffer::from_mem(inflated),
        NodeKind::MetadataRoot,
        "Metadata Root",
        tree.config().clone(),
    );
    pdb.parse_root()?;
    tree.attach_embedded(id, pdb);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_types() {
        assert_eq!(DebugType::from_repr(2), Some(DebugType::CodeView));
        assert_eq!(DebugType::from_repr(16), Some(DebugType::Reproducible));
        assert_eq!(DebugType::from_repr(17), Some(DebugType::EmbeddedPortablePdb));
        assert_eq!(DebugType::from_repr(19), Some(DebugType::PdbChecksum));
        assert_eq!(DebugType::from_repr(4), None);
        assert_eq!(&CODEVIEW_MAGIC.to_le_bytes(), b"RSDS");
        assert_eq!(&EMBEDDED_PDB_MAGIC.to_le_bytes(), b"MPDB");
    }
}
