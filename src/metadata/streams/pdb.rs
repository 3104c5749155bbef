//! The `#Pdb` stream of a portable PDB.
//!
//! Besides the PDB id and the entry point, the stream lists the row counts of the type-system
//! tables that live in the associated image. Indices from PDB tables into those tables are
//! sized by these counts, so the stream is decoded before the table stream.
//!
//! # Reference
//! - Portable PDB v1.0 Format Specification - `#Pdb` stream

use crate::{
    file::ByteBuffer,
    metadata::{streams::metadata_layout_mut, tables::RowCounts},
    tree::{NewNode, NodeId, NodeKind, Tree},
    Result,
};

/// Decoded `#Pdb` stream.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct PdbStream {
    /// PDB id: GUID and timestamp matching the CodeView record of the image
    pub id: [u8; 20],
    /// `MethodDef` token of the entry point, or 0
    pub entry_point: u32,
    /// Row counts of the referenced type-system tables
    pub referenced: RowCounts,
}

impl PdbStream {
    /// Reads the stream at `offset`.
    ///
    /// # Errors
    /// Returns [`crate::Error::TruncatedBuffer`] if the stream exceeds the buffer and
    /// [`crate::Error::UnsupportedTableKind`] if an unknown table is referenced.
    pub fn read(buffer: &ByteBuffer, offset: usize) -> Result<PdbStream> {
        let mut id = [0u8; 20];
        id.copy_from_slice(buffer.slice(offset, 20)?);
        let entry_point = buffer.read_le::<u32>(offset + 20)?;
        let tables = buffer.read_le::<u64>(offset + 24)?;
        let referenced = RowCounts::read(buffer, offset + 32, tables, offset)?;

        Ok(PdbStream {
            id,
            entry_point,
            referenced,
        })
    }
}

/// Parse hook of the `#Pdb` stream; records the decoded stream in the metadata layout.
pub(crate) fn parse_pdb_stream(tree: &mut Tree, id: NodeId) -> Result<()> {
    let start = tree.get(id).start();
    let stream = PdbStream::read(tree.buffer(), start)?;

    tree.append_bytes(id, "PdbId", 20)?;
    tree.append(id, NodeKind::U32, "EntryPoint")?;
    tree.append(id, NodeKind::U64, "ReferencedTypeSystemTables")?;
    let count = stream.referenced.len();
    if count > 0 {
        tree.add(id, NewNode::new(NodeKind::RowCounts, "Row Counts").len(count * 4))?;
    }

    log::debug!(
        "#Pdb references {} type-system tables",
        stream.referenced.len()
    );
    if let Some(layout) = metadata_layout_mut(tree, id) {
        layout.pdb = Some(stream);
    }
    Ok(())
}
