//! Attribute certificate table (`WIN_CERTIFICATE` entries).
//!
//! The certificate data directory holds a file offset, not an RVA: certificates are not mapped
//! into memory and usually follow the last section.

use crate::{
    tree::{NewNode, NodeId, NodeKind, Tree},
    utils::align_to,
    Result,
};

const ENTRY_HEADER_SIZE: usize = 8;

/// Inserts the certificate table found at file `offset`.
pub(crate) fn place_certificate_table(
    tree: &mut Tree,
    root: NodeId,
    offset: usize,
    size: usize,
) -> Result<()> {
    if tree.buffer().ensure(offset, size).is_err() {
        log::warn!("certificate table at {offset:#x} is truncated by end of file");
        return Ok(());
    }
    tree.insert_xref(
        root,
        NewNode::new(NodeKind::CertificateTable, "Certificate Table")
            .at(offset)
            .len(size),
    )?;
    Ok(())
}

/// Parse hook of the certificate table; entries are 8-byte aligned.
pub(crate) fn parse_certificate_table(tree: &mut Tree, id: NodeId) -> Result<()> {
    let span = tree.get(id).span();
    let mut cursor = span.start;

    while cursor + ENTRY_HEADER_SIZE <= span.end() {
        let length = tree.buffer().read_le::<u32>(cursor)? as usize;
        if length < ENTRY_HEADER_SIZE || cursor + length > span.end() {
            return Err(malformed_error!(
                "Certificate at {:#x} declares invalid length {}",
                cursor,
                length
            ));
        }
        tree.add(
            id,
            NewNode::new(NodeKind::CertificateEntry, "Certificate")
                .at(cursor)
                .len(length),
        )?;
        cursor = span.start + align_to(cursor + length - span.start, 8);
    }
    Ok(())
}

/// Parse hook of one `WIN_CERTIFICATE`.
pub(crate) fn parse_certificate_entry(tree: &mut Tree, id: NodeId) -> Result<()> {
    let length = tree.field::<u32>(id, "Length")? as usize;
    tree.append(id, NodeKind::U16, "Revision")?;
    tree.append(id, NodeKind::U16, "CertificateType")?;
    tree.append_bytes(id, "Certificate", length - ENTRY_HEADER_SIZE)?;
    Ok(())
}
