//! Base relocation table.

use crate::{
    tree::{NewNode, NodeId, NodeKind, Tree},
    Result,
};

const BLOCK_HEADER_SIZE: usize = 8;

/// Parse hook of the base relocation table: a sequence of page blocks.
pub(crate) fn parse_relocation_table(tree: &mut Tree, id: NodeId) -> Result<()> {
    let span = tree.get(id).span();
    let mut cursor = span.start;

    while cursor + BLOCK_HEADER_SIZE <= span.end() {
        let size = tree.buffer().read_le::<u32>(cursor + 4)? as usize;
        if size == 0 {
            break;
        }
        if size < BLOCK_HEADER_SIZE || cursor + size > span.end() {
            return Err(malformed_error!(
                "Relocation block at {:#x} declares invalid size {}",
                cursor,
                size
            ));
        }
        tree.add(
            id,
            NewNode::new(NodeKind::RelocationBlock, "Block")
                .at(cursor)
                .len(size),
        )?;
        cursor += size;
    }
    Ok(())
}

/// Parse hook of one relocation block: page RVA, block size, then 16-bit entries of 4-bit type
/// and 12-bit page offset.
pub(crate) fn parse_relocation_block(tree: &mut Tree, id: NodeId) -> Result<()> {
    tree.append(id, NodeKind::U32, "PageRVA")?;
    let size = tree.field::<u32>(id, "BlockSize")? as usize;
    for _ in 0..(size - BLOCK_HEADER_SIZE) / 2 {
        tree.append(id, NodeKind::U16, "Entry")?;
    }
    Ok(())
}
