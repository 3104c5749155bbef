//! Metadata root header and stream directory.
//!
//! The metadata root is the entry point of CLI metadata, both inside a PE image (located through
//! the CLI header) and as the first byte of a standalone or embedded portable PDB.
//!
//! ```text
//! Offset  Size  Field
//! 0       4     Signature       0x424A5342 "BSJB"
//! 4       2     MajorVersion
//! 6       2     MinorVersion
//! 8       4     Reserved
//! 12      4     Length          size of the version string, padded to 4 bytes
//! 16      n     Version
//! 16+n    2     Flags
//! 18+n    2     Streams         number of stream headers
//! 20+n    ...   Stream headers
//! ```
//!
//! Streams are placed at their true offsets, which need not follow header order. The `#Pdb`
//! stream is decoded first and the table stream last, since the table stream needs the other
//! heaps and the row counts of `#Pdb`.
//!
//! # References
//!
//! - [ECMA-335 II.24.2.1: Metadata root](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)

use crate::{
    metadata::{
        customdebuginformation,
        streams::{metadata_layout_mut, HeapKind, MetadataLayout, StreamHeader, StreamInfo},
    },
    tree::{NewNode, NodeId, NodeKind, Payload, Tree},
    Error::BadMagic,
    Result,
};

/// The magic value of a metadata root, `BSJB`
pub const METADATA_MAGIC: u32 = 0x424A_5342;

/// Parse hook of a metadata root: header, stream directory, streams and, for portable PDBs,
/// the custom debug information blobs.
pub(crate) fn parse_metadata_root(tree: &mut Tree, id: NodeId) -> Result<()> {
    let start = tree.get(id).start();

    let signature = tree.buffer().read_le::<u32>(start)?;
    if signature != METADATA_MAGIC {
        return Err(BadMagic {
            offset: start,
            expected: METADATA_MAGIC,
            found: signature,
        });
    }

    tree.append(id, NodeKind::U32, "Signature")?;
    tree.append(id, NodeKind::U16, "MajorVersion")?;
    tree.append(id, NodeKind::U16, "MinorVersion")?;
    tree.append(id, NodeKind::U32, "Reserved")?;
    let length = tree.field::<u32>(id, "Length")? as usize;

    let version = {
        let raw = tree.buffer().slice(start + 16, length)?;
        let text = raw.split(|b| *b == 0).next().unwrap_or_default();
        String::from_utf8_lossy(text).into_owned()
    };
    if length > 0 {
        tree.add(id, NewNode::new(NodeKind::Utf8, "Version").len(length))?;
    }

    tree.append(id, NodeKind::U16, "Flags")?;
    let count = tree.field::<u16>(id, "Streams")?;

    let mut streams = Vec::with_capacity(usize::from(count));
    let mut cursor = start + 20 + length;
    for _ in 0..count {
        let (header, encoded) = StreamHeader::read(tree.buffer(), cursor)?;
        tree.add(
            id,
            NewNode::new(NodeKind::StreamHeader, format!("Stream {}", header.name)).len(encoded),
        )?;
        cursor += encoded;

        streams.push(StreamInfo {
            kind: HeapKind::from_name(&header.name),
            offset: start + header.offset as usize,
            size: header.size as usize,
            name: header.name,
        });
    }

    log::debug!(
        "metadata root at {start:#x}, version {version:?}, streams {}",
        streams
            .iter()
            .map(|s| s.name.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    );

    let mut order: Vec<StreamInfo> = streams.clone();
    order.sort_by_key(|stream| stream.kind.decode_order());
    tree.set_payload(id, Payload::Metadata(MetadataLayout::new(version, streams)));

    for stream in order {
        if stream.size == 0 {
            continue;
        }
        let heap = tree.add(
            id,
            NewNode::new(NodeKind::Heap(stream.kind), stream.name.as_str())
                .at(stream.offset)
                .len(stream.size),
        )?;
        if let Some(layout) = metadata_layout_mut(tree, id) {
            layout.register(stream.kind, heap);
        }
    }

    if tree.config().decode_custom_debug_info {
        customdebuginformation::resolve_debug_info(tree, id)?;
    }
    Ok(())
}
