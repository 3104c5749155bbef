//! `IMAGE_DOS_HEADER`.

use crate::{
    pe::DOS_MAGIC,
    tree::{NodeId, NodeKind, Tree},
    Error::BadMagic,
    Result,
};

/// Offset of `e_lfanew`, the file offset of the PE header.
pub(crate) const E_LFANEW_OFFSET: usize = 60;
/// Size of `IMAGE_DOS_HEADER`.
pub(crate) const DOS_HEADER_SIZE: usize = 64;

const WORD_FIELDS: [&str; 13] = [
    "e_cblp",
    "e_cp",
    "e_crlc",
    "e_cparhdr",
    "e_minalloc",
    "e_maxalloc",
    "e_ss",
    "e_sp",
    "e_csum",
    "e_ip",
    "e_cs",
    "e_lfarlc",
    "e_ovno",
];

/// Parse hook of the DOS header.
pub(crate) fn parse_dos_header(tree: &mut Tree, id: NodeId) -> Result<()> {
    let start = tree.get(id).start();
    let magic = tree.field::<u16>(id, "e_magic")?;
    if magic != DOS_MAGIC {
        return Err(BadMagic {
            offset: start,
            expected: u32::from(DOS_MAGIC),
            found: u32::from(magic),
        });
    }

    for label in WORD_FIELDS {
        tree.append(id, NodeKind::U16, label)?;
    }
    tree.append_bytes(id, "e_res", 8)?;
    tree.append(id, NodeKind::U16, "e_oemid")?;
    tree.append(id, NodeKind::U16, "e_oeminfo")?;
    tree.append_bytes(id, "e_res2", 20)?;
    tree.append(id, NodeKind::U32, "e_lfanew")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::{tree::NodeKind, ByteBuffer, Error, ParseConfig, Tree};

    #[test]
    fn bad_magic() {
        let mut data = vec![0u8; 256];
        data[0] = b'Z';
        data[1] = b'M';

        let mut tree = Tree::with_root(
            ByteBuffer::from_mem(data),
            NodeKind::PeFile,
            "PE File",
            ParseConfig::default(),
        );
        assert!(matches!(
            tree.parse_root(),
            Err(Error::BadMagic {
                offset: 0,
                expected: 0x5A4D,
                found: 0x4D5A
            })
        ));
    }
}
