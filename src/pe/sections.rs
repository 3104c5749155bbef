//! Section headers and section raw data.

use bitflags::bitflags;

use crate::{
    file::ByteBuffer,
    pe::SectionInfo,
    tree::{NewNode, NodeId, NodeKind, Tree},
    Result,
};

/// Size of one `IMAGE_SECTION_HEADER`.
pub(crate) const SECTION_HEADER_SIZE: usize = 40;

bitflags! {
    #[derive(Clone, Copy, PartialEq, Eq, Debug)]
    /// Section characteristics of `IMAGE_SECTION_HEADER`
    pub struct SectionCharacteristics: u32 {
        /// The section contains executable code
        const CNT_CODE = 0x0000_0020;
        /// The section contains initialized data
        const CNT_INITIALIZED_DATA = 0x0000_0040;
        /// The section contains uninitialized data
        const CNT_UNINITIALIZED_DATA = 0x0000_0080;
        /// The section contains extended relocations
        const LNK_NRELOC_OVFL = 0x0100_0000;
        /// The section can be discarded as needed
        const MEM_DISCARDABLE = 0x0200_0000;
        /// The section cannot be cached
        const MEM_NOT_CACHED = 0x0400_0000;
        /// The section is not pageable
        const MEM_NOT_PAGED = 0x0800_0000;
        /// The section can be shared in memory
        const MEM_SHARED = 0x1000_0000;
        /// The section can be executed as code
        const MEM_EXECUTE = 0x2000_0000;
        /// The section can be read
        const MEM_READ = 0x4000_0000;
        /// The section can be written to
        const MEM_WRITE = 0x8000_0000;

        // alignment and other bits
        const _ = !0;
    }
}

/// Decodes the section header at `offset` without touching the tree.
pub(crate) fn read_section_info(buffer: &ByteBuffer, offset: usize) -> Result<SectionInfo> {
    let raw_name = buffer.slice(offset, 8)?;
    let name_len = raw_name.iter().position(|b| *b == 0).unwrap_or(8);

    Ok(SectionInfo {
        name: String::from_utf8_lossy(&raw_name[..name_len]).into_owned(),
        virtual_size: buffer.read_le::<u32>(offset + 8)?,
        virtual_address: buffer.read_le::<u32>(offset + 12)?,
        size_of_raw_data: buffer.read_le::<u32>(offset + 16)?,
        pointer_to_raw_data: buffer.read_le::<u32>(offset + 20)?,
        characteristics: SectionCharacteristics::from_bits_retain(
            buffer.read_le::<u32>(offset + 36)?,
        ),
    })
}

/// Parse hook of the section table; its preset length decides the header count.
pub(crate) fn parse_section_table(tree: &mut Tree, id: NodeId) -> Result<()> {
    let start = tree.get(id).start();
    let count = tree.get(id).len() / SECTION_HEADER_SIZE;

    for index in 0..count {
        let info = read_section_info(tree.buffer(), start + index * SECTION_HEADER_SIZE)?;
        let label = if info.name.is_empty() {
            "Section Header".to_string()
        } else {
            info.name
        };
        tree.add(id, NewNode::new(NodeKind::SectionHeader, label))?;
    }
    Ok(())
}

/// Parse hook of one section header.
pub(crate) fn parse_section_header(tree: &mut Tree, id: NodeId) -> Result<()> {
    tree.add(id, NewNode::new(NodeKind::Utf8, "Name").len(8))?;
    tree.append(id, NodeKind::U32, "VirtualSize")?;
    tree.append(id, NodeKind::U32, "VirtualAddress")?;
    tree.append(id, NodeKind::U32, "SizeOfRawData")?;
    tree.append(id, NodeKind::U32, "PointerToRawData")?;
    tree.append(id, NodeKind::U32, "PointerToRelocations")?;
    tree.append(id, NodeKind::U32, "PointerToLinenumbers")?;
    tree.append(id, NodeKind::U16, "NumberOfRelocations")?;
    tree.append(id, NodeKind::U16, "NumberOfLinenumbers")?;
    tree.append(id, NodeKind::U32, "Characteristics")?;
    Ok(())
}

/// Places the raw data of a section below the image root.
///
/// Raw data reaching past the end of the file is cut at the end of the file.
pub(crate) fn place_section(tree: &mut Tree, root: NodeId, section: &SectionInfo) -> Result<()> {
    let start = section.pointer_to_raw_data as usize;
    let mut length = section.size_of_raw_data as usize;
    if start == 0 || length == 0 {
        return Ok(());
    }

    let available = tree.buffer().len().saturating_sub(start);
    if length > available {
        log::warn!(
            "section {} is truncated by end of file ({:#x} of {:#x} bytes)",
            section.name,
            available,
            length
        );
        length = available;
        if length == 0 {
            return Ok(());
        }
    }

    log::debug!(
        "section {} at {:#x}, {:#x} bytes, {:?}",
        section.name,
        start,
        length,
        section.characteristics
    );
    let label = if section.name.is_empty() {
        "Section"
    } else {
        section.name.as_str()
    };
    tree.add(root, NewNode::new(NodeKind::Section, label).at(start).len(length))?;
    Ok(())
}
