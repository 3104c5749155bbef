//! PE signature, COFF file header and optional header.

use strum::IntoEnumIterator;

use crate::{
    pe::{DataDirectoryType, PE32_MAGIC, PE32_PLUS_MAGIC, PE_MAGIC},
    tree::{NewNode, NodeId, NodeKind, Tree},
    Error::BadMagic,
    Result,
};

/// Parse hook of the PE signature and COFF file header.
pub(crate) fn parse_pe_header(tree: &mut Tree, id: NodeId) -> Result<()> {
    let start = tree.get(id).start();
    let signature = tree.field::<u32>(id, "Signature")?;
    if signature != PE_MAGIC {
        return Err(BadMagic {
            offset: start,
            expected: PE_MAGIC,
            found: signature,
        });
    }

    tree.append(id, NodeKind::U16, "Machine")?;
    tree.append(id, NodeKind::U16, "NumberOfSections")?;
    tree.append(id, NodeKind::U32, "TimeDateStamp")?;
    tree.append(id, NodeKind::U32, "PointerToSymbolTable")?;
    tree.append(id, NodeKind::U32, "NumberOfSymbols")?;
    tree.append(id, NodeKind::U16, "SizeOfOptionalHeader")?;
    tree.append(id, NodeKind::U16, "Characteristics")?;
    Ok(())
}

/// Parse hook of the optional header: standard fields, Windows fields and data directories.
pub(crate) fn parse_optional_header(tree: &mut Tree, id: NodeId) -> Result<()> {
    tree.add(id, NewNode::new(NodeKind::StandardFields, "Standard Fields"))?;
    let windows = tree.add(id, NewNode::new(NodeKind::WindowsFields, "Windows Fields"))?;

    let count = tree
        .get(windows)
        .child("NumberOfRvaAndSizes")
        .and_then(|node| node.as_u64())
        .unwrap_or_default();
    if count > 16 {
        log::warn!("NumberOfRvaAndSizes is {count}, only 16 directories are decoded");
    }
    let count = count.min(16) as usize;
    if count > 0 {
        tree.add(
            id,
            NewNode::new(NodeKind::DataDirectories, "Data Directories").len(count * 8),
        )?;
    }
    Ok(())
}

fn is_pe32_plus(tree: &Tree, id: NodeId) -> Result<bool> {
    let optional = tree
        .find_ancestor(id, |kind| kind == NodeKind::OptionalHeader)
        .ok_or_else(|| malformed_error!("Optional header fields outside of an optional header"))?;
    let magic = tree.buffer().read_le::<u16>(tree.get(optional).start())?;
    Ok(magic == PE32_PLUS_MAGIC)
}

/// Parse hook of the standard fields.
pub(crate) fn parse_standard_fields(tree: &mut Tree, id: NodeId) -> Result<()> {
    let start = tree.get(id).start();
    let magic = tree.field::<u16>(id, "Magic")?;
    if magic != PE32_MAGIC && magic != PE32_PLUS_MAGIC {
        return Err(BadMagic {
            offset: start,
            expected: u32::from(PE32_MAGIC),
            found: u32::from(magic),
        });
    }

    tree.append(id, NodeKind::U8, "MajorLinkerVersion")?;
    tree.append(id, NodeKind::U8, "MinorLinkerVersion")?;
    tree.append(id, NodeKind::U32, "SizeOfCode")?;
    tree.append(id, NodeKind::U32, "SizeOfInitializedData")?;
    tree.append(id, NodeKind::U32, "SizeOfUninitializedData")?;
    tree.append(id, NodeKind::U32, "AddressOfEntryPoint")?;
    tree.append(id, NodeKind::U32, "BaseOfCode")?;
    if magic == PE32_MAGIC {
        tree.append(id, NodeKind::U32, "BaseOfData")?;
    }
    Ok(())
}

/// Parse hook of the Windows-specific fields.
pub(crate) fn parse_windows_fields(tree: &mut Tree, id: NodeId) -> Result<()> {
    let wide = if is_pe32_plus(tree, id)? {
        NodeKind::U64
    } else {
        NodeKind::U32
    };

    tree.append(id, wide, "ImageBase")?;
    tree.append(id, NodeKind::U32, "SectionAlignment")?;
    tree.append(id, NodeKind::U32, "FileAlignment")?;
    tree.append(id, NodeKind::U16, "MajorOperatingSystemVersion")?;
    tree.append(id, NodeKind::U16, "MinorOperatingSystemVersion")?;
    tree.append(id, NodeKind::U16, "MajorImageVersion")?;
    tree.append(id, NodeKind::U16, "MinorImageVersion")?;
    tree.append(id, NodeKind::U16, "MajorSubsystemVersion")?;
    tree.append(id, NodeKind::U16, "MinorSubsystemVersion")?;
    tree.append(id, NodeKind::U32, "Win32VersionValue")?;
    tree.append(id, NodeKind::U32, "SizeOfImage")?;
    tree.append(id, NodeKind::U32, "SizeOfHeaders")?;
    tree.append(id, NodeKind::U32, "CheckSum")?;
    tree.append(id, NodeKind::U16, "Subsystem")?;
    tree.append(id, NodeKind::U16, "DllCharacteristics")?;
    tree.append(id, wide, "SizeOfStackReserve")?;
    tree.append(id, wide, "SizeOfStackCommit")?;
    tree.append(id, wide, "SizeOfHeapReserve")?;
    tree.append(id, wide, "SizeOfHeapCommit")?;
    tree.append(id, NodeKind::U32, "LoaderFlags")?;
    tree.append(id, NodeKind::U32, "NumberOfRvaAndSizes")?;
    Ok(())
}

/// Parse hook of the data directory array; its preset length decides the entry count.
pub(crate) fn parse_data_directories(tree: &mut Tree, id: NodeId) -> Result<()> {
    let count = tree.get(id).len() / 8;
    for directory in DataDirectoryType::iter().take(count) {
        tree.add(id, NewNode::new(NodeKind::DataDirectory, directory.name()))?;
    }
    Ok(())
}

/// Parse hook of one data directory.
pub(crate) fn parse_data_directory(tree: &mut Tree, id: NodeId) -> Result<()> {
    // the certificate table is addressed by file offset
    let address = if tree.get(id).label() == DataDirectoryType::CertificateTable.name() {
        "FileOffset"
    } else {
        "VirtualAddress"
    };
    tree.append(id, NodeKind::U32, address)?;
    tree.append(id, NodeKind::U32, "Size")?;
    Ok(())
}
