//! Win32 resource directory tree.
//!
//! All offsets inside the tree are relative to the start of the resource directory. The high bit
//! of an entry's name field marks a named entry, the high bit of its data field a subdirectory.
//! Entries of the root directory are resource types; their ids map to the fixed `RT_*` names.

use crate::{
    pe::{image_layout, resolve_rva, DataDirectoryType},
    tree::{NewNode, NodeId, NodeKind, Tree},
    Result,
};

const DIRECTORY_SIZE: usize = 16;
const ENTRY_SIZE: usize = 8;
const DATA_ENTRY_SIZE: usize = 16;
const HIGH_BIT: u32 = 0x8000_0000;

/// Name of a predefined resource type.
#[must_use]
pub fn resource_type_name(id: u32) -> Option<&'static str> {
    Some(match id {
        1 => "RT_CURSOR",
        2 => "RT_BITMAP",
        3 => "RT_ICON",
        4 => "RT_MENU",
        5 => "RT_DIALOG",
        6 => "RT_STRING",
        7 => "RT_FONTDIR",
        8 => "RT_FONT",
        9 => "RT_ACCELERATOR",
        10 => "RT_RCDATA",
        11 => "RT_MESSAGETABLE",
        12 => "RT_GROUP_CURSOR",
        14 => "RT_GROUP_ICON",
        16 => "RT_VERSION",
        17 => "RT_DLGINCLUDE",
        19 => "RT_PLUGPLAY",
        20 => "RT_VXD",
        21 => "RT_ANICURSOR",
        22 => "RT_ANIICON",
        23 => "RT_HTML",
        24 => "RT_MANIFEST",
        _ => return None,
    })
}

fn resource_base(tree: &Tree, id: NodeId) -> Option<usize> {
    let layout = image_layout(tree, id)?;
    let (rva, _) = layout.directory(DataDirectoryType::ResourceTable)?;
    layout.rva_to_offset(rva)
}

fn directory_len(tree: &Tree, offset: usize) -> Result<usize> {
    let named = tree.buffer().read_le::<u16>(offset + 12)?;
    let ids = tree.buffer().read_le::<u16>(offset + 14)?;
    Ok(DIRECTORY_SIZE + (usize::from(named) + usize::from(ids)) * ENTRY_SIZE)
}

fn insert_directory(tree: &mut Tree, offset: usize, label: &str) -> Result<Option<NodeId>> {
    let length = directory_len(tree, offset)?;
    let root = tree.root_id();
    tree.insert_xref(
        root,
        NewNode::new(NodeKind::ResourceDirectory, label)
            .at(offset)
            .len(length),
    )
}

/// Inserts the root resource directory table at `offset`.
pub(crate) fn place_resource_root(tree: &mut Tree, _root: NodeId, offset: usize) -> Result<()> {
    insert_directory(tree, offset, "Resource Directory")?;
    Ok(())
}

/// Parse hook of a resource directory table and its entries.
pub(crate) fn parse_resource_directory(tree: &mut Tree, id: NodeId) -> Result<()> {
    let start = tree.get(id).start();
    let is_root = resource_base(tree, id) == Some(start);

    tree.append(id, NodeKind::U32, "Characteristics")?;
    tree.append(id, NodeKind::U32, "TimeDateStamp")?;
    tree.append(id, NodeKind::U16, "MajorVersion")?;
    tree.append(id, NodeKind::U16, "MinorVersion")?;
    let named = tree.field::<u16>(id, "NumberOfNamedEntries")?;
    let ids = tree.field::<u16>(id, "NumberOfIdEntries")?;

    let mut cursor = start + DIRECTORY_SIZE;
    for _ in 0..usize::from(named) + usize::from(ids) {
        let name = tree.buffer().read_le::<u32>(cursor)?;
        let label = if name & HIGH_BIT != 0 {
            "Named Entry".to_string()
        } else if let Some(type_name) = resource_type_name(name).filter(|_| is_root) {
            type_name.to_string()
        } else {
            format!("Id {name}")
        };
        tree.add(id, NewNode::new(NodeKind::ResourceEntry, label))?;
        cursor += ENTRY_SIZE;
    }
    Ok(())
}

/// Parse hook of one resource directory entry; follows its name and its target.
pub(crate) fn parse_resource_entry(tree: &mut Tree, id: NodeId) -> Result<()> {
    let start = tree.get(id).start();
    let named = tree.buffer().read_le::<u32>(start)? & HIGH_BIT != 0;
    let name = tree.field::<u32>(id, if named { "NameOffset" } else { "Id" })?;
    let target = tree.field::<u32>(id, "OffsetToData")?;

    let Some(base) = resource_base(tree, id) else {
        return Ok(());
    };
    let root = tree.root_id();

    if named {
        let offset = base + (name & !HIGH_BIT) as usize;
        let count = tree.buffer().read_le::<u16>(offset)?;
        tree.insert_xref(
            root,
            NewNode::new(NodeKind::PrefixedString, "Name")
                .at(offset)
                .len(2 + usize::from(count) * 2),
        )?;
    }

    let offset = base + (target & !HIGH_BIT) as usize;
    if target & HIGH_BIT != 0 {
        insert_directory(tree, offset, "Directory")?;
    } else {
        tree.insert_xref(
            root,
            NewNode::new(NodeKind::ResourceDataEntry, "Data Entry")
                .at(offset)
                .len(DATA_ENTRY_SIZE),
        )?;
    }
    Ok(())
}

/// Parse hook of an `IMAGE_RESOURCE_DATA_ENTRY`; inserts the referenced data.
pub(crate) fn parse_resource_data_entry(tree: &mut Tree, id: NodeId) -> Result<()> {
    let rva = tree.field::<u32>(id, "DataRVA")?;
    let size = tree.field::<u32>(id, "Size")? as usize;
    tree.append(id, NodeKind::U32, "CodePage")?;
    tree.append(id, NodeKind::U32, "Reserved")?;

    if size == 0 {
        return Ok(());
    }
    let Some(offset) = resolve_rva(tree, id, rva) else {
        log::warn!("resource data at RVA {rva:#x} is not backed by file data");
        return Ok(());
    };
    if tree.buffer().ensure(offset, size).is_err() {
        log::warn!("resource data at {offset:#x} is truncated by end of file");
        return Ok(());
    }

    let root = tree.root_id();
    tree.insert_xref(
        root,
        NewNode::new(NodeKind::Bytes, "Resource Data")
            .at(offset)
            .len(size),
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_names() {
        assert_eq!(resource_type_name(3), Some("RT_ICON"));
        assert_eq!(resource_type_name(16), Some("RT_VERSION"));
        assert_eq!(resource_type_name(24), Some("RT_MANIFEST"));
        assert_eq!(resource_type_name(13), None);
        assert_eq!(resource_type_name(0), None);
    }
}
