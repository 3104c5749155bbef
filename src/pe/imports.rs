//! Import directory: descriptors, thunk arrays and hint/name entries.

use crate::{
    pe::{image_layout, resolve_rva},
    tree::{NewNode, NodeId, NodeKind, Tree},
    Result,
};

const DESCRIPTOR_SIZE: usize = 20;

/// Inserts the import descriptor array found through the import data directory.
pub(crate) fn place_import_directory(
    tree: &mut Tree,
    root: NodeId,
    offset: usize,
    size: usize,
) -> Result<()> {
    if tree.buffer().ensure(offset, size).is_err() {
        log::warn!("import directory at {offset:#x} is truncated by end of file");
        return Ok(());
    }
    tree.insert_xref(
        root,
        NewNode::new(NodeKind::ImportDirectory, "Import Directory")
            .at(offset)
            .len(size),
    )?;
    Ok(())
}

/// Parse hook of the import directory: descriptors up to and including the null descriptor.
pub(crate) fn parse_import_directory(tree: &mut Tree, id: NodeId) -> Result<()> {
    let span = tree.get(id).span();
    let mut cursor = span.start;

    while cursor + DESCRIPTOR_SIZE <= span.end() {
        let is_null = tree
            .buffer()
            .slice(cursor, DESCRIPTOR_SIZE)?
            .iter()
            .all(|b| *b == 0);
        if is_null {
            tree.add(id, NewNode::new(NodeKind::Bytes, "Null Descriptor").len(DESCRIPTOR_SIZE))?;
            break;
        }

        let name_rva = tree.buffer().read_le::<u32>(cursor + 12)?;
        let label = resolve_rva(tree, id, name_rva)
            .and_then(|offset| {
                let length = tree.buffer().zstring_len(offset).ok()?;
                let bytes = tree.buffer().slice(offset, length - 1).ok()?;
                Some(String::from_utf8_lossy(bytes).into_owned())
            })
            .unwrap_or_else(|| "Import Descriptor".to_string());
        tree.add(id, NewNode::new(NodeKind::ImportDescriptor, label))?;
        cursor += DESCRIPTOR_SIZE;
    }
    Ok(())
}

/// Parse hook of one `IMAGE_IMPORT_DESCRIPTOR`; follows its name and thunk arrays.
pub(crate) fn parse_import_descriptor(tree: &mut Tree, id: NodeId) -> Result<()> {
    let lookup_rva = tree.field::<u32>(id, "OriginalFirstThunk")?;
    tree.append(id, NodeKind::U32, "TimeDateStamp")?;
    tree.append(id, NodeKind::U32, "ForwarderChain")?;
    let name_rva = tree.field::<u32>(id, "Name")?;
    let address_rva = tree.field::<u32>(id, "FirstThunk")?;

    let root = tree.root_id();
    if let Some(offset) = resolve_rva(tree, id, name_rva) {
        let length = tree.buffer().zstring_len(offset)?;
        tree.insert_xref(root, NewNode::new(NodeKind::ZString, "DLL Name").at(offset).len(length))?;
    }

    let lookup = insert_thunks(tree, id, lookup_rva, "Import Lookup Table")?;
    let address = insert_thunks(tree, id, address_rva, "Import Address Table")?;

    // the address table is overwritten by the loader, names are reached through the lookup table
    if let Some(thunks) = lookup.or(address) {
        insert_names(tree, id, &thunks)?;
    }
    Ok(())
}

fn insert_thunks(tree: &mut Tree, id: NodeId, rva: u32, label: &str) -> Result<Option<Vec<u64>>> {
    if rva == 0 {
        return Ok(None);
    }
    let Some(width) = image_layout(tree, id).map(|layout| layout.pointer_size()) else {
        return Ok(None);
    };
    let Some(offset) = resolve_rva(tree, id, rva) else {
        log::warn!("{label} at RVA {rva:#x} is not backed by file data");
        return Ok(None);
    };

    let mut thunks = Vec::new();
    let mut cursor = offset;
    loop {
        let thunk = if width == 8 {
            tree.buffer().read_le::<u64>(cursor)?
        } else {
            u64::from(tree.buffer().read_le::<u32>(cursor)?)
        };
        cursor += width;
        if thunk == 0 {
            break;
        }
        thunks.push(thunk);
    }

    let root = tree.root_id();
    tree.insert_xref(
        root,
        NewNode::new(NodeKind::ImportThunks, label)
            .at(offset)
            .len(cursor - offset),
    )?;
    Ok(Some(thunks))
}

fn insert_names(tree: &mut Tree, id: NodeId, thunks: &[u64]) -> Result<()> {
    let Some(width) = image_layout(tree, id).map(|layout| layout.pointer_size()) else {
        return Ok(());
    };
    let ordinal_flag = 1_u64 << (width * 8 - 1);
    let root = tree.root_id();

    for thunk in thunks {
        if thunk & ordinal_flag != 0 {
            continue;
        }
        #[allow(clippy::cast_possible_truncation)]
        let rva = (thunk & 0x7FFF_FFFF) as u32;
        let Some(offset) = resolve_rva(tree, id, rva) else {
            log::warn!("import name at RVA {rva:#x} is not backed by file data");
            continue;
        };
        let length = 2 + tree.buffer().zstring_len(offset + 2)?;
        tree.insert_xref(
            root,
            NewNode::new(NodeKind::ImportByName, "Hint/Name")
                .at(offset)
                .len(length),
        )?;
    }
    Ok(())
}

/// Parse hook of a thunk array, including its null terminator.
pub(crate) fn parse_thunks(tree: &mut Tree, id: NodeId) -> Result<()> {
    let (kind, width) = match image_layout(tree, id).map(|layout| layout.pointer_size()) {
        Some(8) => (NodeKind::U64, 8),
        _ => (NodeKind::U32, 4),
    };
    let count = tree.get(id).len() / width;
    for index in 0..count {
        let label = if index + 1 == count { "Null Thunk" } else { "Thunk" };
        tree.append(id, kind, label)?;
    }
    Ok(())
}

/// Parse hook of an `IMAGE_IMPORT_BY_NAME`.
pub(crate) fn parse_import_by_name(tree: &mut Tree, id: NodeId) -> Result<()> {
    tree.append(id, NodeKind::U16, "Hint")?;
    tree.append(id, NodeKind::ZString, "Name")?;
    Ok(())
}
