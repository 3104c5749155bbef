//! CLR 2.0 (Cor20) header.
//!
//! The CLI header is located through the `CLR Runtime Header` data directory. It points to the
//! metadata root, the managed resources, the strong name signature and the VTable fixups. Once
//! the metadata root is decoded, the table rows are followed to the method bodies, the mapped
//! field data and the embedded resources (see [`crate::metadata::xref`]).
//!
//! # Reference
//! - [ECMA-335 II.25.3.3](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)

use crate::{
    file::ByteBuffer,
    metadata::xref,
    pe::{require_rva, resolve_rva},
    tree::{NewNode, NodeId, NodeKind, Tree},
    Result,
};

/// Size of the CLI header in bytes.
pub const CLI_HEADER_SIZE: usize = 72;

/// `COR_VTABLE_32BIT`: the slots of a fixup are 4 bytes wide
const VTABLE_32BIT: u16 = 0x01;
/// `COR_VTABLE_64BIT`: the slots of a fixup are 8 bytes wide
const VTABLE_64BIT: u16 = 0x02;

/// The main header of CIL, located at the beginning of the `CLR Runtime Header` data directory.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Cor20Header {
    /// Size of header in bytes
    pub cb: u32,
    /// The minimum version of runtime required to run this program
    pub major_runtime_version: u16,
    /// The minor portion of the version
    pub minor_runtime_version: u16,
    /// RVA and size of the metadata root
    pub metadata: (u32, u32),
    /// Flags describing this runtime
    pub flags: u32,
    /// Token for the `MethodDef` or File of the entry point for the image
    pub entry_point_token: u32,
    /// RVA and size of the managed resources
    pub resources: (u32, u32),
    /// RVA and size of the strong name hash
    pub strong_name_signature: (u32, u32),
    /// Always 0
    pub code_manager_table: (u32, u32),
    /// RVA and size of the VTable fixup array
    pub vtable_fixups: (u32, u32),
    /// Always 0
    pub export_address_table_jumps: (u32, u32),
    /// Always 0
    pub managed_native_header: (u32, u32),
}

impl Cor20Header {
    /// Reads the header at `offset`.
    ///
    /// # Errors
    /// Returns [`crate::Error::TruncatedBuffer`] if the header exceeds the buffer.
    pub fn read(buffer: &ByteBuffer, offset: usize) -> Result<Cor20Header> {
        buffer.ensure(offset, CLI_HEADER_SIZE)?;
        let directory = |at: usize| -> Result<(u32, u32)> {
            Ok((
                buffer.read_le::<u32>(offset + at)?,
                buffer.read_le::<u32>(offset + at + 4)?,
            ))
        };

        Ok(Cor20Header {
            cb: buffer.read_le::<u32>(offset)?,
            major_runtime_version: buffer.read_le::<u16>(offset + 4)?,
            minor_runtime_version: buffer.read_le::<u16>(offset + 6)?,
            metadata: directory(8)?,
            flags: buffer.read_le::<u32>(offset + 16)?,
            entry_point_token: buffer.read_le::<u32>(offset + 20)?,
            resources: directory(24)?,
            strong_name_signature: directory(32)?,
            code_manager_table: directory(40)?,
            vtable_fixups: directory(48)?,
            export_address_table_jumps: directory(56)?,
            managed_native_header: directory(64)?,
        })
    }
}

/// Parse hook of the CLI header: its fields, then every structure it points to.
pub(crate) fn parse_cli_header(tree: &mut Tree, id: NodeId) -> Result<()> {
    let start = tree.get(id).start();
    let header = Cor20Header::read(tree.buffer(), start)?;
    if header.cb as usize != CLI_HEADER_SIZE {
        log::warn!("CLI header at {start:#x} declares size {}", header.cb);
    }

    tree.append(id, NodeKind::U32, "Cb")?;
    tree.append(id, NodeKind::U16, "MajorRuntimeVersion")?;
    tree.append(id, NodeKind::U16, "MinorRuntimeVersion")?;
    tree.append(id, NodeKind::DataDirectory, "MetaData")?;
    tree.append(id, NodeKind::U32, "Flags")?;
    tree.append(id, NodeKind::U32, "EntryPointToken")?;
    for label in [
        "Resources",
        "StrongNameSignature",
        "CodeManagerTable",
        "VTableFixups",
        "ExportAddressTableJumps",
        "ManagedNativeHeader",
    ] {
        tree.append(id, NodeKind::DataDirectory, label)?;
    }

    let image = tree
        .find_ancestor(id, |kind| kind == NodeKind::PeFile)
        .unwrap_or_else(|| tree.root_id());

    let (rva, size) = header.metadata;
    let offset = require_rva(tree, id, rva, start + 8)?;
    let root = tree.insert_xref(
        image,
        NewNode::new(NodeKind::MetadataRoot, "Metadata Root")
            .at(offset)
            .len(size as usize),
    )?;
    if root.is_none() {
        return Err(malformed_error!(
            "Metadata root at {:#x} cannot be placed",
            offset
        ));
    }

    let (rva, size) = header.strong_name_signature;
    if rva != 0 && size != 0 {
        match resolve_rva(tree, id, rva) {
            Some(offset) => {
                tree.insert_xref(
                    image,
                    NewNode::new(NodeKind::Bytes, "Strong Name Signature")
                        .at(offset)
                        .len(size as usize),
                )?;
            }
            None => log::warn!("strong name signature at RVA {rva:#x} is not backed by file data"),
        }
    }

    let (rva, size) = header.vtable_fixups;
    if rva != 0 && size != 0 {
        match resolve_rva(tree, id, rva) {
            Some(offset) => {
                tree.insert_xref(
                    image,
                    NewNode::new(NodeKind::VTableFixups, "VTable Fixups")
                        .at(offset)
                        .len(size as usize),
                )?;
            }
            None => log::warn!("VTable fixups at RVA {rva:#x} are not backed by file data"),
        }
    }

    let (rva, size) = header.resources;
    let mut resources = None;
    if rva != 0 && size != 0 {
        let offset = require_rva(tree, id, rva, start + 24)?;
        resources = tree.insert_xref(
            image,
            NewNode::new(NodeKind::Bytes, "Managed Resources")
                .at(offset)
                .len(size as usize),
        )?;
    }

    xref::resolve(tree, image, resources)
}

/// Parse hook of the VTable fixup array: one `(RVA, Count, Type)` entry per 8 bytes, each
/// pointing to its slots.
pub(crate) fn parse_vtable_fixups(tree: &mut Tree, id: NodeId) -> Result<()> {
    let span = tree.get(id).span();
    let image = tree
        .find_ancestor(id, |kind| kind == NodeKind::PeFile)
        .unwrap_or_else(|| tree.root_id());

    let mut cursor = span.start;
    while cursor + 8 <= span.end() {
        let rva = tree.field::<u32>(id, "RVA")?;
        let count = tree.field::<u16>(id, "Count")?;
        let kind = tree.field::<u16>(id, "Type")?;
        cursor += 8;

        let slot = if kind & VTABLE_64BIT != 0 {
            8
        } else if kind & VTABLE_32BIT != 0 {
            4
        } else {
            log::warn!("VTable fixup at {:#x} has unknown type {kind:#x}", cursor - 8);
            continue;
        };
        let Some(offset) = resolve_rva(tree, id, rva) else {
            log::warn!("VTable at RVA {rva:#x} is not backed by file data");
            continue;
        };
        tree.insert_xref(
            image,
            NewNode::new(NodeKind::Bytes, "VTable")
                .at(offset)
                .len(usize::from(count) * slot),
        )?;
    }
    Ok(())
}
