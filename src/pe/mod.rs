//! Decoders for the Portable Executable container.
//!
//! The root of an image tree is a `PeFile` node. Its hook lays out the fixed headers in file
//! order (DOS header, DOS stub, PE header, optional header, section table), records the section
//! layout as the [`crate::pe::ImageLayout`] payload of the root, places the raw data of every
//! section, and finally follows the data directories. Everything a directory points at is
//! inserted by cross-reference, so it ends up inside the section that holds it.
//!
//! # Key Components
//!
//! - [`crate::pe::ImageLayout`] - Section layout and data directories, resolves RVAs
//! - [`crate::pe::DataDirectoryType`] - The 16 optional header data directories
//! - [`crate::pe::SectionInfo`] - One section header, decoded
//!
//! # Reference
//! * Microsoft PE/COFF Specification

pub(crate) mod certificates;
pub(crate) mod debug;
pub(crate) mod dos;
pub(crate) mod headers;
pub(crate) mod imports;
pub(crate) mod relocations;
pub(crate) mod resources;
pub(crate) mod sections;

pub use debug::DebugType;
pub use sections::SectionCharacteristics;

use strum::{EnumCount, EnumIter, FromRepr, IntoStaticStr};

use crate::{
    metadata,
    tree::{NewNode, NodeId, NodeKind, Payload, Tree},
    Error::UnresolvableRva,
    Result,
};

/// `MZ`
pub const DOS_MAGIC: u16 = 0x5A4D;
/// `PE\0\0`
pub const PE_MAGIC: u32 = 0x0000_4550;
/// Optional header magic of a PE32 image
pub const PE32_MAGIC: u16 = 0x010B;
/// Optional header magic of a PE32+ image
pub const PE32_PLUS_MAGIC: u16 = 0x020B;

/// The data directories of the optional header, in table order.
#[derive(Clone, Copy, PartialEq, Eq, Debug, EnumIter, EnumCount, FromRepr, IntoStaticStr)]
#[repr(usize)]
#[allow(missing_docs)]
pub enum DataDirectoryType {
    #[strum(serialize = "Export Table")]
    ExportTable = 0,
    #[strum(serialize = "Import Table")]
    ImportTable = 1,
    #[strum(serialize = "Resource Table")]
    ResourceTable = 2,
    #[strum(serialize = "Exception Table")]
    ExceptionTable = 3,
    #[strum(serialize = "Certificate Table")]
    CertificateTable = 4,
    #[strum(serialize = "Base Relocation Table")]
    BaseRelocationTable = 5,
    #[strum(serialize = "Debug Directory")]
    DebugTable = 6,
    #[strum(serialize = "Architecture")]
    Architecture = 7,
    #[strum(serialize = "Global Ptr")]
    GlobalPtr = 8,
    #[strum(serialize = "TLS Table")]
    TlsTable = 9,
    #[strum(serialize = "Load Config Table")]
    LoadConfigTable = 10,
    #[strum(serialize = "Bound Import")]
    BoundImport = 11,
    #[strum(serialize = "Import Address Table")]
    ImportAddressTable = 12,
    #[strum(serialize = "Delay Import Descriptor")]
    DelayImportDescriptor = 13,
    #[strum(serialize = "CLR Runtime Header")]
    ClrRuntimeHeader = 14,
    #[strum(serialize = "Reserved")]
    Reserved = 15,
}

impl DataDirectoryType {
    /// Human readable name, used as node label.
    #[must_use]
    pub fn name(self) -> &'static str {
        self.into()
    }
}

/// One decoded section header.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct SectionInfo {
    /// Section name, without trailing zeros
    pub name: String,
    /// Size of the section when loaded
    pub virtual_size: u32,
    /// RVA of the section
    pub virtual_address: u32,
    /// Size of the initialized data on disk
    pub size_of_raw_data: u32,
    /// File offset of the initialized data
    pub pointer_to_raw_data: u32,
    /// Section flags
    pub characteristics: SectionCharacteristics,
}

/// The address-space layout of an image, kept as payload on the `PeFile` node.
#[derive(Clone, Debug, Default)]
pub struct ImageLayout {
    /// `true` for a PE32+ (64-bit) optional header
    pub is_pe32_plus: bool,
    /// Combined size of all headers, rounded to the file alignment
    pub size_of_headers: u32,
    /// The `(rva, size)` pairs of the data directories that are present
    pub directories: Vec<(u32, u32)>,
    /// The section headers in table order
    pub sections: Vec<SectionInfo>,
}

impl ImageLayout {
    /// Converts an RVA to a file offset.
    ///
    /// RVAs below `SizeOfHeaders` map to the identical offset; all others must fall into the
    /// raw data of a section. Returns `None` for an RVA that is not backed by file data.
    #[must_use]
    pub fn rva_to_offset(&self, rva: u32) -> Option<usize> {
        if rva < self.size_of_headers {
            return Some(rva as usize);
        }

        self.sections.iter().find_map(|section| {
            let delta = rva.checked_sub(section.virtual_address)?;
            (delta < section.size_of_raw_data)
                .then(|| section.pointer_to_raw_data as usize + delta as usize)
        })
    }

    /// The `(rva, size)` of a data directory, `None` if it is absent or empty.
    #[must_use]
    pub fn directory(&self, kind: DataDirectoryType) -> Option<(u32, u32)> {
        self.directories
            .get(kind as usize)
            .copied()
            .filter(|(rva, size)| *rva != 0 && *size != 0)
    }

    /// Width of import thunks and other pointer-sized fields.
    #[must_use]
    pub fn pointer_size(&self) -> usize {
        if self.is_pe32_plus {
            8
        } else {
            4
        }
    }
}

/// The layout of the image that contains node `id`, `None` inside a metadata-only tree.
pub(crate) fn image_layout(tree: &Tree, id: NodeId) -> Option<&ImageLayout> {
    let root = tree.find_ancestor(id, |kind| kind == NodeKind::PeFile)?;
    match tree.payload(root) {
        Some(Payload::Image(layout)) => Some(layout),
        _ => None,
    }
}

/// Resolves `rva` through the image that contains node `id`.
pub(crate) fn resolve_rva(tree: &Tree, id: NodeId, rva: u32) -> Option<usize> {
    image_layout(tree, id)?.rva_to_offset(rva)
}

/// Resolves an RVA that the format requires to be valid.
///
/// # Errors
/// Returns [`crate::Error::UnresolvableRva`] with `field` as the offending offset.
pub(crate) fn require_rva(tree: &Tree, id: NodeId, rva: u32, field: usize) -> Result<usize> {
    resolve_rva(tree, id, rva).ok_or(UnresolvableRva { rva, offset: field })
}

/// Parse hook of the `PeFile` root.
pub(crate) fn parse_image(tree: &mut Tree, id: NodeId) -> Result<()> {
    tree.buffer().ensure(0, dos::DOS_HEADER_SIZE)?;
    let dos = tree.add(id, NewNode::new(NodeKind::DosHeader, "DOS Header").at(0))?;
    let dos_end = tree.get(dos).end();
    let e_lfanew = tree.buffer().read_le::<u32>(dos::E_LFANEW_OFFSET)? as usize;
    if e_lfanew < dos_end {
        return Err(malformed_error!(
            "e_lfanew {:#x} points into the DOS header",
            e_lfanew
        ));
    }
    tree.append_bytes(id, "DOS Stub", e_lfanew - dos_end)?;

    let pe = tree.add(id, NewNode::new(NodeKind::PeHeader, "PE Header").at(e_lfanew))?;
    let coff = tree.get(pe).start() + 4;
    let number_of_sections = tree.buffer().read_le::<u16>(coff + 2)?;
    let size_of_optional_header = tree.buffer().read_le::<u16>(coff + 16)?;

    let optional = tree.add(
        id,
        NewNode::new(NodeKind::OptionalHeader, "Optional Header")
            .len(usize::from(size_of_optional_header)),
    )?;
    let optional_start = tree.get(optional).start();

    let section_table = optional_start + usize::from(size_of_optional_header);
    if number_of_sections > 0 {
        tree.add(
            id,
            NewNode::new(NodeKind::SectionTable, "Section Table")
                .at(section_table)
                .len(usize::from(number_of_sections) * sections::SECTION_HEADER_SIZE),
        )?;
    }

    let layout = read_layout(tree, optional_start, section_table, number_of_sections)?;
    log::debug!(
        "{} image with {} sections",
        if layout.is_pe32_plus { "PE32+" } else { "PE32" },
        layout.sections.len()
    );
    let sections = layout.sections.clone();
    let directories = layout.directories.clone();
    tree.set_payload(id, Payload::Image(layout));

    for section in &sections {
        sections::place_section(tree, id, section)?;
    }

    place_directories(tree, id, &directories)
}

fn read_layout(
    tree: &Tree,
    optional_start: usize,
    section_table: usize,
    number_of_sections: u16,
) -> Result<ImageLayout> {
    let buffer = tree.buffer();
    let is_pe32_plus = buffer.read_le::<u16>(optional_start)? == PE32_PLUS_MAGIC;
    // same position for both layouts, the wider ImageBase replaces BaseOfData
    let size_of_headers = buffer.read_le::<u32>(optional_start + 60)?;

    let mut directories = Vec::new();
    if let Some(node) = tree.find_kind(NodeKind::DataDirectories) {
        let mut offset = node.start();
        while offset + 8 <= node.end() {
            directories.push((
                buffer.read_le::<u32>(offset)?,
                buffer.read_le::<u32>(offset + 4)?,
            ));
            offset += 8;
        }
    }

    let mut sections = Vec::with_capacity(usize::from(number_of_sections));
    for index in 0..usize::from(number_of_sections) {
        sections.push(sections::read_section_info(
            buffer,
            section_table + index * sections::SECTION_HEADER_SIZE,
        )?);
    }

    Ok(ImageLayout {
        is_pe32_plus,
        size_of_headers,
        directories,
        sections,
    })
}

fn place_directories(tree: &mut Tree, id: NodeId, directories: &[(u32, u32)]) -> Result<()> {
    let mut clr = None;

    for (index, (rva, size)) in directories.iter().copied().enumerate() {
        let Some(kind) = DataDirectoryType::from_repr(index) else {
            continue;
        };
        if rva == 0 || size == 0 {
            continue;
        }

        if kind == DataDirectoryType::CertificateTable {
            certificates::place_certificate_table(tree, id, rva as usize, size as usize)?;
            continue;
        }
        if kind == DataDirectoryType::ClrRuntimeHeader {
            clr = Some((rva, size));
            continue;
        }

        let Some(offset) = resolve_rva(tree, id, rva) else {
            log::warn!("{} at RVA {:#x} is not backed by file data", kind.name(), rva);
            continue;
        };
        let size = size as usize;

        match kind {
            DataDirectoryType::ImportTable => {
                imports::place_import_directory(tree, id, offset, size)?;
            }
            DataDirectoryType::ResourceTable => {
                resources::place_resource_root(tree, id, offset)?;
            }
            DataDirectoryType::BaseRelocationTable => {
                insert_directory(tree, id, NodeKind::RelocationTable, kind, offset, size)?;
            }
            DataDirectoryType::DebugTable => {
                insert_directory(tree, id, NodeKind::DebugDirectory, kind, offset, size)?;
            }
            _ => {
                insert_directory(tree, id, NodeKind::Bytes, kind, offset, size)?;
            }
        }
    }

    if let Some((rva, size)) = clr {
        let field = tree
            .find_kind(NodeKind::DataDirectories)
            .map_or(0, |node| {
                node.start() + DataDirectoryType::ClrRuntimeHeader as usize * 8
            });
        let offset = require_rva(tree, id, rva, field)?;
        if (size as usize) < metadata::cor20header::CLI_HEADER_SIZE {
            log::warn!("CLI header directory declares {size} bytes");
        }
        tree.insert_xref(
            id,
            NewNode::new(NodeKind::CliHeader, "CLI Header")
                .at(offset)
                .len(metadata::cor20header::CLI_HEADER_SIZE),
        )?;
    }

    Ok(())
}

fn insert_directory(
    tree: &mut Tree,
    id: NodeId,
    kind: NodeKind,
    directory: DataDirectoryType,
    offset: usize,
    size: usize,
) -> Result<Option<NodeId>> {
    if tree.buffer().ensure(offset, size).is_err() {
        log::warn!("{} at {:#x} is truncated by end of file", directory.name(), offset);
        return Ok(None);
    }
    tree.insert_xref(id, NewNode::new(kind, directory.name()).at(offset).len(size))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pe::sections::SectionCharacteristics;

    fn layout() -> ImageLayout {
        ImageLayout {
            is_pe32_plus: false,
            size_of_headers: 0x200,
            directories: vec![(0, 0), (0x2010, 0x28)],
            sections: vec![
                SectionInfo {
                    name: ".text".to_string(),
                    virtual_size: 0x1800,
                    virtual_address: 0x2000,
                    size_of_raw_data: 0x1000,
                    pointer_to_raw_data: 0x200,
                    characteristics: SectionCharacteristics::CNT_CODE,
                },
                SectionInfo {
                    name: ".rsrc".to_string(),
                    virtual_size: 0x100,
                    virtual_address: 0x4000,
                    size_of_raw_data: 0x200,
                    pointer_to_raw_data: 0x1200,
                    characteristics: SectionCharacteristics::CNT_INITIALIZED_DATA,
                },
            ],
        }
    }

    #[test]
    fn rva_resolution() {
        let layout = layout();

        assert_eq!(layout.rva_to_offset(0x80), Some(0x80));
        assert_eq!(layout.rva_to_offset(0x2000), Some(0x200));
        assert_eq!(layout.rva_to_offset(0x2FFF), Some(0x11FF));
        // virtual tail of .text has no file data
        assert_eq!(layout.rva_to_offset(0x3000), None);
        assert_eq!(layout.rva_to_offset(0x4010), Some(0x1210));
        assert_eq!(layout.rva_to_offset(0x9000), None);
    }

    #[test]
    fn directories() {
        let layout = layout();

        assert_eq!(layout.directory(DataDirectoryType::ExportTable), None);
        assert_eq!(
            layout.directory(DataDirectoryType::ImportTable),
            Some((0x2010, 0x28))
        );
        assert_eq!(layout.directory(DataDirectoryType::ClrRuntimeHeader), None);
        assert_eq!(DataDirectoryType::ClrRuntimeHeader.name(), "CLR Runtime Header");
        assert_eq!(layout.pointer_size(), 4);
    }
}
