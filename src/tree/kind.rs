use crate::{
    metadata::{self, customdebuginformation::CustomDebugKind, streams::HeapKind, tables::TableId},
    pe,
    tree::{NodeId, Tree},
    Result,
};

/// The closed set of node kinds.
///
/// The kind decides how a node parses itself once it has been placed: primitive values only
/// determine their length, structures declare their fields as children. Kinds carry only what
/// their hook cannot find through the tree; everything else is looked up in ancestor payloads.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum NodeKind {
    /// 1-byte integer
    U8,
    /// 2-byte little-endian integer
    U16,
    /// 4-byte little-endian integer
    U32,
    /// 8-byte little-endian integer
    U64,
    /// Zero-terminated UTF-8 string, terminator included
    ZString,
    /// Zero-terminated string padded with zeros to a multiple of 4 bytes
    AlignedZString,
    /// UTF-16 string prefixed by a 2-byte character count
    PrefixedString,
    /// ECMA-335 compressed unsigned integer (1, 2 or 4 bytes)
    CompressedInt,
    /// UTF-8 text of a preset length
    Utf8,
    /// UTF-16LE text of a preset length
    Utf16,
    /// 16-byte GUID
    Guid,
    /// Opaque bytes of a preset length; cross-referenced structures may be placed inside
    Bytes,
    /// Bytes no decoder claimed
    Padding,

    /// Root of a PE image
    PeFile,
    /// `IMAGE_DOS_HEADER`
    DosHeader,
    /// `PE\0\0` signature and COFF file header
    PeHeader,
    /// Optional header
    OptionalHeader,
    /// Standard fields of the optional header
    StandardFields,
    /// Windows-specific fields of the optional header
    WindowsFields,
    /// The data directory array of the optional header
    DataDirectories,
    /// One `(rva, size)` data directory
    DataDirectory,
    /// The section header array
    SectionTable,
    /// One `IMAGE_SECTION_HEADER`
    SectionHeader,
    /// The raw data of a section
    Section,
    /// Import descriptor array
    ImportDirectory,
    /// One `IMAGE_IMPORT_DESCRIPTOR`
    ImportDescriptor,
    /// Zero-terminated thunk array (lookup table or address table)
    ImportThunks,
    /// Hint and name of an import by name
    ImportByName,
    /// Resource directory table with its entries
    ResourceDirectory,
    /// One resource directory entry
    ResourceEntry,
    /// Resource data entry
    ResourceDataEntry,
    /// Attribute certificate table
    CertificateTable,
    /// One `WIN_CERTIFICATE`
    CertificateEntry,
    /// Base relocation table
    RelocationTable,
    /// One base relocation block
    RelocationBlock,
    /// Debug directory entry array
    DebugDirectory,
    /// One `IMAGE_DEBUG_DIRECTORY`
    DebugEntry,
    /// CodeView `RSDS` record
    CodeView,
    /// PDB checksum record
    PdbChecksum,
    /// Compressed embedded portable PDB
    EmbeddedPdb,
    /// Debug payload of a type without a dedicated decoder
    DebugData,

    /// CLI (COR20) header
    CliHeader,
    /// VTable fixup array
    VTableFixups,
    /// Metadata root (`BSJB`) with its stream headers and streams
    MetadataRoot,
    /// One stream header
    StreamHeader,
    /// One metadata stream
    Heap(HeapKind),
    /// Length-prefixed `#Blob` entry
    BlobEntry,
    /// Length-prefixed `#US` entry
    UserStringEntry,
    /// The row count array of a table stream
    RowCounts,
    /// All rows of one table
    Table(TableId),
    /// One table row
    Row(TableId),
    /// Method header, IL code and extra data sections
    MethodBody,
    /// Exception handling data section of a fat method body
    ExceptionSection,
    /// Length-prefixed embedded managed resource
    ManagedResource,
    /// Initial data of a mapped static field
    FieldData,
    /// Structured custom debug information blob content
    DebugInfo(CustomDebugKind),
}

impl NodeKind {
    /// Length of kinds whose size is fixed by the format.
    #[must_use]
    pub fn fixed_size(self) -> Option<usize> {
        match self {
            NodeKind::U8 => Some(1),
            NodeKind::U16 => Some(2),
            NodeKind::U32 => Some(4),
            NodeKind::U64 => Some(8),
            NodeKind::Guid => Some(16),
            _ => None,
        }
    }

    /// Returns `true` for kinds that hold a single decoded value and never get children.
    #[must_use]
    pub fn is_value(self) -> bool {
        matches!(
            self,
            NodeKind::U8
                | NodeKind::U16
                | NodeKind::U32
                | NodeKind::U64
                | NodeKind::ZString
                | NodeKind::AlignedZString
                | NodeKind::PrefixedString
                | NodeKind::CompressedInt
                | NodeKind::Utf8
                | NodeKind::Utf16
                | NodeKind::Guid
                | NodeKind::Padding
        )
    }

    /// Returns `true` if a cross-referenced node starting inside a node of this kind may be
    /// placed below it.
    #[must_use]
    pub fn accepts_xref(self) -> bool {
        matches!(
            self,
            NodeKind::PeFile
                | NodeKind::Section
                | NodeKind::Bytes
                | NodeKind::MetadataRoot
                | NodeKind::Heap(_)
                | NodeKind::BlobEntry
                | NodeKind::DebugData
        )
    }
}

/// Runs the parse hook of a freshly placed node.
pub(crate) fn parse(tree: &mut Tree, id: NodeId) -> Result<()> {
    match tree.node(id).kind {
        NodeKind::U8
        | NodeKind::U16
        | NodeKind::U32
        | NodeKind::U64
        | NodeKind::Guid
        | NodeKind::Utf8
        | NodeKind::Utf16
        | NodeKind::Bytes
        | NodeKind::Padding
        | NodeKind::Section
        | NodeKind::DebugData
        | NodeKind::FieldData => Ok(()),
        NodeKind::ZString => {
            let start = tree.node(id).span.start;
            let length = tree.buffer().zstring_len(start)?;
            tree.set_len(id, length);
            Ok(())
        }
        NodeKind::AlignedZString => {
            let start = tree.node(id).span.start;
            let length = tree.buffer().zstring_len(start)?;
            let padded = crate::utils::align_to(length, 4);
            tree.buffer().ensure(start, padded)?;
            tree.set_len(id, padded);
            Ok(())
        }
        NodeKind::PrefixedString => {
            let start = tree.node(id).span.start;
            let count = tree.buffer().read_le::<u16>(start)?;
            let length = 2 + usize::from(count) * 2;
            tree.buffer().ensure(start, length)?;
            tree.set_len(id, length);
            Ok(())
        }
        NodeKind::CompressedInt => {
            let start = tree.node(id).span.start;
            let (_, length) = tree.buffer().read_compressed_uint(start)?;
            tree.set_len(id, length);
            Ok(())
        }

        NodeKind::PeFile => pe::parse_image(tree, id),
        NodeKind::DosHeader => pe::dos::parse_dos_header(tree, id),
        NodeKind::PeHeader => pe::headers::parse_pe_header(tree, id),
        NodeKind::OptionalHeader => pe::headers::parse_optional_header(tree, id),
        NodeKind::StandardFields => pe::headers::parse_standard_fields(tree, id),
        NodeKind::WindowsFields => pe::headers::parse_windows_fields(tree, id),
        NodeKind::DataDirectories => pe::headers::parse_data_directories(tree, id),
        NodeKind::DataDirectory => pe::headers::parse_data_directory(tree, id),
        NodeKind::SectionTable => pe::sections::parse_section_table(tree, id),
        NodeKind::SectionHeader => pe::sections::parse_section_header(tree, id),
        NodeKind::ImportDirectory => pe::imports::parse_import_directory(tree, id),
        NodeKind::ImportDescriptor => pe::imports::parse_import_descriptor(tree, id),
        NodeKind::ImportThunks => pe::imports::parse_thunks(tree, id),
        NodeKind::ImportByName => pe::imports::parse_import_by_name(tree, id),
        NodeKind::ResourceDirectory => pe::resources::parse_resource_directory(tree, id),
        NodeKind::ResourceEntry => pe::resources::parse_resource_entry(tree, id),
        NodeKind::ResourceDataEntry => pe::resources::parse_resource_data_entry(tree, id),
        NodeKind::CertificateTable => pe::certificates::parse_certificate_table(tree, id),
        NodeKind::CertificateEntry => pe::certificates::parse_certificate_entry(tree, id),
        NodeKind::RelocationTable => pe::relocations::parse_relocation_table(tree, id),
        NodeKind::RelocationBlock => pe::relocations::parse_relocation_block(tree, id),
        NodeKind::DebugDirectory => pe::debug::parse_debug_directory(tree, id),
        NodeKind::DebugEntry => pe::debug::parse_debug_entry(tree, id),
        NodeKind::CodeView => pe::debug::parse_codeview(tree, id),
        NodeKind::PdbChecksum => pe::debug::parse_pdb_checksum(tree, id),
        NodeKind::EmbeddedPdb => pe::debug::parse_embedded_pdb(tree, id),

        NodeKind::CliHeader => metadata::cor20header::parse_cli_header(tree, id),
        NodeKind::VTableFixups => metadata::cor20header::parse_vtable_fixups(tree, id),
        NodeKind::MetadataRoot => metadata::root::parse_metadata_root(tree, id),
        NodeKind::StreamHeader => metadata::streams::parse_stream_header(tree, id),
        NodeKind::Heap(kind) => metadata::streams::parse_heap(tree, id, kind),
        NodeKind::BlobEntry => metadata::streams::blob::parse_blob_entry(tree, id),
        NodeKind::UserStringEntry => metadata::streams::userstrings::parse_user_string(tree, id),
        NodeKind::RowCounts => metadata::streams::tablesheader::parse_row_counts(tree, id),
        NodeKind::Table(table) => metadata::streams::tablesheader::parse_table(tree, id, table),
        NodeKind::Row(table) => metadata::streams::tablesheader::parse_row(tree, id, table),
        NodeKind::MethodBody => metadata::method::parse_method_body(tree, id),
        NodeKind::ExceptionSection => metadata::method::parse_exception_section(tree, id),
        NodeKind::ManagedResource => metadata::xref::parse_managed_resource(tree, id),
        NodeKind::DebugInfo(kind) => {
            metadata::customdebuginformation::parse_debug_info(tree, id, kind)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        assert_eq!(NodeKind::U32.fixed_size(), Some(4));
        assert_eq!(NodeKind::Guid.fixed_size(), Some(16));
        assert_eq!(NodeKind::ZString.fixed_size(), None);
        assert!(NodeKind::CompressedInt.is_value());
        assert!(!NodeKind::Bytes.is_value());
        assert!(NodeKind::Bytes.accepts_xref());
        assert!(NodeKind::Heap(HeapKind::Blob).accepts_xref());
        assert!(!NodeKind::U16.accepts_xref());
        assert!(!NodeKind::DosHeader.accepts_xref());
    }
}
