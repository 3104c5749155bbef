//! Column layouts of all metadata tables.
//!
//! Each table is described by an ordered list of named columns. A column is either a fixed
//! size scalar or an index whose width is only known per stream: heap indices depend on the
//! heap-size flags, table indices on the row count of the target table and coded indices on the
//! row counts of all their targets. [`crate::metadata::tables::TableInfo::column_size`] turns a
//! column into its width for one stream.
//!
//! # Reference
//! * ECMA-335 Partition II, Section 22
//! * Portable PDB v1.0 Format Specification

use crate::metadata::tables::{CodedIndexType, TableId, TableInfo};

/// The type of one table column.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Column {
    /// 1-byte constant
    U8,
    /// 2-byte constant
    U16,
    /// 4-byte constant
    U32,
    /// Index into the `#Strings` heap
    Str,
    /// Index into the `#GUID` heap
    Guid,
    /// Index into the `#Blob` heap
    Blob,
    /// Index into another table
    Table(TableId),
    /// Coded index
    Coded(CodedIndexType),
}

use CodedIndexType as C;
use Column::{Blob, Coded, Guid, Str, Table, U16, U32, U8};
use TableId as T;

/// Returns the ordered `(name, column)` list of `table`.
#[must_use]
pub fn columns(table: TableId) -> &'static [(&'static str, Column)] {
    match table {
        T::Module => &[
            ("Generation", U16),
            ("Name", Str),
            ("Mvid", Guid),
            ("EncId", Guid),
            ("EncBaseId", Guid),
        ],
        T::TypeRef => &[
            ("ResolutionScope", Coded(C::ResolutionScope)),
            ("TypeName", Str),
            ("TypeNamespace", Str),
        ],
        T::TypeDef => &[
            ("Flags", U32),
            ("TypeName", Str),
            ("TypeNamespace", Str),
            ("Extends", Coded(C::TypeDefOrRef)),
            ("FieldList", Table(T::Field)),
            ("MethodList", Table(T::MethodDef)),
        ],
        T::FieldPtr => &[("Field", Table(T::Field))],
        T::Field => &[("Flags", U16), ("Name", Str), ("Signature", Blob)],
        T::MethodPtr => &[("Method", Table(T::MethodDef))],
        T::MethodDef => &[
            ("RVA", U32),
            ("ImplFlags", U16),
            ("Flags", U16),
            ("Name", Str),
            ("Signature", Blob),
            ("ParamList", Table(T::Param)),
        ],
        T::ParamPtr => &[("Param", Table(T::Param))],
        T::Param => &[("Flags", U16), ("Sequence", U16), ("Name", Str)],
        T::InterfaceImpl => &[
            ("Class", Table(T::TypeDef)),
            ("Interface", Coded(C::TypeDefOrRef)),
        ],
        T::MemberRef => &[
            ("Class", Coded(C::MemberRefParent)),
            ("Name", Str),
            ("Signature", Blob),
        ],
        T::Constant => &[
            ("Type", U8),
            ("Padding", U8),
            ("Parent", Coded(C::HasConstant)),
            ("Value", Blob),
        ],
        T::CustomAttribute => &[
            ("Parent", Coded(C::HasCustomAttribute)),
            ("Type", Coded(C::CustomAttributeType)),
            ("Value", Blob),
        ],
        T::FieldMarshal => &[
            ("Parent", Coded(C::HasFieldMarshal)),
            ("NativeType", Blob),
        ],
        T::DeclSecurity => &[
            ("Action", U16),
            ("Parent", Coded(C::HasDeclSecurity)),
            ("PermissionSet", Blob),
        ],
        T::ClassLayout => &[
            ("PackingSize", U16),
            ("ClassSize", U32),
            ("Parent", Table(T::TypeDef)),
        ],
        T::FieldLayout => &[("Offset", U32), ("Field", Table(T::Field))],
        T::StandAloneSig => &[("Signature", Blob)],
        T::EventMap => &[
            ("Parent", Table(T::TypeDef)),
            ("EventList", Table(T::Event)),
        ],
        T::EventPtr => &[("Event", Table(T::Event))],
        T::Event => &[
            ("EventFlags", U16),
            ("Name", Str),
            ("EventType", Coded(C::TypeDefOrRef)),
        ],
        T::PropertyMap => &[
            ("Parent", Table(T::TypeDef)),
            ("PropertyList", Table(T::Property)),
        ],
        T::PropertyPtr => &[("Property", Table(T::Property))],
        T::Property => &[("Flags", U16), ("Name", Str), ("Type", Blob)],
        T::MethodSemantics => &[
            ("Semantics", U16),
            ("Method", Table(T::MethodDef)),
            ("Association", Coded(C::HasSemantics)),
        ],
        T::MethodImpl => &[
            ("Class", Table(T::TypeDef)),
            ("MethodBody", Coded(C::MethodDefOrRef)),
            ("MethodDeclaration", Coded(C::MethodDefOrRef)),
        ],
        T::ModuleRef => &[("Name", Str)],
        T::TypeSpec => &[("Signature", Blob)],
        T::ImplMap => &[
            ("MappingFlags", U16),
            ("MemberForwarded", Coded(C::MemberForwarded)),
            ("ImportName", Str),
            ("ImportScope", Table(T::ModuleRef)),
        ],
        T::FieldRVA => &[("RVA", U32), ("Field", Table(T::Field))],
        T::EncLog => &[("Token", U32), ("FuncCode", U32)],
        T::EncMap => &[("Token", U32)],
        T::Assembly => &[
            ("HashAlgId", U32),
            ("MajorVersion", U16),
            ("MinorVersion", U16),
            ("BuildNumber", U16),
            ("RevisionNumber", U16),
            ("Flags", U32),
            ("PublicKey", Blob),
            ("Name", Str),
            ("Culture", Str),
        ],
        T::AssemblyProcessor => &[("Processor", U32)],
        T::AssemblyOS => &[
            ("OSPlatformId", U32),
            ("OSMajorVersion", U32),
            ("OSMinorVersion", U32),
        ],
        T::AssemblyRef => &[
            ("MajorVersion", U16),
            ("MinorVersion", U16),
            ("BuildNumber", U16),
            ("RevisionNumber", U16),
            ("Flags", U32),
            ("PublicKeyOrToken", Blob),
            ("Name", Str),
            ("Culture", Str),
            ("HashValue", Blob),
        ],
        T::AssemblyRefProcessor => &[
            ("Processor", U32),
            ("AssemblyRef", Table(T::AssemblyRef)),
        ],
        T::AssemblyRefOS => &[
            ("OSPlatformId", U32),
            ("OSMajorVersion", U32),
            ("OSMinorVersion", U32),
            ("AssemblyRef", Table(T::AssemblyRef)),
        ],
        T::File => &[("Flags", U32), ("Name", Str), ("HashValue", Blob)],
        T::ExportedType => &[
            ("Flags", U32),
            ("TypeDefId", U32),
            ("TypeName", Str),
            ("TypeNamespace", Str),
            ("Implementation", Coded(C::Implementation)),
        ],
        T::ManifestResource => &[
            ("Offset", U32),
            ("Flags", U32),
            ("Name", Str),
            ("Implementation", Coded(C::Implementation)),
        ],
        T::NestedClass => &[
            ("NestedClass", Table(T::TypeDef)),
            ("EnclosingClass", Table(T::TypeDef)),
        ],
        T::GenericParam => &[
            ("Number", U16),
            ("Flags", U16),
            ("Owner", Coded(C::TypeOrMethodDef)),
            ("Name", Str),
        ],
        T::MethodSpec => &[
            ("Method", Coded(C::MethodDefOrRef)),
            ("Instantiation", Blob),
        ],
        T::GenericParamConstraint => &[
            ("Owner", Table(T::GenericParam)),
            ("Constraint", Coded(C::TypeDefOrRef)),
        ],
        T::Document => &[
            ("Name", Blob),
            ("HashAlgorithm", Guid),
            ("Hash", Blob),
            ("Language", Guid),
        ],
        T::MethodDebugInformation => &[
            ("Document", Table(T::Document)),
            ("SequencePoints", Blob),
        ],
        T::LocalScope => &[
            ("Method", Table(T::MethodDef)),
            ("ImportScope", Table(T::ImportScope)),
            ("VariableList", Table(T::LocalVariable)),
            ("ConstantList", Table(T::LocalConstant)),
            ("StartOffset", U32),
            ("Length", U32),
        ],
        T::LocalVariable => &[("Attributes", U16), ("Index", U16), ("Name", Str)],
        T::LocalConstant => &[("Name", Str), ("Signature", Blob)],
        T::ImportScope => &[("Parent", Table(T::ImportScope)), ("Imports", Blob)],
        T::StateMachineMethod => &[
            ("MoveNextMethod", Table(T::MethodDef)),
            ("KickoffMethod", Table(T::MethodDef)),
        ],
        T::CustomDebugInformation => &[
            ("Parent", Coded(C::HasCustomDebugInformation)),
            ("Kind", Guid),
            ("Value", Blob),
        ],
    }
}

impl TableInfo {
    /// Width of one column in this stream.
    #[must_use]
    pub fn column_size(&self, column: Column) -> usize {
        match column {
            Column::U8 => 1,
            Column::U16 => 2,
            Column::U32 => 4,
            Column::Str => self.str_size(),
            Column::Guid => self.guid_size(),
            Column::Blob => self.blob_size(),
            Column::Table(table) => self.table_index_size(table),
            Column::Coded(kind) => self.coded_index_size(kind),
        }
    }

    /// Size of one row of `table`, the sum of its column widths.
    #[must_use]
    pub fn row_size(&self, table: TableId) -> usize {
        columns(table)
            .iter()
            .map(|(_, column)| self.column_size(*column))
            .sum()
    }
}
