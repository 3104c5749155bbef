//! # Coded Index Types Module
//!
//! Coded indices combine a table identifier and a row index into a single value: the lower
//! `tag_bits` bits select the target table, the remaining bits hold the 1-based row. Their
//! stored width (2 or 4 bytes) depends on the row counts of all target tables, which is why a
//! row layout can only be computed once every row count of the stream is known.
//!
//! ## Key Components
//!
//! - [`crate::metadata::tables::CodedIndexType`]: the 14 coded index kinds of ECMA-335 and
//!   Portable PDB
//! - [`crate::metadata::tables::coded_index_size`]: the width rule for an arbitrary tag width
//!   and target list
//!
//! ## References
//!
//! - ECMA-335 6th Edition, Partition II, Section 24.2.6

use strum::{EnumCount, EnumIter};

use crate::metadata::tables::TableId;

/// Represents all coded index types defined by ECMA-335 and the Portable PDB format.
///
/// A coded index type defines which combination of metadata tables can be referenced by a
/// particular coded index column. Unused tag values (as in `CustomAttributeType`) are kept as
/// empty slots so that tags decode to the right table.
#[derive(Debug, Hash, Eq, PartialEq, Clone, Copy, EnumIter, EnumCount)]
#[repr(usize)]
pub enum CodedIndexType {
    /// References `TypeDef`, `TypeRef`, or `TypeSpec` tables.
    TypeDefOrRef,
    /// References `Field`, `Param`, or `Property` tables.
    HasConstant,
    /// References any entity that can carry custom attributes (22 tables).
    HasCustomAttribute,
    /// References `Field` or `Param` tables.
    HasFieldMarshal,
    /// References `TypeDef`, `MethodDef`, or `Assembly` tables.
    HasDeclSecurity,
    /// References `TypeDef`, `TypeRef`, `ModuleRef`, `MethodDef`, or `TypeSpec` tables.
    MemberRefParent,
    /// References `Event` or `Property` tables.
    HasSemantics,
    /// References `MethodDef` or `MemberRef` tables.
    MethodDefOrRef,
    /// References `Field` or `MethodDef` tables.
    MemberForwarded,
    /// References `File`, `AssemblyRef`, or `ExportedType` tables.
    Implementation,
    /// References `MethodDef` or `MemberRef` tables; tags 0, 1 and 4 are unused.
    CustomAttributeType,
    /// References `Module`, `ModuleRef`, `AssemblyRef`, or `TypeRef` tables.
    ResolutionScope,
    /// References `TypeDef` or `MethodDef` tables.
    TypeOrMethodDef,
    /// References any entity that can carry custom debug information (27 tables).
    HasCustomDebugInformation,
}

const HAS_CUSTOM_ATTRIBUTE: [Option<TableId>; 22] = [
    Some(TableId::MethodDef),
    Some(TableId::Field),
    Some(TableId::TypeRef),
    Some(TableId::TypeDef),
    Some(TableId::Param),
    Some(TableId::InterfaceImpl),
    Some(TableId::MemberRef),
    Some(TableId::Module),
    // ECMA-335 names this 'Permission', which is the DeclSecurity table
    Some(TableId::DeclSecurity),
    Some(TableId::Property),
    Some(TableId::Event),
    Some(TableId::StandAloneSig),
    Some(TableId::ModuleRef),
    Some(TableId::TypeSpec),
    Some(TableId::Assembly),
    Some(TableId::AssemblyRef),
    Some(TableId::File),
    Some(TableId::ExportedType),
    Some(TableId::ManifestResource),
    Some(TableId::GenericParam),
    Some(TableId::GenericParamConstraint),
    Some(TableId::MethodSpec),
];

const HAS_CUSTOM_DEBUG_INFORMATION: [Option<TableId>; 27] = [
    Some(TableId::MethodDef),
    Some(TableId::Field),
    Some(TableId::TypeRef),
    Some(TableId::TypeDef),
    Some(TableId::Param),
    Some(TableId::InterfaceImpl),
    Some(TableId::MemberRef),
    Some(TableId::Module),
    Some(TableId::DeclSecurity),
    Some(TableId::Property),
    Some(TableId::Event),
    Some(TableId::StandAloneSig),
    Some(TableId::ModuleRef),
    Some(TableId::TypeSpec),
    Some(TableId::Assembly),
    Some(TableId::AssemblyRef),
    Some(TableId::File),
    Some(TableId::ExportedType),
    Some(TableId::ManifestResource),
    Some(TableId::GenericParam),
    Some(TableId::GenericParamConstraint),
    Some(TableId::MethodSpec),
    Some(TableId::Document),
    Some(TableId::LocalScope),
    Some(TableId::LocalVariable),
    Some(TableId::LocalConstant),
    Some(TableId::ImportScope),
];

impl CodedIndexType {
    /// Returns the target tables by tag value. `None` marks a tag value that is not used.
    #[must_use]
    pub fn targets(&self) -> &'static [Option<TableId>] {
        match self {
            CodedIndexType::TypeDefOrRef => &[
                Some(TableId::TypeDef),
                Some(TableId::TypeRef),
                Some(TableId::TypeSpec),
            ],
            CodedIndexType::HasConstant => &[
                Some(TableId::Field),
                Some(TableId::Param),
                Some(TableId::Property),
            ],
            CodedIndexType::HasCustomAttribute => &HAS_CUSTOM_ATTRIBUTE,
            CodedIndexType::HasFieldMarshal => &[Some(TableId::Field), Some(TableId::Param)],
            CodedIndexType::HasDeclSecurity => &[
                Some(TableId::TypeDef),
                Some(TableId::MethodDef),
                Some(TableId::Assembly),
            ],
            CodedIndexType::MemberRefParent => &[
                Some(TableId::TypeDef),
                Some(TableId::TypeRef),
                Some(TableId::ModuleRef),
                Some(TableId::MethodDef),
                Some(TableId::TypeSpec),
            ],
            CodedIndexType::HasSemantics => &[Some(TableId::Event), Some(TableId::Property)],
            CodedIndexType::MethodDefOrRef => {
                &[Some(TableId::MethodDef), Some(TableId::MemberRef)]
            }
            CodedIndexType::MemberForwarded => &[Some(TableId::Field), Some(TableId::MethodDef)],
            CodedIndexType::Implementation => &[
                Some(TableId::File),
                Some(TableId::AssemblyRef),
                Some(TableId::ExportedType),
            ],
            CodedIndexType::CustomAttributeType => &[
                None,
                None,
                Some(TableId::MethodDef),
                Some(TableId::MemberRef),
                None,
            ],
            CodedIndexType::ResolutionScope => &[
                Some(TableId::Module),
                Some(TableId::ModuleRef),
                Some(TableId::AssemblyRef),
                Some(TableId::TypeRef),
            ],
            CodedIndexType::TypeOrMethodDef => &[Some(TableId::TypeDef), Some(TableId::MethodDef)],
            CodedIndexType::HasCustomDebugInformation => &HAS_CUSTOM_DEBUG_INFORMATION,
        }
    }

    /// The tables this coded index can reference.
    pub fn tables(&self) -> impl Iterator<Item = TableId> {
        self.targets().iter().filter_map(|target| *target)
    }

    /// Number of low bits holding the tag.
    #[must_use]
    pub fn tag_bits(&self) -> u8 {
        match self {
            CodedIndexType::HasFieldMarshal
            | CodedIndexType::HasSemantics
            | CodedIndexType::MethodDefOrRef
            | CodedIndexType::MemberForwarded
            | CodedIndexType::TypeOrMethodDef => 1,
            CodedIndexType::TypeDefOrRef
            | CodedIndexType::HasConstant
            | CodedIndexType::HasDeclSecurity
            | CodedIndexType::Implementation
            | CodedIndexType::ResolutionScope => 2,
            CodedIndexType::MemberRefParent | CodedIndexType::CustomAttributeType => 3,
            CodedIndexType::HasCustomAttribute | CodedIndexType::HasCustomDebugInformation => 5,
        }
    }

    /// Splits a stored value into target table and row. Returns `None` for tags without a
    /// target table.
    #[must_use]
    pub fn decode(&self, value: u32) -> Option<(TableId, u32)> {
        let tag_bits = self.tag_bits();
        let tag = value & ((1 << tag_bits) - 1);
        let table = self.targets().get(tag as usize).copied().flatten()?;
        Some((table, value >> tag_bits))
    }
}

/// Width in bytes of a coded index with `tag_bits` tag bits over tables with the given row
/// counts: 2 if every count is below `2^(16 - tag_bits)`, 4 otherwise.
///
/// ```rust
/// use dotlayout::metadata::tables::coded_index_size;
///
/// assert_eq!(coded_index_size(2, [16_383, 12]), 2);
/// assert_eq!(coded_index_size(2, [65_536, 12]), 4);
/// ```
pub fn coded_index_size(tag_bits: u8, row_counts: impl IntoIterator<Item = u32>) -> usize {
    let limit = 1_u32 << (16 - u32::from(tag_bits));
    let max_rows = row_counts.into_iter().max().unwrap_or(0);
    if max_rows < limit {
        2
    } else {
        4
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn tag_bits_cover_targets() {
        for kind in CodedIndexType::iter() {
            assert!(
                kind.targets().len() <= 1 << kind.tag_bits(),
                "{kind:?} has more targets than tag values"
            );
        }
        assert_eq!(CodedIndexType::COUNT, 14);
    }

    #[test]
    fn synthetic_width_boundaries() {
        assert_eq!(coded_index_size(2, [16_383, 0]), 2);
        assert_eq!(coded_index_size(2, [16_384, 0]), 4);
        assert_eq!(coded_index_size(2, [0, 65_536]), 4);
        assert_eq!(coded_index_size(5, [2_047]), 2);
        assert_eq!(coded_index_size(5, [2_048]), 4);
        assert_eq!(coded_index_size(1, []), 2);
    }

    #[test]
    fn decode() {
        assert_eq!(
            CodedIndexType::TypeDefOrRef.decode(0x09),
            Some((TableId::TypeDef, 2))
        );
        assert_eq!(
            CodedIndexType::TypeDefOrRef.decode(0x0D),
            Some((TableId::TypeRef, 3))
        );
        assert_eq!(CodedIndexType::TypeDefOrRef.decode(0x03), None);
        assert_eq!(
            CodedIndexType::CustomAttributeType.decode(0x0B),
            Some((TableId::MemberRef, 1))
        );
        assert_eq!(CodedIndexType::CustomAttributeType.decode(0x08), None);
        assert_eq!(
            CodedIndexType::Implementation.decode(0),
            Some((TableId::File, 0))
        );
    }
}
