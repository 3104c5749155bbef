//! Typed rows of the tables whose contents drive cross-reference resolution.
//!
//! Rows are decoded from the column values of [`crate::metadata::tables::TableStream`]; every
//! index keeps its raw value. Tables without a typed row are still fully laid out in the tree,
//! column by column.

use crate::metadata::tables::TableId;

/// A table row that can be built from its column values.
pub trait TableRow: Sized {
    /// The table the row belongs to
    const TABLE: TableId;

    /// Builds the row from the values of its columns, in schema order.
    ///
    /// # Arguments
    /// * `rid` - 1-based row id
    /// * `offset` - Absolute offset of the row
    /// * `values` - One value per column, widened to `u32`
    fn from_values(rid: u32, offset: usize, values: &[u32]) -> Self;
}

fn value(values: &[u32], column: usize) -> u32 {
    values.get(column).copied().unwrap_or_default()
}

/// The `Module` table, `TableId` = 0x00
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModuleRow {
    /// `RowID`
    pub rid: u32,
    /// Absolute offset of the row
    pub offset: usize,
    /// Reserved, shall be zero
    pub generation: u32,
    /// an index into the String heap
    pub name: u32,
    /// an index into the Guid heap, the module version id
    pub mvid: u32,
}

impl TableRow for ModuleRow {
    const TABLE: TableId = TableId::Module;

    fn from_values(rid: u32, offset: usize, values: &[u32]) -> Self {
        ModuleRow {
            rid,
            offset,
            generation: value(values, 0),
            name: value(values, 1),
            mvid: value(values, 2),
        }
    }
}

/// The `TypeDef` table, `TableId` = 0x02
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeDefRow {
    /// `RowID`
    pub rid: u32,
    /// Absolute offset of the row
    pub offset: usize,
    /// a 4-byte bitmask of type `TypeAttributes`
    pub flags: u32,
    /// an index into the String heap
    pub type_name: u32,
    /// an index into the String heap
    pub type_namespace: u32,
    /// a `TypeDefOrRef` coded index
    pub extends: u32,
    /// first row of the type's fields in the Field table
    pub field_list: u32,
    /// first row of the type's methods in the `MethodDef` table
    pub method_list: u32,
}

impl TableRow for TypeDefRow {
    const TABLE: TableId = TableId::TypeDef;

    fn from_values(rid: u32, offset: usize, values: &[u32]) -> Self {
        TypeDefRow {
            rid,
            offset,
            flags: value(values, 0),
            type_name: value(values, 1),
            type_namespace: value(values, 2),
            extends: value(values, 3),
            field_list: value(values, 4),
            method_list: value(values, 5),
        }
    }
}

/// The `Field` table, `TableId` = 0x04
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldRow {
    /// `RowID`
    pub rid: u32,
    /// Absolute offset of the row
    pub offset: usize,
    /// a 2-byte bitmask of type `FieldAttributes`
    pub flags: u32,
    /// an index into the String heap
    pub name: u32,
    /// an index into the Blob heap
    pub signature: u32,
}

impl TableRow for FieldRow {
    const TABLE: TableId = TableId::Field;

    fn from_values(rid: u32, offset: usize, values: &[u32]) -> Self {
        FieldRow {
            rid,
            offset,
            flags: value(values, 0),
            name: value(values, 1),
            signature: value(values, 2),
        }
    }
}

/// The `MethodDef` table, `TableId` = 0x06
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MethodDefRow {
    /// `RowID`
    pub rid: u32,
    /// Absolute offset of the row
    pub offset: usize,
    /// RVA of the method body, 0 for abstract, runtime and P/Invoke methods
    pub rva: u32,
    /// bitmask of `MethodImplAttributes`
    pub impl_flags: u32,
    /// bitmask of `MethodAttributes`
    pub flags: u32,
    /// an index into the String heap
    pub name: u32,
    /// an index into the Blob heap
    pub signature: u32,
    /// first row of the method's parameters in the Param table
    pub param_list: u32,
}

impl MethodDefRow {
    /// `MethodImplAttributes.CodeTypeMask`: IL, native, OPTIL or runtime
    pub const CODE_TYPE_MASK: u32 = 0x0003;
    /// `MethodImplAttributes.IL`
    pub const CODE_TYPE_IL: u32 = 0x0000;

    /// Returns `true` if the RVA points to a CIL method body.
    #[must_use]
    pub fn has_il_body(&self) -> bool {
        self.rva != 0 && self.impl_flags & Self::CODE_TYPE_MASK == Self::CODE_TYPE_IL
    }
}

impl TableRow for MethodDefRow {
    const TABLE: TableId = TableId::MethodDef;

    fn from_values(rid: u32, offset: usize, values: &[u32]) -> Self {
        MethodDefRow {
            rid,
            offset,
            rva: value(values, 0),
            impl_flags: value(values, 1),
            flags: value(values, 2),
            name: value(values, 3),
            signature: value(values, 4),
            param_list: value(values, 5),
        }
    }
}

/// The `ClassLayout` table, `TableId` = 0x0F
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassLayoutRow {
    /// `RowID`
    pub rid: u32,
    /// Absolute offset of the row
    pub offset: usize,
    /// field alignment in bytes
    pub packing_size: u32,
    /// size of the type in bytes
    pub class_size: u32,
    /// an index into the `TypeDef` table
    pub parent: u32,
}

impl TableRow for ClassLayoutRow {
    const TABLE: TableId = TableId::ClassLayout;

    fn from_values(rid: u32, offset: usize, values: &[u32]) -> Self {
        ClassLayoutRow {
            rid,
            offset,
            packing_size: value(values, 0),
            class_size: value(values, 1),
            parent: value(values, 2),
        }
    }
}

/// The `FieldRVA` table, `TableId` = 0x1D
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldRvaRow {
    /// `RowID`
    pub rid: u32,
    /// Absolute offset of the row
    pub offset: usize,
    /// RVA of the field's initial data
    pub rva: u32,
    /// an index into the Field table
    pub field: u32,
}

impl TableRow for FieldRvaRow {
    const TABLE: TableId = TableId::FieldRVA;

    fn from_values(rid: u32, offset: usize, values: &[u32]) -> Self {
        FieldRvaRow {
            rid,
            offset,
            rva: value(values, 0),
            field: value(values, 1),
        }
    }
}

/// The `ManifestResource` table, `TableId` = 0x28
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ManifestResourceRow {
    /// `RowID`
    pub rid: u32,
    /// Absolute offset of the row
    pub offset: usize,
    /// offset of the resource inside the CLI resources directory, for embedded resources
    pub data_offset: u32,
    /// a 4-byte bitmask of type `ManifestResourceAttributes`
    pub flags: u32,
    /// an index into the String heap
    pub name: u32,
    /// an `Implementation` coded index, 0 for a resource embedded in this file
    pub implementation: u32,
}

impl ManifestResourceRow {
    /// Returns `true` if the resource data lives in this file's CLI resources directory.
    #[must_use]
    pub fn is_embedded(&self) -> bool {
        self.implementation == 0
    }
}

impl TableRow for ManifestResourceRow {
    const TABLE: TableId = TableId::ManifestResource;

    fn from_values(rid: u32, offset: usize, values: &[u32]) -> Self {
        ManifestResourceRow {
            rid,
            offset,
            data_offset: value(values, 0),
            flags: value(values, 1),
            name: value(values, 2),
            implementation: value(values, 3),
        }
    }
}

/// The `CustomDebugInformation` table of a portable PDB, `TableId` = 0x37
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CustomDebugInformationRow {
    /// `RowID`
    pub rid: u32,
    /// Absolute offset of the row
    pub offset: usize,
    /// a `HasCustomDebugInformation` coded index
    pub parent: u32,
    /// an index into the Guid heap identifying the kind of information
    pub kind: u32,
    /// an index into the Blob heap
    pub value: u32,
}

impl TableRow for CustomDebugInformationRow {
    const TABLE: TableId = TableId::CustomDebugInformation;

    fn from_values(rid: u32, offset: usize, values: &[u32]) -> Self {
        CustomDebugInformationRow {
            rid,
            offset,
            parent: value(values, 0),
            kind: value(values, 1),
            value: value(values, 2),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::tables::columns;

    #[test]
    fn column_order() {
        let names: Vec<_> = columns(TableId::MethodDef).iter().map(|(n, _)| *n).collect();
        assert_eq!(names[0], "RVA");
        assert_eq!(names[1], "ImplFlags");

        let names: Vec<_> = columns(TableId::ManifestResource)
            .iter()
            .map(|(n, _)| *n)
            .collect();
        assert_eq!(names, ["Offset", "Flags", "Name", "Implementation"]);
    }

    #[test]
    fn method_bodies() {
        let method = MethodDefRow::from_values(3, 0x100, &[0x2050, 0, 0x96, 1, 2, 1]);
        assert_eq!(method.rid, 3);
        assert!(method.has_il_body());

        let native = MethodDefRow::from_values(1, 0, &[0x2050, 0x0001, 0, 0, 0, 0]);
        assert!(!native.has_il_body());

        let missing = MethodDefRow::from_values(1, 0, &[]);
        assert!(!missing.has_il_body());
    }

    #[test]
    fn embedded_resources() {
        let local = ManifestResourceRow::from_values(1, 0, &[0x10, 1, 5, 0]);
        assert!(local.is_embedded());

        // File row 1 (tag 0), AssemblyRef row 1 (tag 1)
        let file = ManifestResourceRow::from_values(2, 0, &[0, 1, 5, 1 << 2]);
        assert!(!file.is_embedded());
        let assembly = ManifestResourceRow::from_values(3, 0, &[0, 1, 5, (1 << 2) | 1]);
        assert!(!assembly.is_embedded());
    }
}
