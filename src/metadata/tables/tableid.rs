use strum::{EnumCount, EnumIter, IntoEnumIterator, IntoStaticStr};

/// Identifiers for the metadata tables of ECMA-335 and of the Portable PDB format.
///
/// The discriminant of each variant is the bit position of the table in the `valid` and
/// `sorted` bit-vectors of the table stream header, and at the same time the order in which
/// the tables are laid out in the stream.
///
/// Bits 0x2D - 0x2F are reserved and bits above 0x37 are not defined; a table stream that sets
/// any of them cannot be decoded, because the size of the unknown rows is not known.
///
/// ## Reference
/// * ECMA-335 Partition II, Section 22 - Metadata Tables
/// * Portable PDB v1.0 Format Specification - Metadata tables
#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, EnumIter, EnumCount, IntoStaticStr,
)]
#[repr(u8)]
pub enum TableId {
    /// `Module` table (0x00) - the single row describing this module and its MVID.
    Module = 0x00,
    /// `TypeRef` table (0x01) - references to types of other modules and assemblies.
    TypeRef = 0x01,
    /// `TypeDef` table (0x02) - type definitions of this module.
    TypeDef = 0x02,
    /// `FieldPtr` table (0x03) - indirection table of uncompressed (`#-`) streams.
    FieldPtr = 0x03,
    /// `Field` table (0x04) - field definitions.
    Field = 0x04,
    /// `MethodPtr` table (0x05) - indirection table of uncompressed (`#-`) streams.
    MethodPtr = 0x05,
    /// `MethodDef` table (0x06) - method definitions, including the RVA of their bodies.
    MethodDef = 0x06,
    /// `ParamPtr` table (0x07) - indirection table of uncompressed (`#-`) streams.
    ParamPtr = 0x07,
    /// `Param` table (0x08) - method parameters.
    Param = 0x08,
    /// `InterfaceImpl` table (0x09) - interfaces implemented by types.
    InterfaceImpl = 0x09,
    /// `MemberRef` table (0x0A) - references to fields and methods.
    MemberRef = 0x0A,
    /// `Constant` table (0x0B) - compile-time constants.
    Constant = 0x0B,
    /// `CustomAttribute` table (0x0C) - custom attribute applications.
    CustomAttribute = 0x0C,
    /// `FieldMarshal` table (0x0D) - interop marshalling descriptors.
    FieldMarshal = 0x0D,
    /// `DeclSecurity` table (0x0E) - declarative security.
    DeclSecurity = 0x0E,
    /// `ClassLayout` table (0x0F) - explicit packing and class sizes.
    ClassLayout = 0x0F,
    /// `FieldLayout` table (0x10) - explicit field offsets.
    FieldLayout = 0x10,
    /// `StandAloneSig` table (0x11) - standalone signatures such as local variable lists.
    StandAloneSig = 0x11,
    /// `EventMap` table (0x12) - type to event list mapping.
    EventMap = 0x12,
    /// `EventPtr` table (0x13) - indirection table of uncompressed (`#-`) streams.
    EventPtr = 0x13,
    /// `Event` table (0x14) - event definitions.
    Event = 0x14,
    /// `PropertyMap` table (0x15) - type to property list mapping.
    PropertyMap = 0x15,
    /// `PropertyPtr` table (0x16) - indirection table of uncompressed (`#-`) streams.
    PropertyPtr = 0x16,
    /// `Property` table (0x17) - property definitions.
    Property = 0x17,
    /// `MethodSemantics` table (0x18) - accessor methods of properties and events.
    MethodSemantics = 0x18,
    /// `MethodImpl` table (0x19) - explicit method overrides.
    MethodImpl = 0x19,
    /// `ModuleRef` table (0x1A) - references to other modules.
    ModuleRef = 0x1A,
    /// `TypeSpec` table (0x1B) - type specifications.
    TypeSpec = 0x1B,
    /// `ImplMap` table (0x1C) - P/Invoke mappings.
    ImplMap = 0x1C,
    /// `FieldRVA` table (0x1D) - initial data of mapped static fields.
    FieldRVA = 0x1D,
    /// `EncLog` table (0x1E) - edit-and-continue log.
    EncLog = 0x1E,
    /// `EncMap` table (0x1F) - edit-and-continue token map.
    EncMap = 0x1F,
    /// `Assembly` table (0x20) - the assembly manifest.
    Assembly = 0x20,
    /// `AssemblyProcessor` table (0x21) - unused.
    AssemblyProcessor = 0x21,
    /// `AssemblyOS` table (0x22) - unused.
    AssemblyOS = 0x22,
    /// `AssemblyRef` table (0x23) - referenced assemblies.
    AssemblyRef = 0x23,
    /// `AssemblyRefProcessor` table (0x24) - unused.
    AssemblyRefProcessor = 0x24,
    /// `AssemblyRefOS` table (0x25) - unused.
    AssemblyRefOS = 0x25,
    /// `File` table (0x26) - other files of a multi-file assembly.
    File = 0x26,
    /// `ExportedType` table (0x27) - types forwarded or exported from other modules.
    ExportedType = 0x27,
    /// `ManifestResource` table (0x28) - managed resources.
    ManifestResource = 0x28,
    /// `NestedClass` table (0x29) - nesting relationships.
    NestedClass = 0x29,
    /// `GenericParam` table (0x2A) - generic parameters.
    GenericParam = 0x2A,
    /// `MethodSpec` table (0x2B) - generic method instantiations.
    MethodSpec = 0x2B,
    /// `GenericParamConstraint` table (0x2C) - constraints of generic parameters.
    GenericParamConstraint = 0x2C,
    /// `Document` table (0x30) - source documents of a Portable PDB.
    Document = 0x30,
    /// `MethodDebugInformation` table (0x31) - sequence points per method.
    MethodDebugInformation = 0x31,
    /// `LocalScope` table (0x32) - lexical scopes.
    LocalScope = 0x32,
    /// `LocalVariable` table (0x33) - local variable names.
    LocalVariable = 0x33,
    /// `LocalConstant` table (0x34) - local constants.
    LocalConstant = 0x34,
    /// `ImportScope` table (0x35) - namespace import scopes.
    ImportScope = 0x35,
    /// `StateMachineMethod` table (0x36) - kickoff methods of state machines.
    StateMachineMethod = 0x36,
    /// `CustomDebugInformation` table (0x37) - extensible debug information.
    CustomDebugInformation = 0x37,
}

impl TableId {
    /// Returns the table for a bit position of the presence vector, if one is defined.
    #[must_use]
    pub fn from_bit(bit: u8) -> Option<TableId> {
        TableId::iter().find(|table| *table as u8 == bit)
    }

    /// The table name as used in labels, e.g. `"MethodDef"`.
    #[must_use]
    pub fn name(self) -> &'static str {
        self.into()
    }

    /// Returns `true` for the tables only found in Portable PDB metadata.
    #[must_use]
    pub fn is_debug_table(self) -> bool {
        self as u8 >= TableId::Document as u8
    }

    /// The metadata token prefix of a row of this table.
    #[must_use]
    pub fn token(self, row: u32) -> u32 {
        (u32::from(self as u8) << 24) | row
    }
}
