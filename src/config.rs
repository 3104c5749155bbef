//! Parse and diff configuration.
//!
//! Both structs are plain values with public fields; [`Default`] gives the full decode and the
//! presets cover the common alternatives.
//!
//! ```rust
//! use dotlayout::{DiffConfig, ParseConfig};
//!
//! let headers = ParseConfig::headers_only();
//! assert!(!headers.resolve_method_bodies);
//! assert!(headers.fill_gaps);
//!
//! let diff = DiffConfig {
//!     compare_embedded_pdb: false,
//!     ..DiffConfig::default()
//! };
//! assert_eq!(diff.max_lcs_cells, 16 * 1024 * 1024);
//! ```

/// Default upper bound for the decompressed size of an embedded portable PDB.
pub const MAX_EMBEDDED_PDB_SIZE: usize = 256 * 1024 * 1024;

/// Default upper bound for the LCS table of one child alignment.
pub const MAX_LCS_CELLS: usize = 16 * 1024 * 1024;

/// Controls which optional parts of an image are decoded.
///
/// Structures that are skipped stay covered: their bytes end up in the enclosing section or
/// heap and, with [`ParseConfig::fill_gaps`], in padding leaves.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseConfig {
    /// Inflate embedded portable PDBs and parse them as independent trees
    pub decode_embedded_pdb: bool,
    /// Insert method bodies referenced by `MethodDef` rows
    pub resolve_method_bodies: bool,
    /// Insert mapped data referenced by `FieldRVA` rows
    pub resolve_field_data: bool,
    /// Insert embedded managed resources referenced by `ManifestResource` rows
    pub resolve_resources: bool,
    /// Decode the blobs of well-known `CustomDebugInformation` kinds
    pub decode_custom_debug_info: bool,
    /// Cover all unclaimed bytes with padding leaves after parsing
    pub fill_gaps: bool,
    /// Larger embedded PDBs are rejected as malformed
    pub max_embedded_pdb_size: usize,
}

impl ParseConfig {
    /// Decodes everything. Same as [`ParseConfig::default`].
    #[must_use]
    pub fn full() -> ParseConfig {
        ParseConfig::default()
    }

    /// Decodes the PE and metadata headers, heaps and tables, but follows none of the
    /// references from table rows and does not inflate embedded PDBs.
    #[must_use]
    pub fn headers_only() -> ParseConfig {
        ParseConfig {
            decode_embedded_pdb: false,
            resolve_method_bodies: false,
            resolve_field_data: false,
            resolve_resources: false,
            decode_custom_debug_info: false,
            ..ParseConfig::default()
        }
    }
}

impl Default for ParseConfig {
    fn default() -> Self {
        ParseConfig {
            decode_embedded_pdb: true,
            resolve_method_bodies: true,
            resolve_field_data: true,
            resolve_resources: true,
            decode_custom_debug_info: true,
            fill_gaps: true,
            max_embedded_pdb_size: MAX_EMBEDDED_PDB_SIZE,
        }
    }
}

/// Controls the difference engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiffConfig {
    /// Child lists whose trimmed LCS table would exceed this many cells are aligned by
    /// position instead
    pub max_lcs_cells: usize,
    /// Also diff the trees of embedded PDBs present on both sides
    pub compare_embedded_pdb: bool,
}

impl Default for DiffConfig {
    fn default() -> Self {
        DiffConfig {
            max_lcs_cells: MAX_LCS_CELLS,
            compare_embedded_pdb: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets() {
        assert_eq!(ParseConfig::full(), ParseConfig::default());

        let headers = ParseConfig::headers_only();
        assert!(!headers.decode_embedded_pdb);
        assert!(!headers.decode_custom_debug_info);
        assert_eq!(headers.max_embedded_pdb_size, MAX_EMBEDDED_PDB_SIZE);
    }
}
