use strum::{EnumCount, IntoEnumIterator};

use crate::{
    file::ByteBuffer,
    metadata::tables::{coded_index_size, CodedIndexType, TableId},
    Error::UnsupportedTableKind,
    Result,
};

/// Row counts of every table a table stream can reference.
///
/// A `RowCounts` is only ever produced complete: either by reading all counts announced by a
/// presence vector in one go, or from an explicit list. [`TableInfo`], which derives all index
/// widths, can only be built from a `RowCounts`, so no width is computed from a partial set of
/// counts.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct RowCounts {
    counts: [u32; 64],
    present: u64,
}

impl RowCounts {
    /// Reads one `u32` row count per bit set in `valid`, starting at `offset`.
    ///
    /// # Arguments
    /// * `buffer` - The image buffer
    /// * `offset` - Absolute offset of the first row count
    /// * `valid` - The presence bit-vector of the table stream
    /// * `stream_offset` - Absolute offset of the table stream, for error reporting
    ///
    /// # Errors
    /// Returns [`crate::Error::UnsupportedTableKind`] if `valid` announces a table without a
    /// known schema, or [`crate::Error::TruncatedBuffer`] if the counts exceed the buffer.
    pub fn read(
        buffer: &ByteBuffer,
        offset: usize,
        valid: u64,
        stream_offset: usize,
    ) -> Result<RowCounts> {
        let mut counts = [0_u32; 64];
        let mut cursor = offset;

        for bit in 0..64_u8 {
            if valid & (1 << bit) == 0 {
                continue;
            }
            if TableId::from_bit(bit).is_none() {
                return Err(UnsupportedTableKind {
                    table: bit,
                    offset: stream_offset,
                });
            }

            counts[bit as usize] = buffer.read_le::<u32>(cursor)?;
            cursor += 4;
        }

        Ok(RowCounts {
            counts,
            present: valid,
        })
    }

    /// Builds row counts from an explicit `(table, rows)` list.
    #[must_use]
    pub fn from_tables(tables: &[(TableId, u32)]) -> RowCounts {
        let mut counts = [0_u32; 64];
        let mut present = 0_u64;
        for (table, rows) in tables {
            counts[*table as usize] = *rows;
            present |= 1 << (*table as u8);
        }
        RowCounts { counts, present }
    }

    /// Adds the counts of tables that live in another stream, as the type-system row counts a
    /// Portable PDB references from its `#Pdb` stream. Tables present in `self` keep their own
    /// counts.
    #[must_use]
    pub fn with_referenced(mut self, referenced: &RowCounts) -> RowCounts {
        for table in referenced.tables() {
            if !self.is_present(table) {
                self.counts[table as usize] = referenced.rows(table);
            }
        }
        self
    }

    /// Number of rows of `table`; `0` for absent tables.
    #[must_use]
    pub fn rows(&self, table: TableId) -> u32 {
        self.counts[table as usize]
    }

    /// Returns `true` if the presence vector announced `table`.
    #[must_use]
    pub fn is_present(&self, table: TableId) -> bool {
        self.present & (1 << (table as u8)) != 0
    }

    /// The announced tables, in stream order.
    pub fn tables(&self) -> impl Iterator<Item = TableId> + '_ {
        TableId::iter().filter(|table| self.is_present(*table))
    }

    /// The presence bit-vector these counts were built for.
    #[must_use]
    pub fn present(&self) -> u64 {
        self.present
    }

    /// Number of announced tables, which is the number of row count fields in the header.
    #[must_use]
    pub fn len(&self) -> usize {
        self.present.count_ones() as usize
    }

    /// Returns `true` if no table is announced.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.present == 0
    }
}

/// Widths of heap indices (2 or 4 bytes each), from the heap-size flags.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct HeapSizes {
    /// Indices into `#Strings` are 4 bytes wide
    pub wide_strings: bool,
    /// Indices into `#GUID` are 4 bytes wide
    pub wide_guid: bool,
    /// Indices into `#Blob` are 4 bytes wide
    pub wide_blob: bool,
}

impl HeapSizes {
    /// Extra data flag: a 4-byte value follows the row counts.
    pub const EXTRA_DATA: u8 = 0x40;

    /// Decodes the heap-size flags byte of the table stream header.
    #[must_use]
    pub fn from_flags(flags: u8) -> HeapSizes {
        HeapSizes {
            wide_strings: flags & 0x01 != 0,
            wide_guid: flags & 0x02 != 0,
            wide_blob: flags & 0x04 != 0,
        }
    }
}

fn width(wide: bool) -> usize {
    if wide {
        4
    } else {
        2
    }
}

/// Index widths of one table stream, computed from its complete row counts and heap sizes.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct TableInfo {
    counts: RowCounts,
    heaps: HeapSizes,
    coded_indexes: [usize; CodedIndexType::COUNT],
}

impl TableInfo {
    /// Computes all index widths.
    #[must_use]
    pub fn new(counts: RowCounts, heaps: HeapSizes) -> TableInfo {
        let mut coded_indexes = [2_usize; CodedIndexType::COUNT];
        for kind in CodedIndexType::iter() {
            coded_indexes[kind as usize] =
                coded_index_size(kind.tag_bits(), kind.tables().map(|t| counts.rows(t)));
        }

        TableInfo {
            counts,
            heaps,
            coded_indexes,
        }
    }

    /// The row counts these widths were derived from.
    #[must_use]
    pub fn counts(&self) -> &RowCounts {
        &self.counts
    }

    /// The heap index widths.
    #[must_use]
    pub fn heaps(&self) -> HeapSizes {
        self.heaps
    }

    /// Width of an index into `table`: 2 bytes below 65536 rows, 4 otherwise.
    #[must_use]
    pub fn table_index_size(&self, table: TableId) -> usize {
        width(self.counts.rows(table) >= 1 << 16)
    }

    /// Width of a coded index of the given kind.
    #[must_use]
    pub fn coded_index_size(&self, kind: CodedIndexType) -> usize {
        self.coded_indexes[kind as usize]
    }

    /// Width of a `#Strings` index.
    #[must_use]
    pub fn str_size(&self) -> usize {
        width(self.heaps.wide_strings)
    }

    /// Width of a `#GUID` index.
    #[must_use]
    pub fn guid_size(&self) -> usize {
        width(self.heaps.wide_guid)
    }

    /// Width of a `#Blob` index.
    #[must_use]
    pub fn blob_size(&self) -> usize {
        width(self.heaps.wide_blob)
    }
}
