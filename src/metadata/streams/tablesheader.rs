//! The compressed metadata table stream (`#~`, and `#-` for uncompressed metadata).
//!
//! # Structure
//!
//! ```text
//! Offset  Size  Field
//! 0       4     Reserved
//! 4       1     MajorVersion
//! 5       1     MinorVersion
//! 6       1     HeapSizes       bit 0: wide #Strings, bit 1: wide #GUID, bit 2: wide #Blob,
//!                               0x40: 4 extra bytes after the row counts
//! 7       1     Reserved
//! 8       8     Valid           bit n set: table n is present
//! 16      8     Sorted
//! 24      4*k   Rows            one count per present table
//! ...           Tables          rows of every present table, in table id order
//! ```
//!
//! The size of a row is not fixed: heap indices follow the heap-size flags, table indices and
//! coded indices follow the row counts of their target tables. All widths are derived in one
//! step from the complete set of row counts (see [`crate::metadata::tables::TableInfo`]),
//! including, for a portable PDB, the counts of the type-system tables referenced by `#Pdb`.
//!
//! # Reference
//! - [ECMA-335 II.24.2.6](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)

use crate::{
    file::ByteBuffer,
    metadata::{
        streams::{metadata_layout, HeapKind},
        tables::{columns, HeapSizes, RowCounts, TableId, TableInfo, TableRow},
    },
    tree::{NewNode, NodeId, NodeKind, Payload, Tree},
    Error::InconsistentHeapFlags,
    Result,
};

const HEADER_SIZE: usize = 24;

/// Placement of one present table inside the stream.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct TableLayout {
    /// The table
    pub table: TableId,
    /// Absolute offset of the first row
    pub offset: usize,
    /// Number of rows
    pub rows: u32,
    /// Size of one row in bytes
    pub row_size: usize,
}

/// A decoded table stream header with the layout of all present tables.
///
/// The stream keeps a handle to the buffer, so rows can be read on demand:
///
/// ```rust,no_run
/// use dotlayout::metadata::tables::{MethodDefRow, TableId};
///
/// let tree = dotlayout::parse(dotlayout::ByteBuffer::from_file("app.dll")?)?;
/// if let Some(tables) = tree.table_stream() {
///     println!("{} methods", tables.row_count(TableId::MethodDef));
///     for method in tables.rows::<MethodDefRow>() {
///         println!("RVA {:#x}", method?.rva);
///     }
/// }
/// # Ok::<(), dotlayout::Error>(())
/// ```
#[derive(Clone, Debug)]
pub struct TableStream {
    /// Absolute offset of the stream
    pub offset: usize,
    /// Major version of the table schema, 2 for current metadata
    pub major_version: u8,
    /// Minor version of the table schema
    pub minor_version: u8,
    /// The heap-size flags byte
    pub heap_flags: u8,
    /// Presence bit-vector
    pub valid: u64,
    /// Sorted bit-vector
    pub sorted: u64,
    info: TableInfo,
    tables: Vec<TableLayout>,
    buffer: ByteBuffer,
}

impl TableStream {
    /// Decodes the header of the table stream at `offset` and lays out its tables.
    ///
    /// # Arguments
    /// * `buffer` - The buffer holding the stream
    /// * `offset` - Absolute offset of the stream
    /// * `has_heap` - Tells whether the metadata root lists a heap of the given kind
    /// * `referenced` - Row counts of tables in another stream (`#Pdb`) that indices may target
    ///
    /// # Errors
    /// Returns [`crate::Error::InconsistentHeapFlags`] if a wide index is declared for an absent
    /// heap, [`crate::Error::UnsupportedTableKind`] for an unknown table bit and
    /// [`crate::Error::TruncatedBuffer`] if the header exceeds the buffer.
    pub fn read(
        buffer: &ByteBuffer,
        offset: usize,
        has_heap: impl Fn(HeapKind) -> bool,
        referenced: Option<&RowCounts>,
    ) -> Result<TableStream> {
        let major_version = buffer.read_le::<u8>(offset + 4)?;
        let minor_version = buffer.read_le::<u8>(offset + 5)?;
        let heap_flags = buffer.read_le::<u8>(offset + 6)?;
        let valid = buffer.read_le::<u64>(offset + 8)?;
        let sorted = buffer.read_le::<u64>(offset + 16)?;

        let heaps = HeapSizes::from_flags(heap_flags);
        for (wide, kind, name) in [
            (heaps.wide_strings, HeapKind::Strings, "#Strings"),
            (heaps.wide_guid, HeapKind::Guid, "#GUID"),
            (heaps.wide_blob, HeapKind::Blob, "#Blob"),
        ] {
            if wide && !has_heap(kind) {
                return Err(InconsistentHeapFlags {
                    heap: name,
                    offset: offset + 6,
                });
            }
        }

        let counts = RowCounts::read(buffer, offset + HEADER_SIZE, valid, offset)?;
        let mut cursor = offset + HEADER_SIZE + counts.len() * 4;
        if heap_flags & HeapSizes::EXTRA_DATA != 0 {
            cursor += 4;
        }

        let info = TableInfo::new(
            match referenced {
                Some(referenced) => counts.with_referenced(referenced),
                None => counts,
            },
            heaps,
        );

        let mut tables = Vec::with_capacity(counts.len());
        for table in counts.tables() {
            let rows = counts.rows(table);
            let row_size = info.row_size(table);
            tables.push(TableLayout {
                table,
                offset: cursor,
                rows,
                row_size,
            });
            cursor += rows as usize * row_size;
        }

        Ok(TableStream {
            offset,
            major_version,
            minor_version,
            heap_flags,
            valid,
            sorted,
            info,
            tables,
            buffer: buffer.clone(),
        })
    }

    /// The index widths of this stream.
    #[must_use]
    pub fn info(&self) -> &TableInfo {
        &self.info
    }

    /// Number of rows of `table`, `0` if the table is absent.
    #[must_use]
    pub fn row_count(&self, table: TableId) -> u32 {
        self.table(table).map_or(0, |layout| layout.rows)
    }

    /// Size of one row of `table` in this stream.
    #[must_use]
    pub fn row_size(&self, table: TableId) -> usize {
        self.info.row_size(table)
    }

    /// The layout of `table`, if present.
    #[must_use]
    pub fn table(&self, table: TableId) -> Option<&TableLayout> {
        self.tables.iter().find(|layout| layout.table == table)
    }

    /// All present tables, in stream order.
    pub fn tables(&self) -> impl Iterator<Item = &TableLayout> {
        self.tables.iter()
    }

    /// Size of the header including the row counts and the optional extra data.
    #[must_use]
    pub fn header_size(&self) -> usize {
        self.tables
            .first()
            .map_or(HEADER_SIZE, |first| first.offset - self.offset)
    }

    /// Reads all column values of one row (1-based `rid`), widened to `u32`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the row does not exist and
    /// [`crate::Error::TruncatedBuffer`] if it exceeds the buffer.
    pub fn row_values(&self, table: TableId, rid: u32) -> Result<Vec<u32>> {
        let layout = self
            .table(table)
            .filter(|layout| rid >= 1 && rid <= layout.rows)
            .ok_or_else(|| malformed_error!("{} row {} does not exist", table.name(), rid))?;

        let mut cursor = layout.offset + (rid as usize - 1) * layout.row_size;
        let mut values = Vec::with_capacity(columns(table).len());
        for (_, column) in columns(table) {
            let size = self.info.column_size(*column);
            values.push(match size {
                1 => u32::from(self.buffer.read_le::<u8>(cursor)?),
                2 => u32::from(self.buffer.read_le::<u16>(cursor)?),
                _ => self.buffer.read_le::<u32>(cursor)?,
            });
            cursor += size;
        }
        Ok(values)
    }

    /// Absolute offset of one row (1-based `rid`).
    #[must_use]
    pub fn row_offset(&self, table: TableId, rid: u32) -> Option<usize> {
        let layout = self.table(table)?;
        (rid >= 1 && rid <= layout.rows)
            .then(|| layout.offset + (rid as usize - 1) * layout.row_size)
    }

    /// Decodes one typed row.
    ///
    /// # Errors
    /// See [`TableStream::row_values`].
    pub fn row<R: TableRow>(&self, rid: u32) -> Result<R> {
        let values = self.row_values(R::TABLE, rid)?;
        let offset = self.row_offset(R::TABLE, rid).unwrap_or_default();
        Ok(R::from_values(rid, offset, &values))
    }

    /// Decodes all rows of a typed table, in row order.
    pub fn rows<R: TableRow>(&self) -> impl Iterator<Item = Result<R>> + '_ {
        (1..=self.row_count(R::TABLE)).map(|rid| self.row::<R>(rid))
    }
}

fn table_stream(tree: &Tree, id: NodeId) -> Option<&TableStream> {
    let heap = tree.find_ancestor(id, |kind| kind == NodeKind::Heap(HeapKind::Tables))?;
    match tree.payload(heap) {
        Some(Payload::Tables(stream)) => Some(stream),
        _ => None,
    }
}

/// Parse hook of the table stream: header fields, row counts, then one node per table.
pub(crate) fn parse_table_stream(tree: &mut Tree, id: NodeId) -> Result<()> {
    let start = tree.get(id).start();
    let (streams, referenced) = match metadata_layout(tree, id) {
        Some(layout) => (
            layout.streams.iter().map(|s| s.kind).collect::<Vec<_>>(),
            layout.pdb.as_ref().map(|pdb| pdb.referenced),
        ),
        None => (Vec::new(), None),
    };
    let stream = TableStream::read(
        tree.buffer(),
        start,
        |kind| streams.contains(&kind),
        referenced.as_ref(),
    )?;

    tree.append(id, NodeKind::U32, "Reserved")?;
    tree.append(id, NodeKind::U8, "MajorVersion")?;
    tree.append(id, NodeKind::U8, "MinorVersion")?;
    tree.append(id, NodeKind::U8, "HeapSizes")?;
    tree.append(id, NodeKind::U8, "Reserved")?;
    tree.append(id, NodeKind::U64, "Valid")?;
    tree.append(id, NodeKind::U64, "Sorted")?;
    let present = stream.tables.len();
    if present > 0 {
        tree.add(id, NewNode::new(NodeKind::RowCounts, "Row Counts").len(present * 4))?;
    }
    if stream.heap_flags & HeapSizes::EXTRA_DATA != 0 {
        tree.append(id, NodeKind::U32, "Extra Data")?;
    }

    let tables = stream.tables.clone();
    log::debug!(
        "table stream at {:#x}: {}",
        start,
        tables
            .iter()
            .map(|t| format!("{} {}", t.table.name(), t.rows))
            .collect::<Vec<_>>()
            .join(", ")
    );
    tree.set_payload(id, Payload::Tables(Box::new(stream)));

    for layout in tables {
        if layout.rows == 0 || layout.row_size == 0 {
            continue;
        }
        tree.add(
            id,
            NewNode::new(NodeKind::Table(layout.table), layout.table.name())
                .at(layout.offset)
                .len(layout.rows as usize * layout.row_size),
        )?;
    }
    Ok(())
}

/// Parse hook of a row count array, one `u32` labelled with the table name per present table.
pub(crate) fn parse_row_counts(tree: &mut Tree, id: NodeId) -> Result<()> {
    let start = tree.get(id).start();
    let in_pdb = tree
        .get(id)
        .parent()
        .is_some_and(|parent| parent.kind() == NodeKind::Heap(HeapKind::Pdb));
    // `Valid` precedes `Sorted` in the table stream, the PDB stream has a single vector
    let valid = tree
        .buffer()
        .read_le::<u64>(start - if in_pdb { 8 } else { 16 })?;

    for bit in 0..64_u8 {
        if valid & (1 << bit) == 0 {
            continue;
        }
        let label = TableId::from_bit(bit).map_or("Unknown", TableId::name);
        tree.append(id, NodeKind::U32, label)?;
    }
    Ok(())
}

/// Parse hook of one table: `Row 1` to `Row n`.
pub(crate) fn parse_table(tree: &mut Tree, id: NodeId, table: TableId) -> Result<()> {
    let Some(layout) = table_stream(tree, id).and_then(|stream| stream.table(table)).copied()
    else {
        return Err(malformed_error!("{} table outside of a table stream", table.name()));
    };

    for rid in 1..=layout.rows {
        tree.add(
            id,
            NewNode::new(NodeKind::Row(table), format!("Row {rid}")).len(layout.row_size),
        )?;
    }
    Ok(())
}

/// Parse hook of one row: one integer leaf per column, sized by the stream's index widths.
pub(crate) fn parse_row(tree: &mut Tree, id: NodeId, table: TableId) -> Result<()> {
    let Some(info) = table_stream(tree, id).map(|stream| stream.info().clone()) else {
        return Err(malformed_error!("{} row outside of a table stream", table.name()));
    };

    for (name, column) in columns(table) {
        let kind = match info.column_size(*column) {
            1 => NodeKind::U8,
            2 => NodeKind::U16,
            _ => NodeKind::U32,
        };
        tree.append(id, kind, name)?;
    }
    Ok(())
}
