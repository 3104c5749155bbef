//! Metadata tables: identifiers, column schemas, index widths and typed rows.
//!
//! The physical layout of a table stream is computed here and in
//! [`crate::metadata::streams`]: [`RowCounts`] are read from the stream header,
//! [`TableInfo`] turns them into index widths, and [`columns`] gives the ordered columns of every
//! table from which row sizes follow.

mod codedindex;
mod rows;
mod schema;
mod tableid;
mod tableinfo;

pub use codedindex::{coded_index_size, CodedIndexType};
pub use rows::{
    ClassLayoutRow, CustomDebugInformationRow, FieldRow, FieldRvaRow, ManifestResourceRow,
    MethodDefRow, ModuleRow, TableRow, TypeDefRow,
};
pub use schema::{columns, Column};
pub use tableid::TableId;
pub use tableinfo::{HeapSizes, RowCounts, TableInfo};

pub use crate::metadata::streams::tablesheader::{TableLayout, TableStream};
