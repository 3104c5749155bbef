//! CLI metadata.
//!
//! Decoders for everything the CLI header leads to:
//!
//! - [`cor20header`] - The CLI header and the directories it points to
//! - [`root`] - The metadata root (`BSJB`) and its stream directory
//! - [`streams`] - The heaps, the `#Pdb` stream and the table stream
//! - [`tables`] - Table ids, column schemas, index widths and typed rows
//! - [`method`] - Method body headers and exception sections
//! - [`customdebuginformation`] - Well-known custom debug information payloads
//!
//! Table rows are followed to the structures they reference by a private cross-reference pass
//! that runs once the metadata root of an image is decoded.
//!
//! # Examples
//!
//! ```rust,no_run
//! use dotlayout::metadata::tables::TableId;
//!
//! let tree = dotlayout::parse(dotlayout::ByteBuffer::from_file("app.dll")?)?;
//! if let Some(tables) = tree.table_stream() {
//!     for table in tables.tables() {
//!         println!("{:<24} {:>6} rows", table.table.name(), table.rows);
//!     }
//!     println!("{} types", tables.row_count(TableId::TypeDef));
//! }
//! # Ok::<(), dotlayout::Error>(())
//! ```

pub mod cor20header;
pub mod customdebuginformation;
pub mod method;
pub mod root;
pub mod streams;
pub mod tables;
pub(crate) mod xref;
