use std::path::Path;

use anyhow::{bail, Context};
use serde::Serialize;

use crate::{
    app::GlobalOptions,
    commands::load_tree,
    output::{format_size, print_output, Align, TabWriter},
};

#[derive(Debug, Serialize)]
struct TableEntry {
    table: String,
    offset: usize,
    rows: u32,
    row_size: usize,
    size: usize,
}

#[derive(Debug, Serialize)]
struct TablesOutput {
    major_version: u8,
    minor_version: u8,
    heap_flags: u8,
    tables: Vec<TableEntry>,
}

pub fn run(path: &Path, opts: &GlobalOptions) -> anyhow::Result<()> {
    let tree = load_tree(path)?;
    let stream = tree
        .table_stream()
        .with_context(|| "file has no table stream")?;

    let tables: Vec<TableEntry> = stream
        .tables()
        .map(|layout| TableEntry {
            table: layout.table.name().to_string(),
            offset: layout.offset,
            rows: layout.rows,
            row_size: layout.row_size,
            size: layout.rows as usize * layout.row_size,
        })
        .collect();
    if tables.is_empty() {
        bail!("no metadata tables found");
    }

    let output = TablesOutput {
        major_version: stream.major_version,
        minor_version: stream.minor_version,
        heap_flags: stream.heap_flags,
        tables,
    };

    print_output(&output, opts, |out| {
        println!(
            "Schema {}.{}, heap flags {:#04x}\n",
            out.major_version, out.minor_version, out.heap_flags
        );
        let mut tw = TabWriter::new(&[
            ("Table", Align::Left),
            ("Offset", Align::Right),
            ("Rows", Align::Right),
            ("Row Size", Align::Right),
            ("Size", Align::Right),
        ]);
        for entry in &out.tables {
            tw.row(vec![
                entry.table.clone(),
                format!("{:#x}", entry.offset),
                entry.rows.to_string(),
                entry.row_size.to_string(),
                format_size(entry.size),
            ]);
        }
        tw.print();
    })
}
