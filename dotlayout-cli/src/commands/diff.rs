use std::path::Path;

use dotlayout::{
    diff::{compare_strings, compare_table_counts, StringChanges, TableCountChanges},
    DiffConfig, NodeRef, Tree,
};
use serde::Serialize;

use crate::{
    app::GlobalOptions,
    commands::{file_display_name, load_tree},
    output::{print_output, Align, TabWriter},
};

#[derive(Debug, Serialize)]
struct NodeLocation {
    path: String,
    start: usize,
    end: usize,
}

impl NodeLocation {
    fn new(node: NodeRef<'_>) -> Self {
        NodeLocation {
            path: node_path(node),
            start: node.start(),
            end: node.end(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChangedNode {
    left: NodeLocation,
    right: NodeLocation,
}

#[derive(Debug, Serialize)]
struct TableCountEntry {
    table: String,
    left: u32,
    right: u32,
}

#[derive(Debug, Serialize)]
struct SummaryOutput {
    tables: Vec<TableCountEntry>,
    strings_left_only: Vec<String>,
    strings_right_only: Vec<String>,
}

#[derive(Debug, Serialize)]
struct DiffOutput {
    left: String,
    right: String,
    added: Vec<NodeLocation>,
    removed: Vec<NodeLocation>,
    changed: Vec<ChangedNode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<SummaryOutput>,
}

/// Labels from the root down, e.g. `.text / Metadata Root / #Strings`.
fn node_path(node: NodeRef<'_>) -> String {
    let mut labels = vec![node.label()];
    let mut current = node.parent();
    while let Some(parent) = current {
        // the root label names the whole file
        if parent.parent().is_some() {
            labels.push(parent.label());
        }
        current = parent.parent();
    }
    labels.reverse();
    labels.join(" / ")
}

fn summarize(left: &Tree, right: &Tree) -> SummaryOutput {
    let counts = match (left.table_stream(), right.table_stream()) {
        (Some(l), Some(r)) => compare_table_counts(l, r),
        _ => {
            log::warn!("one side has no table stream, skipping row counts");
            TableCountChanges::default()
        }
    };

    let mut tables = Vec::new();
    for (table, rows) in counts.added {
        tables.push(TableCountEntry {
            table: table.name().to_string(),
            left: 0,
            right: rows,
        });
    }
    for (table, rows) in counts.removed {
        tables.push(TableCountEntry {
            table: table.name().to_string(),
            left: rows,
            right: 0,
        });
    }
    for (table, l, r) in counts.changed {
        tables.push(TableCountEntry {
            table: table.name().to_string(),
            left: l,
            right: r,
        });
    }

    let StringChanges {
        left_only,
        right_only,
    } = compare_strings(left, right);

    SummaryOutput {
        tables,
        strings_left_only: left_only,
        strings_right_only: right_only,
    }
}

fn print_locations(title: &str, sign: char, locations: &[NodeLocation]) {
    if locations.is_empty() {
        return;
    }
    println!("{title} ({}):", locations.len());
    for location in locations {
        println!(
            "  {sign} [{:#x}..{:#x}) {}",
            location.start, location.end, location.path
        );
    }
    println!();
}

fn display(out: &DiffOutput) {
    println!("{} -> {}\n", out.left, out.right);

    if out.added.is_empty() && out.removed.is_empty() && out.changed.is_empty() {
        println!("No structural differences.\n");
    }
    print_locations("Added", '+', &out.added);
    print_locations("Removed", '-', &out.removed);

    if !out.changed.is_empty() {
        println!("Changed ({}):", out.changed.len());
        for change in &out.changed {
            println!(
                "  ~ [{:#x}..{:#x}) -> [{:#x}..{:#x}) {}",
                change.left.start,
                change.left.end,
                change.right.start,
                change.right.end,
                change.left.path
            );
        }
        println!();
    }

    if let Some(summary) = &out.summary {
        if summary.tables.is_empty() {
            println!("Table row counts: identical");
        } else {
            println!("Table row counts:");
            let mut tw = TabWriter::new(&[
                ("Table", Align::Left),
                ("Left", Align::Right),
                ("Right", Align::Right),
            ]);
            for entry in &summary.tables {
                tw.row(vec![
                    entry.table.clone(),
                    entry.left.to_string(),
                    entry.right.to_string(),
                ]);
            }
            tw.print();
        }
        println!();

        for (title, strings) in [
            ("Strings only in left", &summary.strings_left_only),
            ("Strings only in right", &summary.strings_right_only),
        ] {
            if !strings.is_empty() {
                println!("{title} ({}):", strings.len());
                for string in strings {
                    println!("  {string}");
                }
            }
        }
    }
}

pub fn run(
    left: &Path,
    right: &Path,
    summary: bool,
    pdb: bool,
    opts: &GlobalOptions,
) -> anyhow::Result<()> {
    let (left_tree, right_tree) = rayon::join(|| load_tree(left), || load_tree(right));
    let (left_tree, right_tree) = (left_tree?, right_tree?);

    let config = DiffConfig {
        compare_embedded_pdb: pdb,
        ..DiffConfig::default()
    };
    let difference = dotlayout::diff_with(&left_tree, &right_tree, &config);
    log::info!("{} differences", difference.len());

    let output = DiffOutput {
        left: file_display_name(left),
        right: file_display_name(right),
        added: difference.added.iter().copied().map(NodeLocation::new).collect(),
        removed: difference
            .removed
            .iter()
            .copied()
            .map(NodeLocation::new)
            .collect(),
        changed: difference
            .changed
            .iter()
            .map(|&(l, r)| ChangedNode {
                left: NodeLocation::new(l),
                right: NodeLocation::new(r),
            })
            .collect(),
        summary: summary.then(|| summarize(&left_tree, &right_tree)),
    };

    print_output(&output, opts, display)
}
