use std::path::Path;

use dotlayout::{NodeRef, Tree};
use serde::Serialize;

use crate::{app::GlobalOptions, commands::load_tree, output::print_output};

const PREVIEW_BYTES: usize = 16;

#[derive(Debug, Serialize)]
struct NodeEntry {
    depth: usize,
    start: usize,
    end: usize,
    label: String,
    kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<String>,
}

impl NodeEntry {
    fn new(depth: usize, node: NodeRef<'_>) -> Self {
        let value = node.value().or_else(|| {
            (node.is_leaf() && !node.is_empty()).then(|| node.hex_preview(PREVIEW_BYTES))
        });
        NodeEntry {
            depth,
            start: node.start(),
            end: node.end(),
            label: node.label().to_string(),
            kind: format!("{:?}", node.kind()),
            value,
        }
    }
}

/// Depth-first entries; embedded trees continue below their owning node.
fn collect(tree: &Tree, base: usize, max_depth: Option<usize>, out: &mut Vec<NodeEntry>) {
    for (depth, node) in tree.walk() {
        let depth = base + depth;
        if max_depth.is_some_and(|max| depth > max) {
            continue;
        }
        out.push(NodeEntry::new(depth, node));

        if let Some(embedded) = node.embedded() {
            collect(embedded.tree(), depth + 1, max_depth, out);
        }
    }
}

pub fn run(
    path: &Path,
    depth: Option<usize>,
    leaves: bool,
    opts: &GlobalOptions,
) -> anyhow::Result<()> {
    let tree = load_tree(path)?;

    let entries: Vec<NodeEntry> = if leaves {
        tree.leaves()
            .into_iter()
            .map(|node| NodeEntry::new(0, node))
            .collect()
    } else {
        let mut entries = Vec::with_capacity(tree.len());
        collect(&tree, 0, depth, &mut entries);
        entries
    };

    print_output(&entries, opts, |entries| {
        for entry in entries {
            let range = format!("[{:#x}..{:#x})", entry.start, entry.end);
            match &entry.value {
                Some(value) => println!(
                    "{:indent$}{range} {} = {value}",
                    "",
                    entry.label,
                    indent = entry.depth * 2
                ),
                None => println!("{:indent$}{range} {}", "", entry.label, indent = entry.depth * 2),
            }
        }
    })
}
