use std::path::Path;

use anyhow::bail;
use dotlayout::{CoverageIssue, Tree};
use serde::Serialize;

use crate::{
    app::GlobalOptions,
    commands::{file_display_name, load_tree},
    output::{format_size, print_output},
};

#[derive(Debug, Serialize)]
struct IssueEntry {
    kind: &'static str,
    start: usize,
    end: usize,
    /// Owning tree: the file itself or the label of an embedded PDB
    scope: String,
}

#[derive(Debug, Serialize)]
struct CheckOutput {
    file: String,
    size: usize,
    nodes: usize,
    leaves: usize,
    issues: Vec<IssueEntry>,
}

fn collect_issues(tree: &Tree, scope: &str, out: &mut Vec<IssueEntry>) {
    for issue in tree.check_coverage() {
        let (kind, span) = match issue {
            CoverageIssue::Gap(span) => ("gap", span),
            CoverageIssue::Overlap(span) => ("overlap", span),
        };
        out.push(IssueEntry {
            kind,
            start: span.start,
            end: span.end(),
            scope: scope.to_string(),
        });
    }

    for (owner, embedded) in tree.embedded_trees() {
        collect_issues(embedded, owner.label(), out);
    }
}

pub fn run(path: &Path, opts: &GlobalOptions) -> anyhow::Result<()> {
    let tree = load_tree(path)?;
    let file = file_display_name(path);

    let mut issues = Vec::new();
    collect_issues(&tree, &file, &mut issues);

    let output = CheckOutput {
        file,
        size: tree.buffer().len(),
        nodes: tree.len(),
        leaves: tree.leaves().len(),
        issues,
    };

    print_output(&output, opts, |out| {
        println!(
            "{}: {} bytes, {} nodes, {} leaves",
            out.file,
            format_size(out.size),
            out.nodes,
            out.leaves
        );
        for issue in &out.issues {
            println!(
                "  {:<8} [{:#x}..{:#x}) in {}",
                issue.kind, issue.start, issue.end, issue.scope
            );
        }
    })?;

    if !output.issues.is_empty() {
        bail!("{} coverage issues", output.issues.len());
    }
    if !opts.json {
        println!("Coverage complete.");
    }
    Ok(())
}
