//! Structural comparison of two parsed trees.
//!
//! [`diff_trees`] walks both trees in parallel. Children are aligned by label with
//! [`list_diff`], so inserting one method body shifts nothing else: all following nodes are
//! still matched with their counterparts even though their offsets changed. Leaves are
//! compared by content, never by offset.
//!
//! [`compare_table_counts`] and [`compare_strings`] give a coarser summary of two metadata
//! roots, built on the [`sorted_diff`] merge.
//!
//! # Example
//!
//! ```rust,no_run
//! use dotlayout::prelude::*;
//!
//! let left = dotlayout::parse(ByteBuffer::from_file("v1/app.dll")?)?;
//! let right = dotlayout::parse(ByteBuffer::from_file("v2/app.dll")?)?;
//!
//! let difference = dotlayout::diff(&left, &right);
//! for (old, new) in &difference.changed {
//!     println!("{} {} -> {}", old.label(), old.span(), new.span());
//! }
//! # Ok::<(), dotlayout::Error>(())
//! ```

mod listdiff;
mod sorteddiff;
mod summary;

pub use listdiff::{list_diff, Edit};
pub use sorteddiff::{sorted_diff, Merged, SortedDiff};
pub use summary::{compare_strings, compare_table_counts, StringChanges, TableCountChanges};

use crate::{
    config::DiffConfig,
    tree::{NodeKind, NodeRef, Tree},
};

/// The differences between two trees.
///
/// Added and removed entries are whole subtrees; changed entries are pairs of matched leaves
/// whose content differs.
#[derive(Debug, Default)]
pub struct Difference<'a> {
    /// Subtrees of the right tree without counterpart on the left
    pub added: Vec<NodeRef<'a>>,
    /// Subtrees of the left tree without counterpart on the right
    pub removed: Vec<NodeRef<'a>>,
    /// Matched leaves `(left, right)` with different length or bytes
    pub changed: Vec<(NodeRef<'a>, NodeRef<'a>)>,
}

impl Difference<'_> {
    /// Returns `true` if no difference was found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }

    /// Total number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.added.len() + self.removed.len() + self.changed.len()
    }
}

/// Compares two trees from their roots.
///
/// Never fails: trees of unrelated files simply produce a large difference.
#[must_use]
pub fn diff_trees<'a>(left: &'a Tree, right: &'a Tree, config: &DiffConfig) -> Difference<'a> {
    let mut difference = Difference::default();
    diff_nodes(left.root(), right.root(), config, &mut difference);
    log::debug!(
        "{} added, {} removed, {} changed",
        difference.added.len(),
        difference.removed.len(),
        difference.changed.len()
    );
    difference
}

/// Gaps are matched by kind: their "Padding" / "Unparsed" label follows their content.
fn same_slot(left: NodeRef<'_>, right: NodeRef<'_>) -> bool {
    if left.kind() == NodeKind::Padding && right.kind() == NodeKind::Padding {
        return true;
    }
    left.label() == right.label()
}

fn diff_nodes<'a>(
    left: NodeRef<'a>,
    right: NodeRef<'a>,
    config: &DiffConfig,
    difference: &mut Difference<'a>,
) {
    if left.is_leaf() && right.is_leaf() {
        if left.bytes() != right.bytes() {
            difference.changed.push((left, right));
        }
    } else {
        let source: Vec<_> = left.children().collect();
        let destination: Vec<_> = right.children().collect();
        let edits = list_diff(
            &source,
            &destination,
            |l, r| same_slot(*l, *r),
            config.max_lcs_cells,
        );

        for edit in edits {
            match edit {
                Edit::Update {
                    source: s,
                    destination: d,
                } => diff_nodes(source[s], destination[d], config, difference),
                Edit::Add { destination: d } => difference.added.push(destination[d]),
                Edit::Remove { source: s } => difference.removed.push(source[s]),
            }
        }
    }

    if config.compare_embedded_pdb {
        if let (Some(l), Some(r)) = (left.embedded(), right.embedded()) {
            log::trace!("comparing embedded trees of {}", left.label());
            diff_nodes(l, r, config, difference);
        }
    }
}
