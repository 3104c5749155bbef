//! Coarse comparisons of two metadata roots: table row counts and `#Strings` contents.

use crate::{
    diff::sorteddiff::{sorted_diff, Merged},
    metadata::{
        streams::{HeapKind, Strings},
        tables::{TableId, TableStream},
    },
    tree::Tree,
};

/// Row-count differences between two table streams, each list ordered by table id.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TableCountChanges {
    /// Tables only present on the right, with their row count
    pub added: Vec<(TableId, u32)>,
    /// Tables only present on the left, with their row count
    pub removed: Vec<(TableId, u32)>,
    /// Tables present on both sides with different row counts `(table, left, right)`
    pub changed: Vec<(TableId, u32, u32)>,
}

impl TableCountChanges {
    /// Returns `true` if both streams have the same tables with the same row counts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }
}

/// Strings that only one side's `#Strings` heap contains, each list sorted and deduplicated.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StringChanges {
    /// Strings only in the left heap
    pub left_only: Vec<String>,
    /// Strings only in the right heap
    pub right_only: Vec<String>,
}

impl StringChanges {
    /// Returns `true` if both heaps hold the same set of strings.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.left_only.is_empty() && self.right_only.is_empty()
    }
}

fn present_tables(stream: &TableStream) -> Vec<(TableId, u32)> {
    let mut tables: Vec<_> = stream
        .tables()
        .filter(|layout| layout.rows > 0)
        .map(|layout| (layout.table, layout.rows))
        .collect();
    tables.sort_unstable();
    tables
}

/// Compares the tables present in two table streams and their row counts.
#[must_use]
pub fn compare_table_counts(left: &TableStream, right: &TableStream) -> TableCountChanges {
    let left = present_tables(left);
    let right = present_tables(right);

    let mut changes = TableCountChanges::default();
    for merged in sorted_diff(&left, &right, |l, r| l.0.cmp(&r.0)) {
        match merged {
            Merged::Left(&entry) => changes.removed.push(entry),
            Merged::Right(&entry) => changes.added.push(entry),
            Merged::Both(&(table, l), &(_, r)) if l != r => changes.changed.push((table, l, r)),
            Merged::Both(..) => {}
        }
    }
    changes
}

fn heap_strings(tree: &Tree) -> Vec<&str> {
    let data = tree
        .metadata()
        .and_then(|layout| layout.heap(HeapKind::Strings))
        .map_or(&[][..], |id| tree.get(id).bytes());

    let mut strings: Vec<&str> = match Strings::from(data) {
        Ok(heap) => heap.iter().map(|(_, s)| s).filter(|s| !s.is_empty()).collect(),
        Err(_) => Vec::new(),
    };
    strings.sort_unstable();
    strings.dedup();
    strings
}

/// Compares the decoded `#Strings` heaps of the metadata roots of two trees. A tree without
/// metadata counts as an empty heap.
#[must_use]
pub fn compare_strings(left: &Tree, right: &Tree) -> StringChanges {
    let left = heap_strings(left);
    let right = heap_strings(right);

    let mut changes = StringChanges::default();
    for merged in sorted_diff(&left, &right, |l, r| l.cmp(r)) {
        match merged {
            Merged::Left(s) => changes.left_only.push((*s).to_string()),
            Merged::Right(s) => changes.right_only.push((*s).to_string()),
            Merged::Both(..) => {}
        }
    }
    log::debug!(
        "{} strings only on the left, {} only on the right",
        changes.left_only.len(),
        changes.right_only.len()
    );
    changes
}
