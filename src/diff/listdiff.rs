//! Sequence alignment by longest common subsequence.

/// One step of an alignment, by index into the two input sequences.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Edit {
    /// `source[source]` and `destination[destination]` are matched
    Update {
        /// Index into the source sequence
        source: usize,
        /// Index into the destination sequence
        destination: usize,
    },
    /// `destination[destination]` has no counterpart in the source
    Add {
        /// Index into the destination sequence
        destination: usize,
    },
    /// `source[source]` has no counterpart in the destination
    Remove {
        /// Index into the source sequence
        source: usize,
    },
}

/// Aligns two sequences on a longest common subsequence of `matches`.
///
/// Matching prefixes and suffixes are trimmed first, so the quadratic table only covers the
/// middle part. Edits are returned in sequence order: every destination index appears exactly
/// once, in ascending order, and so does every source index. A removal is emitted before an
/// addition at the same position.
///
/// If the table for the middle part would exceed `max_cells` entries, the middle is aligned by
/// position instead: equal positions that match are updates, everything else is removed and
/// added.
///
/// ```rust
/// use dotlayout::diff::{list_diff, Edit};
///
/// let edits = list_diff(&["a", "b", "c"], &["a", "x", "c"], |l, r| l == r, 1024);
/// assert_eq!(edits, [
///     Edit::Update { source: 0, destination: 0 },
///     Edit::Remove { source: 1 },
///     Edit::Add { destination: 1 },
///     Edit::Update { source: 2, destination: 2 },
/// ]);
/// ```
pub fn list_diff<T, U>(
    source: &[T],
    destination: &[U],
    matches: impl Fn(&T, &U) -> bool,
    max_cells: usize,
) -> Vec<Edit> {
    let prefix = source
        .iter()
        .zip(destination)
        .take_while(|(s, d)| matches(s, d))
        .count();
    let suffix = source[prefix..]
        .iter()
        .rev()
        .zip(destination[prefix..].iter().rev())
        .take_while(|(s, d)| matches(s, d))
        .count();

    let mut edits = Vec::with_capacity(source.len().max(destination.len()));
    edits.extend((0..prefix).map(|i| Edit::Update {
        source: i,
        destination: i,
    }));

    let middle_source = &source[prefix..source.len() - suffix];
    let middle_destination = &destination[prefix..destination.len() - suffix];
    let cells = (middle_source.len() + 1).saturating_mul(middle_destination.len() + 1);
    if cells > max_cells {
        log::warn!(
            "aligning {} against {} entries by position, the LCS table would need {} cells",
            middle_source.len(),
            middle_destination.len(),
            cells
        );
        align_by_position(middle_source, middle_destination, &matches, prefix, &mut edits);
    } else {
        align_by_lcs(middle_source, middle_destination, &matches, prefix, &mut edits);
    }

    let source_tail = source.len() - suffix;
    let destination_tail = destination.len() - suffix;
    edits.extend((0..suffix).map(|i| Edit::Update {
        source: source_tail + i,
        destination: destination_tail + i,
    }));
    edits
}

fn align_by_lcs<T, U>(
    source: &[T],
    destination: &[U],
    matches: &impl Fn(&T, &U) -> bool,
    base: usize,
    edits: &mut Vec<Edit>,
) {
    let (n, m) = (source.len(), destination.len());
    let width = m + 1;
    // lengths[i * width + j]: LCS length of source[i..] and destination[j..]
    let mut lengths = vec![0_u32; (n + 1) * width];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            lengths[i * width + j] = if matches(&source[i], &destination[j]) {
                lengths[(i + 1) * width + j + 1] + 1
            } else {
                lengths[(i + 1) * width + j].max(lengths[i * width + j + 1])
            };
        }
    }

    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if matches(&source[i], &destination[j])
            && lengths[i * width + j] == lengths[(i + 1) * width + j + 1] + 1
        {
            edits.push(Edit::Update {
                source: base + i,
                destination: base + j,
            });
            i += 1;
            j += 1;
        } else if lengths[(i + 1) * width + j] >= lengths[i * width + j + 1] {
            edits.push(Edit::Remove { source: base + i });
            i += 1;
        } else {
            edits.push(Edit::Add {
                destination: base + j,
            });
            j += 1;
        }
    }
    edits.extend((i..n).map(|i| Edit::Remove { source: base + i }));
    edits.extend((j..m).map(|j| Edit::Add {
        destination: base + j,
    }));
}

fn align_by_position<T, U>(
    source: &[T],
    destination: &[U],
    matches: &impl Fn(&T, &U) -> bool,
    base: usize,
    edits: &mut Vec<Edit>,
) {
    let common = source.len().min(destination.len());
    for k in 0..common {
        if matches(&source[k], &destination[k]) {
            edits.push(Edit::Update {
                source: base + k,
                destination: base + k,
            });
        } else {
            edits.push(Edit::Remove { source: base + k });
            edits.push(Edit::Add {
                destination: base + k,
            });
        }
    }
    edits.extend((common..source.len()).map(|k| Edit::Remove { source: base + k }));
    edits.extend((common..destination.len()).map(|k| Edit::Add {
        destination: base + k,
    }));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diff(source: &str, destination: &str) -> Vec<Edit> {
        let source: Vec<char> = source.chars().collect();
        let destination: Vec<char> = destination.chars().collect();
        list_diff(&source, &destination, |l, r| l == r, usize::MAX)
    }

    fn updates(edits: &[Edit]) -> usize {
        edits
            .iter()
            .filter(|e| matches!(e, Edit::Update { .. }))
            .count()
    }

    #[test]
    fn identical() {
        let edits = diff("abc", "abc");
        assert_eq!(edits.len(), 3);
        assert_eq!(updates(&edits), 3);
    }

    #[test]
    fn insertion_in_the_middle() {
        let edits = diff("abcd", "abXcd");
        assert_eq!(updates(&edits), 4);
        assert_eq!(edits[2], Edit::Add { destination: 2 });
    }

    #[test]
    fn empty_sides() {
        assert_eq!(diff("", "ab"), [Edit::Add { destination: 0 }, Edit::Add { destination: 1 }]);
        assert_eq!(diff("a", ""), [Edit::Remove { source: 0 }]);
        assert!(diff("", "").is_empty());
    }

    #[test]
    fn lcs_in_the_middle() {
        // prefix "x", suffix "y", middle "abcb" vs "bdcab"
        let edits = diff("xabcby", "xbdcaby");
        assert_eq!(updates(&edits), 2 + 3);

        let destinations: Vec<_> = edits
            .iter()
            .filter_map(|e| match e {
                Edit::Update { destination, .. } | Edit::Add { destination } => Some(*destination),
                Edit::Remove { .. } => None,
            })
            .collect();
        assert_eq!(destinations, (0..7).collect::<Vec<_>>());
    }

    #[test]
    fn positional_fallback() {
        let source: Vec<char> = "abcd".chars().collect();
        let destination: Vec<char> = "xbcdz".chars().collect();
        let edits = list_diff(&source, &destination, |l, r| l == r, 4);

        assert_eq!(
            edits,
            [
                Edit::Remove { source: 0 },
                Edit::Add { destination: 0 },
                Edit::Update { source: 1, destination: 1 },
                Edit::Update { source: 2, destination: 2 },
                Edit::Update { source: 3, destination: 3 },
                Edit::Add { destination: 4 },
            ]
        );
    }
}
