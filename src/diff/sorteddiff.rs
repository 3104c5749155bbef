//! Merge of two sequences sorted by the same order.

use std::cmp::Ordering;

/// One element of a [`SortedDiff`] sweep.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Merged<'a, T, U> {
    /// Only in the left sequence
    Left(&'a T),
    /// Only in the right sequence
    Right(&'a U),
    /// In both sequences, compared equal
    Both(&'a T, &'a U),
}

/// Iterator over the union of two sorted sequences, see [`sorted_diff`].
pub struct SortedDiff<'a, T, U, F> {
    left: &'a [T],
    right: &'a [U],
    compare: F,
}

/// Sweeps two sequences that are sorted by `compare` in a single forward pass, yielding each
/// element once, tagged with the side(s) it was found on.
///
/// Both inputs must be sorted by the same order; unsorted input yields a valid but meaningless
/// merge.
///
/// ```rust
/// use dotlayout::diff::{sorted_diff, Merged};
///
/// let merged: Vec<_> = sorted_diff(&[1, 3, 4], &[2, 3], |l, r| l.cmp(r)).collect();
/// assert_eq!(merged, [
///     Merged::Left(&1),
///     Merged::Right(&2),
///     Merged::Both(&3, &3),
///     Merged::Left(&4),
/// ]);
/// ```
pub fn sorted_diff<'a, T, U, F>(left: &'a [T], right: &'a [U], compare: F) -> SortedDiff<'a, T, U, F>
where
    F: FnMut(&T, &U) -> Ordering,
{
    SortedDiff {
        left,
        right,
        compare,
    }
}

impl<'a, T, U, F> Iterator for SortedDiff<'a, T, U, F>
where
    F: FnMut(&T, &U) -> Ordering,
{
    type Item = Merged<'a, T, U>;

    fn next(&mut self) -> Option<Self::Item> {
        let left = self.left;
        let right = self.right;
        match (left.split_first(), right.split_first()) {
            (None, None) => None,
            (Some((l, rest)), None) => {
                self.left = rest;
                Some(Merged::Left(l))
            }
            (None, Some((r, rest))) => {
                self.right = rest;
                Some(Merged::Right(r))
            }
            (Some((l, left_rest)), Some((r, right_rest))) => match (self.compare)(l, r) {
                Ordering::Less => {
                    self.left = left_rest;
                    Some(Merged::Left(l))
                }
                Ordering::Greater => {
                    self.right = right_rest;
                    Some(Merged::Right(r))
                }
                Ordering::Equal => {
                    self.left = left_rest;
                    self.right = right_rest;
                    Some(Merged::Both(l, r))
                }
            },
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let (l, r) = (self.left.len(), self.right.len());
        (l.max(r), Some(l + r))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disjoint() {
        let merged: Vec<_> = sorted_diff(&[1, 2], &[5, 6], |l: &i32, r: &i32| l.cmp(r)).collect();
        assert_eq!(
            merged,
            [
                Merged::Left(&1),
                Merged::Left(&2),
                Merged::Right(&5),
                Merged::Right(&6)
            ]
        );
    }

    #[test]
    fn different_element_types() {
        let left = [("Module", 1_u32), ("TypeDef", 4)];
        let right = ["Field", "Module"];
        let merged: Vec<_> = sorted_diff(&left, &right, |l, r| l.0.cmp(r)).collect();

        assert_eq!(merged.len(), 3);
        assert!(matches!(merged[0], Merged::Right(&"Field")));
        assert!(matches!(merged[1], Merged::Both(&("Module", 1), &"Module")));
        assert!(matches!(merged[2], Merged::Left(&("TypeDef", 4))));
    }

    #[test]
    fn empty() {
        let empty: [u8; 0] = [];
        assert_eq!(sorted_diff(&empty, &empty, |l, r| l.cmp(r)).count(), 0);
    }
}
