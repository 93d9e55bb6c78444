//! Overlap removal between detected rectangles.
//!
//! Every overlapping pair is resolved in favour of the larger rectangle.
//! Decisions are made against the original input: a rectangle that has
//! already lost a comparison still takes part in later comparisons, so the
//! outcome does not depend on the order in which pairs are visited.
//!
//! This is a greedy O(n²) heuristic, not an optimal non-maximum
//! suppression. In a chain where A overlaps B and B overlaps C but A and C
//! are disjoint (areas decreasing from A to C), both B and C are removed,
//! even though C does not overlap the surviving A.

use crate::config::TieBreak;
use crate::geom::PixelRect;

/// Whether a rectangle survived overlap removal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    Kept,
    /// Removed because it overlaps the rectangle at index `by`, which was
    /// larger (or won the tie-break).
    Removed { by: usize },
}

/// Result of [`dedup`]: one status per input rectangle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DedupOutcome {
    pub status: Vec<Status>,
}

impl DedupOutcome {
    /// Indices of surviving rectangles in input order.
    pub fn kept_indices(&self) -> Vec<usize> {
        self.status
            .iter()
            .enumerate()
            .filter(|(_, s)| **s == Status::Kept)
            .map(|(i, _)| i)
            .collect()
    }

    /// `(removed, winner)` pairs in input order of the removed rectangle.
    pub fn removals(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.status.iter().enumerate().filter_map(|(i, s)| match s {
            Status::Removed { by } => Some((i, *by)),
            Status::Kept => None,
        })
    }

    pub fn removed_count(&self) -> usize {
        self.status.len() - self.kept_count()
    }

    pub fn kept_count(&self) -> usize {
        self.status.iter().filter(|s| **s == Status::Kept).count()
    }

    /// Keeps the items whose rectangle survived, preserving input order.
    ///
    /// `items` must be parallel to the rectangles passed to [`dedup`].
    pub fn retain<T>(&self, items: Vec<T>) -> Vec<T> {
        debug_assert_eq!(items.len(), self.status.len());
        items
            .into_iter()
            .zip(&self.status)
            .filter_map(|(item, s)| (*s == Status::Kept).then_some(item))
            .collect()
    }
}

/// Marks overlapping rectangles for removal.
///
/// For every pair `i < j` whose interiors overlap, the rectangle with the
/// smaller [`area`](PixelRect::area) is removed. On equal areas `tie_break`
/// picks the loser. The first removal recorded for a rectangle is kept as
/// its reason.
pub fn dedup(rects: &[PixelRect], tie_break: TieBreak) -> DedupOutcome {
    let mut status = vec![Status::Kept; rects.len()];

    for i in 0..rects.len() {
        for j in (i + 1)..rects.len() {
            if !rects[i].intersects(&rects[j]) {
                continue;
            }

            let (a_i, a_j) = (rects[i].area(), rects[j].area());
            let (loser, winner) = if a_i > a_j {
                (j, i)
            } else if a_j > a_i {
                (i, j)
            } else {
                match tie_break {
                    TieBreak::RemoveLater => (j, i),
                    TieBreak::RemoveEarlier => (i, j),
                }
            };

            if status[loser] == Status::Kept {
                status[loser] = Status::Removed { by: winner };
            }
        }
    }

    DedupOutcome { status }
}

/// Convenience wrapper returning the surviving rectangles in input order.
pub fn dedup_rects(rects: &[PixelRect], tie_break: TieBreak) -> Vec<PixelRect> {
    dedup(rects, tie_break).retain(rects.to_vec())
}
