//! Reading order for detected rectangles.
//!
//! Rectangles are read in rows from the top of the photo down, and left to
//! right within a row. Positions are compared in normalized detector space
//! (y grows upwards), with a tolerance so that slightly misaligned cards
//! still share a row or column. When two rectangles share both a row and a
//! column, the larger one comes first.
//!
//! A tolerance comparison is not transitive, so it cannot be handed to
//! `sort_by` directly (the standard sorts may panic on an inconsistent
//! comparator). Instead the rectangles are first put in a canonical order,
//! which makes the result depend only on geometry, and then an insertion
//! pass moves each rectangle ahead of those [`pairwise_cmp`] says it
//! precedes. Whenever the pairwise rule is consistent on a set, the output
//! is exactly the order it defines.

use std::cmp::Ordering;

use crate::config::OrderingConfig;
use crate::geom::{Normalized, NormalizedQuad, NormalizedRect, Point};

/// The geometry the orderer looks at.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OrderKey {
    /// Top-left corner in normalized detector space.
    pub anchor: Point<Normalized>,
    /// Tie-break area (see [`NormalizedQuad::calculate_area`]).
    pub area: f64,
    /// Bounding box, only consulted to break exact ties deterministically.
    pub bounds: NormalizedRect,
}

impl OrderKey {
    pub fn from_quad(quad: &NormalizedQuad) -> Self {
        Self {
            anchor: quad.top_left,
            area: quad.calculate_area(),
            bounds: quad.bounding_box(),
        }
    }
}

/// Total order used before the insertion pass: top to bottom, left to right,
/// larger first, then the remaining geometry.
fn canonical_cmp(a: &OrderKey, b: &OrderKey) -> Ordering {
    b.anchor
        .y
        .total_cmp(&a.anchor.y)
        .then_with(|| a.anchor.x.total_cmp(&b.anchor.x))
        .then_with(|| b.area.total_cmp(&a.area))
        .then_with(|| tie_cmp(a, b))
}

fn tie_cmp(a: &OrderKey, b: &OrderKey) -> Ordering {
    a.bounds
        .x()
        .total_cmp(&b.bounds.x())
        .then_with(|| a.bounds.y().total_cmp(&b.bounds.y()))
        .then_with(|| a.bounds.width.total_cmp(&b.bounds.width))
        .then_with(|| a.bounds.height.total_cmp(&b.bounds.height))
}

/// The pairwise reading-order rule.
///
/// Different rows (top-left y apart by more than `row_tolerance`): the higher
/// one first. Same row, different columns: the left one first. Otherwise the
/// larger area first. This rule is not transitive for loosely aligned
/// layouts; [`reading_order`] is the deterministic realization of it.
pub fn pairwise_cmp(a: &OrderKey, b: &OrderKey, config: &OrderingConfig) -> Ordering {
    if (a.anchor.y - b.anchor.y).abs() > config.row_tolerance {
        return b.anchor.y.total_cmp(&a.anchor.y);
    }
    if (a.anchor.x - b.anchor.x).abs() > config.column_tolerance {
        return a.anchor.x.total_cmp(&b.anchor.x);
    }
    b.area.total_cmp(&a.area)
}

/// Returns the indices of `keys` in reading order.
pub fn reading_order(keys: &[OrderKey], config: &OrderingConfig) -> Vec<usize> {
    let mut order: Vec<usize> = (0..keys.len()).collect();
    order.sort_by(|&a, &b| canonical_cmp(&keys[a], &keys[b]));

    // Stable insertion: an entry only moves past neighbours it strictly precedes.
    for i in 1..order.len() {
        let mut j = i;
        while j > 0
            && pairwise_cmp(&keys[order[j]], &keys[order[j - 1]], config) == Ordering::Less
        {
            order.swap(j, j - 1);
            j -= 1;
        }
    }

    tracing::trace!(count = order.len(), "computed reading order");
    order
}

/// Sorts arbitrary items into reading order using `key`.
pub fn sort_reading_order<T>(
    items: Vec<T>,
    key: impl Fn(&T) -> OrderKey,
    config: &OrderingConfig,
) -> Vec<T> {
    let keys: Vec<OrderKey> = items.iter().map(&key).collect();
    let order = reading_order(&keys, config);

    let mut slots: Vec<Option<T>> = items.into_iter().map(Some).collect();
    order
        .into_iter()
        .filter_map(|i| slots[i].take())
        .collect()
}

/// Sorts quads into reading order.
pub fn order_quads(quads: &[NormalizedQuad], config: &OrderingConfig) -> Vec<NormalizedQuad> {
    sort_reading_order(quads.to_vec(), OrderKey::from_quad, config)
}
