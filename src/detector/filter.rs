//! Admission filters for detector output.
//!
//! Real detectors apply these limits internally. Detections replayed from a
//! file have not been through them, so [`DetectorParams::apply`] enforces
//! the same limits before the batch reaches the pipeline.

use crate::config::DetectorParams;
use crate::geom::{Pixel, Point, Size};

use super::{Detection, DetectionBatch};

/// Shape measurements of a detection in raster space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct QuadShape {
    /// Mean length of the top and bottom sides.
    pub width: f64,
    /// Mean length of the left and right sides.
    pub height: f64,
    /// Largest deviation of a corner angle from 90 degrees.
    pub max_skew_degrees: f64,
}

impl QuadShape {
    pub(crate) fn measure(detection: &Detection, size: Size) -> Self {
        let [tl, tr, br, bl] = detection.to_quad(size).pixel_corners(size);
        let width = (tl.distance_to(&tr) + bl.distance_to(&br)) / 2.0;
        let height = (tl.distance_to(&bl) + tr.distance_to(&br)) / 2.0;

        let max_skew_degrees = [(bl, tl, tr), (tl, tr, br), (tr, br, bl), (br, bl, tl)]
            .iter()
            .map(|(prev, corner, next)| (corner_angle(prev, corner, next) - 90.0).abs())
            .fold(0.0, f64::max);

        Self {
            width,
            height,
            max_skew_degrees,
        }
    }
}

/// Interior angle at `corner`, in degrees.
fn corner_angle(prev: &Point<Pixel>, corner: &Point<Pixel>, next: &Point<Pixel>) -> f64 {
    let (ax, ay) = (prev.x - corner.x, prev.y - corner.y);
    let (bx, by) = (next.x - corner.x, next.y - corner.y);
    let cross = ax * by - ay * bx;
    let dot = ax * bx + ay * by;
    cross.abs().atan2(dot).to_degrees()
}

impl DetectorParams {
    /// Returns true if a single detection is finite and passes the
    /// confidence, size, aspect-ratio and quadrature limits.
    pub fn admits(&self, detection: &Detection, size: Size) -> bool {
        if !detection.is_finite() || detection.rank_confidence() < self.min_confidence {
            return false;
        }

        let shape = QuadShape::measure(detection, size);
        if !(shape.width > 0.0 && shape.height > 0.0) {
            return false;
        }

        let aspect = shape.width / shape.height;
        if aspect < self.min_aspect_ratio || aspect > self.max_aspect_ratio {
            return false;
        }

        let min_image_side = size.width.min(size.height);
        if shape.width.min(shape.height) < self.min_size * min_image_side {
            return false;
        }

        shape.max_skew_degrees <= self.quadrature_tolerance
    }

    /// Filters a batch and keeps at most `max_observations` entries, the
    /// most confident ones. Survivors keep their detector order.
    pub fn apply(&self, batch: &DetectionBatch, size: Size) -> DetectionBatch {
        let mut admitted: Vec<(usize, &Detection)> = batch
            .iter()
            .enumerate()
            .filter(|(_, d)| self.admits(d, size))
            .collect();

        let rejected = batch.len() - admitted.len();
        if admitted.len() > self.max_observations {
            admitted.sort_by(|a, b| b.1.rank_confidence().total_cmp(&a.1.rank_confidence()));
            admitted.truncate(self.max_observations);
            admitted.sort_by_key(|(index, _)| *index);
        }

        tracing::debug!(
            input = batch.len(),
            rejected,
            kept = admitted.len(),
            "applied detector filters"
        );

        admitted.into_iter().map(|(_, d)| *d).collect()
    }
}
