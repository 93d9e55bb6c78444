//! Quadrilaterals reported by the rectangle detector.

use serde::{Deserialize, Serialize};

use super::point::Point;
use super::rect::NormalizedRect;
use super::{Normalized, Pixel, Size};

/// A detected quadrilateral in normalized detector space.
///
/// Corners are fractions of the image dimensions with the origin in the
/// bottom-left corner, so `top_left.y` is larger than `bottom_left.y` for an
/// upright quad.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct NormalizedQuad {
    pub top_left: Point<Normalized>,
    pub top_right: Point<Normalized>,
    pub bottom_left: Point<Normalized>,
    pub bottom_right: Point<Normalized>,

    /// Detector confidence in `[0, 1]`.
    #[serde(default = "default_confidence")]
    pub confidence: f32,
}

fn default_confidence() -> f32 {
    1.0
}

impl NormalizedQuad {
    pub fn new(
        top_left: Point<Normalized>,
        top_right: Point<Normalized>,
        bottom_left: Point<Normalized>,
        bottom_right: Point<Normalized>,
        confidence: f32,
    ) -> Self {
        Self {
            top_left,
            top_right,
            bottom_left,
            bottom_right,
            confidence,
        }
    }

    /// Builds the axis-aligned quad covering a normalized box.
    pub fn from_rect(rect: NormalizedRect, confidence: f32) -> Self {
        Self::new(
            Point::new(rect.x(), rect.max_y()),
            Point::new(rect.max_x(), rect.max_y()),
            Point::new(rect.x(), rect.y()),
            Point::new(rect.max_x(), rect.y()),
            confidence,
        )
    }

    /// Corners in clockwise order starting at the top-left.
    pub fn corners(&self) -> [Point<Normalized>; 4] {
        [
            self.top_left,
            self.top_right,
            self.bottom_right,
            self.bottom_left,
        ]
    }

    pub fn is_finite(&self) -> bool {
        self.corners().iter().all(Point::is_finite) && self.confidence.is_finite()
    }

    /// The smallest normalized box containing all four corners.
    pub fn bounding_box(&self) -> NormalizedRect {
        let corners = self.corners();
        let (mut xmin, mut ymin) = (f64::INFINITY, f64::INFINITY);
        let (mut xmax, mut ymax) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
        for c in &corners {
            xmin = xmin.min(c.x);
            ymin = ymin.min(c.y);
            xmax = xmax.max(c.x);
            ymax = ymax.max(c.y);
        }
        NormalizedRect::from_corners(xmin, ymin, xmax, ymax)
    }

    /// Approximate area from side lengths: `|TL-TR| * |TL-BL|`.
    ///
    /// This is exact for rectangles and close for near-rectangular quads; it
    /// is not the polygon area of an arbitrary quadrilateral.
    pub fn calculate_area(&self) -> f64 {
        let width = self.top_left.distance_to(&self.top_right);
        let height = self.top_left.distance_to(&self.bottom_left);
        width * height
    }

    /// Corners mapped to raster space (clockwise from top-left).
    pub fn pixel_corners(&self, size: Size) -> [Point<Pixel>; 4] {
        self.corners()
            .map(|c| Point::new(c.x * size.width, (1.0 - c.y) * size.height))
    }
}
