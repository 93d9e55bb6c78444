//! Geometry shared by every pipeline stage.
//!
//! Detector output lives in normalized space (bottom-left origin, fractions
//! of the image), while cropping happens in pixel space (top-left origin).
//! The two are kept apart with marker types, the same way a `Point<Pixel>`
//! can never be handed to code expecting a `Point<Normalized>`.
//!
//! # Example
//!
//! ```
//! use quadcrop::geom::{to_pixel_rect, NormalizedRect, PixelRect, Size};
//!
//! let bbox = NormalizedRect::new(0.25, 0.25, 0.5, 0.5);
//! let rect = to_pixel_rect(&bbox, Size::new(800.0, 600.0));
//! assert_eq!(rect, PixelRect::new(200.0, 150.0, 400.0, 300.0));
//! ```

mod point;
mod quad;
mod rect;
mod space;

pub use point::Point;
pub use quad::NormalizedQuad;
pub use rect::{NormalizedRect, PixelRect, Rect};
pub use space::{Normalized, Pixel};

use serde::{Deserialize, Serialize};

/// Width and height of an image in its logical (display) units.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    #[inline]
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// True if both dimensions are finite and positive.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

impl From<(u32, u32)> for Size {
    fn from((width, height): (u32, u32)) -> Self {
        Self::new(f64::from(width), f64::from(height))
    }
}

/// Converts a normalized bounding box into a pixel rectangle for an image of
/// the given size.
#[inline]
pub fn to_pixel_rect(bbox: &NormalizedRect, size: Size) -> PixelRect {
    bbox.to_pixel(size)
}

/// `width * height`, zero for degenerate rectangles.
#[inline]
pub fn area<TSpace>(rect: &Rect<TSpace>) -> f64 {
    rect.area()
}

/// Positive-area overlap test; touching edges do not count.
#[inline]
pub fn intersects<TSpace>(a: &Rect<TSpace>, b: &Rect<TSpace>) -> bool {
    a.intersects(b)
}

/// Side-length area approximation of a quad. See
/// [`NormalizedQuad::calculate_area`].
#[inline]
pub fn calculate_area(quad: &NormalizedQuad) -> f64 {
    quad.calculate_area()
}
