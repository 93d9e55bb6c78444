//! Axis-aligned rectangles in XYWH form.

use serde::{Deserialize, Serialize};

use super::point::Point;
use super::{Normalized, Pixel, Size};

/// An axis-aligned rectangle stored as origin plus extent.
///
/// For [`Pixel`] rectangles the origin is the top-left corner. For
/// [`Normalized`] rectangles it is the bottom-left corner, following the
/// detector convention.
///
/// Construction does not reject negative extents or non-finite values;
/// the pipeline reports those instead of panicking while parsing input.
#[derive(Clone, Copy, PartialEq)]
pub struct Rect<TSpace> {
    pub origin: Point<TSpace>,
    pub width: f64,
    pub height: f64,
}

/// A rectangle in raster space (top-left origin).
pub type PixelRect = Rect<Pixel>;

/// A rectangle in detector space (bottom-left origin, `[0, 1]`).
pub type NormalizedRect = Rect<Normalized>;

impl<TSpace> Rect<TSpace> {
    #[inline]
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            origin: Point::new(x, y),
            width,
            height,
        }
    }

    /// Creates a rectangle from two opposite corners (min, max).
    #[inline]
    pub fn from_corners(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        Self::new(xmin, ymin, xmax - xmin, ymax - ymin)
    }

    #[inline]
    pub fn x(&self) -> f64 {
        self.origin.x
    }

    #[inline]
    pub fn y(&self) -> f64 {
        self.origin.y
    }

    #[inline]
    pub fn max_x(&self) -> f64 {
        self.origin.x + self.width
    }

    #[inline]
    pub fn max_y(&self) -> f64 {
        self.origin.y + self.height
    }

    /// Returns `width * height`, or zero when either extent is not positive.
    #[inline]
    pub fn area(&self) -> f64 {
        if self.is_degenerate() {
            0.0
        } else {
            self.width * self.height
        }
    }

    /// Returns true if the origin and extents are all finite.
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.origin.is_finite() && self.width.is_finite() && self.height.is_finite()
    }

    /// Returns true if the rectangle has no interior.
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }

    /// Area of the overlap with `other`, zero when the interiors are disjoint.
    pub fn intersection_area(&self, other: &Self) -> f64 {
        let w = self.max_x().min(other.max_x()) - self.x().max(other.x());
        let h = self.max_y().min(other.max_y()) - self.y().max(other.y());
        if w > 0.0 && h > 0.0 {
            w * h
        } else {
            0.0
        }
    }

    /// Returns true if the two rectangles share a region of positive area.
    ///
    /// Rectangles that only touch along an edge or at a corner do not
    /// intersect, and a degenerate rectangle intersects nothing.
    #[inline]
    pub fn intersects(&self, other: &Self) -> bool {
        self.intersection_area(other) > 0.0
    }

    /// Multiplies every component by `factor`.
    pub fn scaled(&self, factor: f64) -> Self {
        Self::new(
            self.origin.x * factor,
            self.origin.y * factor,
            self.width * factor,
            self.height * factor,
        )
    }

    /// Returns true if the rectangle lies inside `[0, width] x [0, height]`,
    /// allowing each edge to overshoot by at most `tolerance`.
    pub fn fits_within(&self, width: f64, height: f64, tolerance: f64) -> bool {
        self.x() >= -tolerance
            && self.y() >= -tolerance
            && self.max_x() <= width + tolerance
            && self.max_y() <= height + tolerance
    }

    /// Intersects the rectangle with `[0, width] x [0, height]`.
    ///
    /// A rectangle entirely outside the bounds collapses to zero extent.
    pub fn clamped_to(&self, width: f64, height: f64) -> Self {
        let xmin = self.x().clamp(0.0, width);
        let ymin = self.y().clamp(0.0, height);
        let xmax = self.max_x().clamp(0.0, width);
        let ymax = self.max_y().clamp(0.0, height);
        Self::from_corners(xmin, ymin, xmax.max(xmin), ymax.max(ymin))
    }
}

impl Rect<Normalized> {
    /// Maps a normalized, bottom-left-origin box into a pixel rectangle with
    /// a top-left origin.
    ///
    /// The vertical flip `(1 - y - h)` is what turns detector space into
    /// raster space.
    pub fn to_pixel(&self, size: Size) -> Rect<Pixel> {
        Rect::new(
            self.origin.x * size.width,
            (1.0 - self.origin.y - self.height) * size.height,
            self.width * size.width,
            self.height * size.height,
        )
    }
}

impl Rect<Pixel> {
    /// Inverse of [`Rect::<Normalized>::to_pixel`].
    pub fn to_normalized(&self, size: Size) -> Rect<Normalized> {
        let width = self.width / size.width;
        let height = self.height / size.height;
        Rect::new(
            self.origin.x / size.width,
            1.0 - self.origin.y / size.height - height,
            width,
            height,
        )
    }
}

impl<TSpace> std::fmt::Debug for Rect<TSpace> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rect")
            .field("x", &self.origin.x)
            .field("y", &self.origin.y)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

impl<TSpace> Default for Rect<TSpace> {
    fn default() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0)
    }
}

// Hand-written serde so that TSpace needs no Serialize/Deserialize bounds.
impl<TSpace> Serialize for Rect<TSpace> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("Rect", 4)?;
        state.serialize_field("x", &self.origin.x)?;
        state.serialize_field("y", &self.origin.y)?;
        state.serialize_field("width", &self.width)?;
        state.serialize_field("height", &self.height)?;
        state.end()
    }
}

impl<'de, TSpace> Deserialize<'de> for Rect<TSpace> {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct RectData {
            x: f64,
            y: f64,
            width: f64,
            height: f64,
        }
        let data = RectData::deserialize(deserializer)?;
        Ok(Rect::new(data.x, data.y, data.width, data.height))
    }
}
