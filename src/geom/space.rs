//! Coordinate space marker types.
//!
//! These are zero-sized types used as type parameters so that detector
//! geometry and raster geometry cannot be mixed at compile time.

use std::fmt;

/// Marker for pixel coordinates: absolute positions with the origin in the
/// top-left corner of the image and y growing downwards.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pixel {}

/// Marker for normalized detector coordinates: fractions of the image
/// dimensions in `[0, 1]` with the origin in the bottom-left corner and y
/// growing upwards.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum Normalized {}

impl fmt::Debug for Pixel {
    fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {}
    }
}

impl fmt::Debug for Normalized {
    fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {}
    }
}
