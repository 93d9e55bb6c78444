//! Cutting rectangles out of the source raster.
//!
//! Rectangles arrive in logical (display) pixel space. The raw buffer may be
//! larger than the logical image, e.g. a photo shown at scale 2, so every
//! rectangle is divided by `scale_factor = logical_width / raw_width` before
//! it touches the buffer.

use image::DynamicImage;
use serde::Serialize;
use thiserror::Error;

use crate::config::BoundsPolicy;
use crate::error::QuadcropError;
use crate::geom::{PixelRect, Size};

/// Slack, in raw pixels, allowed at the buffer edges to absorb rounding.
pub const EDGE_TOLERANCE: f64 = 1e-6;

/// The photo being cropped: the raw pixel buffer and its logical size.
#[derive(Clone, Copy, Debug)]
pub struct SourceImage<'a> {
    pixels: &'a DynamicImage,
    logical_size: Size,
}

impl<'a> SourceImage<'a> {
    /// A source displayed at scale 1 (logical size equals raw size).
    pub fn new(pixels: &'a DynamicImage) -> Self {
        Self {
            pixels,
            logical_size: Size::from((pixels.width(), pixels.height())),
        }
    }

    /// A source displayed at `scale` raw pixels per logical point.
    pub fn with_scale(pixels: &'a DynamicImage, scale: f64) -> Result<Self, QuadcropError> {
        if !(scale.is_finite() && scale > 0.0) {
            return Err(QuadcropError::InvalidConfig(format!(
                "display scale must be a positive number (got {})",
                scale
            )));
        }
        let raw = Size::from((pixels.width(), pixels.height()));
        Self::with_logical_size(pixels, Size::new(raw.width / scale, raw.height / scale))
    }

    /// A source with an explicit logical size.
    pub fn with_logical_size(
        pixels: &'a DynamicImage,
        logical_size: Size,
    ) -> Result<Self, QuadcropError> {
        if !logical_size.is_valid() {
            return Err(QuadcropError::InvalidConfig(format!(
                "logical image size must be positive (got {}x{})",
                logical_size.width, logical_size.height
            )));
        }
        Ok(Self {
            pixels,
            logical_size,
        })
    }

    pub fn pixels(&self) -> &'a DynamicImage {
        self.pixels
    }

    pub fn logical_size(&self) -> Size {
        self.logical_size
    }

    /// `(width, height)` of the raw buffer.
    pub fn raw_dimensions(&self) -> (u32, u32) {
        (self.pixels.width(), self.pixels.height())
    }

    /// `logical_width / raw_width`.
    pub fn scale_factor(&self) -> f64 {
        self.logical_size.width / f64::from(self.pixels.width())
    }
}

/// An integer region of the raw buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct RawRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Why a single rectangle could not be cropped.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum CropError {
    #[error("rectangle {rect:?} lies outside the {width}x{height} buffer")]
    OutOfBounds {
        /// The rectangle in raw pixel space.
        rect: PixelRect,
        width: u32,
        height: u32,
    },

    #[error("rectangle {rect:?} has no pixel extent")]
    DegenerateRectangle {
        /// The rectangle in raw pixel space.
        rect: PixelRect,
    },
}

/// Maps a logical rectangle to the raw pixels it covers.
///
/// The rectangle is scaled into raw space, checked against the buffer (or
/// clamped to it under [`BoundsPolicy::Clamp`]) and snapped outward to whole
/// pixels.
pub fn raw_region(
    rect: &PixelRect,
    source: &SourceImage<'_>,
    policy: BoundsPolicy,
) -> Result<RawRegion, CropError> {
    let (raw_w, raw_h) = source.raw_dimensions();
    let scaled = rect.scaled(1.0 / source.scale_factor());

    if !scaled.is_finite() || raw_w == 0 || raw_h == 0 {
        return Err(CropError::OutOfBounds {
            rect: scaled,
            width: raw_w,
            height: raw_h,
        });
    }
    if scaled.is_degenerate() {
        return Err(CropError::DegenerateRectangle { rect: scaled });
    }

    let (w, h) = (f64::from(raw_w), f64::from(raw_h));
    let region = if scaled.fits_within(w, h, EDGE_TOLERANCE) {
        scaled
    } else {
        let clamped = scaled.clamped_to(w, h);
        if policy == BoundsPolicy::Skip || clamped.is_degenerate() {
            return Err(CropError::OutOfBounds {
                rect: scaled,
                width: raw_w,
                height: raw_h,
            });
        }
        clamped
    };

    let x0 = (region.x() + EDGE_TOLERANCE).floor().max(0.0);
    let y0 = (region.y() + EDGE_TOLERANCE).floor().max(0.0);
    let x1 = (region.max_x() - EDGE_TOLERANCE).ceil().min(w);
    let y1 = (region.max_y() - EDGE_TOLERANCE).ceil().min(h);

    if x1 <= x0 || y1 <= y0 {
        return Err(CropError::DegenerateRectangle { rect: scaled });
    }

    Ok(RawRegion {
        x: x0 as u32,
        y: y0 as u32,
        width: (x1 - x0) as u32,
        height: (y1 - y0) as u32,
    })
}

/// Crops one logical rectangle into a newly allocated image.
pub fn crop_one(
    rect: &PixelRect,
    source: &SourceImage<'_>,
    policy: BoundsPolicy,
) -> Result<(DynamicImage, RawRegion), CropError> {
    let region = raw_region(rect, source, policy)?;
    let image = source
        .pixels()
        .crop_imm(region.x, region.y, region.width, region.height);
    Ok((image, region))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgba, RgbaImage};

    fn gradient(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_fn(width, height, |x, y| {
            Rgba([x as u8, y as u8, 0, 255])
        }))
    }

    #[test]
    fn test_crop_at_scale_one() {
        let image = gradient(100, 80);
        let source = SourceImage::new(&image);
        let (crop, region) = crop_one(
            &PixelRect::new(10.0, 20.0, 30.0, 40.0),
            &source,
            BoundsPolicy::Skip,
        )
        .expect("crop");

        assert_eq!(
            region,
            RawRegion {
                x: 10,
                y: 20,
                width: 30,
                height: 40
            }
        );
        assert_eq!(crop.dimensions(), (30, 40));
        assert_eq!(crop.get_pixel(0, 0), Rgba([10, 20, 0, 255]));
    }

    #[test]
    fn test_crop_divides_by_scale_factor() {
        let image = gradient(200, 100);
        let source = SourceImage::with_scale(&image, 2.0).expect("source");
        assert_eq!(source.logical_size(), Size::new(100.0, 50.0));
        assert_eq!(source.scale_factor(), 0.5);

        let region = raw_region(
            &PixelRect::new(10.0, 5.0, 20.0, 10.0),
            &source,
            BoundsPolicy::Skip,
        )
        .expect("region");
        assert_eq!(
            region,
            RawRegion {
                x: 20,
                y: 10,
                width: 40,
                height: 20
            }
        );
    }

    #[test]
    fn test_full_image_rect_fits_despite_rounding() {
        let image = gradient(300, 300);
        let source = SourceImage::with_scale(&image, 3.0).expect("source");
        // 100 logical points * 3 may not come back as exactly 300.0.
        let rect = PixelRect::new(0.0, 0.0, 100.0, 100.0);
        let region = raw_region(&rect, &source, BoundsPolicy::Skip).expect("region");
        assert_eq!((region.width, region.height), (300, 300));
    }

    #[test]
    fn test_fractional_rect_snaps_outward() {
        let image = gradient(50, 50);
        let source = SourceImage::new(&image);
        let region = raw_region(
            &PixelRect::new(10.4, 10.6, 5.2, 5.0),
            &source,
            BoundsPolicy::Skip,
        )
        .expect("region");
        assert_eq!(
            region,
            RawRegion {
                x: 10,
                y: 10,
                width: 6,
                height: 6
            }
        );
    }

    #[test]
    fn test_out_of_bounds_is_skipped() {
        let image = gradient(100, 100);
        let source = SourceImage::new(&image);
        let err = raw_region(
            &PixelRect::new(90.0, 10.0, 20.0, 20.0),
            &source,
            BoundsPolicy::Skip,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            CropError::OutOfBounds {
                width: 100,
                height: 100,
                ..
            }
        ));
    }

    #[test]
    fn test_clamp_policy_intersects_with_buffer() {
        let image = gradient(100, 100);
        let source = SourceImage::new(&image);
        let region = raw_region(
            &PixelRect::new(90.0, -5.0, 20.0, 20.0),
            &source,
            BoundsPolicy::Clamp,
        )
        .expect("region");
        assert_eq!(
            region,
            RawRegion {
                x: 90,
                y: 0,
                width: 10,
                height: 15
            }
        );

        // Entirely outside stays an error even when clamping.
        let err = raw_region(
            &PixelRect::new(150.0, 150.0, 10.0, 10.0),
            &source,
            BoundsPolicy::Clamp,
        );
        assert!(matches!(err, Err(CropError::OutOfBounds { .. })));
    }

    #[test]
    fn test_zero_size_rect_is_degenerate() {
        let image = gradient(100, 100);
        let source = SourceImage::new(&image);
        let err = raw_region(
            &PixelRect::new(10.5, 10.0, 0.0, 20.0),
            &source,
            BoundsPolicy::Skip,
        );
        assert!(matches!(err, Err(CropError::DegenerateRectangle { .. })));
    }

    #[test]
    fn test_invalid_scale_rejected() {
        let image = gradient(10, 10);
        assert!(SourceImage::with_scale(&image, 0.0).is_err());
        assert!(SourceImage::with_scale(&image, f64::NAN).is_err());
    }

    #[test]
    fn test_source_is_not_mutated() {
        let image = gradient(20, 20);
        let before = image.clone();
        let source = SourceImage::new(&image);
        let (crop, _) = crop_one(&PixelRect::new(0.0, 0.0, 5.0, 5.0), &source, BoundsPolicy::Skip)
            .expect("crop");
        assert_eq!(crop.dimensions(), (5, 5));
        assert_eq!(image, before);
    }
}
