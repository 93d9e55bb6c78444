//! Raster helpers used around the crop pipeline.
//!
//! None of these are needed to produce crops. They cover the image chores
//! that come with them: previewing detections, making thumbnails, turning a
//! segmentation model's output into something displayable, and cutting a
//! subject out of its background.

mod overlay;
mod segment;

pub use overlay::{draw_rectangles, DETECTION_COLOR};
pub use segment::{remove_background, Segmenter, DEFAULT_SEGMENTATION_SIZE};

use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, Luma, Rgba, RgbaImage};

use crate::error::QuadcropError;

/// Channel value above which a pixel counts as content in [`content_mask`].
pub const CONTENT_LEVEL: u8 = 10;

/// Default cut-off for [`to_black_and_white`].
pub const DEFAULT_THRESHOLD: f32 = 0.7;

/// Converts to grayscale and binarizes: pixels brighter than `threshold`
/// (a fraction of full scale) become white, the rest black.
pub fn to_black_and_white(image: &DynamicImage, threshold: f32) -> GrayImage {
    let cutoff = threshold.clamp(0.0, 1.0) * 255.0;
    let mut gray = image.to_luma8();
    for Luma([value]) in gray.pixels_mut() {
        *value = if f32::from(*value) > cutoff { 255 } else { 0 };
    }
    gray
}

/// Paints content red and background white, keeping each pixel's alpha.
///
/// A pixel is content when any colour channel exceeds [`CONTENT_LEVEL`].
pub fn content_mask(image: &DynamicImage) -> RgbaImage {
    let mut rgba = image.to_rgba8();
    for Rgba([r, g, b, _]) in rgba.pixels_mut() {
        let content = [*r, *g, *b].iter().any(|c| *c > CONTENT_LEVEL);
        (*r, *g, *b) = if content { (255, 0, 0) } else { (255, 255, 255) };
    }
    rgba
}

/// Uses the luminance of `mask` as opacity: black mask pixels become fully
/// transparent, white ones leave the pixel as it was.
pub fn apply_mask(image: &DynamicImage, mask: &GrayImage) -> Result<RgbaImage, QuadcropError> {
    let expected = (image.width(), image.height());
    if mask.dimensions() != expected {
        return Err(QuadcropError::ShapeMismatch {
            expected,
            actual: mask.dimensions(),
        });
    }

    let mut rgba = image.to_rgba8();
    for (pixel, Luma([m])) in rgba.pixels_mut().zip(mask.pixels()) {
        let alpha = u16::from(pixel[3]) * u16::from(*m) / 255;
        pixel[3] = alpha as u8;
    }
    Ok(rgba)
}

/// Turns a row-major map of probabilities into a grayscale image, mapping
/// `0.0..=1.0` onto `0..=255` (values outside are clamped, NaN is black).
///
/// Returns `None` if either dimension is zero or `values` has the wrong
/// length.
pub fn probabilities_to_gray(width: u32, height: u32, values: &[f32]) -> Option<GrayImage> {
    if width == 0 || height == 0 || values.len() != (width as usize) * (height as usize) {
        return None;
    }

    let bytes = values
        .iter()
        .map(|v| (v * 255.0).clamp(0.0, 255.0) as u8)
        .collect();
    GrayImage::from_raw(width, height, bytes)
}

/// Center-crops to the aspect ratio of `width x height` and resizes, the
/// way grid thumbnails are filled.
pub fn fill_crop(image: &DynamicImage, width: u32, height: u32) -> DynamicImage {
    image.resize_to_fill(width, height, FilterType::Triangle)
}

/// Drops the alpha channel.
pub fn to_rgb(image: &DynamicImage) -> DynamicImage {
    DynamicImage::ImageRgb8(image.to_rgb8())
}
