//! Background removal through an external segmentation model.

use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, RgbaImage};

use super::apply_mask;
use crate::error::QuadcropError;

/// Input size expected by the bundled segmentation models.
pub const DEFAULT_SEGMENTATION_SIZE: (u32, u32) = (512, 512);

/// A foreground segmentation model.
///
/// Given an image, returns a single-channel mask where bright pixels are
/// foreground. The mask may be smaller or larger than the input.
pub trait Segmenter {
    fn mask(&self, image: &RgbaImage) -> Result<GrayImage, QuadcropError>;
}

impl<S: Segmenter + ?Sized> Segmenter for &S {
    fn mask(&self, image: &RgbaImage) -> Result<GrayImage, QuadcropError> {
        (**self).mask(image)
    }
}

/// Makes everything outside the segmented foreground transparent.
///
/// The image is resized to `size` for the model, and the returned mask is
/// resized back to the image before it is applied.
pub fn remove_background<S: Segmenter + ?Sized>(
    image: &DynamicImage,
    segmenter: &S,
    size: (u32, u32),
) -> Result<RgbaImage, QuadcropError> {
    let (width, height) = (image.width(), image.height());
    if size.0 == 0 || size.1 == 0 || width == 0 || height == 0 {
        return Err(QuadcropError::Segmentation(format!(
            "cannot segment a {}x{} image at {}x{}",
            width, height, size.0, size.1
        )));
    }

    let input = image
        .resize_exact(size.0, size.1, FilterType::Triangle)
        .to_rgba8();
    let mask = segmenter.mask(&input)?;
    if mask.width() == 0 || mask.height() == 0 {
        return Err(QuadcropError::Segmentation("model returned an empty mask".into()));
    }

    let mask = if mask.dimensions() == (width, height) {
        mask
    } else {
        tracing::debug!(
            from = ?mask.dimensions(),
            to = ?(width, height),
            "resizing segmentation mask"
        );
        imageops::resize(&mask, width, height, FilterType::Triangle)
    };

    apply_mask(image, &mask)
}
