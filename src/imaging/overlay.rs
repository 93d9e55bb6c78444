use image::{DynamicImage, Rgba, RgbaImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

use crate::geom::PixelRect;

/// Outline colour used for detections.
pub const DETECTION_COLOR: Rgba<u8> = Rgba([255, 0, 0, 255]);

/// Draws each rectangle as an outline `thickness` pixels wide, growing
/// inwards. Rectangles are in the image's pixel space and are clipped to it.
pub fn draw_rectangles(
    image: &DynamicImage,
    rects: &[PixelRect],
    color: Rgba<u8>,
    thickness: u32,
) -> RgbaImage {
    let mut canvas = image.to_rgba8();
    let (width, height) = canvas.dimensions();

    for rect in rects {
        if !rect.is_finite() {
            continue;
        }
        let clipped = rect.clamped_to(f64::from(width), f64::from(height));
        let x0 = clipped.x().floor() as u32;
        let y0 = clipped.y().floor() as u32;
        let w = (clipped.max_x().ceil() as u32).saturating_sub(x0);
        let h = (clipped.max_y().ceil() as u32).saturating_sub(y0);

        for t in 0..thickness.max(1) {
            let inner_w = w.saturating_sub(2 * t);
            let inner_h = h.saturating_sub(2 * t);
            if inner_w == 0 || inner_h == 0 {
                break;
            }
            let outline = Rect::at((x0 + t) as i32, (y0 + t) as i32).of_size(inner_w, inner_h);
            draw_hollow_rect_mut(&mut canvas, outline, color);
        }
    }

    canvas
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outline_drawn_and_interior_untouched() {
        let image = DynamicImage::new_rgba8(20, 20);
        let out = draw_rectangles(
            &image,
            &[PixelRect::new(5.0, 5.0, 10.0, 10.0)],
            DETECTION_COLOR,
            1,
        );

        assert_eq!(out.get_pixel(5, 5), &DETECTION_COLOR);
        assert_eq!(out.get_pixel(14, 14), &DETECTION_COLOR);
        assert_eq!(out.get_pixel(10, 10), &Rgba([0, 0, 0, 0]));
        assert_eq!(out.get_pixel(4, 4), &Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn test_thickness_grows_inwards() {
        let image = DynamicImage::new_rgba8(20, 20);
        let out = draw_rectangles(
            &image,
            &[PixelRect::new(2.0, 2.0, 16.0, 16.0)],
            DETECTION_COLOR,
            3,
        );
        assert_eq!(out.get_pixel(4, 10), &DETECTION_COLOR);
        assert_eq!(out.get_pixel(5, 10), &Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn test_rect_outside_image_is_ignored() {
        let image = DynamicImage::new_rgba8(10, 10);
        let out = draw_rectangles(
            &image,
            &[PixelRect::new(50.0, 50.0, 5.0, 5.0)],
            DETECTION_COLOR,
            2,
        );
        assert!(out.pixels().all(|p| *p == Rgba([0, 0, 0, 0])));
    }
}
