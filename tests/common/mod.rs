#![allow(dead_code)]

use std::fs;
use std::path::Path;

use image::{DynamicImage, Rgb, RgbImage};

/// A 400x200 scene: two cards side by side, a smaller duplicate inside the
/// first card, and a card hanging off the bottom-right edge.
pub const SCENE_DETECTIONS: &str = r#"{
    "image": {"width": 400, "height": 200},
    "detections": [
        {"type": "pixel", "x": 10, "y": 10, "width": 80, "height": 80},
        {"type": "pixel", "x": 110, "y": 10, "width": 80, "height": 80},
        {"type": "pixel", "x": 20, "y": 20, "width": 40, "height": 40},
        {"type": "pixel", "x": 350, "y": 100, "width": 80, "height": 80}
    ]
}"#;

pub fn photo(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    }))
}

pub fn write_photo(path: &Path, width: u32, height: u32) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    photo(width, height).save(path).expect("write photo");
}

pub fn write_text(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    fs::write(path, content).expect("write file");
}
