#![allow(dead_code)]

use proptest::prelude::*;
use proptest::strategy::BoxedStrategy;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};
use quadcrop::detector::{Detection, DetectionBatch};
use quadcrop::geom::{NormalizedQuad, NormalizedRect, PixelRect};

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

/// Integer-aligned rectangles with positive size whose origin lies inside a
/// `width x height` image. They may extend past the right/bottom edges.
pub fn arb_pixel_rect(width: u32, height: u32) -> BoxedStrategy<PixelRect> {
    (0..width, 0..height, 1..=width, 1..=height)
        .prop_map(|(x, y, w, h)| PixelRect::new(x as f64, y as f64, w as f64, h as f64))
        .boxed()
}

pub fn arb_pixel_rects(width: u32, height: u32, max: usize) -> BoxedStrategy<Vec<PixelRect>> {
    proptest::collection::vec(arb_pixel_rect(width, height), 0..=max).boxed()
}

/// Normalized axis-aligned quads on a coarse grid, with a confidence.
pub fn arb_quad() -> BoxedStrategy<NormalizedQuad> {
    (0u32..20, 0u32..20, 1u32..=10, 1u32..=10, 0u16..=1000)
        .prop_map(|(x, y, w, h, c)| {
            let rect = NormalizedRect::new(
                x as f64 * 0.05,
                y as f64 * 0.05,
                w as f64 * 0.05,
                h as f64 * 0.05,
            );
            NormalizedQuad::from_rect(rect, c as f32 / 1000.0)
        })
        .boxed()
}

pub fn arb_batch(max: usize) -> BoxedStrategy<DetectionBatch> {
    proptest::collection::vec(
        prop_oneof![
            arb_quad().prop_map(Detection::Quad),
            arb_pixel_rect(400, 300).prop_map(Detection::Pixel),
        ],
        0..=max,
    )
    .prop_map(DetectionBatch::new)
    .boxed()
}
