//! Fuzz target for the geometry, dedup and ordering stages.
//!
//! Every detections document that parses must plan without panicking, and
//! the plan may never contain more rectangles than the batch.

#![no_main]

use libfuzzer_sys::fuzz_target;
use quadcrop::detector::io_json::from_json_slice;
use quadcrop::geom::Size;
use quadcrop::pipeline::plan;
use quadcrop::PipelineConfig;

fuzz_target!(|data: &[u8]| {
    if data.len() > 1024 * 1024 {
        return;
    }

    let Ok(file) = from_json_slice(data) else {
        return;
    };
    let size = file
        .image
        .map(|dims| Size::from((dims.width, dims.height)))
        .filter(Size::is_valid)
        .unwrap_or(Size::new(1024.0, 768.0));

    if let Ok(planned) = plan(&file.detections, size, &PipelineConfig::default()) {
        assert!(planned.rects.len() <= file.detections.len());
    }
});
