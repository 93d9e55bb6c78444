//! Fuzz target for pipeline configuration parsing.
//!
//! Accepted configurations must survive a JSON round trip through
//! `to_json_string`.

#![no_main]

use libfuzzer_sys::fuzz_target;
use quadcrop::PipelineConfig;

fuzz_target!(|data: &[u8]| {
    if data.len() > 1024 * 1024 {
        return;
    }

    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(config) = PipelineConfig::fuzz_parse_yaml(text) {
        let _ = config.to_json_string();
    }
});
