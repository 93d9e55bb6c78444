//! JSON detections files.
//!
//! A detections file is how an external detector hands its batch to the
//! CLI:
//!
//! ```json
//! {
//!   "image": {"width": 800, "height": 600},
//!   "detections": [
//!     {"type": "quad",
//!      "top_left": {"x": 0.1, "y": 0.9}, "top_right": {"x": 0.4, "y": 0.9},
//!      "bottom_left": {"x": 0.1, "y": 0.6}, "bottom_right": {"x": 0.4, "y": 0.6},
//!      "confidence": 0.93},
//!     {"type": "pixel", "x": 500, "y": 40, "width": 200, "height": 150}
//!   ]
//! }
//! ```
//!
//! `image` is optional and only used to cross-check the photo the file is
//! applied to.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::DetectionBatch;
use crate::error::QuadcropError;

/// Contents of a detections file.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionsFile {
    /// Dimensions of the image the detector ran on, if recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageDims>,

    /// The detection batch.
    pub detections: DetectionBatch,
}

/// Pixel dimensions recorded alongside detections.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageDims {
    pub width: u32,
    pub height: u32,
}

/// Reads a detections file from disk.
///
/// # Errors
/// Returns an error if the file cannot be opened or is not a valid
/// detections document.
pub fn read_detections_json(path: &Path) -> Result<DetectionsFile, QuadcropError> {
    let file = File::open(path).map_err(QuadcropError::Io)?;
    let reader = BufReader::new(file);

    serde_json::from_reader(reader).map_err(|source| QuadcropError::DetectionsParse {
        path: path.to_path_buf(),
        source,
    })
}

/// Writes a detections file to disk.
pub fn write_detections_json(path: &Path, file: &DetectionsFile) -> Result<(), QuadcropError> {
    let out = File::create(path).map_err(QuadcropError::Io)?;
    let writer = BufWriter::new(out);

    serde_json::to_writer_pretty(writer, file).map_err(|source| QuadcropError::DetectionsWrite {
        path: path.to_path_buf(),
        source,
    })
}

/// Parses a detections document from a string.
pub fn from_json_str(json: &str) -> Result<DetectionsFile, serde_json::Error> {
    serde_json::from_str(json)
}

/// Parses a detections document from raw bytes.
pub fn from_json_slice(bytes: &[u8]) -> Result<DetectionsFile, serde_json::Error> {
    serde_json::from_slice(bytes)
}

/// Serializes a detections document to a pretty-printed string.
pub fn to_json_string(file: &DetectionsFile) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(file)
}
