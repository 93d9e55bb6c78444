use std::path::PathBuf;
use thiserror::Error;

use crate::detector::DetectionError;

/// The main error type for quadcrop operations.
///
/// These are whole-batch failures. Problems with a single rectangle are
/// never raised through this type; they are recorded in the
/// [`PipelineReport`](crate::pipeline::PipelineReport) and the rectangle is
/// skipped.
#[derive(Debug, Error)]
pub enum QuadcropError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to decode image {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to write image {path}: {source}")]
    ImageWrite {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to read image size of {path}: {message}")]
    ImageSize { path: PathBuf, message: String },

    #[error("Detection failed: {0}")]
    Detection(#[from] DetectionError),

    #[error("Failed to parse detections from {path}: {source}")]
    DetectionsParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write detections to {path}: {source}")]
    DetectionsWrite {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to parse config {path}: {message}")]
    ConfigParse { path: PathBuf, message: String },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Failed to write manifest {path}: {source}")]
    ManifestWrite {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Segmentation failed: {0}")]
    Segmentation(String),

    #[error("Mask size {actual:?} does not match image size {expected:?}")]
    ShapeMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },

    #[error("Failed to serialize output: {0}")]
    OutputSerialize(#[from] serde_json::Error),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}
