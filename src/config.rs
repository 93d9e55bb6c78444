//! Tunable parameters for the crop pipeline and the detector boundary.
//!
//! Configuration can be built programmatically or loaded from a JSON or
//! YAML file:
//!
//! ```no_run
//! use quadcrop::PipelineConfig;
//! use std::path::Path;
//!
//! let config = PipelineConfig::from_path(Path::new("quadcrop.yaml"))?;
//! # Ok::<(), quadcrop::QuadcropError>(())
//! ```
//!
//! Every field has a default, so a file only needs to mention the values it
//! changes.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::QuadcropError;

/// Complete configuration for one `process` call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Reading-order tolerances.
    pub ordering: OrderingConfig,

    /// Overlap removal policy.
    pub dedup: DedupConfig,

    /// Upper bound on detections entering the pairwise dedup stage.
    pub max_detections: usize,

    /// What to do with rectangles that leave the raw pixel buffer.
    pub bounds: BoundsPolicy,

    /// Filters applied by detector collaborators before the pipeline runs.
    pub detector: DetectorParams,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            ordering: OrderingConfig::default(),
            dedup: DedupConfig::default(),
            max_detections: 20,
            bounds: BoundsPolicy::default(),
            detector: DetectorParams::default(),
        }
    }
}

/// Tolerances used to group rectangles into rows and columns.
///
/// Both values are fractions of the image dimension in normalized detector
/// space.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderingConfig {
    /// Two rectangles whose top-left y differ by at most this much share a row.
    pub row_tolerance: f64,

    /// Two rectangles in a row whose top-left x differ by at most this much
    /// share a column.
    pub column_tolerance: f64,
}

impl Default for OrderingConfig {
    fn default() -> Self {
        Self {
            row_tolerance: 0.1,
            column_tolerance: 0.1,
        }
    }
}

/// Overlap removal settings.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    /// Which rectangle loses when two overlapping rectangles have equal area.
    pub tie_break: TieBreak,
}

/// Loser of an equal-area overlap.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TieBreak {
    /// Remove the rectangle with the higher input index.
    #[default]
    RemoveLater,
    /// Remove the rectangle with the lower input index.
    RemoveEarlier,
}

/// Handling of rectangles whose raw-pixel bounds exceed the buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BoundsPolicy {
    /// Skip the rectangle and report `OutOfBounds`.
    #[default]
    Skip,
    /// Intersect the rectangle with the buffer and crop what remains.
    Clamp,
}

/// Admission filters a rectangle detector applies before handing its batch
/// to the pipeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorParams {
    /// Smallest accepted width/height ratio.
    pub min_aspect_ratio: f64,

    /// Largest accepted width/height ratio.
    pub max_aspect_ratio: f64,

    /// Smallest accepted side, as a fraction of the image's smaller dimension.
    pub min_size: f64,

    /// Largest accepted deviation of any corner angle from 90 degrees.
    pub quadrature_tolerance: f64,

    /// Keep at most this many detections (highest confidence first).
    pub max_observations: usize,

    /// Drop detections below this confidence.
    pub min_confidence: f32,
}

impl Default for DetectorParams {
    fn default() -> Self {
        Self {
            min_aspect_ratio: 0.5,
            max_aspect_ratio: 2.0,
            min_size: 0.1,
            quadrature_tolerance: 15.0,
            max_observations: 20,
            min_confidence: 0.5,
        }
    }
}

impl PipelineConfig {
    /// Loads a configuration file, choosing the parser from the extension
    /// (`.json`, `.yaml` or `.yml`), and validates it.
    pub fn from_path(path: &Path) -> Result<Self, QuadcropError> {
        let content = std::fs::read_to_string(path)?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        let config: Self = match ext.as_deref() {
            Some("json") => {
                serde_json::from_str(&content).map_err(|e| QuadcropError::ConfigParse {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?
            }
            Some("yaml") | Some("yml") => {
                serde_yaml::from_str(&content).map_err(|e| QuadcropError::ConfigParse {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?
            }
            _ => {
                return Err(QuadcropError::UnsupportedFormat(format!(
                    "config file '{}' (supported: .json, .yaml, .yml)",
                    path.display()
                )));
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Fuzz-only entrypoint for YAML configuration parsing and validation.
    #[cfg(feature = "fuzzing")]
    pub fn fuzz_parse_yaml(input: &str) -> Result<Self, QuadcropError> {
        let config: Self =
            serde_yaml::from_str(input).map_err(|e| QuadcropError::ConfigParse {
                path: std::path::PathBuf::from("<fuzz>"),
                message: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Writes the configuration as pretty JSON.
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Rejects values that would make the pipeline meaningless.
    pub fn validate(&self) -> Result<(), QuadcropError> {
        let OrderingConfig {
            row_tolerance,
            column_tolerance,
        } = self.ordering;
        for (name, value) in [
            ("ordering.row_tolerance", row_tolerance),
            ("ordering.column_tolerance", column_tolerance),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(QuadcropError::InvalidConfig(format!(
                    "{} must be a finite, non-negative number (got {})",
                    name, value
                )));
            }
        }

        if self.max_detections == 0 {
            return Err(QuadcropError::InvalidConfig(
                "max_detections must be at least 1".into(),
            ));
        }

        self.detector.validate()
    }
}

impl DetectorParams {
    /// Checks ranges of the detector filters.
    pub fn validate(&self) -> Result<(), QuadcropError> {
        let p = self;
        if !(p.min_aspect_ratio.is_finite()
            && p.max_aspect_ratio.is_finite()
            && p.min_aspect_ratio > 0.0
            && p.min_aspect_ratio <= p.max_aspect_ratio)
        {
            return Err(QuadcropError::InvalidConfig(format!(
                "detector aspect ratio range [{}, {}] is invalid",
                p.min_aspect_ratio, p.max_aspect_ratio
            )));
        }
        if !(0.0..=1.0).contains(&p.min_size) {
            return Err(QuadcropError::InvalidConfig(format!(
                "detector.min_size must be within [0, 1] (got {})",
                p.min_size
            )));
        }
        if !(0.0..=45.0).contains(&p.quadrature_tolerance) {
            return Err(QuadcropError::InvalidConfig(format!(
                "detector.quadrature_tolerance must be within [0, 45] degrees (got {})",
                p.quadrature_tolerance
            )));
        }
        if !(0.0..=1.0).contains(&p.min_confidence) {
            return Err(QuadcropError::InvalidConfig(format!(
                "detector.min_confidence must be within [0, 1] (got {})",
                p.min_confidence
            )));
        }
        if p.max_observations == 0 {
            return Err(QuadcropError::InvalidConfig(
                "detector.max_observations must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
