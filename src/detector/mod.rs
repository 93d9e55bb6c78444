//! The boundary to the rectangle detector.
//!
//! Finding rectangles in raw pixels is not done here. A detector
//! collaborator implements [`RectangleDetector`] and hands back a
//! [`DetectionBatch`]; the pipeline only post-processes that batch.
//!
//! Detectors that run asynchronously are wrapped with
//! [`spawn_detection`], which yields exactly one result through a
//! [`PendingDetection`] handle.

mod filter;
pub mod io_json;

use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::DetectorParams;
use crate::geom::{Normalized, NormalizedQuad, PixelRect, Point, Size};

/// One entry of a detection pass.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Detection {
    /// A quadrilateral in normalized detector space.
    Quad(NormalizedQuad),
    /// An axis-aligned rectangle already in logical pixel space.
    Pixel(PixelRect),
}

impl Detection {
    /// Detector confidence, if the detection carries one.
    pub fn confidence(&self) -> Option<f32> {
        match self {
            Detection::Quad(q) => Some(q.confidence),
            Detection::Pixel(_) => None,
        }
    }

    /// True if every coordinate is finite.
    pub fn is_finite(&self) -> bool {
        match self {
            Detection::Quad(q) => q.is_finite(),
            Detection::Pixel(r) => r.is_finite(),
        }
    }

    /// Confidence used for ranking; detections without one rank as certain.
    pub(crate) fn rank_confidence(&self) -> f32 {
        self.confidence().unwrap_or(1.0)
    }

    /// The bounding rectangle in logical pixel space.
    pub fn pixel_rect(&self, size: Size) -> PixelRect {
        match self {
            Detection::Quad(q) => q.bounding_box().to_pixel(size),
            Detection::Pixel(r) => *r,
        }
    }

    /// Top-left corner in normalized detector space (y grows upwards).
    pub fn anchor(&self, size: Size) -> Point<Normalized> {
        match self {
            Detection::Quad(q) => q.top_left,
            Detection::Pixel(r) => {
                let n = r.to_normalized(size);
                Point::new(n.x(), n.max_y())
            }
        }
    }

    /// Area used to break ordering ties, in normalized units.
    pub fn quad_area(&self, size: Size) -> f64 {
        match self {
            Detection::Quad(q) => q.calculate_area(),
            Detection::Pixel(r) => r.to_normalized(size).area(),
        }
    }

    /// The detection as a quad; pixel rectangles become axis-aligned quads.
    pub fn to_quad(&self, size: Size) -> NormalizedQuad {
        match self {
            Detection::Quad(q) => *q,
            Detection::Pixel(r) => NormalizedQuad::from_rect(r.to_normalized(size), 1.0),
        }
    }
}

/// The output of one detection pass, in detector order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DetectionBatch {
    pub detections: Vec<Detection>,
}

impl DetectionBatch {
    pub fn new(detections: Vec<Detection>) -> Self {
        Self { detections }
    }

    pub fn len(&self) -> usize {
        self.detections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Detection> {
        self.detections.iter()
    }
}

impl From<Vec<Detection>> for DetectionBatch {
    fn from(detections: Vec<Detection>) -> Self {
        Self::new(detections)
    }
}

impl FromIterator<Detection> for DetectionBatch {
    fn from_iter<I: IntoIterator<Item = Detection>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a DetectionBatch {
    type Item = &'a Detection;
    type IntoIter = std::slice::Iter<'a, Detection>;

    fn into_iter(self) -> Self::IntoIter {
        self.detections.iter()
    }
}

/// Failure reported by (or while waiting for) a detector.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DetectionError {
    #[error("detector reported an error: {0}")]
    Failed(String),

    #[error("detector did not answer within {0:?}")]
    TimedOut(Duration),

    #[error("detector stopped without producing a result")]
    Disconnected,
}

/// A source of rectangle detections for one image.
///
/// Implementations are expected to apply `params` themselves; entries they
/// return are trusted by the pipeline.
pub trait RectangleDetector {
    fn detect(
        &self,
        image: &DynamicImage,
        params: &DetectorParams,
    ) -> Result<DetectionBatch, DetectionError>;
}

impl<D: RectangleDetector + ?Sized> RectangleDetector for &D {
    fn detect(
        &self,
        image: &DynamicImage,
        params: &DetectorParams,
    ) -> Result<DetectionBatch, DetectionError> {
        (**self).detect(image, params)
    }
}

/// A detector that replays detections produced elsewhere (for example by a
/// platform detector that wrote them to a file), applying the admission
/// filters on the way out.
#[derive(Clone, Debug, Default)]
pub struct PrecomputedDetector {
    batch: DetectionBatch,
    logical_size: Option<Size>,
}

impl PrecomputedDetector {
    pub fn new(batch: DetectionBatch) -> Self {
        Self {
            batch,
            logical_size: None,
        }
    }

    /// Measures pixel detections against `size` instead of the raw buffer
    /// dimensions, for sources displayed at a scale other than 1.
    pub fn with_logical_size(mut self, size: Size) -> Self {
        self.logical_size = Some(size);
        self
    }
}

impl RectangleDetector for PrecomputedDetector {
    fn detect(
        &self,
        image: &DynamicImage,
        params: &DetectorParams,
    ) -> Result<DetectionBatch, DetectionError> {
        let size = self
            .logical_size
            .unwrap_or_else(|| Size::from((image.width(), image.height())));
        Ok(params.apply(&self.batch, size))
    }
}

/// Handle to a detection running on a background thread.
///
/// The handle yields exactly one result; waiting consumes it.
#[derive(Debug)]
pub struct PendingDetection {
    rx: mpsc::Receiver<Result<DetectionBatch, DetectionError>>,
}

impl PendingDetection {
    /// Blocks until the detector answers, or until `timeout` elapses.
    pub fn wait(self, timeout: Option<Duration>) -> Result<DetectionBatch, DetectionError> {
        match timeout {
            Some(limit) => match self.rx.recv_timeout(limit) {
                Ok(result) => result,
                Err(mpsc::RecvTimeoutError::Timeout) => Err(DetectionError::TimedOut(limit)),
                Err(mpsc::RecvTimeoutError::Disconnected) => Err(DetectionError::Disconnected),
            },
            None => self.rx.recv().map_err(|_| DetectionError::Disconnected)?,
        }
    }
}

/// Runs `detector` on its own thread and returns a single-shot handle to
/// its result.
pub fn spawn_detection<D>(
    detector: D,
    image: Arc<DynamicImage>,
    params: DetectorParams,
) -> PendingDetection
where
    D: RectangleDetector + Send + 'static,
{
    let (tx, rx) = mpsc::sync_channel(1);
    let spawned = thread::Builder::new()
        .name("quadcrop-detector".into())
        .spawn(move || {
            let result = detector.detect(&image, &params);
            if let Err(e) = &result {
                tracing::warn!(error = %e, "detector failed");
            }
            // The receiver may have given up already; nothing to do then.
            let _ = tx.send(result);
        });

    if let Err(e) = spawned {
        tracing::warn!(error = %e, "could not start detector thread");
    }

    PendingDetection { rx }
}
