//! The crop pipeline.
//!
//! [`process`] takes a detector's batch and the source photo and runs, in
//! order:
//!
//! 1. geometry: each detection becomes a pixel rectangle in logical space
//!    (entries with NaN or infinite values are dropped),
//! 2. the detection cap (`max_detections`, most confident entries win),
//! 3. overlap removal ([`crate::dedup`]),
//! 4. reading order ([`crate::order`]),
//! 5. cropping ([`crate::crop`]).
//!
//! Entries lost along the way are recorded in the [`PipelineReport`]; only a
//! failing detector aborts a run.
//!
//! # Example
//!
//! ```
//! use image::DynamicImage;
//! use quadcrop::detector::{Detection, DetectionBatch};
//! use quadcrop::geom::PixelRect;
//! use quadcrop::pipeline::process;
//! use quadcrop::{PipelineConfig, SourceImage};
//!
//! let photo = DynamicImage::new_rgb8(200, 100);
//! let batch = DetectionBatch::new(vec![
//!     Detection::Pixel(PixelRect::new(110.0, 10.0, 80.0, 80.0)),
//!     Detection::Pixel(PixelRect::new(10.0, 10.0, 80.0, 80.0)),
//! ]);
//!
//! let result = process(&batch, &SourceImage::new(&photo), &PipelineConfig::default());
//! assert_eq!(result.crops.len(), 2);
//! assert_eq!(result.crops[0].source_index, 1);
//! ```

pub mod report;

pub use report::{
    IssueCode, IssueContext, PipelineCounts, PipelineIssue, PipelineReport, Severity,
};

use image::DynamicImage;
use serde::Serialize;

use crate::config::PipelineConfig;
use crate::crop::{crop_one, CropError, RawRegion, SourceImage, EDGE_TOLERANCE};
use crate::dedup::dedup;
use crate::detector::{Detection, DetectionBatch, RectangleDetector};
use crate::error::QuadcropError;
use crate::geom::{PixelRect, Size};
use crate::order::{reading_order, OrderKey};

/// One cropped region.
#[derive(Clone, Debug)]
pub struct Crop {
    /// Newly allocated pixels.
    pub image: DynamicImage,
    /// The rectangle in logical pixel space, limited to the image.
    pub rect: PixelRect,
    /// The region of the raw buffer that was copied.
    pub raw_bounds: RawRegion,
    /// Index of the detection in the incoming batch.
    pub source_index: usize,
    pub confidence: Option<f32>,
}

/// Crops in reading order, plus what happened to the rest of the batch.
#[derive(Clone, Debug, Default)]
pub struct CropResult {
    pub crops: Vec<Crop>,
    pub report: PipelineReport,
}

impl CropResult {
    pub fn len(&self) -> usize {
        self.crops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.crops.is_empty()
    }
}

/// A rectangle that would be cropped, without touching any pixels.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PlannedRect {
    /// Index of the detection in the incoming batch.
    pub source_index: usize,
    /// The rectangle in logical pixel space.
    pub rect: PixelRect,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    /// Whether the rectangle lies inside the image.
    pub in_bounds: bool,
}

/// Output of [`plan`].
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Plan {
    pub rects: Vec<PlannedRect>,
    pub report: PipelineReport,
}

/// A detection that made it through geometry, in logical pixel space.
#[derive(Clone, Copy, Debug)]
struct Candidate {
    index: usize,
    rect: PixelRect,
    key: OrderKey,
    confidence: Option<f32>,
}

/// Keeps the `max` most confident candidates, in batch order.
fn apply_cap(
    candidates: Vec<Candidate>,
    max: usize,
    report: &mut PipelineReport,
) -> Vec<Candidate> {
    let total = candidates.len();
    if total <= max {
        return candidates;
    }

    let rank = |c: &Candidate| c.confidence.unwrap_or(1.0);
    let mut indices: Vec<usize> = (0..total).collect();
    // Stable sort: equally confident entries keep batch order.
    indices.sort_by(|&a, &b| rank(&candidates[b]).total_cmp(&rank(&candidates[a])));
    indices.truncate(max);
    indices.sort_unstable();

    tracing::warn!(total, kept = max, "detection cap applied");
    report.add(PipelineIssue::warning(
        IssueCode::DetectionCapApplied,
        format!("kept the {} most confident of {} detections", max, total),
        IssueContext::Batch,
    ));
    indices.into_iter().map(|i| candidates[i]).collect()
}

fn to_candidate(index: usize, detection: &Detection, size: Size) -> Option<Candidate> {
    if !detection.is_finite() {
        return None;
    }
    let rect = detection.pixel_rect(size);
    let anchor = detection.anchor(size);
    let area = detection.quad_area(size);
    if !(rect.is_finite() && anchor.is_finite() && area.is_finite()) {
        return None;
    }

    Some(Candidate {
        index,
        rect,
        key: OrderKey {
            anchor,
            area,
            bounds: rect.to_normalized(size),
        },
        confidence: detection.confidence(),
    })
}

/// Runs geometry, cap, dedup and ordering; returns candidates in reading
/// order.
fn prepare(
    batch: &DetectionBatch,
    size: Size,
    config: &PipelineConfig,
    report: &mut PipelineReport,
) -> Vec<Candidate> {
    report.counts.detections = batch.len();

    let mut candidates = Vec::with_capacity(batch.len());
    for (index, detection) in batch.iter().enumerate() {
        match to_candidate(index, detection, size) {
            Some(c) => candidates.push(c),
            None => {
                tracing::warn!(index, "skipping detection with non-finite geometry");
                report.add(PipelineIssue::warning(
                    IssueCode::NonFiniteGeometry,
                    "coordinates are NaN or infinite",
                    IssueContext::Detection { index },
                ));
            }
        }
    }
    tracing::debug!(count = candidates.len(), "geometry stage done");

    let candidates = apply_cap(candidates, config.max_detections, report);
    report.counts.after_cap = candidates.len();

    let rects: Vec<PixelRect> = candidates.iter().map(|c| c.rect).collect();
    let outcome = dedup(&rects, config.dedup.tie_break);
    for (removed, winner) in outcome.removals() {
        let (removed, winner) = (candidates[removed].index, candidates[winner].index);
        report.add(PipelineIssue::info(
            IssueCode::OverlapRemoved,
            format!("overlaps detection {}", winner),
            IssueContext::Detection { index: removed },
        ));
    }
    let candidates = outcome.retain(candidates);
    report.counts.after_dedup = candidates.len();
    tracing::debug!(
        kept = candidates.len(),
        removed = outcome.removed_count(),
        "dedup stage done"
    );

    let keys: Vec<OrderKey> = candidates.iter().map(|c| c.key).collect();
    reading_order(&keys, &config.ordering)
        .into_iter()
        .map(|i| candidates[i])
        .collect()
}

fn crop_issue(index: usize, error: &CropError) -> PipelineIssue {
    let code = match error {
        CropError::OutOfBounds { .. } => IssueCode::OutOfBounds,
        CropError::DegenerateRectangle { .. } => IssueCode::DegenerateRectangle,
    };
    PipelineIssue::warning(code, error.to_string(), IssueContext::Detection { index })
}

/// Turns a detection batch into crops in reading order.
///
/// Stateless and deterministic. An empty batch gives an empty result.
pub fn process(
    batch: &DetectionBatch,
    source: &SourceImage<'_>,
    config: &PipelineConfig,
) -> CropResult {
    let mut report = PipelineReport::new();
    let size = source.logical_size();
    let candidates = prepare(batch, size, config, &mut report);

    let mut crops = Vec::with_capacity(candidates.len());
    for c in candidates {
        match crop_one(&c.rect, source, config.bounds) {
            Ok((image, raw_bounds)) => crops.push(Crop {
                image,
                rect: c.rect.clamped_to(size.width, size.height),
                raw_bounds,
                source_index: c.index,
                confidence: c.confidence,
            }),
            Err(e) => {
                tracing::warn!(index = c.index, error = %e, "skipping rectangle");
                report.add(crop_issue(c.index, &e));
            }
        }
    }
    report.counts.crops = crops.len();

    tracing::info!(
        detections = report.counts.detections,
        crops = crops.len(),
        "pipeline finished"
    );
    CropResult { crops, report }
}

/// Runs every stage except cropping, for an image of logical `size`.
pub fn plan(
    batch: &DetectionBatch,
    size: Size,
    config: &PipelineConfig,
) -> Result<Plan, QuadcropError> {
    if !size.is_valid() {
        return Err(QuadcropError::InvalidConfig(format!(
            "image size must be positive (got {}x{})",
            size.width, size.height
        )));
    }

    let mut report = PipelineReport::new();
    let rects: Vec<PlannedRect> = prepare(batch, size, config, &mut report)
        .into_iter()
        .map(|c| PlannedRect {
            source_index: c.index,
            rect: c.rect,
            confidence: c.confidence,
            in_bounds: c.rect.fits_within(size.width, size.height, EDGE_TOLERANCE),
        })
        .collect();
    report.counts.crops = rects.len();

    Ok(Plan { rects, report })
}

/// Asks `detector` for detections on the source photo, then runs
/// [`process`].
///
/// # Errors
/// Returns [`QuadcropError::Detection`] if the detector fails. The failure
/// is logged at warn level first.
pub fn run<D: RectangleDetector>(
    detector: &D,
    source: &SourceImage<'_>,
    config: &PipelineConfig,
) -> Result<CropResult, QuadcropError> {
    let batch = detector
        .detect(source.pixels(), &config.detector)
        .inspect_err(|e| tracing::warn!(error = %e, "detector failed"))?;
    tracing::debug!(count = batch.len(), "detector returned");
    Ok(process(&batch, source, config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::{DetectionError, PrecomputedDetector};
    use crate::geom::{NormalizedQuad, NormalizedRect};
    use image::GenericImageView;

    fn photo() -> DynamicImage {
        DynamicImage::new_rgb8(800, 600)
    }

    fn pixel(x: f64, y: f64, w: f64, h: f64) -> Detection {
        Detection::Pixel(PixelRect::new(x, y, w, h))
    }

    fn quad(x: f64, y: f64, w: f64, h: f64, confidence: f32) -> Detection {
        Detection::Quad(NormalizedQuad::from_rect(
            NormalizedRect::new(x, y, w, h),
            confidence,
        ))
    }

    #[test]
    fn test_empty_batch_gives_empty_result() {
        let image = photo();
        let result = process(
            &DetectionBatch::default(),
            &SourceImage::new(&image),
            &PipelineConfig::default(),
        );
        assert!(result.is_empty());
        assert!(result.report.is_clean());
        assert_eq!(result.report.counts, PipelineCounts::default());
    }

    #[test]
    fn test_quad_is_flipped_into_raster_space() {
        let image = photo();
        let batch = DetectionBatch::new(vec![quad(0.25, 0.25, 0.5, 0.5, 0.9)]);
        let result = process(&batch, &SourceImage::new(&image), &PipelineConfig::default());

        assert_eq!(result.len(), 1);
        let crop = &result.crops[0];
        assert_eq!(crop.rect, PixelRect::new(200.0, 150.0, 400.0, 300.0));
        assert_eq!(crop.image.dimensions(), (400, 300));
        assert_eq!(crop.confidence, Some(0.9));
    }

    #[test]
    fn test_grid_comes_out_in_reading_order() {
        let image = photo();
        // Normalized top edges at 0.8 and 0.3; listed bottom-right first.
        let batch = DetectionBatch::new(vec![
            quad(0.7, 0.1, 0.2, 0.2, 0.9),
            quad(0.2, 0.1, 0.2, 0.2, 0.9),
            quad(0.7, 0.6, 0.2, 0.2, 0.9),
            quad(0.2, 0.6, 0.2, 0.2, 0.9),
        ]);
        let result = process(&batch, &SourceImage::new(&image), &PipelineConfig::default());
        let order: Vec<usize> = result.crops.iter().map(|c| c.source_index).collect();
        assert_eq!(order, vec![3, 2, 1, 0]);
    }

    #[test]
    fn test_overlap_removed_and_reported() {
        let image = photo();
        let batch = DetectionBatch::new(vec![
            pixel(10.0, 10.0, 100.0, 100.0),
            pixel(20.0, 20.0, 200.0, 200.0),
            pixel(500.0, 10.0, 50.0, 50.0),
        ]);
        let result = process(&batch, &SourceImage::new(&image), &PipelineConfig::default());

        assert_eq!(result.len(), 2);
        assert_eq!(result.report.counts.after_dedup, 2);
        assert_eq!(result.report.count_of(IssueCode::OverlapRemoved), 1);
        let issue = &result.report.issues[0];
        assert_eq!(issue.context, IssueContext::Detection { index: 0 });
        assert_eq!(issue.severity, Severity::Info);
        assert!(issue.message.contains("detection 1"));
    }

    #[test]
    fn test_out_of_bounds_skipped_without_aborting() {
        let image = photo();
        let batch = DetectionBatch::new(vec![
            pixel(750.0, 10.0, 100.0, 100.0),
            pixel(10.0, 10.0, 100.0, 100.0),
        ]);
        let result = process(&batch, &SourceImage::new(&image), &PipelineConfig::default());

        assert_eq!(result.len(), 1);
        assert_eq!(result.crops[0].source_index, 1);
        assert_eq!(result.report.count_of(IssueCode::OutOfBounds), 1);
        assert_eq!(result.report.warning_count(), 1);
    }

    #[test]
    fn test_clamp_policy_keeps_partial_rect() {
        let image = photo();
        let batch = DetectionBatch::new(vec![pixel(750.0, 10.0, 100.0, 100.0)]);
        let config = PipelineConfig {
            bounds: crate::config::BoundsPolicy::Clamp,
            ..Default::default()
        };
        let result = process(&batch, &SourceImage::new(&image), &config);
        assert_eq!(result.len(), 1);
        let crop = &result.crops[0];
        assert_eq!(crop.image.dimensions(), (50, 100));
        assert_eq!(crop.rect, PixelRect::new(750.0, 10.0, 50.0, 100.0));
        assert!(crop.rect.max_x() <= 800.0);
    }

    #[test]
    fn test_scaled_source() {
        let image = DynamicImage::new_rgb8(400, 200);
        let source = SourceImage::with_scale(&image, 2.0).expect("source");
        let batch = DetectionBatch::new(vec![pixel(50.0, 25.0, 100.0, 50.0)]);
        let result = process(&batch, &source, &PipelineConfig::default());

        let crop = &result.crops[0];
        assert_eq!(crop.image.dimensions(), (200, 100));
        assert_eq!(
            crop.raw_bounds,
            RawRegion {
                x: 100,
                y: 50,
                width: 200,
                height: 100
            }
        );
    }

    #[test]
    fn test_cap_keeps_most_confident() {
        let image = photo();
        let batch = DetectionBatch::new(vec![
            quad(0.0, 0.0, 0.1, 0.1, 0.6),
            quad(0.3, 0.0, 0.1, 0.1, 0.9),
            quad(0.6, 0.0, 0.1, 0.1, 0.7),
        ]);
        let config = PipelineConfig {
            max_detections: 2,
            ..Default::default()
        };
        let result = process(&batch, &SourceImage::new(&image), &config);

        let kept: Vec<usize> = result.crops.iter().map(|c| c.source_index).collect();
        assert_eq!(kept, vec![1, 2]);
        assert_eq!(result.report.counts.after_cap, 2);
        assert_eq!(result.report.count_of(IssueCode::DetectionCapApplied), 1);
    }

    #[test]
    fn test_cap_ignores_non_finite_entries() {
        let image = photo();
        let batch = DetectionBatch::new(vec![
            quad(0.1, 0.1, 0.3, 0.3, f32::NAN),
            quad(0.6, 0.1, 0.3, 0.3, 0.9),
        ]);
        let config = PipelineConfig {
            max_detections: 1,
            ..Default::default()
        };
        let result = process(&batch, &SourceImage::new(&image), &config);

        assert_eq!(result.len(), 1);
        assert_eq!(result.crops[0].source_index, 1);
        assert_eq!(result.report.counts.after_cap, 1);
        assert_eq!(result.report.count_of(IssueCode::NonFiniteGeometry), 1);
        assert_eq!(result.report.count_of(IssueCode::DetectionCapApplied), 0);
    }

    #[test]
    fn test_non_finite_geometry_skipped() {
        let image = photo();
        let batch = DetectionBatch::new(vec![
            pixel(f64::NAN, 0.0, 10.0, 10.0),
            pixel(0.0, 0.0, 10.0, 10.0),
        ]);
        let result = process(&batch, &SourceImage::new(&image), &PipelineConfig::default());
        assert_eq!(result.len(), 1);
        assert_eq!(result.report.count_of(IssueCode::NonFiniteGeometry), 1);
    }

    #[test]
    fn test_plan_matches_process_order() {
        let image = photo();
        let batch = DetectionBatch::new(vec![
            pixel(400.0, 300.0, 100.0, 100.0),
            pixel(10.0, 10.0, 100.0, 100.0),
            pixel(700.0, 500.0, 200.0, 200.0),
        ]);
        let config = PipelineConfig::default();

        let plan = plan(&batch, Size::new(800.0, 600.0), &config).expect("plan");
        let planned: Vec<usize> = plan.rects.iter().map(|r| r.source_index).collect();
        assert_eq!(planned, vec![1, 0, 2]);
        assert!(!plan.rects[2].in_bounds);

        let result = process(&batch, &SourceImage::new(&image), &config);
        let cropped: Vec<usize> = result.crops.iter().map(|c| c.source_index).collect();
        assert_eq!(cropped, vec![1, 0]);
    }

    #[test]
    fn test_plan_rejects_empty_size() {
        let err = plan(
            &DetectionBatch::default(),
            Size::new(0.0, 600.0),
            &PipelineConfig::default(),
        );
        assert!(matches!(err, Err(QuadcropError::InvalidConfig(_))));
    }

    struct Broken;

    impl RectangleDetector for Broken {
        fn detect(
            &self,
            _image: &DynamicImage,
            _params: &crate::config::DetectorParams,
        ) -> Result<DetectionBatch, DetectionError> {
            Err(DetectionError::Failed("no model".into()))
        }
    }

    #[test]
    fn test_run_propagates_detector_failure() {
        let image = photo();
        let err = run(&Broken, &SourceImage::new(&image), &PipelineConfig::default());
        assert!(matches!(err, Err(QuadcropError::Detection(_))));
    }

    #[test]
    fn test_run_with_precomputed_detector_filters() {
        let image = photo();
        let batch = DetectionBatch::new(vec![
            quad(0.1, 0.1, 0.3, 0.3, 0.95),
            // Below the default confidence floor.
            quad(0.6, 0.6, 0.3, 0.3, 0.2),
        ]);
        let result = run(
            &PrecomputedDetector::new(batch),
            &SourceImage::new(&image),
            &PipelineConfig::default(),
        )
        .expect("run");
        assert_eq!(result.len(), 1);
        assert_eq!(result.crops[0].source_index, 0);
    }
}
