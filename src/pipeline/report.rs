//! Pipeline report types.
//!
//! Rectangles that are dropped on the way through the pipeline are never
//! errors. Each drop is recorded here instead, so callers can tell how many
//! detections came in, how many crops came out, and why the difference.

use serde::Serialize;
use std::fmt;

/// What happened during one `process` call.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct PipelineReport {
    /// Entry counts after each stage.
    pub counts: PipelineCounts,
    /// Rectangles dropped along the way, and other notes.
    pub issues: Vec<PipelineIssue>,
}

impl PipelineReport {
    /// Creates a new empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an issue to the report.
    pub fn add(&mut self, issue: PipelineIssue) {
        self.issues.push(issue);
    }

    /// Count of warning-level issues.
    pub fn warning_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
            .count()
    }

    /// Count of info-level issues.
    pub fn info_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Info)
            .count()
    }

    /// Number of issues with the given code.
    pub fn count_of(&self, code: IssueCode) -> usize {
        self.issues.iter().filter(|i| i.code == code).count()
    }

    /// Returns true if nothing was dropped.
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

impl fmt::Display for PipelineReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = &self.counts;
        writeln!(
            f,
            "{} detection(s) -> {} after cap -> {} after dedup -> {} crop(s)",
            c.detections, c.after_cap, c.after_dedup, c.crops
        )?;

        for (label, severity) in [("Warnings", Severity::Warning), ("Notes", Severity::Info)] {
            let matching: Vec<_> = self
                .issues
                .iter()
                .filter(|i| i.severity == severity)
                .collect();
            if matching.is_empty() {
                continue;
            }

            writeln!(f)?;
            writeln!(f, "{} ({}):", label, matching.len())?;
            for issue in matching {
                writeln!(f, "  {}", issue)?;
            }
        }

        Ok(())
    }
}

/// Number of entries alive after each stage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PipelineCounts {
    /// Entries in the incoming batch.
    pub detections: usize,
    /// Entries left after the detection cap.
    pub after_cap: usize,
    /// Entries left after dropping non-finite geometry and overlaps.
    pub after_dedup: usize,
    /// Crops produced (or rectangles planned, for `plan`).
    pub crops: usize,
}

/// A single note about the batch or one of its entries.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PipelineIssue {
    pub severity: Severity,
    pub code: IssueCode,
    pub message: String,
    pub context: IssueContext,
}

impl PipelineIssue {
    pub fn new(
        severity: Severity,
        code: IssueCode,
        message: impl Into<String>,
        context: IssueContext,
    ) -> Self {
        Self {
            severity,
            code,
            message: message.into(),
            context,
        }
    }

    /// Creates a warning-level issue (a rectangle was lost).
    pub fn warning(code: IssueCode, message: impl Into<String>, context: IssueContext) -> Self {
        Self::new(Severity::Warning, code, message, context)
    }

    /// Creates an info-level issue (expected behavior, e.g. a duplicate).
    pub fn info(code: IssueCode, message: impl Into<String>, context: IssueContext) -> Self {
        Self::new(Severity::Info, code, message, context)
    }
}

impl fmt::Display for PipelineIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} in {}: {}", self.code, self.context, self.message)
    }
}

/// Severity level for pipeline issues.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Expected pruning, such as a duplicate detection.
    Info,
    /// A detection that should have produced a crop but did not.
    Warning,
}

/// Stable issue codes for programmatic consumption.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCode {
    /// The batch exceeded `max_detections`; the least confident entries were
    /// dropped.
    DetectionCapApplied,
    /// A detection had NaN or infinite coordinates.
    NonFiniteGeometry,
    /// A detection overlapped a larger one.
    OverlapRemoved,
    /// A rectangle fell outside the raw pixel buffer.
    OutOfBounds,
    /// A rectangle covered no whole pixel.
    DegenerateRectangle,
}

/// Where an issue occurred.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum IssueContext {
    /// The batch as a whole.
    Batch,
    /// One entry, by its index in the incoming batch.
    Detection { index: usize },
}

impl fmt::Display for IssueContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueContext::Batch => write!(f, "batch"),
            IssueContext::Detection { index } => write!(f, "detection {}", index),
        }
    }
}
