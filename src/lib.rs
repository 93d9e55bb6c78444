//! Quadcrop: cut detected cards and documents out of a single photo.
//!
//! A rectangle detector finds candidate quadrilaterals in a photograph.
//! Quadcrop takes that raw output, removes overlapping duplicates, puts the
//! survivors in reading order and crops each one into its own image.
//!
//! # Modules
//!
//! - [`geom`]: Coordinate spaces, rectangles, quads and conversions
//! - [`dedup`]: Overlap removal
//! - [`order`]: Reading order
//! - [`crop`]: Raw-buffer cropping
//! - [`pipeline`]: The composed pipeline and its report
//! - [`detector`]: The detector boundary and detections files
//! - [`imaging`]: Thumbnails, masks and overlays
//! - [`config`]: Pipeline configuration
//! - [`error`]: Error types for quadcrop operations

pub mod config;
pub mod crop;
pub mod dedup;
pub mod detector;
pub mod error;
pub mod geom;
pub mod imaging;
pub mod order;
pub mod pipeline;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use image::{DynamicImage, ImageFormat};
use serde::Serialize;

pub use config::PipelineConfig;
pub use crop::SourceImage;
pub use error::QuadcropError;
pub use pipeline::{process, CropResult, PipelineReport};

use config::BoundsPolicy;
use detector::io_json::{read_detections_json, DetectionsFile};
use detector::{spawn_detection, DetectionBatch, PrecomputedDetector};
use geom::Size;

/// The quadcrop CLI application.
#[derive(Parser)]
#[command(name = "quadcrop")]
#[command(version, author, about)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Crop every detected rectangle out of a photo.
    Crop(CropArgs),
    /// Print the rectangles that would be cropped, without decoding the photo.
    Plan(PlanArgs),
    /// Draw the rectangles that would be cropped onto the photo.
    Overlay(OverlayArgs),
    /// Convert a photo to black and white.
    Threshold(ThresholdArgs),
    /// Paint content red and background white.
    ContentMask(ContentMaskArgs),
}

/// Options shared by every subcommand that runs the pipeline.
#[derive(clap::Args)]
struct PipelineArgs {
    /// Detections file (JSON).
    #[arg(long)]
    detections: PathBuf,

    /// Pipeline configuration file (.json, .yaml or .yml).
    #[arg(long, env = "QUADCROP_CONFIG")]
    config: Option<PathBuf>,

    /// Raw pixels per logical point of the photo.
    #[arg(long, default_value_t = 1.0)]
    scale: f64,

    /// Override ordering.row_tolerance.
    #[arg(long)]
    row_tolerance: Option<f64>,

    /// Override ordering.column_tolerance.
    #[arg(long)]
    column_tolerance: Option<f64>,

    /// Override max_detections.
    #[arg(long)]
    max_detections: Option<usize>,

    /// Clamp rectangles that leave the photo instead of skipping them.
    #[arg(long)]
    clamp: bool,
}

impl PipelineArgs {
    /// Loads the config file (if any) and applies command-line overrides.
    fn load_config(&self) -> Result<PipelineConfig, QuadcropError> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_path(path)?,
            None => PipelineConfig::default(),
        };

        if let Some(t) = self.row_tolerance {
            config.ordering.row_tolerance = t;
        }
        if let Some(t) = self.column_tolerance {
            config.ordering.column_tolerance = t;
        }
        if let Some(n) = self.max_detections {
            config.max_detections = n;
        }
        if self.clamp {
            config.bounds = BoundsPolicy::Clamp;
        }

        config.validate()?;
        Ok(config)
    }

    fn check_scale(&self) -> Result<(), QuadcropError> {
        if self.scale.is_finite() && self.scale > 0.0 {
            Ok(())
        } else {
            Err(QuadcropError::InvalidConfig(format!(
                "--scale must be a positive number (got {})",
                self.scale
            )))
        }
    }
}

/// Output format for reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ReportFormat {
    Text,
    Json,
}

/// Arguments for the crop subcommand.
#[derive(clap::Args)]
struct CropArgs {
    /// Photo to crop.
    image: PathBuf,

    #[command(flatten)]
    pipeline: PipelineArgs,

    /// Directory the crops and manifest.csv are written to.
    #[arg(long)]
    out: PathBuf,

    /// Also write square thumbnails of this many pixels per side.
    #[arg(long)]
    thumbnail: Option<u32>,

    /// Give up if the detector takes longer than this many milliseconds.
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Output format for the report.
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    report: ReportFormat,
}

/// Arguments for the plan subcommand.
#[derive(clap::Args)]
struct PlanArgs {
    /// Photo the detections belong to (only its header is read).
    image: PathBuf,

    #[command(flatten)]
    pipeline: PipelineArgs,
}

/// Arguments for the overlay subcommand.
#[derive(clap::Args)]
struct OverlayArgs {
    /// Photo to draw on.
    image: PathBuf,

    #[command(flatten)]
    pipeline: PipelineArgs,

    /// Output PNG file.
    #[arg(long)]
    out: PathBuf,

    /// Outline width in pixels.
    #[arg(long, default_value_t = 3)]
    thickness: u32,
}

/// Arguments for the threshold subcommand.
#[derive(clap::Args)]
struct ThresholdArgs {
    /// Photo to convert.
    image: PathBuf,

    /// Output PNG file.
    #[arg(long)]
    out: PathBuf,

    /// Brightness cut-off, from 0 to 1.
    #[arg(long, default_value_t = imaging::DEFAULT_THRESHOLD)]
    level: f32,
}

/// Arguments for the content-mask subcommand.
#[derive(clap::Args)]
struct ContentMaskArgs {
    /// Photo to convert.
    image: PathBuf,

    /// Output PNG file.
    #[arg(long)]
    out: PathBuf,
}

/// Sets up logging to stderr, filtered by `RUST_LOG` (default `warn`).
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

/// Run the quadcrop CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), QuadcropError> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Crop(args)) => run_crop(args),
        Some(Commands::Plan(args)) => run_plan(args),
        Some(Commands::Overlay(args)) => run_overlay(args),
        Some(Commands::Threshold(args)) => run_threshold(args),
        Some(Commands::ContentMask(args)) => run_content_mask(args),
        None => {
            println!("quadcrop {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Cut detected cards and documents out of a photo.");
            println!();
            println!("Run 'quadcrop --help' for usage information.");
            Ok(())
        }
    }
}

fn decode_image(path: &Path) -> Result<DynamicImage, QuadcropError> {
    image::open(path).map_err(|source| QuadcropError::Decode {
        path: path.to_path_buf(),
        source,
    })
}

fn save_png(image: &DynamicImage, path: &Path) -> Result<(), QuadcropError> {
    image
        .save_with_format(path, ImageFormat::Png)
        .map_err(|source| QuadcropError::ImageWrite {
            path: path.to_path_buf(),
            source,
        })
}

/// Reads a detections file and warns if it was recorded for a photo of a
/// different size.
fn load_detections(path: &Path, raw: (u32, u32)) -> Result<DetectionBatch, QuadcropError> {
    let DetectionsFile { image, detections } = read_detections_json(path)?;
    if let Some(dims) = image {
        if (dims.width, dims.height) != raw {
            tracing::warn!(
                recorded = ?(dims.width, dims.height),
                actual = ?raw,
                "detections were recorded for a different image size"
            );
        }
    }
    Ok(detections)
}

/// Converts header dimensions to buffer dimensions, rejecting sizes that do
/// not fit in `u32`.
fn header_dimensions(
    path: &Path,
    width: usize,
    height: usize,
) -> Result<(u32, u32), QuadcropError> {
    match (u32::try_from(width), u32::try_from(height)) {
        (Ok(w), Ok(h)) => Ok((w, h)),
        _ => Err(QuadcropError::ImageSize {
            path: path.to_path_buf(),
            message: format!("{}x{} exceeds the supported size", width, height),
        }),
    }
}

fn logical_size(raw: (u32, u32), scale: f64) -> Size {
    Size::new(f64::from(raw.0) / scale, f64::from(raw.1) / scale)
}

/// Execute the crop subcommand.
fn run_crop(args: CropArgs) -> Result<(), QuadcropError> {
    args.pipeline.check_scale()?;
    let config = args.pipeline.load_config()?;

    let image = Arc::new(decode_image(&args.image)?);
    let raw = (image.width(), image.height());
    let batch = load_detections(&args.pipeline.detections, raw)?;
    let source = SourceImage::with_scale(&image, args.pipeline.scale)?;

    let detector = PrecomputedDetector::new(batch).with_logical_size(source.logical_size());
    let pending = spawn_detection(detector, Arc::clone(&image), config.detector.clone());
    let batch = pending.wait(args.timeout_ms.map(Duration::from_millis))?;

    let result = process(&batch, &source, &config);

    fs::create_dir_all(&args.out)?;
    let files = write_crops(&result, &args.out, args.thumbnail)?;
    write_manifest(&result, &files, &args.out.join("manifest.csv"))?;

    match args.report {
        ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&result.report)?),
        ReportFormat::Text => {
            print!("{}", result.report);
            println!();
            println!("Wrote {} crop(s) to {}", result.len(), args.out.display());
        }
    }
    Ok(())
}

/// Writes `crop_NNN.png` (and optional `thumb_NNN.png`) files; returns the
/// crop file names in reading order.
fn write_crops(
    result: &CropResult,
    out: &Path,
    thumbnail: Option<u32>,
) -> Result<Vec<String>, QuadcropError> {
    let mut names = Vec::with_capacity(result.len());
    for (i, crop) in result.crops.iter().enumerate() {
        let name = format!("crop_{:03}.png", i);
        save_png(&crop.image, &out.join(&name))?;

        if let Some(side) = thumbnail.filter(|s| *s > 0) {
            let thumb = imaging::fill_crop(&crop.image, side, side);
            save_png(&thumb, &out.join(format!("thumb_{:03}.png", i)))?;
        }
        names.push(name);
    }
    Ok(names)
}

#[derive(Serialize)]
struct ManifestRow<'a> {
    file: &'a str,
    source_index: usize,
    confidence: Option<f32>,
    x: f64,
    y: f64,
    width: f64,
    height: f64,
    raw_x: u32,
    raw_y: u32,
    raw_width: u32,
    raw_height: u32,
}

fn write_manifest(result: &CropResult, files: &[String], path: &Path) -> Result<(), QuadcropError> {
    let to_err = |source: csv::Error| QuadcropError::ManifestWrite {
        path: path.to_path_buf(),
        source,
    };

    let mut writer = csv::Writer::from_path(path).map_err(to_err)?;
    for (crop, file) in result.crops.iter().zip(files) {
        writer
            .serialize(ManifestRow {
                file,
                source_index: crop.source_index,
                confidence: crop.confidence,
                x: crop.rect.x(),
                y: crop.rect.y(),
                width: crop.rect.width,
                height: crop.rect.height,
                raw_x: crop.raw_bounds.x,
                raw_y: crop.raw_bounds.y,
                raw_width: crop.raw_bounds.width,
                raw_height: crop.raw_bounds.height,
            })
            .map_err(to_err)?;
    }
    writer.flush().map_err(|e| to_err(e.into()))?;
    Ok(())
}

/// Execute the plan subcommand.
fn run_plan(args: PlanArgs) -> Result<(), QuadcropError> {
    args.pipeline.check_scale()?;
    let config = args.pipeline.load_config()?;

    let dims = imagesize::size(&args.image).map_err(|e| QuadcropError::ImageSize {
        path: args.image.clone(),
        message: e.to_string(),
    })?;
    let raw = header_dimensions(&args.image, dims.width, dims.height)?;
    let size = logical_size(raw, args.pipeline.scale);

    let batch = load_detections(&args.pipeline.detections, raw)?;
    let batch = config.detector.apply(&batch, size);
    let plan = pipeline::plan(&batch, size, &config)?;

    println!("{}", serde_json::to_string_pretty(&plan)?);
    Ok(())
}

/// Execute the overlay subcommand.
fn run_overlay(args: OverlayArgs) -> Result<(), QuadcropError> {
    args.pipeline.check_scale()?;
    let config = args.pipeline.load_config()?;

    let image = decode_image(&args.image)?;
    let raw = (image.width(), image.height());
    let size = logical_size(raw, args.pipeline.scale);

    let batch = load_detections(&args.pipeline.detections, raw)?;
    let batch = config.detector.apply(&batch, size);
    let plan = pipeline::plan(&batch, size, &config)?;

    let rects: Vec<_> = plan
        .rects
        .iter()
        .map(|p| p.rect.scaled(args.pipeline.scale))
        .collect();
    let drawn = imaging::draw_rectangles(&image, &rects, imaging::DETECTION_COLOR, args.thickness);
    save_png(&DynamicImage::ImageRgba8(drawn), &args.out)?;

    println!("Drew {} rectangle(s) to {}", rects.len(), args.out.display());
    Ok(())
}

/// Execute the threshold subcommand.
fn run_threshold(args: ThresholdArgs) -> Result<(), QuadcropError> {
    if !(0.0..=1.0).contains(&args.level) {
        return Err(QuadcropError::InvalidConfig(format!(
            "--level must be within [0, 1] (got {})",
            args.level
        )));
    }

    let image = decode_image(&args.image)?;
    let bw = imaging::to_black_and_white(&image, args.level);
    save_png(&DynamicImage::ImageLuma8(bw), &args.out)
}

/// Execute the content-mask subcommand.
fn run_content_mask(args: ContentMaskArgs) -> Result<(), QuadcropError> {
    let image = decode_image(&args.image)?;
    let mask = imaging::content_mask(&image);
    save_png(&DynamicImage::ImageRgba8(mask), &args.out)
}
