use anyhow::Context;
use clap::{Parser, ValueEnum};
use image::ImageReader;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use roimark::detection::{DedupPolicy, SkinToneBackend};
use roimark::{AnalyzeError, Config, Outcome, Session};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Backend {
    /// Skin-tone region detector
    Skin,
    /// No model; use the fixed-position fallback
    #[value(name = "none")]
    Fallback,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum DedupMode {
    /// Drop boxes overlapping a kept box by more than the threshold
    Ratio,
    /// Drop boxes whose center is close to a kept box
    Distance,
}

#[derive(Parser)]
#[command(name = "roimark")]
#[command(about = "Find regions of interest in an image and mark them as a prompt asks")]
struct Cli {
    /// Path to input image file
    #[arg(value_name = "IMAGE")]
    image_path: PathBuf,

    /// What to do, e.g. "circle faces in blue, 6px"
    #[arg(short, long)]
    prompt: String,

    /// Where to write the annotated image
    #[arg(short, long, default_value = "annotated.png")]
    out: PathBuf,

    /// JSON configuration file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    #[arg(long, value_enum, default_value = "skin")]
    backend: Backend,

    /// Tiles per side
    #[arg(long)]
    grid: Option<u32>,

    /// Tile overlap as a fraction of tile size
    #[arg(long)]
    overlap: Option<f64>,

    /// Force a dedup policy instead of the detector's preference
    #[arg(long, value_enum)]
    dedup: Option<DedupMode>,

    /// Overlap ratio (ratio mode) or center distance in px (distance mode)
    #[arg(long)]
    threshold: Option<f32>,

    /// Save debug outputs to directory (must be empty)
    #[arg(long, value_name = "DIR")]
    debug_out: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn build_config(&self) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::new(),
        };

        if let Some(grid) = self.grid {
            config.tiling.grid_size = grid;
        }
        if let Some(overlap) = self.overlap {
            config.tiling.overlap = overlap;
        }
        if let Some(mode) = self.dedup {
            config.dedup.policy = Some(match mode {
                DedupMode::Ratio => DedupPolicy::OverlapRatio {
                    threshold: self.threshold.unwrap_or(config.dedup.overlap_threshold),
                },
                DedupMode::Distance => DedupPolicy::CenterDistance {
                    min_distance: self.threshold.unwrap_or(config.dedup.min_center_distance),
                },
            });
        } else if let Some(threshold) = self.threshold {
            config.dedup.overlap_threshold = threshold;
        }

        config.validate()?;
        Ok(config)
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    let args = Cli::parse();
    init_tracing(args.verbose);

    let config = args.build_config()?;

    tracing::debug!(path = %args.image_path.display(), "Loading image");
    let img = ImageReader::open(&args.image_path)
        .with_context(|| format!("Failed to open {}", args.image_path.display()))?
        .decode()
        .map_err(|e| anyhow::anyhow!("Failed to decode image: {}", e))?;
    tracing::debug!(width = img.width(), height = img.height(), "Image loaded");

    let backend = match args.backend {
        Backend::Skin => Some(SkinToneBackend::new()),
        Backend::Fallback => None,
    };
    let mut session = Session::start(backend, config).await;
    if let Some(debug_dir) = args.debug_out.clone() {
        session = session.with_debug(debug_dir)?;
    }

    session.load_image(img);

    let report = match session.analyze(&args.prompt).await {
        Ok(report) => report,
        Err(err @ AnalyzeError::StalePrompt(_)) => {
            eprintln!("{err}");
            return Ok(ExitCode::FAILURE);
        }
    };

    println!("{}", report.status);
    if args.verbose {
        for (i, det) in report.detections.iter().enumerate() {
            println!(
                "  {} at ({:.0}, {:.0}) {:.0}x{:.0} - confidence: {:.2}",
                i + 1,
                det.x,
                det.y,
                det.width,
                det.height,
                det.score()
            );
        }
    }

    if report.outcome == Outcome::Annotated || report.outcome == Outcome::NoDetections {
        let frame = session
            .surface()
            .snapshot()
            .context("Display surface is empty after analysis")?;
        frame
            .pixels
            .save(&args.out)
            .with_context(|| format!("Failed to write {}", args.out.display()))?;
        tracing::info!(path = %args.out.display(), "Wrote annotated image");
    }

    Ok(ExitCode::SUCCESS)
}
