use anyhow::Result;
use image::DynamicImage;
use std::path::PathBuf;

use crate::config::Config;
use crate::detection::{Deduplicator, Detector, aggregate};
use crate::models::CanonicalDetection;

/// Debug configuration for pipeline execution
#[derive(Clone, Debug)]
pub struct DebugConfig {
    /// Root directory for debug outputs
    pub output_dir: PathBuf,
}

/// Stages that write debug images, in pipeline order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugStage {
    Input,
    Regions,
    RawPool,
    Annotated,
}

impl DebugStage {
    /// Directory name under the debug root, e.g. "01_regions"
    pub fn dir_name(&self) -> &'static str {
        match self {
            DebugStage::Input => "00_input",
            DebugStage::Regions => "01_regions",
            DebugStage::RawPool => "02_raw_pool",
            DebugStage::Annotated => "03_annotated",
        }
    }
}

/// Context available to every pipeline stage
#[derive(Clone, Debug, Default)]
pub struct PipelineContext {
    pub debug: Option<DebugConfig>,
}

impl PipelineContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable debug mode with output directory.
    /// The directory must be empty or non-existent.
    pub fn with_debug(mut self, output_dir: PathBuf) -> Result<Self> {
        if output_dir.exists() {
            let entries = std::fs::read_dir(&output_dir)?;
            if entries.count() > 0 {
                return Err(anyhow::anyhow!(
                    "Debug directory is not empty: {}",
                    output_dir.display()
                ));
            }
        } else {
            std::fs::create_dir_all(&output_dir)?;
        }

        self.debug = Some(DebugConfig { output_dir });
        Ok(self)
    }

    /// Save `image` as item `index` of `stage` when debug mode is on.
    /// Write failures are logged and otherwise ignored.
    pub fn save_debug(&self, stage: DebugStage, index: usize, image: &DynamicImage) {
        let Some(debug) = &self.debug else {
            return;
        };
        if let Err(err) = Self::write_debug_image(debug, stage, index, image) {
            tracing::warn!(stage = stage.dir_name(), error = %err, "Failed to save debug image");
        }
    }

    fn write_debug_image(debug: &DebugConfig, stage: DebugStage, index: usize, image: &DynamicImage) -> Result<()> {
        let step_dir = debug.output_dir.join(stage.dir_name());
        std::fs::create_dir_all(&step_dir)?;

        let filename = format!("{:02}.png", index + 1);
        let output_path = step_dir.join(&filename);
        image
            .save(&output_path)
            .map_err(|e| anyhow::anyhow!("Failed to save debug image: {}", e))?;

        tracing::debug!("Debug: saved {}/{}", stage.dir_name(), filename);
        Ok(())
    }
}

/// Result of the detection half of an analysis
#[derive(Debug, Clone)]
pub struct DetectionRun {
    /// Raw detections gathered before dedup
    pub pool_size: usize,
    pub detections: Vec<CanonicalDetection>,
}

/// Tiled scan plus dedup for one image
pub struct Pipeline<'a, D> {
    detector: &'a D,
    config: &'a Config,
    context: &'a PipelineContext,
}

impl<'a, D: Detector> Pipeline<'a, D> {
    pub fn new(detector: &'a D, config: &'a Config, context: &'a PipelineContext) -> Self {
        Self {
            detector,
            config,
            context,
        }
    }

    /// Dedup policy for this run: the configured override, else whatever the
    /// detector prefers
    pub fn deduplicator(&self) -> Deduplicator {
        let policy = self
            .config
            .dedup
            .policy
            .unwrap_or_else(|| self.detector.preferred_policy(self.config));
        Deduplicator::new(policy, self.config.dedup.max_detections)
    }

    pub async fn run(&self, image: &DynamicImage) -> DetectionRun {
        self.context.save_debug(DebugStage::Input, 0, image);

        let pool = aggregate(self.detector, image, &self.config.tiling, self.context).await;
        let pool_size = pool.len();

        if self.context.debug.is_some() {
            let outlines = crate::render::draw_outlines(image, pool.iter());
            self.context
                .save_debug(DebugStage::RawPool, 0, &DynamicImage::ImageRgba8(outlines));
        }

        let deduplicator = self.deduplicator();
        let detections = deduplicator.deduplicate(pool);
        tracing::debug!(
            detector = self.detector.name(),
            policy = ?deduplicator.policy,
            pool_size,
            kept = detections.len(),
            "Deduplicated detection pool"
        );

        DetectionRun {
            pool_size,
            detections,
        }
    }
}
