use std::path::PathBuf;
use std::sync::Arc;

use image::{DynamicImage, RgbaImage};
use parking_lot::Mutex;

use crate::config::Config;
use crate::detection::{DetectionBackend, Detector, DetectorAdapter};
use crate::error::{AnalyzeError, StaleReason};
use crate::models::{CanonicalDetection, ImageId};
use crate::pipeline::{DebugStage, Pipeline, PipelineContext};
use crate::prompt::{Intent, RenderDirective, Shape, Target, interpret};
use crate::render::render;

pub const DESCRIBE_STATUS: &str =
    "Image analysis complete. For detailed descriptions, consider using a vision model API.";
pub const UNSUPPORTED_STATUS: &str = "Command processed. Currently supporting: face detection and circling.";
pub const SUPERSEDED_STATUS: &str = "A new image was loaded before analysis finished; result discarded.";

/// What the display currently shows
#[derive(Debug, Clone)]
pub struct Frame {
    pub image_id: ImageId,
    pub pixels: RgbaImage,
    /// False while the plain loaded image is shown
    pub annotated: bool,
}

/// Front buffer. Frames are swapped in whole, never drawn into.
#[derive(Debug, Default)]
pub struct DisplaySurface {
    frame: Mutex<Option<Frame>>,
}

impl DisplaySurface {
    pub fn snapshot(&self) -> Option<Frame> {
        self.frame.lock().clone()
    }

    fn present(&self, frame: Frame) {
        *self.frame.lock() = Some(frame);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Annotated,
    NoDetections,
    Described,
    Unsupported,
    /// The image changed mid-run and the result was dropped
    Superseded,
}

#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub outcome: Outcome,
    /// User-facing status line
    pub status: String,
    pub directive: RenderDirective,
    pub detections: Vec<CanonicalDetection>,
    pub pool_size: usize,
}

struct LoadedImage {
    id: ImageId,
    image: Arc<DynamicImage>,
}

/// One user's image, detector and display
pub struct Session<B> {
    detector: DetectorAdapter<B>,
    config: Config,
    context: PipelineContext,
    current: Mutex<Option<LoadedImage>>,
    surface: DisplaySurface,
}

impl<B: DetectionBackend> Session<B> {
    /// Connect the detector (waiting for `backend` to become ready) and
    /// start with no image loaded
    pub async fn start(backend: Option<B>, config: Config) -> Self {
        let detector = DetectorAdapter::connect(backend, &config).await;
        Self::with_detector(detector, config)
    }

    pub fn with_detector(detector: DetectorAdapter<B>, config: Config) -> Self {
        Self {
            detector,
            config,
            context: PipelineContext::new(),
            current: Mutex::new(None),
            surface: DisplaySurface::default(),
        }
    }

    /// Dump per-stage images under `output_dir`, which must be empty or absent
    pub fn with_debug(mut self, output_dir: PathBuf) -> anyhow::Result<Self> {
        self.context = self.context.with_debug(output_dir)?;
        Ok(self)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn detector(&self) -> &DetectorAdapter<B> {
        &self.detector
    }

    pub fn surface(&self) -> &DisplaySurface {
        &self.surface
    }

    pub fn current_image_id(&self) -> Option<ImageId> {
        self.current.lock().as_ref().map(|loaded| loaded.id)
    }

    /// Replace the current image and show it unannotated. Any analysis still
    /// running for the previous image will not commit.
    pub fn load_image(&self, image: DynamicImage) -> ImageId {
        let id = ImageId::new();
        let pixels = image.to_rgba8();

        let mut current = self.current.lock();
        *current = Some(LoadedImage {
            id,
            image: Arc::new(image),
        });
        self.surface.present(Frame {
            image_id: id,
            pixels,
            annotated: false,
        });
        drop(current);

        tracing::debug!(%id, "Loaded image");
        id
    }

    /// Draw `detections` on the current image and show the result
    pub fn annotate(&self, detections: &[CanonicalDetection], directive: &RenderDirective) -> Result<(), AnalyzeError> {
        let current = self.current.lock();
        let Some(loaded) = current.as_ref() else {
            return Err(AnalyzeError::StalePrompt(StaleReason::NoImage));
        };
        let pixels = render(&loaded.image, detections, directive);
        self.surface.present(Frame {
            image_id: loaded.id,
            pixels,
            annotated: true,
        });
        Ok(())
    }

    /// Interpret `prompt` and, for annotation requests, detect, dedup and
    /// draw on the current image.
    ///
    /// Fails only when there is no image or the prompt is blank; both are
    /// checked before any detector call.
    pub async fn analyze(&self, prompt: &str) -> Result<AnalysisReport, AnalyzeError> {
        let (id, image) = {
            let current = self.current.lock();
            let Some(loaded) = current.as_ref() else {
                return Err(AnalyzeError::StalePrompt(StaleReason::NoImage));
            };
            (loaded.id, Arc::clone(&loaded.image))
        };
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(AnalyzeError::StalePrompt(StaleReason::EmptyPrompt));
        }

        let instruction = interpret(prompt, &self.config.labels);
        let directive = instruction.directive;
        match instruction.intent {
            Intent::Describe => return Ok(report(Outcome::Described, DESCRIBE_STATUS.to_string(), directive)),
            Intent::Unsupported => {
                return Ok(report(Outcome::Unsupported, UNSUPPORTED_STATUS.to_string(), directive));
            }
            Intent::Annotate => {}
        }

        let run = Pipeline::new(&self.detector, &self.config, &self.context)
            .run(&image)
            .await;

        let back_buffer = (!run.detections.is_empty()).then(|| render(&image, &run.detections, &directive));

        // Stale check and commit under one lock so a concurrent load always wins
        let current = self.current.lock();
        let still_current = current.as_ref().is_some_and(|loaded| loaded.id == id);
        let mut committed_debug = None;
        let outcome = match (still_current, back_buffer) {
            (false, _) => Outcome::Superseded,
            (true, None) => Outcome::NoDetections,
            (true, Some(pixels)) => {
                if self.context.debug.is_some() {
                    committed_debug = Some(pixels.clone());
                }
                self.surface.present(Frame {
                    image_id: id,
                    pixels,
                    annotated: true,
                });
                Outcome::Annotated
            }
        };
        drop(current);

        // Debug write happens after the lock is released
        if let Some(pixels) = committed_debug {
            self.context
                .save_debug(DebugStage::Annotated, 0, &DynamicImage::ImageRgba8(pixels));
        }

        let status = status_line(outcome, instruction.target, directive.shape, run.detections.len());
        match outcome {
            Outcome::Superseded => tracing::info!(%id, "Image changed during analysis, dropping result"),
            _ => tracing::info!(
                %id,
                detector = self.detector.name(),
                pool_size = run.pool_size,
                detections = run.detections.len(),
                "Analysis complete"
            ),
        }

        Ok(AnalysisReport {
            outcome,
            status,
            directive,
            detections: run.detections,
            pool_size: run.pool_size,
        })
    }
}

fn report(outcome: Outcome, status: String, directive: RenderDirective) -> AnalysisReport {
    AnalysisReport {
        outcome,
        status,
        directive,
        detections: Vec::new(),
        pool_size: 0,
    }
}

/// e.g. "3 face(s) detected and circled in the image!"
pub fn status_line(outcome: Outcome, target: Target, shape: Shape, count: usize) -> String {
    let noun = target.noun();
    match outcome {
        Outcome::Annotated => {
            let verb = match shape {
                Shape::Circle => "circled",
                Shape::Rectangle => "boxed",
            };
            format!("{count} {noun}(s) detected and {verb} in the image!")
        }
        Outcome::NoDetections => format!("No {noun}s detected in the image."),
        Outcome::Described => DESCRIBE_STATUS.to_string(),
        Outcome::Unsupported => UNSUPPORTED_STATUS.to_string(),
        Outcome::Superseded => SUPERSEDED_STATUS.to_string(),
    }
}
