pub mod config;
pub mod detection;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod prompt;
pub mod render;
pub mod session;

pub use config::Config;
pub use detection::{DetectionBackend, Detector, DetectorAdapter, RasterRegion};
pub use error::{AnalyzeError, ConfigError, DetectionError, StaleReason};
pub use models::{CanonicalDetection, Color, DetectionPool, ImageId, RawDetection, Tile};
pub use pipeline::{DebugConfig, Pipeline, PipelineContext};
pub use prompt::{RenderDirective, Shape, interpret, parse_directive};
pub use session::{AnalysisReport, DisplaySurface, Frame, Outcome, Session};
