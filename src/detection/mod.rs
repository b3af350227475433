pub mod aggregate;
pub mod contours;
pub mod dedup;
pub mod fallback;
pub mod preprocessing;
pub mod skin;
pub mod tiling;

use std::future::Future;
use std::time::Duration;

use image::DynamicImage;

use crate::config::{Config, ReadinessConfig};
use crate::error::DetectionError;
use crate::models::{RawDetection, Tile};

pub use aggregate::aggregate;
pub use dedup::{DedupPolicy, Deduplicator};
pub use fallback::FallbackDetector;
pub use skin::SkinToneBackend;
pub use tiling::tile_image;

/// Which pass a region belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionKind {
    Full,
    Tile(usize),
}

impl std::fmt::Display for RegionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegionKind::Full => write!(f, "full image"),
            RegionKind::Tile(index) => write!(f, "tile {}", index + 1),
        }
    }
}

/// Pixels handed to a detector, plus where they came from
#[derive(Clone)]
pub struct RasterRegion {
    /// Cropped pixels; `(0, 0)` here is `(tile.offset_x, tile.offset_y)` in the source
    pub pixels: DynamicImage,
    pub tile: Tile,
    pub kind: RegionKind,
    pub source_width: u32,
    pub source_height: u32,
}

impl RasterRegion {
    pub fn full(image: &DynamicImage) -> Self {
        Self {
            pixels: image.clone(),
            tile: Tile::full(image.width(), image.height()),
            kind: RegionKind::Full,
            source_width: image.width(),
            source_height: image.height(),
        }
    }

    pub fn crop(image: &DynamicImage, tile: Tile, index: usize) -> Self {
        Self {
            pixels: image.crop_imm(tile.offset_x, tile.offset_y, tile.width, tile.height),
            tile,
            kind: RegionKind::Tile(index),
            source_width: image.width(),
            source_height: image.height(),
        }
    }

    pub fn width(&self) -> u32 {
        self.tile.width
    }

    pub fn height(&self) -> u32 {
        self.tile.height
    }
}

/// An externally supplied detection model.
///
/// Returned boxes are in region-local pixel coordinates.
pub trait DetectionBackend {
    fn name(&self) -> &str;

    /// Whether the backend has finished loading and can take `detect` calls
    fn is_ready(&self) -> bool;

    fn detect(
        &self,
        region: &RasterRegion,
    ) -> impl Future<Output = Result<Vec<RawDetection>, DetectionError>>;
}

/// The capability the aggregator scans with
pub trait Detector {
    fn name(&self) -> &str;

    fn detect(
        &self,
        region: &RasterRegion,
    ) -> impl Future<Output = Result<Vec<RawDetection>, DetectionError>>;

    /// Dedup policy suited to the boxes this detector produces
    fn preferred_policy(&self, config: &Config) -> DedupPolicy {
        DedupPolicy::OverlapRatio {
            threshold: config.dedup.overlap_threshold,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Ready { attempts: u32 },
    Unavailable { attempts: u32 },
}

/// Poll `backend` until it reports ready, at most `config.max_attempts` times
pub async fn wait_until_ready<B: DetectionBackend>(backend: &B, config: &ReadinessConfig) -> Readiness {
    let max_attempts = config.max_attempts.max(1);
    for attempt in 1..=max_attempts {
        if backend.is_ready() {
            return Readiness::Ready { attempts: attempt };
        }
        tracing::debug!(
            backend = backend.name(),
            attempt,
            max_attempts,
            "Waiting for detection backend"
        );
        if attempt < max_attempts {
            tokio::time::sleep(config.interval()).await;
        }
    }
    Readiness::Unavailable {
        attempts: max_attempts,
    }
}

/// A primary backend with a per-call time limit, or the deterministic fallback
pub enum DetectorAdapter<B> {
    Primary { backend: B, timeout: Duration },
    Fallback(FallbackDetector),
}

impl<B: DetectionBackend> DetectorAdapter<B> {
    /// Wait for `backend` to become ready; commit to the fallback if it
    /// never does or if there is none.
    pub async fn connect(backend: Option<B>, config: &Config) -> Self {
        let Some(backend) = backend else {
            tracing::info!("No detection backend supplied, using fallback detector");
            return DetectorAdapter::Fallback(FallbackDetector::new());
        };

        match wait_until_ready(&backend, &config.readiness).await {
            Readiness::Ready { attempts } => {
                tracing::info!(backend = backend.name(), attempts, "Detection backend ready");
                DetectorAdapter::Primary {
                    backend,
                    timeout: config.region_timeout(),
                }
            }
            Readiness::Unavailable { attempts } => {
                tracing::warn!(
                    backend = backend.name(),
                    attempts,
                    "Detection backend never became ready, using fallback detector"
                );
                DetectorAdapter::Fallback(FallbackDetector::new())
            }
        }
    }

    pub fn primary(backend: B, timeout: Duration) -> Self {
        DetectorAdapter::Primary { backend, timeout }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, DetectorAdapter::Fallback(_))
    }
}

impl<B: DetectionBackend> Detector for DetectorAdapter<B> {
    fn name(&self) -> &str {
        match self {
            DetectorAdapter::Primary { backend, .. } => backend.name(),
            DetectorAdapter::Fallback(fallback) => Detector::name(fallback),
        }
    }

    async fn detect(&self, region: &RasterRegion) -> Result<Vec<RawDetection>, DetectionError> {
        match self {
            DetectorAdapter::Primary { backend, timeout } => {
                match tokio::time::timeout(*timeout, backend.detect(region)).await {
                    Ok(result) => result,
                    Err(_) => Err(DetectionError::TimedOut(*timeout)),
                }
            }
            DetectorAdapter::Fallback(fallback) => fallback.detect(region).await,
        }
    }

    fn preferred_policy(&self, config: &Config) -> DedupPolicy {
        match self {
            DetectorAdapter::Primary { .. } => DedupPolicy::OverlapRatio {
                threshold: config.dedup.overlap_threshold,
            },
            DetectorAdapter::Fallback(fallback) => fallback.preferred_policy(config),
        }
    }
}
