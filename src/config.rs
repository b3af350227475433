use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::detection::dedup::DedupPolicy;
use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TilingConfig {
    /// Tiles per side; the tiler emits grid_size² tiles
    pub grid_size: u32,

    /// Margin added on each shared edge, as a fraction of the tile size
    pub overlap: f64,
}

impl Default for TilingConfig {
    fn default() -> Self {
        Self {
            grid_size: 2,
            overlap: 0.2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    /// Overlap ratio above which two boxes are the same detection
    pub overlap_threshold: f32,

    /// Center distance (px) below which two boxes are the same detection
    pub min_center_distance: f32,

    pub max_detections: usize,

    /// Forces a policy instead of the one the detector prefers
    pub policy: Option<DedupPolicy>,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            overlap_threshold: 0.5,
            min_center_distance: 20.0,
            max_detections: 20,
            policy: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadinessConfig {
    pub max_attempts: u32,
    pub interval_ms: u64,
}

impl ReadinessConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            max_attempts: 50, // ~10 seconds at the default interval
            interval_ms: 200,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelConfig {
    /// Most faces that still get numbered
    pub face_cap: usize,

    /// Most generic objects that still get numbered
    pub object_cap: usize,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            face_cap: 10,
            object_cap: 20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tiling: TilingConfig,
    pub dedup: DedupConfig,
    pub readiness: ReadinessConfig,
    pub labels: LabelConfig,

    /// Upper bound for a single region's detect call
    pub region_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tiling: TilingConfig::default(),
            dedup: DedupConfig::default(),
            readiness: ReadinessConfig::default(),
            labels: LabelConfig::default(),
            region_timeout_ms: 5000,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load and validate configuration from a JSON file.
    /// Missing fields take their default values.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config: Config = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn region_timeout(&self) -> Duration {
        Duration::from_millis(self.region_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tiling.grid_size == 0 {
            return Err(ConfigError::Invalid("tiling.grid_size must be at least 1".into()));
        }
        if !(0.0..=1.0).contains(&self.tiling.overlap) {
            return Err(ConfigError::Invalid("tiling.overlap must be within [0, 1]".into()));
        }
        if !(self.dedup.overlap_threshold > 0.0 && self.dedup.overlap_threshold <= 1.0) {
            return Err(ConfigError::Invalid(
                "dedup.overlap_threshold must be within (0, 1]".into(),
            ));
        }
        if !(self.dedup.min_center_distance >= 0.0) {
            return Err(ConfigError::Invalid(
                "dedup.min_center_distance must not be negative".into(),
            ));
        }
        if self.dedup.max_detections == 0 {
            return Err(ConfigError::Invalid("dedup.max_detections must be at least 1".into()));
        }
        if let Some(policy) = &self.dedup.policy {
            policy.validate()?;
        }
        if self.readiness.max_attempts == 0 {
            return Err(ConfigError::Invalid("readiness.max_attempts must be at least 1".into()));
        }
        if self.region_timeout_ms == 0 {
            return Err(ConfigError::Invalid("region_timeout_ms must be positive".into()));
        }
        Ok(())
    }
}
