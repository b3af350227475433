use std::time::Duration;

use thiserror::Error;

use crate::detection::RegionKind;

/// Failures a detector can signal for a single region
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DetectionError {
    #[error("detection backend unavailable: {0}")]
    Unavailable(String),

    #[error("detection timed out after {0:?}")]
    TimedOut(Duration),

    #[error("detection backend failed: {0}")]
    Backend(String),
}

/// One region's detect call failed. Recovered by the aggregator.
#[derive(Error, Debug)]
#[error("detection failed for {region}")]
pub struct RegionDetectionFailed {
    pub region: RegionKind,
    #[source]
    pub source: DetectionError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaleReason {
    NoImage,
    EmptyPrompt,
}

/// Input validation failures surfaced straight to the caller
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalyzeError {
    #[error("Please add an image and enter a command.")]
    StalePrompt(StaleReason),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration from {path}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration from {path}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
