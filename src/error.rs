//! Error types shared across the crate.

use thiserror::Error;

/// Rejected configuration. Raised before any frame is processed.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("history_len must be non-negative, got {0}")]
    NegativeHistoryLen(i64),

    #[error("history_len {0} exceeds the supported maximum of {max}", max = u32::MAX)]
    HistoryLenTooLarge(i64),

    #[error("ROI fraction {axis} range [{low}, {high}] must satisfy 0 <= low < high <= 1")]
    InvalidRoiFraction {
        axis: &'static str,
        low: f32,
        high: f32,
    },

    #[error("bucket `{label}`: {channel} range [{low}, {high}] is malformed")]
    InvalidHsvRange {
        label: String,
        channel: &'static str,
        low: u8,
        high: u8,
    },

    #[error("bucket `{label}`: wraparound hue range must lie above the primary hue range")]
    InvalidWrapHue { label: String },

    #[error("HSV bucket table is empty")]
    EmptyBucketTable,

    #[error("HSV bucket label `{0}` appears more than once")]
    DuplicateBucketLabel(String),

    #[error("HSV bucket label `{0}` is reserved")]
    ReservedBucketLabel(String),

    #[error("{name} must be finite and positive, got {value}")]
    InvalidNoise { name: &'static str, value: f64 },

    #[error("confidence threshold must lie in [0, 1], got {0}")]
    InvalidConfidence(f32),

    #[error("{name} must be positive")]
    NonPositive { name: &'static str },

    #[error("class `{0}` is not in the detector vocabulary")]
    UnknownClass(String),

    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Json(#[from] serde_json::Error),
}

/// Numerical failure inside a Kalman estimator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EstimatorError {
    #[error("innovation covariance is not invertible")]
    SingularInnovation,
}

/// Failure of the iterative colour clustering. Callers fall back to the mean colour.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClusterError {
    #[error("need at least {clusters} samples, got {samples}")]
    TooFewSamples { samples: usize, clusters: usize },

    #[error("cluster centres diverged to a non-finite value")]
    NonFinite,
}

/// Failure while writing a rendered snapshot.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("render output failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot serialisation failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("overlay image could not be written: {0}")]
    Image(#[from] image::ImageError),
}

/// Failure of the JSON replay detection source.
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("failed to read detection log: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse detection log: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to load frame image {}: {source}", path.display())]
    Image {
        path: std::path::PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Failure while running a [`TrackerPipeline`](crate::TrackerPipeline) loop.
#[derive(Debug, Error)]
pub enum PipelineError<E>
where
    E: std::error::Error + 'static,
{
    #[error("detection source failed: {0}")]
    Source(#[source] E),

    #[error(transparent)]
    Render(#[from] RenderError),
}
