//! Smoothing and team labelling for per-frame tracker output.
//!
//! An external detector/tracker hands over boxes with persistent track ids.
//! This crate keeps one constant-velocity Kalman filter per id, bridges short
//! detection gaps by prediction, merges related detector classes, and samples
//! jersey colour once per identity to attach a sticky team label.

pub mod classes;
pub mod config;
pub mod error;
pub mod integration;
pub mod team;
pub mod tracker;

pub use classes::{ClassReconciler, ClassVocabulary};
pub use config::PipelineConfig;
pub use error::{ConfigError, EstimatorError, PipelineError, RenderError, ReplayError};
pub use integration::{
    DetectionBuilder, DetectionSource, FrameSnapshot, JsonLinesSink, JsonReplaySource, RenderSink,
    RunSummary, SourceFrame, TrackerPipeline, TrackingSession,
};
pub use team::{BucketTable, HsvBucket, TeamClassifier};
pub use tracker::{
    Detection, KalmanEstimator, Rect, RenderRecord, TeamLabel, TrackRegistry, TrackState,
    TrackStatus, TrackerConfig,
};
