//! Integration module for connecting an upstream detector/tracker with the
//! track registry and a renderer.
//!
//! This module provides the traits at both external boundaries, the session
//! object that runs the per-frame cycle, and a JSON replay source.

mod builder;
mod detector;
mod pipeline;
mod render;
mod replay;

pub use builder::DetectionBuilder;
pub use detector::{DetectionSource, IntoDetections, SourceFrame};
pub use pipeline::{FrameSnapshot, RunSummary, TrackerPipeline, TrackingSession};
pub use render::{JsonLinesSink, OverlayRenderer, Palette, RenderSink};
pub use replay::JsonReplaySource;
