//! Trait for the upstream detector/tracker boundary.

use image::RgbImage;

use crate::classes::ClassVocabulary;
use crate::integration::DetectionBuilder;
use crate::tracker::Detection;

/// Everything the upstream stage hands over for one frame.
#[derive(Debug, Clone, Default)]
pub struct SourceFrame {
    /// Decoded frame pixels, needed only for team classification
    pub image: Option<RgbImage>,
    /// Tracked detections, already carrying persistent track ids
    pub detections: Vec<Detection>,
}

/// Trait for upstream detection/tracking backends.
///
/// Implement this trait to feed any tracker's per-frame output into the
/// pipeline. Each call blocks until one complete frame is available.
///
/// # Example
///
/// ```ignore
/// use pitchtrack_rs::{ClassVocabulary, DetectionSource, SourceFrame};
///
/// struct MyTracker {
///     classes: ClassVocabulary,
///     // Your model here
/// }
///
/// impl DetectionSource for MyTracker {
///     type Error = std::io::Error;
///
///     fn class_names(&self) -> &ClassVocabulary {
///         &self.classes
///     }
///
///     fn next_frame(&mut self) -> Result<Option<SourceFrame>, Self::Error> {
///         // Decode, run inference and tracking, return detections
///         Ok(None)
///     }
/// }
/// ```
pub trait DetectionSource {
    /// Error type for detection failures.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Class id to name mapping used by the detector.
    fn class_names(&self) -> &ClassVocabulary;

    /// Produce the next frame, or `None` once the stream is exhausted.
    fn next_frame(&mut self) -> Result<Option<SourceFrame>, Self::Error>;
}

/// Helper trait for converting model-specific outputs to `Detection`.
///
/// Implement this for your model's output format to enable easy conversion.
pub trait IntoDetections {
    /// Convert the output into a vector of detections.
    fn into_detections(self) -> Vec<Detection>;
}

impl IntoDetections for Vec<Detection> {
    fn into_detections(self) -> Vec<Detection> {
        self
    }
}

impl IntoDetections for &[Detection] {
    fn into_detections(self) -> Vec<Detection> {
        self.to_vec()
    }
}

impl IntoDetections for Vec<DetectionBuilder> {
    fn into_detections(self) -> Vec<Detection> {
        self.into_iter().map(DetectionBuilder::build).collect()
    }
}
