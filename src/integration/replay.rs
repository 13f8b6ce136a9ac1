//! Detection source that replays a recorded tracker log.
//!
//! The log is a single JSON document:
//!
//! ```json
//! {
//!   "classes": {"0": "player", "1": "goalkeeper", "2": "referee", "3": "ball"},
//!   "frames": [
//!     {"image": "frames/000001.jpg",
//!      "detections": [{"track_id": 7, "class_id": 0, "confidence": 0.91,
//!                      "bbox": [100.0, 50.0, 140.0, 150.0]}]}
//!   ]
//! }
//! ```
//!
//! `bbox` is `[x1, y1, x2, y2]` in pixels. Image paths are resolved relative
//! to the log file and are optional.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, warn};

use crate::classes::ClassVocabulary;
use crate::config::DetectorConfig;
use crate::error::{ConfigError, ReplayError};
use crate::tracker::Detection;

use super::{DetectionSource, SourceFrame};

#[derive(Debug, Deserialize)]
struct ReplayLog {
    classes: ClassVocabulary,
    #[serde(default)]
    frames: Vec<ReplayFrame>,
}

#[derive(Debug, Deserialize)]
struct ReplayFrame {
    #[serde(default)]
    image: Option<PathBuf>,
    #[serde(default)]
    detections: Vec<ReplayDetection>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct ReplayDetection {
    track_id: u64,
    class_id: u32,
    confidence: f32,
    bbox: [f32; 4],
}

/// Replays a JSON tracker log frame by frame.
#[derive(Debug)]
pub struct JsonReplaySource {
    vocabulary: ClassVocabulary,
    frames: std::vec::IntoIter<ReplayFrame>,
    base_dir: PathBuf,
    confidence_threshold: f32,
    allowed: Option<HashSet<u32>>,
    frame_index: u64,
}

impl JsonReplaySource {
    /// Open a log file. Relative image paths resolve against its directory.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ReplayError> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)?;
        let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Self::from_json_str(&data, base_dir)
    }

    pub fn from_json_str(data: &str, base_dir: impl Into<PathBuf>) -> Result<Self, ReplayError> {
        let log: ReplayLog = serde_json::from_str(data)?;
        debug!(
            frames = log.frames.len(),
            classes = log.classes.len(),
            "detection log loaded"
        );
        Ok(Self {
            vocabulary: log.classes,
            frames: log.frames.into_iter(),
            base_dir: base_dir.into(),
            confidence_threshold: 0.0,
            allowed: None,
            frame_index: 0,
        })
    }

    /// Apply the detector-side confidence threshold and class allow-list.
    ///
    /// Fails if the allow-list names a class the log does not define.
    pub fn with_filter(mut self, config: &DetectorConfig) -> Result<Self, ReplayError> {
        self.confidence_threshold = config.confidence_threshold;
        self.allowed = match &config.classes {
            Some(names) => Some(
                names
                    .iter()
                    .map(|name| {
                        self.vocabulary
                            .id_of(name)
                            .ok_or_else(|| ConfigError::UnknownClass(name.clone()))
                    })
                    .collect::<Result<HashSet<_>, _>>()?,
            ),
            None => None,
        };
        Ok(self)
    }

    /// Frames not yet handed out.
    pub fn remaining(&self) -> usize {
        self.frames.len()
    }

    fn accept(&self, raw: &ReplayDetection) -> Option<Detection> {
        let [x1, y1, x2, y2] = raw.bbox;
        let det = Detection::new(raw.track_id, raw.class_id, raw.confidence, x1, y1, x2, y2);
        if !det.bbox.is_valid() {
            warn!(frame = self.frame_index, track_id = raw.track_id, bbox = ?raw.bbox, "dropping invalid box");
            return None;
        }
        if !(0.0..=1.0).contains(&raw.confidence) {
            warn!(
                frame = self.frame_index,
                track_id = raw.track_id,
                confidence = raw.confidence,
                "dropping detection with out-of-range confidence"
            );
            return None;
        }
        if raw.confidence < self.confidence_threshold {
            return None;
        }
        if let Some(allowed) = &self.allowed {
            if !allowed.contains(&raw.class_id) {
                return None;
            }
        }
        Some(det)
    }
}

impl DetectionSource for JsonReplaySource {
    type Error = ReplayError;

    fn class_names(&self) -> &ClassVocabulary {
        &self.vocabulary
    }

    fn next_frame(&mut self) -> Result<Option<SourceFrame>, Self::Error> {
        let Some(frame) = self.frames.next() else {
            return Ok(None);
        };
        self.frame_index += 1;

        let image = match &frame.image {
            Some(relative) => {
                let path = self.base_dir.join(relative);
                let decoded = image::open(&path).map_err(|source| ReplayError::Image {
                    path: path.clone(),
                    source,
                })?;
                Some(decoded.to_rgb8())
            }
            None => None,
        };

        let detections: Vec<Detection> = frame
            .detections
            .iter()
            .filter_map(|raw| self.accept(raw))
            .collect();

        Ok(Some(SourceFrame { image, detections }))
    }
}
