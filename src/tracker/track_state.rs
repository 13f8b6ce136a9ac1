use std::fmt;

use serde::{Deserialize, Serialize, Serializer};

use crate::tracker::detection::Detection;
use crate::tracker::kalman_filter::{KalmanEstimator, KalmanParams};
use crate::tracker::rect::Rect;

/// Team attribute of a track.
///
/// Starts as [`TeamLabel::Unassigned`]; once it becomes [`TeamLabel::Team`] it
/// never changes for the lifetime of the track.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum TeamLabel {
    #[default]
    Unassigned,
    Unknown,
    Team(String),
}

impl TeamLabel {
    pub fn is_definitive(&self) -> bool {
        matches!(self, TeamLabel::Team(_))
    }
}

impl fmt::Display for TeamLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TeamLabel::Unassigned => f.write_str("Unassigned"),
            TeamLabel::Unknown => f.write_str("Unknown"),
            TeamLabel::Team(name) => f.write_str(name),
        }
    }
}

impl Serialize for TeamLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// What happens after a classification attempt yields no bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownPolicy {
    /// Record "Unknown" but keep sampling on later frames until a bucket matches
    #[default]
    Retry,
    /// Record "Unknown" permanently
    Sticky,
}

/// Whether the rendered position comes from a correction or pure prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackStatus {
    /// Corrected by a detection this frame
    Tracked,
    /// Not detected this frame, position extrapolated
    Predicted,
}

/// Per-identity state owned by the registry.
#[derive(Debug, Clone)]
pub struct TrackState {
    pub(crate) track_id: u64,
    pub(crate) estimator: KalmanEstimator,
    pub(crate) missed_count: u32,
    pub(crate) last_bbox: Rect,
    pub(crate) class_id: u32,
    pub(crate) team_label: TeamLabel,
    pub(crate) start_frame: u64,
}

impl TrackState {
    /// Create a track at the detection's bottom-centre with zero velocity.
    pub fn new(detection: &Detection, params: &KalmanParams, frame_id: u64) -> Self {
        Self {
            track_id: detection.track_id,
            estimator: KalmanEstimator::new(detection.measurement(), params),
            missed_count: 0,
            last_bbox: detection.bbox,
            class_id: detection.class_id,
            team_label: TeamLabel::Unassigned,
            start_frame: frame_id,
        }
    }

    pub fn track_id(&self) -> u64 {
        self.track_id
    }

    pub fn missed_count(&self) -> u32 {
        self.missed_count
    }

    pub fn last_bbox(&self) -> Rect {
        self.last_bbox
    }

    pub fn class_id(&self) -> u32 {
        self.class_id
    }

    pub fn team_label(&self) -> &TeamLabel {
        &self.team_label
    }

    pub fn estimator(&self) -> &KalmanEstimator {
        &self.estimator
    }

    /// Frame index on which this identity was first seen.
    pub fn start_frame(&self) -> u64 {
        self.start_frame
    }

    pub fn status(&self) -> TrackStatus {
        if self.missed_count == 0 {
            TrackStatus::Tracked
        } else {
            TrackStatus::Predicted
        }
    }

    /// Filtered position, always the estimator's and never the raw box.
    pub fn estimated_position(&self) -> (f32, f32) {
        let (x, y) = self.estimator.position();
        (x as f32, y as f32)
    }

    /// True while the classifier should still sample this track.
    pub fn needs_team_label(&self, policy: UnknownPolicy) -> bool {
        match self.team_label {
            TeamLabel::Unassigned => true,
            TeamLabel::Unknown => policy == UnknownPolicy::Retry,
            TeamLabel::Team(_) => false,
        }
    }

    /// Record a classification result. A definitive label is never overwritten.
    pub fn record_team_label(&mut self, label: TeamLabel) {
        if self.team_label.is_definitive() || label == TeamLabel::Unassigned {
            return;
        }
        self.team_label = label;
    }
}
