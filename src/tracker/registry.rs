//! Per-session track lifecycle: create, predict/correct, coast, expire.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::{debug, warn};

use crate::classes::ClassVocabulary;
use crate::error::ConfigError;
use crate::tracker::detection::Detection;
use crate::tracker::kalman_filter::{KalmanEstimator, KalmanParams};
use crate::tracker::rect::Rect;
use crate::tracker::track_state::{TeamLabel, TrackState, TrackStatus, UnknownPolicy};

/// Configuration for the TrackRegistry.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Frames a lost track is kept alive by prediction before removal
    pub history_len: u32,
    pub kalman: KalmanParams,
    /// Render the filtered position instead of the raw box bottom-centre
    pub smoothing: bool,
    pub unknown_policy: UnknownPolicy,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            history_len: 10,
            kalman: KalmanParams::default(),
            smoothing: true,
            unknown_policy: UnknownPolicy::default(),
        }
    }
}

impl TrackerConfig {
    /// Default configuration with the given history length; negative values are rejected.
    pub fn with_history_len(history_len: i64) -> Result<Self, ConfigError> {
        if history_len < 0 {
            return Err(ConfigError::NegativeHistoryLen(history_len));
        }
        let history_len =
            u32::try_from(history_len).map_err(|_| ConfigError::HistoryLenTooLarge(history_len))?;
        Ok(Self {
            history_len,
            ..Self::default()
        })
    }
}

/// What the renderer receives for one live track.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderRecord {
    pub track_id: u64,
    pub estimated_position: (f32, f32),
    pub last_bbox: Rect,
    pub class_id: u32,
    /// `None` when `class_id` is outside the vocabulary
    pub class_name: Option<String>,
    pub team_label: TeamLabel,
    pub status: TrackStatus,
    pub missed_count: u32,
}

/// Owns every [`TrackState`] of one processing session, keyed by track id.
///
/// Iteration, and therefore snapshot order, is ascending track id.
#[derive(Debug, Clone)]
pub struct TrackRegistry {
    tracks: BTreeMap<u64, TrackState>,
    config: TrackerConfig,
    frame_id: u64,
}

impl TrackRegistry {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            tracks: BTreeMap::new(),
            config,
            frame_id: 0,
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Number of frames started so far.
    pub fn frame_id(&self) -> u64 {
        self.frame_id
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn get(&self, track_id: u64) -> Option<&TrackState> {
        self.tracks.get(&track_id)
    }

    pub fn contains(&self, track_id: u64) -> bool {
        self.tracks.contains_key(&track_id)
    }

    pub fn tracks(&self) -> impl Iterator<Item = &TrackState> {
        self.tracks.values()
    }

    /// Ingest this frame's detections and return the set of ids seen.
    ///
    /// New ids get a fresh filter at the measurement. Known ids run
    /// `predict()` then `correct()`. A repeated id within one frame is ignored
    /// after its first occurrence so each filter predicts once per frame.
    pub fn begin_frame(&mut self, detections: &[Detection]) -> BTreeSet<u64> {
        self.frame_id += 1;
        let mut seen = BTreeSet::new();

        for det in detections {
            if !seen.insert(det.track_id) {
                warn!(track_id = det.track_id, frame = self.frame_id, "duplicate track id in frame, ignoring");
                continue;
            }

            match self.tracks.entry(det.track_id) {
                Entry::Vacant(entry) => {
                    debug!(track_id = det.track_id, frame = self.frame_id, "new track");
                    entry.insert(TrackState::new(det, &self.config.kalman, self.frame_id));
                }
                Entry::Occupied(entry) => {
                    let track = entry.into_mut();
                    let measurement = det.measurement();
                    track.estimator.predict();
                    if let Err(err) = track.estimator.correct(measurement) {
                        warn!(track_id = det.track_id, %err, "resetting filter at measurement");
                        track.estimator = KalmanEstimator::new(measurement, &self.config.kalman);
                    }
                    track.missed_count = 0;
                    track.last_bbox = det.bbox;
                    track.class_id = det.class_id;
                }
            }
        }

        seen
    }

    /// Coast every track absent from `seen` and drop those past `history_len`.
    ///
    /// Returns the removed ids in ascending order.
    pub fn expire_missing(&mut self, seen: &BTreeSet<u64>) -> Vec<u64> {
        let history_len = self.config.history_len;
        let mut expired = Vec::new();

        for (id, track) in self.tracks.iter_mut() {
            if seen.contains(id) {
                continue;
            }
            track.estimator.predict();
            track.missed_count += 1;
            if track.missed_count > history_len {
                expired.push(*id);
            }
        }

        for id in &expired {
            self.tracks.remove(id);
            debug!(track_id = id, frame = self.frame_id, "track expired");
        }
        expired
    }

    /// Offer every seen track still lacking a label to `classify`.
    ///
    /// `classify` returns `None` when it cannot sample the box this frame.
    /// Returns the number of tracks whose label changed.
    pub fn assign_team_labels<F>(&mut self, seen: &BTreeSet<u64>, mut classify: F) -> usize
    where
        F: FnMut(&Rect) -> Option<TeamLabel>,
    {
        let policy = self.config.unknown_policy;
        let mut changed = 0;

        for id in seen {
            let Some(track) = self.tracks.get_mut(id) else {
                continue;
            };
            if !track.needs_team_label(policy) {
                continue;
            }
            if let Some(label) = classify(&track.last_bbox) {
                let before = track.team_label.clone();
                track.record_team_label(label);
                if track.team_label != before {
                    debug!(track_id = id, label = %track.team_label, "team label recorded");
                    changed += 1;
                }
            }
        }
        changed
    }

    /// Renderable view of every remaining track, ascending by id.
    pub fn render_snapshot(&self, vocabulary: &ClassVocabulary) -> Vec<RenderRecord> {
        self.tracks
            .values()
            .map(|track| RenderRecord {
                track_id: track.track_id,
                estimated_position: if self.config.smoothing {
                    track.estimated_position()
                } else {
                    track.last_bbox.bottom_center()
                },
                last_bbox: track.last_bbox,
                class_id: track.class_id,
                class_name: vocabulary.name(track.class_id).map(str::to_owned),
                team_label: track.team_label.clone(),
                status: track.status(),
                missed_count: track.missed_count,
            })
            .collect()
    }

    /// Run one frame without team classification and return the snapshot.
    pub fn update(&mut self, detections: &[Detection], vocabulary: &ClassVocabulary) -> Vec<RenderRecord> {
        let seen = self.begin_frame(detections);
        self.expire_missing(&seen);
        self.render_snapshot(vocabulary)
    }

    /// Drop every track and restart frame numbering.
    pub fn reset(&mut self) {
        self.tracks.clear();
        self.frame_id = 0;
    }
}
