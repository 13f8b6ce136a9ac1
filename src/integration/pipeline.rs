//! TrackerPipeline for combining an upstream tracker with the registry.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};

use image::RgbImage;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::classes::{ClassReconciler, ClassVocabulary};
use crate::config::PipelineConfig;
use crate::error::{ConfigError, PipelineError};
use crate::team::TeamClassifier;
use crate::tracker::{Detection, RenderRecord, TrackRegistry};

use super::{DetectionSource, IntoDetections, RenderSink};

/// Result of one processed frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameSnapshot {
    /// 1-based index of the frame within the session
    pub frame_index: u64,
    /// Every live track, ascending by id
    pub records: Vec<RenderRecord>,
    /// Ids dropped during this frame
    pub removed: Vec<u64>,
}

/// Per-video processing state: the registry plus the optional stages.
///
/// Create one per video. Nothing is shared between sessions.
#[derive(Debug)]
pub struct TrackingSession {
    registry: TrackRegistry,
    vocabulary: ClassVocabulary,
    reconciler: Option<ClassReconciler>,
    classifier: Option<TeamClassifier>,
    warned_classes: HashSet<(u64, u32)>,
}

impl TrackingSession {
    pub fn new(config: &PipelineConfig, vocabulary: ClassVocabulary) -> Result<Self, ConfigError> {
        config.validate()?;
        let stages = config.stages;

        let reconciler = stages
            .class_reconciliation
            .then(|| ClassReconciler::new(&vocabulary, &config.reconcile));
        let classifier = if stages.team_classification {
            Some(TeamClassifier::new(&config.team)?)
        } else {
            None
        };

        Ok(Self {
            registry: TrackRegistry::new(config.tracker_config()?),
            vocabulary,
            reconciler,
            classifier,
            warned_classes: HashSet::new(),
        })
    }

    /// Run the full per-frame cycle.
    ///
    /// Detections are reconciled, ingested, and labelled; tracks that were not
    /// seen coast and expire. The image is only read for team classification,
    /// so `None` simply defers labelling to a later frame.
    pub fn process(&mut self, image: Option<&RgbImage>, detections: impl IntoDetections) -> FrameSnapshot {
        let mut detections = detections.into_detections();
        if let Some(reconciler) = &self.reconciler {
            reconciler.reconcile_all(&mut detections);
        }
        self.warn_out_of_vocabulary(&detections);

        let seen = self.registry.begin_frame(&detections);
        if let (Some(classifier), Some(frame)) = (&self.classifier, image) {
            self.registry
                .assign_team_labels(&seen, |bbox| classifier.classify(frame, bbox));
        }
        let removed = self.registry.expire_missing(&seen);

        self.warned_classes
            .retain(|(track_id, _)| !removed.contains(track_id));

        FrameSnapshot {
            frame_index: self.registry.frame_id(),
            records: self.registry.render_snapshot(&self.vocabulary),
            removed,
        }
    }

    fn warn_out_of_vocabulary(&mut self, detections: &[Detection]) {
        for det in detections {
            if self.vocabulary.contains(det.class_id) {
                continue;
            }
            if self.warned_classes.insert((det.track_id, det.class_id)) {
                warn!(
                    track_id = det.track_id,
                    class_id = det.class_id,
                    "class id outside the detector vocabulary"
                );
            }
        }
    }

    pub fn registry(&self) -> &TrackRegistry {
        &self.registry
    }

    pub fn vocabulary(&self) -> &ClassVocabulary {
        &self.vocabulary
    }

    /// Drop all tracks, e.g. when switching to another video.
    pub fn reset(&mut self) {
        self.registry.reset();
        self.warned_classes.clear();
    }
}

/// Counters reported by [`TrackerPipeline::run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub frames: u64,
    /// Largest number of simultaneously live tracks
    pub peak_tracks: usize,
    /// The stop flag ended the run before the source was exhausted
    pub interrupted: bool,
}

/// A combined pipeline that pulls frames from a `DetectionSource` and runs
/// them through a [`TrackingSession`].
pub struct TrackerPipeline<D: DetectionSource> {
    source: D,
    session: TrackingSession,
}

impl<D: DetectionSource> TrackerPipeline<D> {
    /// Create a new pipeline. The session vocabulary is taken from the source.
    pub fn new(source: D, config: &PipelineConfig) -> Result<Self, ConfigError> {
        let session = TrackingSession::new(config, source.class_names().clone())?;
        Ok(Self { source, session })
    }

    /// Create a new pipeline with the default configuration.
    pub fn with_default_config(source: D) -> Result<Self, ConfigError> {
        Self::new(source, &PipelineConfig::default())
    }

    /// Pull and process one frame. `Ok(None)` once the source is exhausted.
    pub fn process_frame(&mut self) -> Result<Option<FrameSnapshot>, D::Error> {
        let Some(frame) = self.source.next_frame()? else {
            return Ok(None);
        };
        Ok(Some(self.session.process(frame.image.as_ref(), frame.detections)))
    }

    /// Process detections obtained outside the source, e.g. from a live tracker.
    pub fn process_detections(
        &mut self,
        image: Option<&RgbImage>,
        detections: impl IntoDetections,
    ) -> FrameSnapshot {
        self.session.process(image, detections)
    }

    /// Process frames into `sink` until the source is exhausted or `stop` is set.
    ///
    /// `stop` is checked between frames, never within one.
    pub fn run<S: RenderSink>(
        &mut self,
        sink: &mut S,
        stop: &AtomicBool,
    ) -> Result<RunSummary, PipelineError<D::Error>> {
        let mut summary = RunSummary::default();
        info!("tracking started");

        loop {
            if stop.load(Ordering::Relaxed) {
                summary.interrupted = true;
                info!(frames = summary.frames, "stop requested");
                break;
            }
            let Some(frame) = self.source.next_frame().map_err(PipelineError::Source)? else {
                break;
            };

            let snapshot = self.session.process(frame.image.as_ref(), frame.detections);
            sink.render(&snapshot, frame.image.as_ref())?;

            summary.frames += 1;
            summary.peak_tracks = summary.peak_tracks.max(snapshot.records.len());
            debug!(
                frame = snapshot.frame_index,
                tracks = snapshot.records.len(),
                removed = snapshot.removed.len(),
                "frame rendered"
            );
        }

        info!(
            frames = summary.frames,
            peak_tracks = summary.peak_tracks,
            "tracking finished"
        );
        Ok(summary)
    }

    /// Get a reference to the underlying source.
    pub fn source(&self) -> &D {
        &self.source
    }

    /// Get a mutable reference to the underlying source.
    pub fn source_mut(&mut self) -> &mut D {
        &mut self.source
    }

    pub fn session(&self) -> &TrackingSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut TrackingSession {
        &mut self.session
    }
}
