use std::sync::atomic::AtomicBool;

use approx::assert_abs_diff_eq;
use image::{Rgb, RgbImage};
use pitchtrack_rs::classes::ReconcileConfig;
use pitchtrack_rs::integration::{JsonLinesSink, JsonReplaySource};
use pitchtrack_rs::{
    ClassReconciler, ClassVocabulary, ConfigError, Detection, PipelineConfig, TeamLabel, TrackStatus,
    TrackerPipeline, TrackingSession,
};

fn vocab() -> ClassVocabulary {
    ClassVocabulary::from_names(["player", "goalkeeper", "referee", "ball"])
}

fn session(history_len: i64) -> TrackingSession {
    let config = PipelineConfig {
        history_len,
        ..PipelineConfig::default()
    };
    TrackingSession::new(&config, vocab()).unwrap()
}

/// Player box moving +10 px per frame; its bottom-centre x is `120 + 10 * (frame - 1)`.
fn walker(id: u64, frame: u64) -> Detection {
    let x1 = 100.0 + 10.0 * (frame - 1) as f32;
    Detection::new(id, 0, 0.9, x1, 50.0, x1 + 40.0, 150.0)
}

fn jersey_frame(color: [u8; 3], detections: &[Detection]) -> RgbImage {
    let mut frame = RgbImage::from_pixel(640, 360, Rgb([30, 120, 40]));
    for det in detections {
        let [x1, y1, x2, y2] = det.bbox.to_tlbr();
        for y in y1 as u32..y2 as u32 {
            for x in x1 as u32..x2 as u32 {
                frame.put_pixel(x, y, Rgb(color));
            }
        }
    }
    frame
}

#[test]
fn test_lost_track_is_predicted_then_removed() {
    let mut session = session(3);
    for frame in 1..=5 {
        let snapshot = session.process(None, vec![walker(7, frame)]);
        assert_eq!(snapshot.records.len(), 1);
        assert_eq!(snapshot.records[0].status, TrackStatus::Tracked);
    }

    let mut last_x = session.registry().get(7).unwrap().estimated_position().0;
    for frame in 6..=8 {
        let snapshot = session.process(None, Vec::<Detection>::new());
        assert_eq!(snapshot.frame_index, frame);
        let record = &snapshot.records[0];
        assert_eq!(record.track_id, 7);
        assert_eq!(record.status, TrackStatus::Predicted);
        assert_eq!(record.missed_count as u64, frame - 5);

        let (x, y) = record.estimated_position;
        let truth = 120.0 + 10.0 * (frame - 1) as f32;
        assert!(x > last_x, "prediction should keep moving right");
        assert_abs_diff_eq!(x, truth, epsilon = 5.0);
        assert_abs_diff_eq!(y, 150.0, epsilon = 1e-3);
        last_x = x;
    }

    let snapshot = session.process(None, Vec::<Detection>::new());
    assert!(snapshot.records.is_empty());
    assert_eq!(snapshot.removed, vec![7]);
    assert!(!session.registry().contains(7));
}

#[test]
fn test_history_len_bounds_rendering() {
    let mut session = session(4);
    session.process(None, vec![walker(1, 1), walker(2, 1)]);

    // id 2 keeps arriving; id 1 is missing from frame 2 on
    for frame in 2..=5 {
        let snapshot = session.process(None, vec![walker(2, frame)]);
        assert!(snapshot.records.iter().any(|r| r.track_id == 1));
    }
    let snapshot = session.process(None, vec![walker(2, 6)]);
    let ids: Vec<_> = snapshot.records.iter().map(|r| r.track_id).collect();
    assert_eq!(ids, vec![2]);
}

#[test]
fn test_zero_history_drops_on_first_miss() {
    let mut session = session(0);
    session.process(None, vec![walker(1, 1)]);
    let snapshot = session.process(None, Vec::<Detection>::new());
    assert!(snapshot.records.is_empty());
    assert_eq!(snapshot.removed, vec![1]);
}

#[test]
fn test_reused_id_starts_fresh() {
    let mut session = session(1);
    for frame in 1..=4 {
        let image = jersey_frame([0, 0, 255], &[walker(9, frame)]);
        session.process(Some(&image), vec![walker(9, frame)]);
    }
    assert_eq!(*session.registry().get(9).unwrap().team_label(), TeamLabel::Team("Blue".into()));

    session.process(None, Vec::<Detection>::new());
    session.process(None, Vec::<Detection>::new());
    assert!(!session.registry().contains(9));

    let reborn = Detection::new(9, 0, 0.9, 400.0, 50.0, 440.0, 150.0);
    session.process(None, vec![reborn]);
    let track = session.registry().get(9).unwrap();
    assert_eq!(*track.team_label(), TeamLabel::Unassigned);
    assert_eq!(track.estimator().velocity(), (0.0, 0.0));
    assert_eq!(track.start_frame(), 7);
    assert_eq!(track.estimated_position(), (420.0, 150.0));
}

#[test]
fn test_snapshot_is_ordered_by_track_id() {
    let mut session = session(10);
    let snapshot = session.process(None, vec![walker(30, 1), walker(4, 1), walker(17, 1)]);
    let ids: Vec<_> = snapshot.records.iter().map(|r| r.track_id).collect();
    assert_eq!(ids, vec![4, 17, 30]);
}

#[test]
fn test_team_label_never_changes_once_assigned() {
    let mut session = session(10);
    let colours = [[0, 0, 255], [255, 0, 0], [255, 255, 255], [10, 10, 10]];
    for (i, colour) in colours.iter().enumerate() {
        let det = walker(3, i as u64 + 1);
        let image = jersey_frame(*colour, std::slice::from_ref(&det));
        let snapshot = session.process(Some(&image), vec![det]);
        assert_eq!(snapshot.records[0].team_label, TeamLabel::Team("Blue".into()));
    }
}

#[test]
fn test_unknown_is_retried_until_a_bucket_matches() {
    let mut session = session(10);

    let first = walker(5, 1);
    let grey = jersey_frame([128, 128, 128], std::slice::from_ref(&first));
    let snapshot = session.process(Some(&grey), vec![first]);
    assert_eq!(snapshot.records[0].team_label, TeamLabel::Unknown);

    let second = walker(5, 2);
    let yellow = jersey_frame([255, 220, 0], std::slice::from_ref(&second));
    let snapshot = session.process(Some(&yellow), vec![second]);
    assert_eq!(snapshot.records[0].team_label, TeamLabel::Team("Yellow".into()));
}

#[test]
fn test_hue_wraparound_classifies_as_red() {
    let mut session = session(10);
    let det = walker(2, 1);
    // hue ~178 on the 0..179 scale
    let image = jersey_frame([255, 0, 12], std::slice::from_ref(&det));
    let snapshot = session.process(Some(&image), vec![det]);
    assert_eq!(snapshot.records[0].team_label, TeamLabel::Team("Red".into()));
}

#[test]
fn test_tiny_box_is_retried_once_it_grows() {
    let mut session = session(10);
    let tiny = Detection::new(11, 0, 0.9, 100.0, 100.0, 106.0, 106.0);
    let image = jersey_frame([0, 0, 255], std::slice::from_ref(&tiny));
    let snapshot = session.process(Some(&image), vec![tiny]);
    assert_eq!(snapshot.records[0].team_label, TeamLabel::Unassigned);

    let full = Detection::new(11, 0, 0.9, 100.0, 60.0, 140.0, 160.0);
    let image = jersey_frame([0, 0, 255], std::slice::from_ref(&full));
    let snapshot = session.process(Some(&image), vec![full]);
    assert_eq!(snapshot.records[0].team_label, TeamLabel::Team("Blue".into()));
}

#[test]
fn test_reconciler_is_idempotent_and_keeps_ball() {
    let vocab = vocab();
    let reconciler = ClassReconciler::new(&vocab, &ReconcileConfig::default());
    let dets = [
        Detection::new(1, 1, 0.9, 0.0, 0.0, 10.0, 10.0),
        Detection::new(2, 2, 0.9, 0.0, 0.0, 10.0, 10.0),
        Detection::new(3, 3, 0.9, 0.0, 0.0, 10.0, 10.0),
    ];
    for det in &dets {
        let once = reconciler.reconcile(det);
        let twice = reconciler.reconcile(&once);
        assert_eq!(once, twice);
    }
    let ids: Vec<_> = dets.iter().map(|d| reconciler.reconcile(d).class_id).collect();
    assert_eq!(ids, vec![0, 0, 3]);
}

#[test]
fn test_reconciler_without_player_class_is_noop() {
    let vocab = ClassVocabulary::from_names(["goalkeeper", "referee", "ball"]);
    let reconciler = ClassReconciler::new(&vocab, &ReconcileConfig::default());
    let det = Detection::new(1, 0, 0.9, 0.0, 0.0, 10.0, 10.0);
    assert_eq!(reconciler.reconcile(&det), det);
}

#[test]
fn test_invalid_configs_rejected_before_processing() {
    let err = TrackingSession::new(
        &PipelineConfig {
            history_len: -1,
            ..PipelineConfig::default()
        },
        vocab(),
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::NegativeHistoryLen(-1)));

    let err = PipelineConfig::from_json_str(r#"{"team": {"roi": {"top": 0.7, "bottom": 0.3}}}"#).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidRoiFraction { .. }));
}

#[test]
fn test_replay_log_to_json_lines() {
    let log = r#"{
        "classes": {"0": "player", "1": "goalkeeper", "2": "referee", "3": "ball"},
        "frames": [
            {"detections": [
                {"track_id": 1, "class_id": 1, "confidence": 0.9, "bbox": [100, 50, 140, 150]},
                {"track_id": 2, "class_id": 3, "confidence": 0.2, "bbox": [300, 200, 306, 206]}
            ]},
            {"detections": [
                {"track_id": 1, "class_id": 1, "confidence": 0.9, "bbox": [110, 50, 150, 150]}
            ]},
            {"detections": []}
        ]
    }"#;
    let config = PipelineConfig::default();
    let source = JsonReplaySource::from_json_str(log, ".")
        .unwrap()
        .with_filter(&config.detector)
        .unwrap();
    let mut pipeline = TrackerPipeline::new(source, &config).unwrap();
    let mut sink = JsonLinesSink::new(Vec::new());
    let summary = pipeline.run(&mut sink, &AtomicBool::new(false)).unwrap();
    assert_eq!(summary.frames, 3);
    assert_eq!(summary.peak_tracks, 1);

    let text = String::from_utf8(sink.into_inner()).unwrap();
    let frames: Vec<serde_json::Value> = text.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
    assert_eq!(frames.len(), 3);

    let first = &frames[0]["records"][0];
    assert_eq!(first["track_id"], 1);
    assert_eq!(first["class_id"], 0);
    assert_eq!(first["class_name"], "player");
    assert_eq!(first["team_label"], "Unassigned");

    let last = &frames[2]["records"][0];
    assert_eq!(last["status"], "predicted");
    assert_eq!(last["missed_count"], 1);
}
