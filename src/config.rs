//! Session configuration, loaded from JSON and validated before any frame runs.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::classes::ReconcileConfig;
use crate::error::ConfigError;
use crate::team::TeamConfig;
use crate::tracker::{KalmanParams, TrackerConfig};

/// Toggles for the independently composable processing stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageConfig {
    pub kalman_smoothing: bool,
    pub class_reconciliation: bool,
    pub team_classification: bool,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            kalman_smoothing: true,
            class_reconciliation: true,
            team_classification: true,
        }
    }
}

/// Filtering applied upstream, by the detector/tracker itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub confidence_threshold: f32,
    /// Class names the tracker should emit; `None` means all
    pub classes: Option<Vec<String>>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.5,
            classes: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Frames a lost track survives on prediction alone
    pub history_len: i64,
    pub stages: StageConfig,
    pub detector: DetectorConfig,
    pub reconcile: ReconcileConfig,
    pub kalman: KalmanParams,
    pub team: TeamConfig,
    /// Seed of the render palette
    pub palette_seed: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            history_len: 10,
            stages: StageConfig::default(),
            detector: DetectorConfig::default(),
            reconcile: ReconcileConfig::default(),
            kalman: KalmanParams::default(),
            team: TeamConfig::default(),
            palette_seed: 42,
        }
    }
}

impl PipelineConfig {
    /// Load from a JSON file. Missing keys take their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let data = fs::read_to_string(path)?;
        Self::from_json_str(&data)
    }

    pub fn from_json_str(data: &str) -> Result<Self, ConfigError> {
        let cfg: PipelineConfig = serde_json::from_str(data)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.tracker_config()?;
        let threshold = self.detector.confidence_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::InvalidConfidence(threshold));
        }
        if self.stages.team_classification {
            self.team.validate()?;
        }
        Ok(())
    }

    /// Registry configuration derived from this config.
    pub fn tracker_config(&self) -> Result<TrackerConfig, ConfigError> {
        self.kalman.validate()?;
        let base = TrackerConfig::with_history_len(self.history_len)?;
        Ok(TrackerConfig {
            kalman: self.kalman,
            smoothing: self.stages.kalman_smoothing,
            unknown_policy: self.team.unknown_policy,
            ..base
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::UnknownPolicy;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = PipelineConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.tracker_config().unwrap().history_len, 10);
    }

    #[test]
    fn test_partial_json_overrides_defaults() {
        let cfg = PipelineConfig::from_json_str(
            r#"{
                "history_len": 3,
                "stages": {"team_classification": false},
                "team": {"unknown_policy": "sticky", "roi": {"top": 0.2}},
                "kalman": {"measurement_noise": 1.5}
            }"#,
        )
        .unwrap();
        assert_eq!(cfg.history_len, 3);
        assert!(!cfg.stages.team_classification);
        assert!(cfg.stages.kalman_smoothing);
        assert_eq!(cfg.team.roi.top, 0.2);
        assert_eq!(cfg.team.roi.bottom, 0.60);
        assert_eq!(cfg.kalman.measurement_noise, 1.5);
        assert_eq!(cfg.kalman.process_noise, 0.03);

        let tracker = cfg.tracker_config().unwrap();
        assert_eq!(tracker.unknown_policy, UnknownPolicy::Sticky);
        assert_eq!(tracker.history_len, 3);
    }

    #[test]
    fn test_negative_history_len_rejected() {
        let err = PipelineConfig::from_json_str(r#"{"history_len": -2}"#).unwrap_err();
        assert!(matches!(err, ConfigError::NegativeHistoryLen(-2)));
    }

    #[test]
    fn test_malformed_bucket_table_rejected() {
        let err = PipelineConfig::from_json_str(
            r#"{"team": {"buckets": [
                {"label": "Home", "hue": [120, 100], "saturation": [0, 255], "value": [0, 255]}
            ]}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidHsvRange { .. }));
    }

    #[test]
    fn test_bucket_table_ignored_when_stage_disabled() {
        let cfg = PipelineConfig::from_json_str(r#"{"stages": {"team_classification": false}, "team": {"buckets": []}}"#);
        assert!(cfg.is_ok());
    }

    #[test]
    fn test_bad_threshold_rejected() {
        let err = PipelineConfig::from_json_str(r#"{"detector": {"confidence_threshold": 1.5}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidConfidence(_)));
    }

    #[test]
    fn test_syntax_error_is_json_error() {
        assert!(matches!(PipelineConfig::from_json_str("{"), Err(ConfigError::Json(_))));
    }
}
