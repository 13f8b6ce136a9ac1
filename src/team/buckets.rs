use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::team::color::Hsv;
use crate::tracker::TeamLabel;

const MAX_HUE: u8 = 179;

/// Inclusive `[low, high]` range of one HSV channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelRange(pub u8, pub u8);

impl ChannelRange {
    pub const FULL: ChannelRange = ChannelRange(0, 255);

    #[inline]
    pub fn contains(&self, value: u8) -> bool {
        self.0 <= value && value <= self.1
    }
}

/// A named colour region of HSV space.
///
/// `hue_wrap` is a second hue range near the top of the scale, for colours
/// whose hue passes through 0 (red).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HsvBucket {
    pub label: String,
    pub hue: ChannelRange,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hue_wrap: Option<ChannelRange>,
    pub saturation: ChannelRange,
    pub value: ChannelRange,
}

impl HsvBucket {
    pub fn new(label: impl Into<String>, hue: ChannelRange, saturation: ChannelRange, value: ChannelRange) -> Self {
        Self {
            label: label.into(),
            hue,
            hue_wrap: None,
            saturation,
            value,
        }
    }

    pub fn with_hue_wrap(mut self, wrap: ChannelRange) -> Self {
        self.hue_wrap = Some(wrap);
        self
    }

    pub fn matches(&self, hsv: Hsv) -> bool {
        let hue = self.hue.contains(hsv.h) || self.hue_wrap.is_some_and(|w| w.contains(hsv.h));
        hue && self.saturation.contains(hsv.s) && self.value.contains(hsv.v)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let malformed = |channel: &'static str, range: ChannelRange| ConfigError::InvalidHsvRange {
            label: self.label.clone(),
            channel,
            low: range.0,
            high: range.1,
        };

        if self.hue.0 > self.hue.1 || self.hue.1 > MAX_HUE {
            return Err(malformed("hue", self.hue));
        }
        if let Some(wrap) = self.hue_wrap {
            if wrap.0 > wrap.1 || wrap.1 > MAX_HUE {
                return Err(malformed("hue_wrap", wrap));
            }
            if wrap.0 <= self.hue.1 {
                return Err(ConfigError::InvalidWrapHue {
                    label: self.label.clone(),
                });
            }
        }
        if self.saturation.0 > self.saturation.1 {
            return Err(malformed("saturation", self.saturation));
        }
        if self.value.0 > self.value.1 {
            return Err(malformed("value", self.value));
        }
        Ok(())
    }
}

/// Jersey colours commonly seen on broadcast footage, in match order.
pub fn default_buckets() -> Vec<HsvBucket> {
    vec![
        HsvBucket::new("Red", ChannelRange(0, 10), ChannelRange(100, 255), ChannelRange(70, 255))
            .with_hue_wrap(ChannelRange(170, MAX_HUE)),
        HsvBucket::new("Blue", ChannelRange(90, 130), ChannelRange(80, 255), ChannelRange(50, 255)),
        HsvBucket::new("Yellow", ChannelRange(20, 35), ChannelRange(100, 255), ChannelRange(100, 255)),
        HsvBucket::new("Green", ChannelRange(36, 85), ChannelRange(80, 255), ChannelRange(50, 255)),
        HsvBucket::new("White", ChannelRange(0, MAX_HUE), ChannelRange(0, 40), ChannelRange(180, 255)),
        HsvBucket::new("Black", ChannelRange(0, MAX_HUE), ChannelRange::FULL, ChannelRange(0, 50)),
    ]
}

/// Ordered bucket list; the first match wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketTable {
    buckets: Vec<HsvBucket>,
}

impl BucketTable {
    pub fn new(buckets: Vec<HsvBucket>) -> Result<Self, ConfigError> {
        if buckets.is_empty() {
            return Err(ConfigError::EmptyBucketTable);
        }
        let reserved = [TeamLabel::Unknown.to_string(), TeamLabel::Unassigned.to_string()];
        let mut labels = HashSet::new();
        for bucket in &buckets {
            if bucket.label.trim().is_empty() || reserved.contains(&bucket.label) {
                return Err(ConfigError::ReservedBucketLabel(bucket.label.clone()));
            }
            if !labels.insert(bucket.label.as_str()) {
                return Err(ConfigError::DuplicateBucketLabel(bucket.label.clone()));
            }
            bucket.validate()?;
        }
        Ok(Self { buckets })
    }

    pub fn buckets(&self) -> &[HsvBucket] {
        &self.buckets
    }

    pub fn classify(&self, hsv: Hsv) -> TeamLabel {
        self.buckets
            .iter()
            .find(|b| b.matches(hsv))
            .map_or(TeamLabel::Unknown, |b| TeamLabel::Team(b.label.clone()))
    }
}

impl Default for BucketTable {
    fn default() -> Self {
        Self {
            buckets: default_buckets(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn team(name: &str) -> TeamLabel {
        TeamLabel::Team(name.to_string())
    }

    #[test]
    fn test_hue_wraparound() {
        let table = BucketTable::default();
        assert_eq!(table.classify(Hsv::new(2, 200, 200)), team("Red"));
        assert_eq!(table.classify(Hsv::new(178, 200, 200)), team("Red"));
        assert_eq!(table.classify(Hsv::new(150, 200, 200)), TeamLabel::Unknown);
    }

    #[test]
    fn test_first_match_wins() {
        let table = BucketTable::new(vec![
            HsvBucket::new("Home", ChannelRange(100, 120), ChannelRange::FULL, ChannelRange::FULL),
            HsvBucket::new("Away", ChannelRange(0, MAX_HUE), ChannelRange::FULL, ChannelRange::FULL),
        ])
        .unwrap();
        assert_eq!(table.classify(Hsv::new(110, 10, 10)), team("Home"));
        assert_eq!(table.classify(Hsv::new(10, 10, 10)), team("Away"));
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let table = BucketTable::default();
        assert_eq!(table.classify(Hsv::new(90, 80, 50)), team("Blue"));
        assert_eq!(table.classify(Hsv::new(0, 40, 180)), team("White"));
        assert_eq!(table.classify(Hsv::new(0, 41, 180)), TeamLabel::Unknown);
    }

    #[test]
    fn test_malformed_tables_rejected() {
        assert!(matches!(BucketTable::new(vec![]), Err(ConfigError::EmptyBucketTable)));

        let inverted = HsvBucket::new("X", ChannelRange(50, 10), ChannelRange::FULL, ChannelRange::FULL);
        assert!(matches!(
            BucketTable::new(vec![inverted]),
            Err(ConfigError::InvalidHsvRange { channel: "hue", .. })
        ));

        let off_scale = HsvBucket::new("X", ChannelRange(0, 200), ChannelRange::FULL, ChannelRange::FULL);
        assert!(BucketTable::new(vec![off_scale]).is_err());

        let bad_wrap = HsvBucket::new("X", ChannelRange(0, 10), ChannelRange::FULL, ChannelRange::FULL)
            .with_hue_wrap(ChannelRange(5, 179));
        assert!(matches!(
            BucketTable::new(vec![bad_wrap]),
            Err(ConfigError::InvalidWrapHue { .. })
        ));

        let a = HsvBucket::new("Dup", ChannelRange(0, 10), ChannelRange::FULL, ChannelRange::FULL);
        assert!(matches!(
            BucketTable::new(vec![a.clone(), a]),
            Err(ConfigError::DuplicateBucketLabel(_))
        ));

        let reserved = HsvBucket::new("Unknown", ChannelRange(0, 10), ChannelRange::FULL, ChannelRange::FULL);
        assert!(matches!(
            BucketTable::new(vec![reserved]),
            Err(ConfigError::ReservedBucketLabel(_))
        ));
    }

    #[test]
    fn test_default_table_is_valid() {
        assert!(BucketTable::new(default_buckets()).is_ok());
    }

    #[test]
    fn test_bucket_deserializes_from_json() {
        let json = r#"{"label": "Red", "hue": [0, 10], "hue_wrap": [170, 179],
                       "saturation": [100, 255], "value": [70, 255]}"#;
        let bucket: HsvBucket = serde_json::from_str(json).unwrap();
        assert_eq!(bucket, default_buckets()[0]);
    }
}
