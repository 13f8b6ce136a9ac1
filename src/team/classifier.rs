use image::RgbImage;
use ndarray::ArrayView2;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::team::buckets::{BucketTable, HsvBucket, default_buckets};
use crate::team::cluster::{KMeansParams, kmeans, mean_color};
use crate::team::color::Hsv;
use crate::team::roi::{RoiFractions, extract_roi, roi_samples};
use crate::tracker::{Rect, TeamLabel, UnknownPolicy};

/// Appearance sampling and bucket configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamConfig {
    pub roi: RoiFractions,
    /// Minimum clipped ROI width and height in pixels
    pub min_roi_px: u32,
    pub kmeans: KMeansParams,
    /// Seed of the k-means initialisation; each sample restarts from it
    pub seed: u64,
    pub unknown_policy: UnknownPolicy,
    pub buckets: Vec<HsvBucket>,
}

impl Default for TeamConfig {
    fn default() -> Self {
        Self {
            roi: RoiFractions::default(),
            min_roi_px: 5,
            kmeans: KMeansParams::default(),
            seed: 0,
            unknown_policy: UnknownPolicy::default(),
            buckets: default_buckets(),
        }
    }
}

impl TeamConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.roi.validate()?;
        if self.min_roi_px == 0 {
            return Err(ConfigError::NonPositive { name: "team.min_roi_px" });
        }
        if self.kmeans.clusters == 0 {
            return Err(ConfigError::NonPositive {
                name: "team.kmeans.clusters",
            });
        }
        BucketTable::new(self.buckets.clone()).map(|_| ())
    }
}

/// Rule-based jersey colour classifier.
#[derive(Debug, Clone)]
pub struct TeamClassifier {
    roi: RoiFractions,
    min_roi_px: u32,
    kmeans: KMeansParams,
    seed: u64,
    table: BucketTable,
}

impl TeamClassifier {
    pub fn new(config: &TeamConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            roi: config.roi,
            min_roi_px: config.min_roi_px,
            kmeans: config.kmeans,
            seed: config.seed,
            table: BucketTable::new(config.buckets.clone())?,
        })
    }

    pub fn table(&self) -> &BucketTable {
        &self.table
    }

    /// Representative colour of the torso band, or `None` if the band is too small.
    pub fn sample(&self, frame: &RgbImage, bbox: &Rect) -> Option<[f32; 3]> {
        let region = extract_roi(bbox, &self.roi, frame.width(), frame.height());
        if !region.is_at_least(self.min_roi_px) {
            trace!(?region, "ROI below minimum size, deferring");
            return None;
        }
        let samples = roi_samples(frame, &region);
        self.dominant_color(samples.view())
    }

    /// Dominant colour by k-means, falling back to the mean if clustering fails.
    pub fn dominant_color(&self, samples: ArrayView2<f32>) -> Option<[f32; 3]> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        match kmeans(samples, &self.kmeans, &mut rng) {
            Ok(clustering) => {
                let c = clustering.dominant();
                Some([c[0], c[1], c[2]])
            }
            Err(err) => {
                debug!(%err, "clustering failed, using mean colour");
                mean_color(samples)
            }
        }
    }

    /// Classify the jersey inside `bbox`.
    ///
    /// `None` means the ROI was degenerate and the track should be retried on a
    /// later frame; otherwise the first matching bucket or `Unknown`.
    pub fn classify(&self, frame: &RgbImage, bbox: &Rect) -> Option<TeamLabel> {
        let color = self.sample(frame, bbox)?;
        let hsv = Hsv::from_rgb(color);
        let label = self.table.classify(hsv);
        trace!(?hsv, %label, "classified jersey colour");
        Some(label)
    }
}
