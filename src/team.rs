//! Jersey-colour team classification.
//!
//! A torso band of the player's box is sampled, reduced to one dominant
//! colour, converted to HSV and matched against an ordered bucket table.

mod buckets;
mod classifier;
mod cluster;
mod color;
mod roi;

pub use buckets::{BucketTable, ChannelRange, HsvBucket, default_buckets};
pub use classifier::{TeamClassifier, TeamConfig};
pub use cluster::{Clustering, KMeansParams, kmeans, mean_color};
pub use color::Hsv;
pub use roi::{PixelRegion, RoiFractions, extract_roi, roi_samples};
