use image::RgbImage;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::tracker::Rect;

/// Fractions of the box sampled for jersey colour.
///
/// The defaults skip the head and legs vertically and the arms horizontally.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoiFractions {
    pub top: f32,
    pub bottom: f32,
    pub left: f32,
    pub right: f32,
}

impl Default for RoiFractions {
    fn default() -> Self {
        Self {
            top: 0.15,
            bottom: 0.60,
            left: 0.25,
            right: 0.75,
        }
    }
}

impl RoiFractions {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (axis, low, high) in [
            ("vertical", self.top, self.bottom),
            ("horizontal", self.left, self.right),
        ] {
            let ordered = (0.0..=1.0).contains(&low) && (0.0..=1.0).contains(&high) && low < high;
            if !ordered {
                return Err(ConfigError::InvalidRoiFraction { axis, low, high });
            }
        }
        Ok(())
    }
}

/// Integer pixel rectangle inside a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRegion {
    pub fn is_at_least(&self, min_px: u32) -> bool {
        self.width >= min_px && self.height >= min_px
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// Torso band of `bbox`, clipped to a `frame_width` x `frame_height` frame.
pub fn extract_roi(bbox: &Rect, fractions: &RoiFractions, frame_width: u32, frame_height: u32) -> PixelRegion {
    let band = bbox.fractional(fractions.left, fractions.top, fractions.right, fractions.bottom);
    let [x1, y1, x2, y2] = band.to_tlbr();

    let clip = |v: f32, limit: u32| v.clamp(0.0, limit as f32) as u32;
    let (x1, x2) = (clip(x1, frame_width), clip(x2, frame_width));
    let (y1, y2) = (clip(y1, frame_height), clip(y2, frame_height));

    PixelRegion {
        x: x1,
        y: y1,
        width: x2.saturating_sub(x1),
        height: y2.saturating_sub(y1),
    }
}

/// RGB values of every pixel in `region`, one row per pixel.
pub fn roi_samples(frame: &RgbImage, region: &PixelRegion) -> Array2<f32> {
    let mut samples = Array2::zeros((region.pixel_count(), 3));
    let mut row = 0;
    for y in region.y..region.y + region.height {
        for x in region.x..region.x + region.width {
            let pixel = frame.get_pixel(x, y);
            for c in 0..3 {
                samples[[row, c]] = pixel.0[c] as f32;
            }
            row += 1;
        }
    }
    samples
}
