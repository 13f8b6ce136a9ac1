use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box in pixel coordinates.
///
/// Stored as top-left corner plus size; detections arrive as corners
/// `(x1, y1, x2, y2)` and are converted with [`Rect::from_tlbr`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    /// Top-left x coordinate
    pub x: f32,
    /// Top-left y coordinate
    pub y: f32,
    /// Width of the bounding box
    pub width: f32,
    /// Height of the bounding box
    pub height: f32,
}

impl Rect {
    /// Create a new Rect from top-left coordinates and dimensions (TLWH format).
    #[inline]
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Create a Rect from TLBR format (top-left x, top-left y, bottom-right x, bottom-right y).
    #[inline]
    pub fn from_tlbr(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            x: x1,
            y: y1,
            width: x2 - x1,
            height: y2 - y1,
        }
    }

    /// Convert to TLBR format: (x1, y1, x2, y2).
    #[inline]
    pub fn to_tlbr(&self) -> [f32; 4] {
        [self.x, self.y, self.x + self.width, self.y + self.height]
    }

    /// True when `x2 > x1` and `y2 > y1` and every coordinate is finite.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.x.is_finite()
            && self.y.is_finite()
            && self.width.is_finite()
            && self.height.is_finite()
            && self.width > 0.0
            && self.height > 0.0
    }

    /// Bottom-centre point, i.e. where a player's feet touch the pitch.
    #[inline]
    pub fn bottom_center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height)
    }

    /// Sub-rectangle spanning the given fractions of this box.
    ///
    /// `left`/`right` are fractions of the width, `top`/`bottom` of the height,
    /// all measured from the top-left corner.
    pub fn fractional(&self, left: f32, top: f32, right: f32, bottom: f32) -> Rect {
        Rect::from_tlbr(
            self.x + left * self.width,
            self.y + top * self.height,
            self.x + right * self.width,
            self.y + bottom * self.height,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_tlbr() {
        let rect = Rect::from_tlbr(10.0, 20.0, 40.0, 60.0);
        assert_eq!(rect, Rect::new(10.0, 20.0, 30.0, 40.0));
        assert_eq!(rect.to_tlbr(), [10.0, 20.0, 40.0, 60.0]);
    }

    #[test]
    fn test_bottom_center() {
        let rect = Rect::from_tlbr(100.0, 50.0, 140.0, 150.0);
        assert_eq!(rect.bottom_center(), (120.0, 150.0));
    }

    #[test]
    fn test_validity() {
        assert!(Rect::from_tlbr(0.0, 0.0, 1.0, 1.0).is_valid());
        assert!(!Rect::from_tlbr(5.0, 0.0, 5.0, 10.0).is_valid());
        assert!(!Rect::from_tlbr(0.0, 10.0, 10.0, 2.0).is_valid());
        assert!(!Rect::new(f32::NAN, 0.0, 1.0, 1.0).is_valid());
    }

    #[test]
    fn test_fractional() {
        let rect = Rect::new(0.0, 0.0, 40.0, 100.0);
        let band = rect.fractional(0.25, 0.15, 0.75, 0.60);
        assert!((band.x - 10.0).abs() < 1e-5);
        assert!((band.y - 15.0).abs() < 1e-5);
        assert!((band.width - 20.0).abs() < 1e-5);
        assert!((band.height - 45.0).abs() < 1e-5);
    }
}
