/// 8-bit HSV with OpenCV's scale: hue in `0..=179`, saturation and value in `0..=255`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hsv {
    pub h: u8,
    pub s: u8,
    pub v: u8,
}

impl Hsv {
    pub fn new(h: u8, s: u8, v: u8) -> Self {
        Self { h, s, v }
    }

    /// Convert an RGB colour with channels in `0.0..=255.0`.
    pub fn from_rgb(rgb: [f32; 3]) -> Self {
        let [r, g, b] = rgb.map(|c| c.clamp(0.0, 255.0));
        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let delta = max - min;

        let s = if max > 0.0 { 255.0 * delta / max } else { 0.0 };

        let mut hue = if delta == 0.0 {
            0.0
        } else if max == r {
            60.0 * (g - b) / delta
        } else if max == g {
            120.0 + 60.0 * (b - r) / delta
        } else {
            240.0 + 60.0 * (r - g) / delta
        };
        if hue < 0.0 {
            hue += 360.0;
        }

        // Half-degree steps so hue fits a byte; 180 wraps to 0.
        let h = (hue / 2.0).round() as u32 % 180;

        Self {
            h: h as u8,
            s: s.round() as u8,
            v: max.round() as u8,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primaries() {
        assert_eq!(Hsv::from_rgb([255.0, 0.0, 0.0]), Hsv::new(0, 255, 255));
        assert_eq!(Hsv::from_rgb([0.0, 255.0, 0.0]), Hsv::new(60, 255, 255));
        assert_eq!(Hsv::from_rgb([0.0, 0.0, 255.0]), Hsv::new(120, 255, 255));
    }

    #[test]
    fn test_greys_have_no_saturation() {
        assert_eq!(Hsv::from_rgb([0.0, 0.0, 0.0]), Hsv::new(0, 0, 0));
        assert_eq!(Hsv::from_rgb([200.0, 200.0, 200.0]), Hsv::new(0, 0, 200));
    }

    #[test]
    fn test_reds_either_side_of_zero() {
        assert_eq!(Hsv::from_rgb([255.0, 17.0, 0.0]).h, 2);
        assert_eq!(Hsv::from_rgb([255.0, 0.0, 17.0]).h, 178);
    }

    #[test]
    fn test_near_full_circle_wraps() {
        // 359.8 degrees rounds to 180 half-degrees, which is hue 0
        assert_eq!(Hsv::from_rgb([255.0, 0.0, 0.8]).h, 0);
    }
}
