//! Builder for creating Detection objects from various input formats.

use crate::tracker::Detection;

/// Builder for creating `Detection` objects from various input formats.
#[derive(Debug, Clone, Default)]
pub struct DetectionBuilder {
    track_id: u64,
    class_id: u32,
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
    confidence: f32,
}

impl DetectionBuilder {
    /// Create a new detection builder.
    pub fn new(track_id: u64) -> Self {
        Self {
            track_id,
            ..Self::default()
        }
    }

    pub fn class_id(mut self, class_id: u32) -> Self {
        self.class_id = class_id;
        self
    }

    /// Set bounding box in TLBR format (x1, y1, x2, y2).
    pub fn tlbr(mut self, x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        self.x1 = x1;
        self.y1 = y1;
        self.x2 = x2;
        self.y2 = y2;
        self
    }

    /// Set bounding box in XYWH format (center_x, center_y, width, height).
    pub fn xywh(mut self, cx: f32, cy: f32, w: f32, h: f32) -> Self {
        self.x1 = cx - w / 2.0;
        self.y1 = cy - h / 2.0;
        self.x2 = cx + w / 2.0;
        self.y2 = cy + h / 2.0;
        self
    }

    /// Set bounding box in TLWH format (left, top, width, height).
    pub fn tlwh(mut self, x: f32, y: f32, w: f32, h: f32) -> Self {
        self.x1 = x;
        self.y1 = y;
        self.x2 = x + w;
        self.y2 = y + h;
        self
    }

    /// Set the confidence score.
    pub fn confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence;
        self
    }

    /// Build the final `Detection`.
    pub fn build(self) -> Detection {
        Detection::new(
            self.track_id,
            self.class_id,
            self.confidence,
            self.x1,
            self.y1,
            self.x2,
            self.y2,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::Rect;

    #[test]
    fn test_detection_builder() {
        let det = DetectionBuilder::new(7)
            .class_id(2)
            .tlbr(10.0, 20.0, 50.0, 80.0)
            .confidence(0.95)
            .build();

        assert_eq!(det.track_id, 7);
        assert_eq!(det.class_id, 2);
        assert_eq!(det.confidence, 0.95);
        assert_eq!(det.bbox, Rect::new(10.0, 20.0, 40.0, 60.0));
    }

    #[test]
    fn test_box_formats_agree() {
        let a = DetectionBuilder::new(1).tlwh(10.0, 20.0, 40.0, 60.0).build();
        let b = DetectionBuilder::new(1).xywh(30.0, 50.0, 40.0, 60.0).build();
        assert_eq!(a.bbox, b.bbox);
    }
}
