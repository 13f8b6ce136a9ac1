use crate::tracker::rect::Rect;

/// One detected object in one frame, as handed over by the upstream tracker.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// Identity assigned by the upstream tracker
    pub track_id: u64,
    /// Index into the detector's class vocabulary
    pub class_id: u32,
    /// Detection confidence in [0, 1]
    pub confidence: f32,
    /// Bounding box of the object in the current frame
    pub bbox: Rect,
}

impl Detection {
    pub fn new(track_id: u64, class_id: u32, confidence: f32, x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            track_id,
            class_id,
            confidence,
            bbox: Rect::from_tlbr(x1, y1, x2, y2),
        }
    }

    /// Point fed to the Kalman filter: bottom-centre of the box.
    pub fn measurement(&self) -> [f64; 2] {
        let (x, y) = self.bbox.bottom_center();
        [x as f64, y as f64]
    }
}
