use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

/// One object found in a frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    pub class_id: usize,
    pub confidence: f64,
    pub bbox: BoundingBox,
}

/// A decoded frame together with the detections kept for it.
///
/// Produced once per source frame, in source order, and consumed by the
/// renderer right away.
#[derive(Clone, Debug)]
pub struct DetectionResult {
    pub frame: Frame,
    pub detections: Vec<Detection>,
}

impl DetectionResult {
    pub fn new(frame: Frame, detections: Vec<Detection>) -> Self {
        Self { frame, detections }
    }

    pub fn frame_index(&self) -> usize {
        self.frame.index()
    }
}
