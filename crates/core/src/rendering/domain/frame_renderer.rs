use crate::detection::domain::class_labels::ClassLabels;
use crate::detection::domain::detection::DetectionResult;
use crate::shared::error::BoxError;
use crate::shared::frame::Frame;

/// Domain interface for drawing detections onto a frame.
///
/// Rendering is pure: the source frame is left untouched and a new frame
/// with the same dimensions and index is returned.
pub trait FrameRenderer: Send {
    fn render(&self, result: &DetectionResult, labels: &ClassLabels) -> Result<Frame, BoxError>;
}
