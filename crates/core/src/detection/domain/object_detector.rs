use crate::shared::error::BoxError;
use crate::shared::frame::Frame;

use super::class_labels::ClassLabels;
use super::detection::Detection;

/// Domain interface for object detection on a single frame.
///
/// Returned detections are already restricted to the detector's target
/// classes and confidence threshold.
pub trait ObjectDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, BoxError>;

    /// Names for the class ids this detector emits.
    fn labels(&self) -> &ClassLabels;
}

/// Builds a detector on demand, so the model is only loaded once a run
/// has passed validation and probing.
pub trait DetectorLoader {
    fn load(&self) -> Result<Box<dyn ObjectDetector>, BoxError>;

    /// Path or name of the weights, for error reporting.
    fn model_path(&self) -> &std::path::Path;
}
