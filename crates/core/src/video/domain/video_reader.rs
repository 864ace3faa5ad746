use std::path::Path;

use crate::shared::error::BoxError;
use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;

/// Reads frames from a video source.
///
/// Implementations handle I/O details (codec, container format, etc.)
/// while the pipeline works with the abstract `Frame` and `VideoMetadata`
/// types.
pub trait VideoReader: Send {
    /// Opens a video file and returns its probed metadata.
    fn open(&mut self, path: &Path) -> Result<VideoMetadata, BoxError>;

    /// Returns an iterator over frames in decode order.
    ///
    /// The sequence is not restartable; reopen the reader to decode again.
    fn frames(&mut self) -> Box<dyn Iterator<Item = Result<Frame, BoxError>> + '_>;

    /// Releases any resources held by the reader.
    fn close(&mut self);
}
