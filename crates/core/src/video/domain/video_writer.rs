use std::path::Path;

use crate::shared::error::BoxError;
use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;

/// Append-only output video stream.
///
/// `close` must run exactly once per successful `open`, on every exit
/// path, or the container is left without a trailer.
pub trait VideoWriter: Send {
    fn open(&mut self, path: &Path, metadata: &VideoMetadata) -> Result<(), BoxError>;

    /// Appends one frame; dimensions must match the opened metadata.
    fn write(&mut self, frame: &Frame) -> Result<(), BoxError>;

    /// Flushes buffered packets and finalizes the container.
    fn close(&mut self) -> Result<(), BoxError>;
}
