use std::path::PathBuf;

/// Format parameters captured once per run by probing the input video.
///
/// `codec` is the codec the output is re-encoded with, not the input's;
/// the input decoder name is kept in `source_codec` for reporting.
#[derive(Clone, Debug, PartialEq)]
pub struct VideoMetadata {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub total_frames: usize,
    pub codec: String,
    pub source_codec: String,
    pub source_path: Option<PathBuf>,
}

impl VideoMetadata {
    /// Frame dimensions as `(width, height)`.
    pub fn frame_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construction() {
        let meta = VideoMetadata {
            width: 640,
            height: 480,
            fps: 30.0,
            total_frames: 10,
            codec: "XVID".to_string(),
            source_codec: "h264".to_string(),
            source_path: Some(PathBuf::from("/tmp/input.mp4")),
        };
        assert_eq!(meta.frame_size(), (640, 480));
        assert_eq!(meta.fps, 30.0);
        assert_eq!(meta.total_frames, 10);
        assert_eq!(meta.codec, "XVID");
        assert_eq!(meta.source_codec, "h264");
    }

    #[test]
    fn test_clone_is_equal() {
        let meta = VideoMetadata {
            width: 160,
            height: 120,
            fps: 25.0,
            total_frames: 0,
            codec: "XVID".to_string(),
            source_codec: "mpeg4".to_string(),
            source_path: None,
        };
        assert_eq!(meta.clone(), meta);
    }
}
