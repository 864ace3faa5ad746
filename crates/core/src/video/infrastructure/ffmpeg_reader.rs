use std::path::Path;

use crate::shared::constants::OUTPUT_CODEC_FOURCC;
use crate::shared::error::BoxError;
use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_reader::VideoReader;

use super::codec_status::is_drained;

/// Probes and decodes video via ffmpeg-next (libavformat + libavcodec).
///
/// Converts each decoded frame to RGB24 and wraps it in a [`Frame`].
pub struct FfmpegReader {
    input_ctx: Option<ffmpeg_next::format::context::Input>,
    video_stream_index: usize,
}

// Safety: FfmpegReader is only used from a single thread at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for FfmpegReader {}

impl FfmpegReader {
    pub fn new() -> Self {
        Self {
            input_ctx: None,
            video_stream_index: 0,
        }
    }

    /// Reads metadata and releases the input immediately.
    pub fn probe(path: &Path) -> Result<VideoMetadata, BoxError> {
        let mut reader = Self::new();
        let metadata = reader.open(path);
        reader.close();
        metadata
    }

    fn frame_iter(&mut self) -> Result<FfmpegFrameIter<'_>, BoxError> {
        let ictx = self.input_ctx.as_mut().ok_or("FfmpegReader: not opened")?;

        let stream = ictx
            .stream(self.video_stream_index)
            .ok_or("FfmpegReader: video stream disappeared")?;
        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?;
        let decoder = codec_ctx.decoder().video()?;

        let width = decoder.width();
        let height = decoder.height();

        let scaler = ffmpeg_next::software::scaling::Context::get(
            decoder.format(),
            width,
            height,
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )?;

        Ok(FfmpegFrameIter {
            ictx,
            decoder,
            scaler,
            width,
            height,
            video_stream_index: self.video_stream_index,
            frame_index: 0,
            flushing: false,
            done: false,
        })
    }
}

impl Default for FfmpegReader {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoReader for FfmpegReader {
    fn open(&mut self, path: &Path) -> Result<VideoMetadata, BoxError> {
        ffmpeg_next::init()?;

        let ictx = ffmpeg_next::format::input(path)?;

        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or("No video stream found")?;

        let video_stream_index = stream.index();
        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?;
        let decoder = codec_ctx.decoder().video()?;

        let fps = frame_rate(&stream).ok_or("Video stream has no usable frame rate")?;
        if decoder.width() == 0 || decoder.height() == 0 {
            return Err("Video stream has no frame dimensions".into());
        }

        let total_frames = match stream.frames() {
            n if n > 0 => n as usize,
            _ => count_video_packets(path, video_stream_index)?,
        };

        let metadata = VideoMetadata {
            width: decoder.width(),
            height: decoder.height(),
            fps,
            total_frames,
            codec: OUTPUT_CODEC_FOURCC.to_string(),
            source_codec: decoder
                .codec()
                .map(|c| c.name().to_string())
                .unwrap_or_default(),
            source_path: Some(path.to_path_buf()),
        };

        log::debug!(
            "Probed {}: {}x{} @ {:.2} fps, {} frames ({})",
            path.display(),
            metadata.width,
            metadata.height,
            metadata.fps,
            metadata.total_frames,
            metadata.source_codec
        );

        self.video_stream_index = video_stream_index;
        self.input_ctx = Some(ictx);

        Ok(metadata)
    }

    fn frames(&mut self) -> Box<dyn Iterator<Item = Result<Frame, BoxError>> + '_> {
        match self.frame_iter() {
            Ok(iter) => Box::new(iter),
            Err(e) => Box::new(std::iter::once(Err(e))),
        }
    }

    fn close(&mut self) {
        self.input_ctx = None;
    }
}

/// Lazy iterator that decodes video frames one at a time, avoiding the need
/// to buffer the entire video in memory.
///
/// Fused: after the end of the stream or the first error it only yields
/// `None`.
struct FfmpegFrameIter<'a> {
    ictx: &'a mut ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: ffmpeg_next::software::scaling::Context,
    width: u32,
    height: u32,
    video_stream_index: usize,
    frame_index: usize,
    flushing: bool,
    done: bool,
}

impl FfmpegFrameIter<'_> {
    fn try_receive(&mut self) -> Option<Result<Frame, BoxError>> {
        let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
        match self.decoder.receive_frame(&mut decoded) {
            Ok(()) => {}
            Err(e) if is_drained(&e) => return None,
            Err(e) => {
                self.done = true;
                return Some(Err(
                    format!("decode failed at frame {}: {e}", self.frame_index).into()
                ));
            }
        }

        let mut rgb_frame = ffmpeg_next::util::frame::video::Video::empty();
        if let Err(e) = self.scaler.run(&decoded, &mut rgb_frame) {
            self.done = true;
            return Some(Err(Box::new(e)));
        }

        let pixels = extract_rgb_pixels(&rgb_frame, self.width, self.height);
        let frame = Frame::new(pixels, self.width, self.height, 3, self.frame_index);
        self.frame_index += 1;
        Some(Ok(frame))
    }
}

impl Iterator for FfmpegFrameIter<'_> {
    type Item = Result<Frame, BoxError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        if let Some(result) = self.try_receive() {
            return Some(result);
        }

        if self.flushing {
            self.done = true;
            return None;
        }

        loop {
            let Some((stream, packet)) = self.ictx.packets().next() else {
                if let Err(e) = self.decoder.send_eof() {
                    self.done = true;
                    return Some(Err(Box::new(e)));
                }
                self.flushing = true;
                if let Some(result) = self.try_receive() {
                    return Some(result);
                }
                self.done = true;
                return None;
            };

            if stream.index() != self.video_stream_index {
                continue;
            }

            if let Err(e) = self.decoder.send_packet(&packet) {
                self.done = true;
                return Some(Err(format!(
                    "decode failed after frame {}: {e}",
                    self.frame_index
                )
                .into()));
            }

            if let Some(result) = self.try_receive() {
                return Some(result);
            }
        }
    }
}

impl std::iter::FusedIterator for FfmpegFrameIter<'_> {}

/// Average frame rate of the stream, falling back to the base rate.
fn frame_rate(stream: &ffmpeg_next::format::stream::Stream) -> Option<f64> {
    [stream.avg_frame_rate(), stream.rate()]
        .into_iter()
        .filter(|rate| rate.numerator() > 0 && rate.denominator() > 0)
        .map(|rate| rate.numerator() as f64 / rate.denominator() as f64)
        .next()
}

/// Counts the packets of one stream with a demux-only pass.
///
/// Used when the container header carries no frame count; every video
/// packet holds exactly one frame for the codecs FFmpeg demuxes here.
fn count_video_packets(path: &Path, stream_index: usize) -> Result<usize, BoxError> {
    let mut ictx = ffmpeg_next::format::input(path)?;
    Ok(ictx
        .packets()
        .filter(|(stream, _)| stream.index() == stream_index)
        .count())
}

/// Copies pixel data from an ffmpeg frame into a contiguous RGB buffer.
///
/// ffmpeg frames may have padding bytes at the end of each row (stride > width*3).
/// This function strips that padding to produce a tightly-packed pixel buffer.
fn extract_rgb_pixels(
    rgb_frame: &ffmpeg_next::util::frame::video::Video,
    width: u32,
    height: u32,
) -> Vec<u8> {
    let stride = rgb_frame.stride(0);
    let data = rgb_frame.data(0);
    let w = width as usize;
    let h = height as usize;

    let mut pixels = Vec::with_capacity(w * h * 3);
    for row in 0..h {
        let row_start = row * stride;
        pixels.extend_from_slice(&data[row_start..row_start + w * 3]);
    }
    pixels
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::infrastructure::test_video::create_test_video;
    use rstest::rstest;
    use std::path::PathBuf;

    fn test_video_path(dir: &Path) -> PathBuf {
        dir.join("test.mp4")
    }

    #[test]
    fn test_open_returns_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = test_video_path(dir.path());
        create_test_video(&path, 5, 160, 120, 30.0);

        let mut reader = FfmpegReader::new();
        let meta = reader.open(&path).unwrap();
        assert_eq!(meta.width, 160);
        assert_eq!(meta.height, 120);
        assert!((meta.fps - 30.0).abs() < 0.5);
        assert_eq!(meta.codec, "XVID");
        assert_eq!(meta.source_codec, "mpeg4");
        assert_eq!(meta.source_path, Some(path));
    }

    #[test]
    fn test_open_nonexistent_returns_error() {
        let mut reader = FfmpegReader::new();
        assert!(reader.open(Path::new("/nonexistent/test.mp4")).is_err());
    }

    #[test]
    fn test_open_garbage_file_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.mp4");
        std::fs::write(&path, b"this is not a video container").unwrap();

        assert!(FfmpegReader::probe(&path).is_err());
    }

    #[rstest]
    #[case::mp4("clip.mp4", 5)]
    #[case::avi("clip.avi", 7)]
    fn test_probed_count_matches_decoded_count(#[case] name: &str, #[case] num_frames: usize) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(name);
        create_test_video(&path, num_frames, 160, 120, 30.0);

        let meta = FfmpegReader::probe(&path).unwrap();
        assert_eq!(meta.total_frames, num_frames);

        let mut reader = FfmpegReader::new();
        reader.open(&path).unwrap();
        let decoded = reader.frames().filter(|f| f.is_ok()).count();
        assert_eq!(decoded, meta.total_frames);
    }

    #[test]
    fn test_count_video_packets_matches_frames() {
        let dir = tempfile::tempdir().unwrap();
        let path = test_video_path(dir.path());
        create_test_video(&path, 6, 160, 120, 30.0);

        assert_eq!(count_video_packets(&path, 0).unwrap(), 6);
    }

    #[test]
    fn test_frames_have_sequential_indices() {
        let dir = tempfile::tempdir().unwrap();
        let path = test_video_path(dir.path());
        create_test_video(&path, 5, 160, 120, 30.0);

        let mut reader = FfmpegReader::new();
        reader.open(&path).unwrap();

        let frames: Vec<_> = reader.frames().map(|f| f.unwrap()).collect();
        for (i, frame) in frames.iter().enumerate() {
            assert_eq!(frame.index(), i);
        }
    }

    #[test]
    fn test_frames_are_3_channel() {
        let dir = tempfile::tempdir().unwrap();
        let path = test_video_path(dir.path());
        create_test_video(&path, 2, 160, 120, 30.0);

        let mut reader = FfmpegReader::new();
        reader.open(&path).unwrap();

        let frame = reader.frames().next().unwrap().unwrap();
        assert_eq!(frame.channels(), 3);
        assert_eq!(frame.data().len(), 160 * 120 * 3);
    }

    #[test]
    fn test_frames_end_with_none_and_stay_ended() {
        let dir = tempfile::tempdir().unwrap();
        let path = test_video_path(dir.path());
        create_test_video(&path, 2, 160, 120, 30.0);

        let mut reader = FfmpegReader::new();
        reader.open(&path).unwrap();

        let mut frames = reader.frames();
        assert!(frames.next().is_some());
        assert!(frames.next().is_some());
        assert!(frames.next().is_none());
        assert!(frames.next().is_none());
    }

    #[test]
    fn test_frames_without_open_returns_error() {
        let mut reader = FfmpegReader::new();
        let result = reader.frames().next().unwrap();
        assert!(result.is_err());
    }

    #[test]
    fn test_close_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = test_video_path(dir.path());
        create_test_video(&path, 1, 160, 120, 30.0);

        let mut reader = FfmpegReader::new();
        reader.open(&path).unwrap();
        reader.close();
        reader.close();
        assert!(reader.frames().next().unwrap().is_err());
    }
}
