use std::path::Path;

use crate::shared::error::BoxError;
use crate::shared::frame::Frame;
use crate::shared::output_format::validate_output_path;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_writer::VideoWriter;

use super::codec_status::is_drained;

/// Frame rate used when the probed rate is not positive.
const FALLBACK_FPS: i32 = 30;

/// MPEG-4 Part 2 caps the time base denominator at 16 bits.
const MAX_TIME_BASE_DEN: i32 = 65535;

/// Encodes frames as MPEG-4 Part 2 (XVID tag) into an AVI container.
pub struct FfmpegWriter {
    octx: Option<ffmpeg_next::format::context::Output>,
    encoder: Option<ffmpeg_next::codec::encoder::video::Encoder>,
    scaler: Option<ffmpeg_next::software::scaling::Context>,
    width: u32,
    height: u32,
    time_base: ffmpeg_next::Rational,
    frame_count: usize,
}

// Safety: FfmpegWriter is only used from a single thread at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for FfmpegWriter {}

impl FfmpegWriter {
    pub fn new() -> Self {
        Self {
            octx: None,
            encoder: None,
            scaler: None,
            width: 0,
            height: 0,
            time_base: ffmpeg_next::Rational(1, FALLBACK_FPS),
            frame_count: 0,
        }
    }

    /// Number of frames appended since the last `open`.
    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    fn drain_packets(&mut self) -> Result<(), BoxError> {
        let (Some(encoder), Some(octx)) = (self.encoder.as_mut(), self.octx.as_mut()) else {
            return Err("FfmpegWriter: not opened".into());
        };
        let ost_time_base = octx
            .stream(0)
            .ok_or("FfmpegWriter: output stream missing")?
            .time_base();

        let mut encoded = ffmpeg_next::Packet::empty();
        loop {
            match encoder.receive_packet(&mut encoded) {
                Ok(()) => {
                    encoded.set_stream(0);
                    encoded.rescale_ts(self.time_base, ost_time_base);
                    encoded.write_interleaved(octx)?;
                }
                Err(e) if is_drained(&e) => return Ok(()),
                Err(e) => return Err(format!("encode failed: {e}").into()),
            }
        }
    }

    /// Flushes the encoder and writes the container trailer.
    fn finish(&mut self) -> Result<(), BoxError> {
        self.encoder
            .as_mut()
            .ok_or("FfmpegWriter: not opened")?
            .send_eof()?;
        self.drain_packets()?;
        self.octx
            .as_mut()
            .ok_or("FfmpegWriter: not opened")?
            .write_trailer()?;
        Ok(())
    }
}

impl Default for FfmpegWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoWriter for FfmpegWriter {
    fn open(&mut self, path: &Path, metadata: &VideoMetadata) -> Result<(), BoxError> {
        validate_output_path(path)?;
        if self.encoder.is_some() {
            return Err("FfmpegWriter: already open".into());
        }

        ffmpeg_next::init()?;

        let mut octx = ffmpeg_next::format::output_as(path, "avi")?;

        let codec = ffmpeg_next::encoder::find(ffmpeg_next::codec::Id::MPEG4)
            .ok_or("MPEG4 encoder not found")?;

        let mut ost = octx.add_stream(Some(codec))?;

        let mut encoder_ctx = ffmpeg_next::codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()?;

        let frame_rate = encoder_frame_rate(metadata.fps);
        let time_base = frame_rate.invert();

        encoder_ctx.set_width(metadata.width);
        encoder_ctx.set_height(metadata.height);
        encoder_ctx.set_format(ffmpeg_next::format::Pixel::YUV420P);
        encoder_ctx.set_time_base(time_base);
        encoder_ctx.set_frame_rate(Some(frame_rate));

        let encoder = encoder_ctx.open_with(ffmpeg_next::Dictionary::new())?;
        ost.set_parameters(&encoder);
        ost.set_time_base(time_base);
        ost.set_avg_frame_rate(frame_rate);
        unsafe {
            (*ost.parameters().as_mut_ptr()).codec_tag = fourcc(&metadata.codec)?;
        }

        octx.write_header()?;

        let scaler = ffmpeg_next::software::scaling::Context::get(
            ffmpeg_next::format::Pixel::RGB24,
            metadata.width,
            metadata.height,
            ffmpeg_next::format::Pixel::YUV420P,
            metadata.width,
            metadata.height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )?;

        self.width = metadata.width;
        self.height = metadata.height;
        self.time_base = time_base;
        self.octx = Some(octx);
        self.encoder = Some(encoder);
        self.scaler = Some(scaler);
        self.frame_count = 0;

        log::debug!(
            "Opened {} for writing: {}x{} @ {}/{} fps ({})",
            path.display(),
            metadata.width,
            metadata.height,
            frame_rate.numerator(),
            frame_rate.denominator(),
            metadata.codec
        );

        Ok(())
    }

    fn write(&mut self, frame: &Frame) -> Result<(), BoxError> {
        let (Some(encoder), Some(scaler)) = (self.encoder.as_mut(), self.scaler.as_mut()) else {
            return Err("FfmpegWriter: not opened".into());
        };
        if frame.width() != self.width || frame.height() != self.height || frame.channels() != 3 {
            return Err(format!(
                "frame {} is {}x{}x{}, expected {}x{}x3",
                frame.index(),
                frame.width(),
                frame.height(),
                frame.channels(),
                self.width,
                self.height
            )
            .into());
        }

        let mut rgb_frame = ffmpeg_next::util::frame::video::Video::new(
            ffmpeg_next::format::Pixel::RGB24,
            self.width,
            self.height,
        );

        let stride = rgb_frame.stride(0);
        let data = rgb_frame.data_mut(0);
        let src = frame.data();
        let row_len = self.width as usize * 3;

        // Copy pixel data, respecting stride
        for row in 0..self.height as usize {
            let src_start = row * row_len;
            let dst_start = row * stride;
            data[dst_start..dst_start + row_len]
                .copy_from_slice(&src[src_start..src_start + row_len]);
        }

        let mut yuv_frame = ffmpeg_next::util::frame::video::Video::empty();
        scaler.run(&rgb_frame, &mut yuv_frame)?;
        yuv_frame.set_pts(Some(self.frame_count as i64));

        encoder.send_frame(&yuv_frame)?;
        self.drain_packets()?;

        self.frame_count += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<(), BoxError> {
        let result = if self.encoder.is_some() {
            self.finish()
        } else {
            Ok(())
        };

        self.octx = None;
        self.encoder = None;
        self.scaler = None;

        result
    }
}

/// Exact rational form of a probed frame rate, within the encoder's
/// time base limits. 29.97 becomes 2997/100 and 12.5 becomes 25/2.
fn encoder_frame_rate(fps: f64) -> ffmpeg_next::Rational {
    if !(fps.is_finite() && fps > 0.0) {
        return ffmpeg_next::Rational(FALLBACK_FPS, 1);
    }
    match ffmpeg_next::Rational::from(fps).reduce_with_limit(MAX_TIME_BASE_DEN) {
        Ok(rate) | Err(rate) => rate,
    }
}

/// Packs a four-character code into FFmpeg's little-endian `codec_tag`.
fn fourcc(code: &str) -> Result<u32, BoxError> {
    let bytes: [u8; 4] = code
        .as_bytes()
        .try_into()
        .map_err(|_| format!("invalid FourCC: {code:?}"))?;
    Ok(u32::from_le_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::error::DetectHumansError;
    use crate::video::domain::video_reader::VideoReader;
    use crate::video::infrastructure::ffmpeg_reader::FfmpegReader;
    use approx::assert_relative_eq;
    use rstest::rstest;

    fn metadata(w: u32, h: u32, fps: f64) -> VideoMetadata {
        VideoMetadata {
            width: w,
            height: h,
            fps,
            total_frames: 0,
            codec: "XVID".to_string(),
            source_codec: String::new(),
            source_path: None,
        }
    }

    fn solid_frame(index: usize, w: u32, h: u32, value: u8) -> Frame {
        let data = vec![value; (w * h * 3) as usize];
        Frame::new(data, w, h, 3, index)
    }

    #[test]
    fn test_fourcc_packs_little_endian() {
        assert_eq!(fourcc("XVID").unwrap(), 0x4449_5658);
        assert!(fourcc("XVI").is_err());
    }

    #[test]
    fn test_open_rejects_non_avi_before_creating_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.mp4");

        let mut writer = FfmpegWriter::new();
        let err = writer.open(&path, &metadata(160, 120, 30.0)).unwrap_err();

        let err = err.downcast::<DetectHumansError>().unwrap();
        assert!(matches!(
            *err,
            DetectHumansError::UnsupportedOutputFormat { .. }
        ));
        assert!(!path.exists());
    }

    #[test]
    fn test_write_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.avi");

        let mut writer = FfmpegWriter::new();
        writer.open(&path, &metadata(160, 120, 30.0)).unwrap();
        for i in 0..3 {
            writer.write(&solid_frame(i, 160, 120, 128)).unwrap();
        }
        assert_eq!(writer.frame_count(), 3);
        writer.close().unwrap();

        assert!(path.exists());
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }

    #[test]
    fn test_written_video_is_xvid_tagged_avi() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.avi");

        let mut writer = FfmpegWriter::new();
        writer.open(&path, &metadata(160, 120, 30.0)).unwrap();
        writer.write(&solid_frame(0, 160, 120, 128)).unwrap();
        writer.close().unwrap();

        ffmpeg_next::init().unwrap();
        let ictx = ffmpeg_next::format::input(&path).unwrap();
        assert!(ictx.format().name().contains("avi"));
        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .unwrap();
        let params = stream.parameters();
        assert_eq!(params.id(), ffmpeg_next::codec::Id::MPEG4);
        let tag = unsafe { (*params.as_ptr()).codec_tag };
        assert_eq!(tag, fourcc("XVID").unwrap());
    }

    #[test]
    fn test_write_rejects_mismatched_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.avi");

        let mut writer = FfmpegWriter::new();
        writer.open(&path, &metadata(160, 120, 30.0)).unwrap();
        assert!(writer.write(&solid_frame(0, 80, 60, 128)).is_err());
        assert_eq!(writer.frame_count(), 0);
        writer.close().unwrap();
    }

    #[test]
    fn test_write_without_open_returns_error() {
        let mut writer = FfmpegWriter::new();
        let result = writer.write(&solid_frame(0, 160, 120, 128));
        assert!(result.is_err());
    }

    #[test]
    fn test_close_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.avi");

        let mut writer = FfmpegWriter::new();
        writer.open(&path, &metadata(160, 120, 30.0)).unwrap();
        writer.write(&solid_frame(0, 160, 120, 128)).unwrap();
        writer.close().unwrap();
        assert!(writer.close().is_ok());
    }

    #[test]
    fn test_zero_fps_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.avi");

        let mut writer = FfmpegWriter::new();
        writer.open(&path, &metadata(160, 120, 0.0)).unwrap();
        writer.write(&solid_frame(0, 160, 120, 128)).unwrap();
        writer.close().unwrap();

        let meta = FfmpegReader::probe(&path).unwrap();
        assert!((meta.fps - FALLBACK_FPS as f64).abs() < 0.5);
    }

    #[rstest]
    #[case(25.0, (25, 1))]
    #[case(12.5, (25, 2))]
    #[case(29.97, (2997, 100))]
    #[case(30000.0 / 1001.0, (30000, 1001))]
    #[case(0.0, (30, 1))]
    #[case(f64::NAN, (30, 1))]
    fn test_encoder_frame_rate_is_exact(#[case] fps: f64, #[case] expected: (i32, i32)) {
        let rate = encoder_frame_rate(fps);
        assert_eq!((rate.numerator(), rate.denominator()), expected);
        assert!(rate.invert().denominator() <= MAX_TIME_BASE_DEN);
    }

    #[rstest]
    #[case(12.5)]
    #[case(29.97)]
    #[case(30000.0 / 1001.0)]
    fn test_fractional_fps_survives_roundtrip(#[case] fps: f64) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fractional.avi");

        let mut writer = FfmpegWriter::new();
        writer.open(&path, &metadata(160, 120, fps)).unwrap();
        for i in 0..5 {
            writer.write(&solid_frame(i, 160, 120, 128)).unwrap();
        }
        writer.close().unwrap();

        let probed = FfmpegReader::probe(&path).unwrap();
        assert_relative_eq!(probed.fps, fps, epsilon = 1e-3);
        assert_eq!(probed.total_frames, 5);
    }

    #[test]
    fn test_roundtrip_preserves_count_and_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roundtrip.avi");

        let mut writer = FfmpegWriter::new();
        writer.open(&path, &metadata(160, 120, 30.0)).unwrap();
        for i in 0..4 {
            writer.write(&solid_frame(i, 160, 120, 128)).unwrap();
        }
        writer.close().unwrap();

        let mut reader = FfmpegReader::new();
        let read_meta = reader.open(&path).unwrap();
        assert_eq!(read_meta.frame_size(), (160, 120));
        assert_eq!(read_meta.total_frames, 4);

        let frames: Vec<_> = reader.frames().map(|f| f.unwrap()).collect();
        assert_eq!(frames.len(), 4);

        // Codec is lossy, but the overall brightness should be close
        let first = &frames[0];
        let avg: f64 =
            first.data().iter().map(|&b| b as f64).sum::<f64>() / first.data().len() as f64;
        assert!(
            (avg - 128.0).abs() < 40.0,
            "Average pixel value {avg} should be close to 128"
        );
    }
}
