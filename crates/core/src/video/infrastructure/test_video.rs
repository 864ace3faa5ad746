//! Synthesizes small MPEG-4 clips for FFmpeg-backed tests.

use std::path::Path;

/// Encodes `num_frames` solid grey frames into `path`.
///
/// The container is chosen by FFmpeg from the file extension.
pub(crate) fn create_test_video(path: &Path, num_frames: usize, width: u32, height: u32, fps: f64) {
    ffmpeg_next::init().unwrap();

    let mut octx = ffmpeg_next::format::output(path).unwrap();

    let global_header = octx
        .format()
        .flags()
        .contains(ffmpeg_next::format::Flags::GLOBAL_HEADER);

    let codec = ffmpeg_next::encoder::find(ffmpeg_next::codec::Id::MPEG4).unwrap();
    let mut ost = octx.add_stream(Some(codec)).unwrap();

    let mut encoder_ctx = ffmpeg_next::codec::context::Context::new_with_codec(codec)
        .encoder()
        .video()
        .unwrap();

    let time_base = ffmpeg_next::Rational(1, fps as i32);
    encoder_ctx.set_width(width);
    encoder_ctx.set_height(height);
    encoder_ctx.set_format(ffmpeg_next::format::Pixel::YUV420P);
    encoder_ctx.set_time_base(time_base);
    encoder_ctx.set_frame_rate(Some(ffmpeg_next::Rational(fps as i32, 1)));

    if global_header {
        encoder_ctx.set_flags(ffmpeg_next::codec::Flags::GLOBAL_HEADER);
    }

    let mut encoder = encoder_ctx
        .open_with(ffmpeg_next::Dictionary::new())
        .unwrap();
    ost.set_parameters(&encoder);

    octx.write_header().unwrap();

    let ost_time_base = octx.stream(0).unwrap().time_base();

    let mut scaler = ffmpeg_next::software::scaling::Context::get(
        ffmpeg_next::format::Pixel::RGB24,
        width,
        height,
        ffmpeg_next::format::Pixel::YUV420P,
        width,
        height,
        ffmpeg_next::software::scaling::Flags::BILINEAR,
    )
    .unwrap();

    let drain = |encoder: &mut ffmpeg_next::codec::encoder::video::Encoder,
                 octx: &mut ffmpeg_next::format::context::Output| {
        let mut encoded = ffmpeg_next::Packet::empty();
        while encoder.receive_packet(&mut encoded).is_ok() {
            encoded.set_stream(0);
            encoded.rescale_ts(time_base, ost_time_base);
            encoded.write_interleaved(octx).unwrap();
        }
    };

    for i in 0..num_frames {
        let mut rgb_frame = ffmpeg_next::util::frame::video::Video::new(
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
        );
        let value = ((i * 40) % 256) as u8;
        rgb_frame.data_mut(0).fill(value);

        let mut yuv_frame = ffmpeg_next::util::frame::video::Video::empty();
        scaler.run(&rgb_frame, &mut yuv_frame).unwrap();
        yuv_frame.set_pts(Some(i as i64));

        encoder.send_frame(&yuv_frame).unwrap();
        drain(&mut encoder, &mut octx);
    }

    encoder.send_eof().unwrap();
    drain(&mut encoder, &mut octx);

    octx.write_trailer().unwrap();
}
