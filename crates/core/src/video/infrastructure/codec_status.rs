/// Whether a `receive_frame` / `receive_packet` error only means the codec
/// has no output right now (needs more input, or is fully drained).
///
/// Anything else is a real decode or encode failure.
pub(crate) fn is_drained(err: &ffmpeg_next::Error) -> bool {
    matches!(
        err,
        ffmpeg_next::Error::Eof | ffmpeg_next::Error::Other { errno: ffmpeg_next::error::EAGAIN }
    )
}
