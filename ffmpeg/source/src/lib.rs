/*!
    Media source and demuxing for the movie decoding pipeline.

    This crate handles the input side of the pipeline. It opens media from local
    files or network URLs, parses containers, selects the streams worth decoding,
    and produces encoded packets that downstream crates can decode. Every blocking
    demuxer call can be cancelled through an [`InterruptGate`].
*/

mod codec_config;
mod convert;
mod interrupt;
mod location;
mod probe;
mod select;
mod source;

use std::sync::Once;

use ffmpeg_types::{Error, Result};

pub use codec_config::CodecConfig;
pub use convert::{
    channel_layout_from_count, channel_layout_to_ffmpeg, codec_id_from_ffmpeg,
    fill_video_frame, pixel_format_from_ffmpeg, pixel_format_to_ffmpeg, rational_from_ffmpeg,
    sample_format_from_ffmpeg, sample_format_to_ffmpeg, video_frame_data,
};
pub use interrupt::{InterruptCallback, InterruptGate};
pub use location::Location;
pub use probe::probe;
pub use select::{StreamCandidate, select_stream};
pub use source::{Source, SourceConfig};

static FFMPEG_INIT: Once = Once::new();

/**
    Initialize FFmpeg once per process.

    Safe to call any number of times. Lowers FFmpeg's own log output to errors
    so container warnings don't spam stderr; pipeline diagnostics go through
    `tracing` instead.
*/
pub fn init() -> Result<()> {
    let mut result = Ok(());

    FFMPEG_INIT.call_once(|| {
        if let Err(e) = ffmpeg_next::init() {
            result = Err(Error::codec(format!("FFmpeg initialization failed: {}", e)));
            return;
        }

        // SAFETY: av_log_set_level only touches FFmpeg's global log level
        unsafe {
            ffmpeg_next::ffi::av_log_set_level(ffmpeg_next::ffi::AV_LOG_ERROR);
        }
    });

    result
}
