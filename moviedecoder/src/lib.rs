/*!
    Pull-based movie decoding on top of FFmpeg.

    [`MovieDecoder`] opens a local file or network URL, selects one video and
    one audio stream, and hands out decoded frames in batches sized by
    playback time. Video frames come out as three YUV planes or one
    interleaved RGB buffer; audio frames as interleaved samples, optionally
    resampled.

    ```no_run
    use moviedecoder::{MovieDecoder, MovieDecoderConfig, PackedLayout, VideoFrameFormat};
    use moviedecoder::InterruptGate;

    let config = MovieDecoderConfig::default()
        .with_video_format(VideoFrameFormat::Rgb(PackedLayout::Rgba));
    let gate = InterruptGate::new();
    let mut decoder = MovieDecoder::open_with("https://example.com/live.m3u8", config, gate.clone())?;

    // Another thread may call `gate.interrupt()` to cut the open or a decode short
    decoder.set_position(30.0);
    let frames = decoder.decode_frames(0.5);
    # drop((gate, frames));
    # Ok::<(), moviedecoder::Error>(())
    ```

    The building blocks live in the `ffmpeg-*` crates: `ffmpeg-source`
    (demuxing, stream selection, interrupt gate), `ffmpeg-decode` (codec
    sessions) and `ffmpeg-transform` (pixel and sample conversion).
*/

mod config;
mod convert;
mod decoder;
mod frame;
mod pump;

pub use config::{AudioOutputConfig, MovieDecoderConfig, OutputSampleFormat};
pub use convert::PixelConverter;
pub use decoder::MovieDecoder;
pub use frame::{AudioFrame, Frame, PackedLayout, VideoFrame, VideoFrameFormat, VideoPixels};
pub use pump::{
    DEFAULT_FPS, DEFAULT_MAX_CONSECUTIVE_ERRORS, FramePump, PacketReader, Pipeline, PumpConfig,
};

pub use ffmpeg_source::{InterruptGate, Location, probe};
pub use ffmpeg_types::{
    ChannelLayout, Error, MediaInfo, MovieErrorKind, Result, SampleFormat, StreamType,
};
