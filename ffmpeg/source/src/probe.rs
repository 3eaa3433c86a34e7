/*!
    Probing functionality for extracting media metadata.
*/

use std::time::Duration;

use ffmpeg_next::{ffi, format::context::Input as InputContext, format::stream::Stream};

use ffmpeg_types::{
    AudioStreamInfo, ChannelLayout, MediaInfo, Rational, Result, VideoStreamInfo,
};

use crate::convert::{
    codec_id_from_ffmpeg, pixel_format_from_ffmpeg, rational_from_ffmpeg,
    sample_format_from_ffmpeg,
};
use crate::interrupt::InterruptGate;
use crate::location::Location;
use crate::source::{open_input, select_streams};

/**
    Probe a media resource to extract metadata without building decoders.

    Opens the resource, reads stream information and selects streams the
    same way [`Source::open`](crate::Source::open) does, then closes it.

    # Example

    ```ignore
    let info = probe("video.mp4")?;
    if let Some(video) = &info.video {
        println!("Video: {}x{}", video.width, video.height);
    }
    ```
*/
pub fn probe(location: impl Into<Location>) -> Result<MediaInfo> {
    crate::init()?;

    let location = location.into();
    let gate = Box::new(InterruptGate::new());
    let input = open_input(&location, &[], &gate)?;

    let (video, audio) = select_streams(&input);
    let info = extract_media_info(&input, video, audio);
    drop(input);

    Ok(info)
}

/**
    Extract MediaInfo for the selected streams of an opened input.

    Missing or odd metadata never fails the extraction; unknown values are
    left as `None`.
*/
pub(crate) fn extract_media_info(
    input: &InputContext,
    video_index: Option<usize>,
    audio_index: Option<usize>,
) -> MediaInfo {
    let container_duration = container_duration(input);

    let video = video_index
        .and_then(|index| input.stream(index))
        .map(|stream| extract_video_stream_info(&stream, container_duration));
    let audio = audio_index
        .and_then(|index| input.stream(index))
        .map(|stream| extract_audio_stream_info(&stream, container_duration));

    let duration = container_duration.or_else(|| {
        video
            .as_ref()
            .and_then(|v| v.duration)
            .or_else(|| audio.as_ref().and_then(|a| a.duration))
    });

    MediaInfo {
        duration,
        start_time: container_start_time(input),
        video,
        audio,
    }
}

fn container_duration(input: &InputContext) -> Option<Duration> {
    let micros = input.duration();
    (micros > 0).then(|| Duration::from_micros(micros as u64))
}

fn container_start_time(input: &InputContext) -> Duration {
    // SAFETY: the context is open and owned by `input`
    let start = unsafe { (*input.as_ptr()).start_time };
    if start == ffi::AV_NOPTS_VALUE || start <= 0 {
        Duration::ZERO
    } else {
        Duration::from_micros(start as u64)
    }
}

fn stream_duration(stream: &Stream, fallback: Option<Duration>) -> Option<Duration> {
    let time_base = rational_from_ffmpeg(stream.time_base());
    if stream.duration() > 0 && time_base.is_valid() {
        let seconds = stream.duration() as f64 * time_base.to_f64();
        Some(Duration::from_secs_f64(seconds))
    } else {
        fallback
    }
}

/**
    Nominal frame rate: the average rate, falling back to the real base rate.
*/
pub(crate) fn stream_frame_rate(stream: &Stream) -> Option<Rational> {
    [stream.avg_frame_rate(), stream.rate()]
        .into_iter()
        .map(rational_from_ffmpeg)
        .find(|r| r.num > 0 && r.den > 0)
}

fn extract_video_stream_info(stream: &Stream, container: Option<Duration>) -> VideoStreamInfo {
    let parameters = stream.parameters();

    // SAFETY: We're reading from a valid AVCodecParameters pointer that FFmpeg owns
    let (width, height, bitrate) = unsafe {
        let ptr = parameters.as_ptr();
        (
            (*ptr).width.max(0) as u32,
            (*ptr).height.max(0) as u32,
            ((*ptr).bit_rate > 0).then_some((*ptr).bit_rate as u64),
        )
    };

    // A decoder context is the safe way to read the pixel format
    let pixel_format = ffmpeg_next::codec::context::Context::from_parameters(parameters.clone())
        .ok()
        .and_then(|ctx| ctx.decoder().video().ok())
        .and_then(|decoder| pixel_format_from_ffmpeg(decoder.format()));

    VideoStreamInfo {
        index: stream.index(),
        width,
        height,
        pixel_format,
        frame_rate: stream_frame_rate(stream),
        time_base: rational_from_ffmpeg(stream.time_base()),
        duration: stream_duration(stream, container),
        codec_id: codec_id_from_ffmpeg(parameters.id()),
        bitrate,
    }
}

fn extract_audio_stream_info(stream: &Stream, container: Option<Duration>) -> AudioStreamInfo {
    let parameters = stream.parameters();

    // SAFETY: We're reading from a valid AVCodecParameters pointer that FFmpeg owns
    let (sample_rate, channel_count, bitrate) = unsafe {
        let ptr = parameters.as_ptr();
        (
            (*ptr).sample_rate.max(0) as u32,
            (*ptr).ch_layout.nb_channels.max(0) as u16,
            ((*ptr).bit_rate > 0).then_some((*ptr).bit_rate as u64),
        )
    };

    let sample_format = ffmpeg_next::codec::context::Context::from_parameters(parameters.clone())
        .ok()
        .and_then(|ctx| ctx.decoder().audio().ok())
        .and_then(|decoder| sample_format_from_ffmpeg(decoder.format()));

    AudioStreamInfo {
        index: stream.index(),
        sample_rate,
        channels: ChannelLayout::from_count(channel_count),
        sample_format,
        time_base: rational_from_ffmpeg(stream.time_base()),
        duration: stream_duration(stream, container),
        codec_id: codec_id_from_ffmpeg(parameters.id()),
        bitrate,
    }
}
