/*!
    Media source implementation.
*/

use std::ffi::{CString, c_int, c_void};
use std::panic::{self, AssertUnwindSafe};
use std::ptr;
use std::time::Duration;

use ffmpeg_next::{
    Dictionary, ffi,
    format::{context::Input as InputContext, stream::Disposition, stream::Stream},
    media::Type,
};
use tracing::{debug, info, warn};

use ffmpeg_types::{Error, MediaInfo, Packet, Pts, Result, StreamDescriptor, StreamType};

use crate::codec_config::CodecConfig;
use crate::convert::{duration_from_ffmpeg, pts_from_ffmpeg, rational_from_ffmpeg};
use crate::interrupt::InterruptGate;
use crate::location::Location;
use crate::probe::{extract_media_info, stream_frame_rate};
use crate::select::{StreamCandidate, select_stream};

/**
    Configuration for opening a media source.
*/
#[derive(Clone, Debug, Default)]
pub struct SourceConfig {
    /// Demuxer options passed to FFmpeg when opening network locations,
    /// e.g. `("rtsp_transport", "tcp")` or `("timeout", "5000000")`.
    pub network_options: Vec<(String, String)>,
}

struct SelectedStream {
    descriptor: StreamDescriptor,
    codec_config: CodecConfig,
}

/**
    A media source that produces encoded packets.

    Created by [`Source::open`]. Holds the demuxer, the streams
    selected for decoding and the interrupt gate FFmpeg polls during blocking
    I/O.
*/
pub struct Source {
    input: InputContext,
    // FFmpeg keeps a raw pointer to the boxed gate, so it must be dropped
    // after `input` (fields drop in declaration order)
    gate: Box<InterruptGate>,
    location: Location,
    media_info: MediaInfo,
    video: Option<SelectedStream>,
    audio: Option<SelectedStream>,
}

impl Source {
    /**
        Open a media resource.

        The gate is installed as FFmpeg's interrupt callback before the
        resource is opened, so a slow network connect can be cancelled from
        another thread through a clone of the gate.

        # Errors

        - [`Error::OpenFile`] if the resource cannot be opened
        - [`Error::Interrupted`] if the gate fired while opening
        - [`Error::StreamInfoNotFound`] if stream information cannot be read
        - [`Error::StreamNotFound`] if there is no usable audio or video stream
    */
    pub fn open(
        location: impl Into<Location>,
        config: SourceConfig,
        gate: InterruptGate,
    ) -> Result<Self> {
        crate::init()?;

        let location = location.into();
        let gate = Box::new(gate);

        let options: &[(String, String)] = if location.is_network() {
            &config.network_options
        } else {
            &[]
        };
        let input = open_input(&location, options, &gate)?;

        let (video_index, audio_index) = select_streams(&input);

        if video_index.is_none() && audio_index.is_none() {
            return Err(Error::StreamNotFound);
        }

        let media_info = extract_media_info(&input, video_index, audio_index);
        let video = video_index
            .and_then(|index| input.stream(index))
            .map(|stream| selected_stream(&stream, StreamType::Video));
        let audio = audio_index
            .and_then(|index| input.stream(index))
            .map(|stream| selected_stream(&stream, StreamType::Audio));

        info!(
            %location,
            network = location.is_network(),
            video = ?video_index,
            audio = ?audio_index,
            "opened media source"
        );

        Ok(Self {
            input,
            gate,
            location,
            media_info,
            video,
            audio,
        })
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn is_network(&self) -> bool {
        self.location.is_network()
    }

    /**
        The gate FFmpeg polls during blocking reads.
    */
    pub fn interrupt_gate(&self) -> &InterruptGate {
        &self.gate
    }

    /**
        Get the media info for this source.
    */
    pub fn media_info(&self) -> &MediaInfo {
        &self.media_info
    }

    /**
        Container duration, if known.
    */
    pub fn duration(&self) -> Option<Duration> {
        self.media_info.duration
    }

    /**
        Container start time (zero when the container reports none).
    */
    pub fn start_time(&self) -> Duration {
        self.media_info.start_time
    }

    pub fn video_stream(&self) -> Option<&StreamDescriptor> {
        self.video.as_ref().map(|s| &s.descriptor)
    }

    pub fn audio_stream(&self) -> Option<&StreamDescriptor> {
        self.audio.as_ref().map(|s| &s.descriptor)
    }

    /**
        Get the video codec configuration, if video is present.

        Pass this to `ffmpeg-decode` to create a video decoder.
    */
    pub fn video_codec_config(&self) -> Option<&CodecConfig> {
        self.video.as_ref().map(|s| &s.codec_config)
    }

    /**
        Get the audio codec configuration, if audio is present.

        Pass this to `ffmpeg-decode` to create an audio decoder.
    */
    pub fn audio_codec_config(&self) -> Option<&CodecConfig> {
        self.audio.as_ref().map(|s| &s.codec_config)
    }

    /**
        Read the next packet of a selected stream.

        Returns `Ok(Some(packet))` for each packet, `Ok(None)` at end of
        stream and [`Error::Interrupted`] if the gate fired. Packets of
        streams that were not selected are skipped here and never returned.
    */
    pub fn next_packet(&mut self) -> Result<Option<Packet>> {
        loop {
            if self.gate.is_interrupted() {
                return Err(Error::Interrupted);
            }

            // av_read_frame never unrefs its target, so every read gets a
            // fresh packet that frees its buffer when dropped
            let mut packet = ffmpeg_next::Packet::empty();

            match packet.read(&mut self.input) {
                Ok(()) => {}
                Err(ffmpeg_next::Error::Eof) => return Ok(None),
                Err(ffmpeg_next::Error::Exit) => return Err(Error::Interrupted),
                Err(ffmpeg_next::Error::Other { errno }) if errno == ffi::EAGAIN => continue,
                Err(e) => {
                    if self.gate.is_interrupted() {
                        return Err(Error::Interrupted);
                    }
                    return Err(Error::codec(format!("packet read failed: {}", e)));
                }
            }

            let index = packet.stream();
            let selected = [&self.video, &self.audio]
                .into_iter()
                .flatten()
                .find(|s| s.descriptor.index == index);

            let Some(selected) = selected else {
                continue;
            };

            let descriptor = &selected.descriptor;
            return Ok(Some(Packet::new(
                packet.data().map(|d| d.to_vec()).unwrap_or_default(),
                pts_from_ffmpeg(packet.pts()),
                pts_from_ffmpeg(packet.dts()),
                duration_from_ffmpeg(packet.duration()),
                descriptor.time_base,
                packet.is_key(),
                descriptor.kind,
            )));
        }
    }

    /**
        Seek to a position on the container timeline.

        Seeks to the nearest keyframe at or before the target. If the
        demuxer refuses, retries without the upper bound so the nearest
        keyframe on either side is used. Decoders must be reset afterwards.
    */
    pub fn seek(&mut self, position: Duration) -> Result<()> {
        // FFmpeg's seek API takes AV_TIME_BASE (microsecond) units
        let timestamp = (position.as_secs_f64() * ffi::AV_TIME_BASE as f64) as i64;

        match self.input.seek(timestamp, ..timestamp) {
            Ok(()) => Ok(()),
            Err(first) => {
                debug!(?position, error = %first, "bounded seek failed, retrying unbounded");
                self.input.seek(timestamp, ..).map_err(|e| {
                    warn!(?position, error = %e, "seek failed");
                    Error::codec(format!("seek failed: {}", e))
                })
            }
        }
    }
}

impl std::fmt::Debug for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Source")
            .field("location", &self.location)
            .field("video", &self.video_stream())
            .field("audio", &self.audio_stream())
            .finish_non_exhaustive()
    }
}

unsafe extern "C" fn interrupt_trampoline(opaque: *mut c_void) -> c_int {
    if opaque.is_null() {
        return 0;
    }

    // SAFETY: opaque is the boxed gate owned by the Source (or probe call)
    // that also owns the format context, and it outlives that context
    let gate = unsafe { &*(opaque as *const InterruptGate) };

    // Unwinding into C is undefined, a panicking predicate aborts the I/O
    match panic::catch_unwind(AssertUnwindSafe(|| gate.is_interrupted())) {
        Ok(interrupted) => interrupted as c_int,
        Err(_) => 1,
    }
}

/**
    Open a format context with the gate installed as its interrupt callback
    and read stream information.

    The gate must stay at the same address for as long as the returned
    context lives.
*/
pub(crate) fn open_input(
    location: &Location,
    options: &[(String, String)],
    gate: &InterruptGate,
) -> Result<InputContext> {
    let url = CString::new(location.to_ffmpeg_string())
        .map_err(|_| Error::open_file(format!("{}: location contains a NUL byte", location)))?;

    let mut dictionary = Dictionary::new();
    for (key, value) in options {
        dictionary.set(key, value);
    }

    // SAFETY: every pointer handed to FFmpeg is either freshly allocated
    // here or owned by the caller for the lifetime of the context
    unsafe {
        let mut ctx = ffi::avformat_alloc_context();
        if ctx.is_null() {
            return Err(Error::open_file("failed to allocate format context"));
        }

        (*ctx).interrupt_callback = ffi::AVIOInterruptCB {
            callback: Some(interrupt_trampoline),
            opaque: gate as *const InterruptGate as *mut c_void,
        };

        let mut raw_options = dictionary.disown();
        let ret = ffi::avformat_open_input(&mut ctx, url.as_ptr(), ptr::null_mut(), &mut raw_options);

        // Options FFmpeg did not consume are handed back
        let leftover = Dictionary::own(raw_options);
        for (key, _) in leftover.iter() {
            debug!(%location, option = key, "demuxer ignored option");
        }
        drop(leftover);

        // On failure avformat_open_input frees the context itself
        if ret < 0 {
            let error = ffmpeg_next::Error::from(ret);
            if matches!(error, ffmpeg_next::Error::Exit) || gate.is_interrupted() {
                return Err(Error::Interrupted);
            }
            return Err(Error::open_file(format!("{}: {}", location, error)));
        }

        let ret = ffi::avformat_find_stream_info(ctx, ptr::null_mut());
        if ret < 0 {
            ffi::avformat_close_input(&mut ctx);
            let error = ffmpeg_next::Error::from(ret);
            if matches!(error, ffmpeg_next::Error::Exit) || gate.is_interrupted() {
                return Err(Error::Interrupted);
            }
            return Err(Error::stream_info_not_found(format!("{}: {}", location, error)));
        }

        Ok(InputContext::wrap(ctx))
    }
}

/**
    Choose the video and audio stream to decode, if any.
*/
pub(crate) fn select_streams(input: &InputContext) -> (Option<usize>, Option<usize>) {
    let candidates: Vec<StreamCandidate> = input
        .streams()
        .filter_map(|stream| {
            let kind = match stream.parameters().medium() {
                Type::Video => StreamType::Video,
                Type::Audio => StreamType::Audio,
                _ => return None,
            };
            Some(StreamCandidate {
                index: stream.index(),
                kind,
                attached_picture: stream.disposition().contains(Disposition::ATTACHED_PIC),
            })
        })
        .collect();

    let best = |kind| input.streams().best(kind).map(|s| s.index());

    let video = select_stream(&candidates, StreamType::Video, best(Type::Video));
    let audio = select_stream(&candidates, StreamType::Audio, best(Type::Audio));

    (video, audio)
}

fn selected_stream(stream: &Stream, kind: StreamType) -> SelectedStream {
    let start_time = stream.start_time();
    let descriptor = StreamDescriptor {
        index: stream.index(),
        kind,
        codec_id: crate::convert::codec_id_from_ffmpeg(stream.parameters().id()),
        time_base: rational_from_ffmpeg(stream.time_base()),
        start_time: (start_time != ffi::AV_NOPTS_VALUE).then_some(Pts(start_time)),
        frame_rate: match kind {
            StreamType::Video => stream_frame_rate(stream),
            StreamType::Audio => None,
        },
    };

    SelectedStream {
        descriptor,
        codec_config: CodecConfig::new(&stream.parameters()),
    }
}
