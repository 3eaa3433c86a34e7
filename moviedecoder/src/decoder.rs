/*!
    The movie decoder: one opened resource, pulled frame batch by frame batch.
*/

use std::time::Duration;

use tracing::{debug, info, warn};

use ffmpeg_decode::{AudioDecoder, AudioDecoderConfig, VideoDecoder, VideoDecoderConfig};
use ffmpeg_source::{InterruptGate, Location, Source, SourceConfig};
use ffmpeg_transform::AudioTransform;
use ffmpeg_types::{Error, MediaInfo, Result};

use crate::config::MovieDecoderConfig;
use crate::convert::PixelConverter;
use crate::frame::{Frame, VideoFrameFormat};
use crate::pump::{FramePump, Pipeline, PumpConfig};

/**
    Pull-based decoder for one media resource.

    Opening demuxes the container, picks at most one video and one audio
    stream and opens a codec for each. Frames are then produced on demand by
    [`decode_frames`](Self::decode_frames), each call decoding at least the
    requested amount of playback time. A failed open returns an error and no
    decoder, so there is never a half-open instance to misuse.

    Every decoding method takes `&mut self`; use [`interrupt_gate`](Self::interrupt_gate)
    to cancel a blocking call from another thread.

    # Example

    ```no_run
    use moviedecoder::{Frame, MovieDecoder};

    let mut decoder = MovieDecoder::open("movie.mp4")?;
    while !decoder.is_eof() {
        for frame in decoder.decode_frames(0.1) {
            if let Frame::Video(video) = frame {
                println!("{:.3}s {}x{}", video.position(), video.width(), video.height());
            }
        }
    }
    # Ok::<(), moviedecoder::Error>(())
    ```
*/
pub struct MovieDecoder {
    source: Source,
    pipeline: Pipeline<VideoDecoder, AudioDecoder>,
    pump: FramePump,
    start_time: f64,
    duration: Option<f64>,
    fps: f64,
}

impl MovieDecoder {
    /**
        Open a file path or URL with the default configuration.
    */
    pub fn open(location: impl Into<Location>) -> Result<Self> {
        Self::open_with(location, MovieDecoderConfig::default(), InterruptGate::new())
    }

    /**
        Open a resource with the given configuration and interrupt gate.

        Keep a clone of `gate` to cancel the open itself, which matters for
        network locations that may stall while connecting.

        # Errors

        - [`Error::OpenFile`] if the resource cannot be opened
        - [`Error::Interrupted`] if the gate fired while opening
        - [`Error::StreamInfoNotFound`] if stream information cannot be read
        - [`Error::StreamNotFound`] if there is neither audio nor video
        - [`Error::CodecNotFound`], [`Error::OpenCodec`], [`Error::AllocateFrame`]
          if no selected stream could get a working codec
    */
    pub fn open_with(
        location: impl Into<Location>,
        config: MovieDecoderConfig,
        gate: InterruptGate,
    ) -> Result<Self> {
        let source_config = SourceConfig {
            network_options: config.network_option_pairs(),
        };
        let source = Source::open(location, source_config, gate)?;

        let video = match (source.video_stream(), source.video_codec_config()) {
            (Some(stream), Some(codec)) => {
                let decoder_config = VideoDecoderConfig {
                    thread_count: config.decoder_threads,
                };
                Some(VideoDecoder::new(codec.clone(), stream.time_base, decoder_config))
            }
            _ => None,
        };

        let audio = match (source.audio_stream(), source.audio_codec_config()) {
            (Some(stream), Some(codec)) => {
                let decoder_config = AudioDecoderConfig {
                    thread_count: config.decoder_threads,
                };
                Some(AudioDecoder::new(codec.clone(), stream.time_base, decoder_config))
            }
            _ => None,
        };

        // One working stream is enough; report the video error if both fail
        let (video, audio) = match (video, audio) {
            (Some(Err(e)), None | Some(Err(_))) => return Err(e),
            (None, Some(Err(e))) => return Err(e),
            (video, audio) => (
                usable(video, "video", source.location()),
                usable(audio, "audio", source.location()),
            ),
        };

        let clock = if video.is_some() {
            source.video_stream()
        } else {
            source.audio_stream()
        };
        let start_time = clock
            .and_then(|stream| stream.start_time.map(|_| stream.start_seconds()))
            .unwrap_or_else(|| source.start_time().as_secs_f64());

        let fps = match video {
            Some(_) => source.video_stream().map(|s| s.fps()).unwrap_or(0.0),
            None => 0.0,
        };
        let duration = source.duration().map(|d| d.as_secs_f64());

        let resampler = match (&config.audio_output, &source.media_info().audio) {
            (Some(output), Some(stream)) if audio.is_some() => {
                Some(AudioTransform::new(output.resolve(stream)?))
            }
            _ => None,
        };

        let pump = FramePump::new(PumpConfig {
            max_consecutive_errors: config.max_consecutive_errors,
            skip_to_seek_target: config.skip_to_seek_target,
            start_time,
            fps,
        });

        let mut decoder = Self {
            source,
            pipeline: Pipeline {
                video,
                audio,
                pixels: PixelConverter::new(VideoFrameFormat::default()),
                resampler,
            },
            pump,
            start_time,
            duration,
            fps,
        };

        if let Err(e) = decoder.setup_video_frame_format(config.video_format) {
            warn!(
                error = %e,
                requested = %config.video_format,
                "falling back to the default frame format"
            );
        }

        info!(
            location = %decoder.source.location(),
            video = decoder.valid_video(),
            audio = decoder.valid_audio(),
            duration = ?decoder.duration,
            start_time,
            fps,
            format = %decoder.video_frame_format(),
            "movie decoder ready"
        );

        Ok(decoder)
    }

    /**
        Decode until at least `min_duration` seconds of frames are available.

        Video timing drives the budget when there is a video stream, audio
        otherwise. Returns frames in decode order; fewer than requested at end
        of stream or after an interrupt, none once [`is_eof`](Self::is_eof)
        is set. Decode failures are logged and skipped, never returned.

        An interrupt raised with [`interrupt_decoder`](Self::interrupt_decoder)
        ends this call early and is consumed when it returns.
    */
    pub fn decode_frames(&mut self, min_duration: f64) -> Vec<Frame> {
        let gate = self.source.interrupt_gate().clone();
        let frames =
            self.pump
                .decode_frames(&mut self.source, &mut self.pipeline, min_duration, &gate);

        if gate.is_triggered() {
            gate.clear();
            debug!(frames = frames.len(), "interrupt consumed");
        }

        frames
    }

    /**
        Ask a running (or the next) decode call to stop as soon as possible.

        Returns true if this raised a new interrupt, false if one was already
        pending.
    */
    pub fn interrupt_decoder(&self) -> bool {
        let raised = self.source.interrupt_gate().interrupt();
        if raised {
            debug!("interrupt raised");
        }
        raised
    }

    /**
        Attach (or remove) a predicate polled alongside the interrupt flag.

        The predicate stays in place across calls until replaced.
    */
    pub fn set_interrupt_callback<F>(&self, callback: Option<F>)
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.source.interrupt_gate().set_callback(callback);
    }

    /**
        A handle to the gate this decoder polls, usable from any thread.
    */
    pub fn interrupt_gate(&self) -> InterruptGate {
        self.source.interrupt_gate().clone()
    }

    /**
        Seconds from the start of the media of the last frame produced on the
        budget clock, or the last seek target.
    */
    pub fn position(&self) -> f64 {
        self.pump.position()
    }

    /**
        Seek to `seconds` from the start of the media.

        The target is clamped to `[0, duration]`. The demuxer lands on a
        keyframe at or before the target; frames before the target are then
        dropped unless disabled in the configuration. If the demuxer cannot
        seek at all the read cursor stays where it was.
    */
    pub fn set_position(&mut self, seconds: f64) {
        let target = clamp_seek_target(seconds, self.duration);
        if target != seconds {
            debug!(requested = seconds, target, "clamped seek target");
        }

        self.pipeline.reset();

        match container_offset(target, self.start_time) {
            Some(absolute) => match self.source.seek(absolute) {
                Ok(()) => debug!(target, "seeked"),
                Err(e) => warn!(error = %e, target, "seek failed, keeping read position"),
            },
            None => warn!(target, "seek target out of range, keeping read position"),
        }

        self.pump.seeked(target);
    }

    /**
        Length of the media in seconds, if the container knows it.
    */
    pub fn duration(&self) -> Option<f64> {
        self.duration
    }

    /**
        Timestamp of the first frame of the budget-clock stream, in seconds.
        Subtracted from every frame position.
    */
    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    /**
        Nominal video frame rate, 0.0 without video or when unknown.
    */
    pub fn fps(&self) -> f64 {
        self.fps
    }

    pub fn is_network(&self) -> bool {
        self.source.is_network()
    }

    pub fn valid_video(&self) -> bool {
        self.pipeline.video.is_some()
    }

    pub fn valid_audio(&self) -> bool {
        self.pipeline.audio.is_some()
    }

    /**
        True once the stream has ended (or decoding gave up). Cleared by a
        seek.
    */
    pub fn is_eof(&self) -> bool {
        self.pump.is_eof()
    }

    pub fn location(&self) -> &Location {
        self.source.location()
    }

    pub fn media_info(&self) -> &MediaInfo {
        self.source.media_info()
    }

    pub fn video_frame_format(&self) -> VideoFrameFormat {
        self.pipeline.pixels.format()
    }

    /**
        Choose how video frames are represented.

        Must be called before the first video frame is produced. YUV is only
        available when the decoder's output is 8-bit three-plane YUV; RGB
        layouts are always available.

        # Errors

        - [`Error::FormatLocked`] if video frames have already been produced
        - [`Error::UnsupportedFormat`] if YUV was requested for a stream that
          does not decode to three-plane YUV
    */
    pub fn setup_video_frame_format(&mut self, format: VideoFrameFormat) -> Result<()> {
        if format == self.video_frame_format() {
            return Ok(());
        }

        let Some(video) = self.pipeline.video.as_ref() else {
            self.pipeline.pixels.set_format(format);
            return Ok(());
        };

        if self.pump.has_produced_video() {
            return Err(Error::FormatLocked);
        }

        if format == VideoFrameFormat::Yuv {
            let native = video.output_format();
            if !native.is_some_and(|f| f.is_three_plane_yuv()) {
                return Err(Error::unsupported_format(format!(
                    "stream decodes to {:?}, not three-plane YUV",
                    native
                )));
            }
        }

        self.pipeline.pixels.set_format(format);
        debug!(%format, "video frame format set");
        Ok(())
    }

    /**
        Width of decoded video frames, 0 without video.
    */
    pub fn frame_width(&self) -> u32 {
        self.pipeline.video.as_ref().map_or(0, VideoDecoder::width)
    }

    /**
        Height of decoded video frames, 0 without video.
    */
    pub fn frame_height(&self) -> u32 {
        self.pipeline.video.as_ref().map_or(0, VideoDecoder::height)
    }

    /**
        Sample rate of the audio handed out, 0 without audio.
    */
    pub fn sample_rate(&self) -> u32 {
        match (&self.pipeline.resampler, &self.pipeline.audio) {
            (Some(resampler), _) => resampler.config().sample_rate,
            (None, Some(audio)) => audio.sample_rate(),
            (None, None) => 0,
        }
    }

    /**
        Channel count of the audio handed out, 0 without audio.
    */
    pub fn channels(&self) -> u16 {
        match (&self.pipeline.resampler, &self.pipeline.audio) {
            (Some(resampler), _) => resampler.config().channels.channels(),
            (None, Some(audio)) => audio.channels(),
            (None, None) => 0,
        }
    }
}

/**
    Clamp a requested position to `[0, duration]`; non-finite requests go to
    the start. Without a known duration only the lower bound applies.
*/
fn clamp_seek_target(seconds: f64, duration: Option<f64>) -> f64 {
    let target = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
    match duration {
        Some(duration) => target.min(duration),
        None => target,
    }
}

/**
    Container timestamp for a target position, `None` when it does not fit
    in a [`Duration`].
*/
fn container_offset(target: f64, start_time: f64) -> Option<Duration> {
    Duration::try_from_secs_f64((target + start_time).max(0.0)).ok()
}

/**
    Keep a stream whose codec opened, log and drop one whose codec did not.
*/
fn usable<T>(session: Option<Result<T>>, kind: &str, location: &Location) -> Option<T> {
    match session? {
        Ok(session) => Some(session),
        Err(e) => {
            warn!(error = %e, %location, "ignoring {} stream without a usable codec", kind);
            None
        }
    }
}

impl std::fmt::Debug for MovieDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MovieDecoder")
            .field("source", &self.source)
            .field("position", &self.pump.position())
            .field("duration", &self.duration)
            .field("start_time", &self.start_time)
            .field("format", &self.video_frame_format())
            .field("eof", &self.pump.is_eof())
            .finish_non_exhaustive()
    }
}
