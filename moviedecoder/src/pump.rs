/*!
    The frame pump.

    Each call reads packets, pushes them through the codec sessions and
    collects positioned frames until enough playback time has been decoded,
    the stream ends, or the interrupt gate fires.
*/

use tracing::{debug, warn};

use ffmpeg_decode::Decode;
use ffmpeg_source::{InterruptGate, Source};
use ffmpeg_transform::AudioTransform;
use ffmpeg_types::{
    AudioFrame as RawAudioFrame, Packet, Result, StreamType, VideoFrame as RawVideoFrame,
};

use crate::convert::PixelConverter;
use crate::frame::{AudioFrame, Frame};

/// Consecutive decode failures tolerated before a call gives up.
pub const DEFAULT_MAX_CONSECUTIVE_ERRORS: u32 = 16;

/// Frame rate assumed for frame durations when the stream reports none.
pub const DEFAULT_FPS: f64 = 25.0;

/**
    Anything that yields demuxed packets.

    Returns `Ok(None)` at end of stream and [`Error::Interrupted`](ffmpeg_types::Error::Interrupted)
    when the read was cancelled.
*/
pub trait PacketReader {
    fn read_packet(&mut self) -> Result<Option<Packet>>;
}

impl PacketReader for Source {
    fn read_packet(&mut self) -> Result<Option<Packet>> {
        self.next_packet()
    }
}

/**
    The per-stream machinery a pump call drives.

    A `None` session means the stream is absent (or its codec could not be
    opened) and its packets are dropped unread.
*/
#[derive(Debug)]
pub struct Pipeline<V, A> {
    pub video: Option<V>,
    pub audio: Option<A>,
    pub pixels: PixelConverter,
    pub resampler: Option<AudioTransform>,
}

impl<V: Decode, A: Decode> Pipeline<V, A> {
    /**
        Drop everything buffered in the sessions and the resampler.
    */
    pub fn reset(&mut self) {
        if let Some(video) = self.video.as_mut() {
            video.reset();
        }
        if let Some(audio) = self.audio.as_mut() {
            audio.reset();
        }
        if let Some(resampler) = self.resampler.as_mut() {
            resampler.reset();
        }
    }

    /**
        The stream whose frames count against the budget and drive the
        position: video when present, otherwise audio.
    */
    pub fn budget_clock(&self) -> StreamType {
        if self.video.is_some() {
            StreamType::Video
        } else {
            StreamType::Audio
        }
    }

    fn accepts(&self, kind: StreamType) -> bool {
        match kind {
            StreamType::Video => self.video.is_some(),
            StreamType::Audio => self.audio.is_some(),
        }
    }
}

/**
    Tuning for a [`FramePump`].
*/
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PumpConfig {
    pub max_consecutive_errors: u32,
    /// Drop frames that end before the target of the last seek.
    pub skip_to_seek_target: bool,
    /// Subtracted from every timestamp, in seconds.
    pub start_time: f64,
    /// Nominal video frame rate (0.0 when unknown).
    pub fps: f64,
}

impl Default for PumpConfig {
    fn default() -> Self {
        Self {
            max_consecutive_errors: DEFAULT_MAX_CONSECUTIVE_ERRORS,
            skip_to_seek_target: true,
            start_time: 0.0,
            fps: 0.0,
        }
    }
}

/// Decoded time accumulated by one call.
struct Budget {
    clock: StreamType,
    elapsed: f64,
    ticked: bool,
}

/**
    Read cursor state carried between pump calls.
*/
#[derive(Debug)]
pub struct FramePump {
    config: PumpConfig,
    position: f64,
    is_eof: bool,
    consecutive_errors: u32,
    seek_target: Option<f64>,
    produced_video: bool,
    // Where the next untimed frame of each kind is placed
    next_video: f64,
    next_audio: f64,
}

impl FramePump {
    pub fn new(config: PumpConfig) -> Self {
        Self {
            config,
            position: 0.0,
            is_eof: false,
            consecutive_errors: 0,
            seek_target: None,
            produced_video: false,
            next_video: 0.0,
            next_audio: 0.0,
        }
    }

    pub fn config(&self) -> &PumpConfig {
        &self.config
    }

    /**
        Position of the last budget-clock frame produced, or the target of
        the last seek if nothing has been produced since.
    */
    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn is_eof(&self) -> bool {
        self.is_eof
    }

    /**
        True once any video frame has left the pump.
    */
    pub fn has_produced_video(&self) -> bool {
        self.produced_video
    }

    /**
        Move the cursor after the demuxer was repositioned to `target`.
    */
    pub fn seeked(&mut self, target: f64) {
        self.position = target;
        self.is_eof = false;
        self.consecutive_errors = 0;
        self.seek_target = self.config.skip_to_seek_target.then_some(target);
        self.next_video = target;
        self.next_audio = target;
    }

    /**
        Decode until at least `min_duration` seconds of the budget clock
        have been produced.

        Returns early, with whatever was collected so far, when the gate
        fires, the stream ends or too many packets in a row fail to decode.
        Once at end of stream every call returns nothing until the next seek.
    */
    pub fn decode_frames<R, V, A>(
        &mut self,
        reader: &mut R,
        pipeline: &mut Pipeline<V, A>,
        min_duration: f64,
        gate: &InterruptGate,
    ) -> Vec<Frame>
    where
        R: PacketReader + ?Sized,
        V: Decode<Frame = RawVideoFrame>,
        A: Decode<Frame = RawAudioFrame>,
    {
        let mut frames = Vec::new();
        if self.is_eof {
            return frames;
        }

        let mut budget = Budget {
            clock: pipeline.budget_clock(),
            elapsed: 0.0,
            ticked: false,
        };

        loop {
            if gate.is_interrupted() {
                debug!(frames = frames.len(), "decode interrupted");
                break;
            }

            let packet = match reader.read_packet() {
                Ok(Some(packet)) => packet,
                Ok(None) => {
                    self.finish(pipeline, &mut frames, &mut budget);
                    break;
                }
                Err(e) if e.is_interrupted() => {
                    debug!(frames = frames.len(), "packet read interrupted");
                    break;
                }
                Err(e) => {
                    warn!(error = %e, "packet read failed, treating as end of stream");
                    self.finish(pipeline, &mut frames, &mut budget);
                    break;
                }
            };

            if !pipeline.accepts(packet.stream_type) {
                continue;
            }

            // Codecs read an empty packet as end of input
            if packet.data.is_empty() {
                debug!(stream = ?packet.stream_type, "skipping empty packet");
                continue;
            }

            match self.decode_packet(&packet, pipeline, &mut frames, &mut budget) {
                Ok(()) => self.consecutive_errors = 0,
                Err(e) => {
                    self.consecutive_errors += 1;
                    warn!(
                        error = %e,
                        stream = ?packet.stream_type,
                        consecutive = self.consecutive_errors,
                        "skipping undecodable packet"
                    );

                    if self.consecutive_errors >= self.config.max_consecutive_errors.max(1) {
                        warn!(
                            errors = self.consecutive_errors,
                            "too many consecutive decode errors, giving up on stream"
                        );
                        self.is_eof = true;
                        break;
                    }
                }
            }

            if budget.ticked && budget.elapsed >= min_duration {
                break;
            }
        }

        frames
    }

    fn decode_packet<V, A>(
        &mut self,
        packet: &Packet,
        pipeline: &mut Pipeline<V, A>,
        frames: &mut Vec<Frame>,
        budget: &mut Budget,
    ) -> Result<()>
    where
        V: Decode<Frame = RawVideoFrame>,
        A: Decode<Frame = RawAudioFrame>,
    {
        match packet.stream_type {
            StreamType::Video => {
                if let Some(decoder) = pipeline.video.as_mut() {
                    for raw in decoder.decode(packet)? {
                        self.emit_video(raw, &mut pipeline.pixels, frames, budget);
                    }
                }
            }
            StreamType::Audio => {
                if let Some(decoder) = pipeline.audio.as_mut() {
                    for raw in decoder.decode(packet)? {
                        self.emit_audio(raw, pipeline.resampler.as_mut(), frames, budget);
                    }
                }
            }
        }

        Ok(())
    }

    /**
        End of stream: drain every session and the resampler.
    */
    fn finish<V, A>(
        &mut self,
        pipeline: &mut Pipeline<V, A>,
        frames: &mut Vec<Frame>,
        budget: &mut Budget,
    ) where
        V: Decode<Frame = RawVideoFrame>,
        A: Decode<Frame = RawAudioFrame>,
    {
        if let Some(decoder) = pipeline.video.as_mut() {
            match decoder.flush() {
                Ok(raws) => {
                    for raw in raws {
                        self.emit_video(raw, &mut pipeline.pixels, frames, budget);
                    }
                }
                Err(e) => warn!(error = %e, "video flush failed"),
            }
        }

        if let Some(decoder) = pipeline.audio.as_mut() {
            match decoder.flush() {
                Ok(raws) => {
                    for raw in raws {
                        self.emit_audio(raw, pipeline.resampler.as_mut(), frames, budget);
                    }
                }
                Err(e) => warn!(error = %e, "audio flush failed"),
            }

            if let Some(resampler) = pipeline.resampler.as_mut() {
                match resampler.flush() {
                    Ok(Some(tail)) => self.push_audio(tail, frames, budget),
                    Ok(None) => {}
                    Err(e) => warn!(error = %e, "resampler flush failed"),
                }
            }
        }

        self.is_eof = true;
        debug!(position = self.position, "end of stream");
    }

    fn emit_video(
        &mut self,
        raw: RawVideoFrame,
        pixels: &mut PixelConverter,
        frames: &mut Vec<Frame>,
        budget: &mut Budget,
    ) {
        let duration = self.video_duration(&raw);
        let position = raw
            .pts_seconds()
            .map(|t| t - self.config.start_time)
            .unwrap_or(self.next_video);
        self.next_video = position + duration;

        if self.before_seek_target(StreamType::Video, position, duration, budget) {
            return;
        }

        match pixels.convert(&raw, position, duration) {
            Ok(frame) => {
                self.produced_video = true;
                self.tick(StreamType::Video, position, duration, budget);
                frames.push(Frame::Video(frame));
            }
            Err(e) => warn!(error = %e, position, "dropping video frame that failed conversion"),
        }
    }

    fn emit_audio(
        &mut self,
        raw: RawAudioFrame,
        resampler: Option<&mut AudioTransform>,
        frames: &mut Vec<Frame>,
        budget: &mut Budget,
    ) {
        let raw = match resampler {
            Some(resampler) => match resampler.transform(&raw) {
                Ok(converted) => converted,
                Err(e) => {
                    warn!(error = %e, "dropping audio frame that failed resampling");
                    return;
                }
            },
            None => raw,
        };

        self.push_audio(raw, frames, budget);
    }

    fn push_audio(&mut self, raw: RawAudioFrame, frames: &mut Vec<Frame>, budget: &mut Budget) {
        let duration = raw.duration_seconds();
        let position = raw
            .pts_seconds()
            .map(|t| t - self.config.start_time)
            .unwrap_or(self.next_audio);
        self.next_audio = position + duration;

        if self.before_seek_target(StreamType::Audio, position, duration, budget) {
            return;
        }

        self.tick(StreamType::Audio, position, duration, budget);
        frames.push(Frame::Audio(AudioFrame::from_raw(raw, position, duration)));
    }

    /**
        Packet duration plus half a tick per repeated field, or one nominal
        frame interval when the container gave no duration.
    */
    fn video_duration(&self, raw: &RawVideoFrame) -> f64 {
        match raw.duration {
            Some(duration) => {
                duration.to_seconds(raw.time_base)
                    + raw.repeat_pict as f64 * raw.time_base.to_f64() * 0.5
            }
            None => {
                let fps = if self.config.fps > 0.0 {
                    self.config.fps
                } else {
                    DEFAULT_FPS
                };
                1.0 / fps
            }
        }
    }

    fn before_seek_target(
        &mut self,
        kind: StreamType,
        position: f64,
        duration: f64,
        budget: &Budget,
    ) -> bool {
        let Some(target) = self.seek_target else {
            return false;
        };

        if position + duration <= target {
            return true;
        }

        if kind == budget.clock {
            self.seek_target = None;
        }
        false
    }

    fn tick(&mut self, kind: StreamType, position: f64, duration: f64, budget: &mut Budget) {
        if kind == budget.clock {
            budget.elapsed += duration;
            budget.ticked = true;
            self.position = position;
        }
    }
}
