/*!
    Stream information types.
*/

use std::time::Duration;

use crate::{ChannelLayout, CodecId, PixelFormat, Pts, Rational, SampleFormat, StreamType};

/**
    Immutable metadata for one selected stream.

    Captured once when the stream is selected and never updated afterwards.
*/
#[derive(Clone, Debug, PartialEq)]
pub struct StreamDescriptor {
    /// Index of the stream in the container's stream table.
    pub index: usize,
    pub kind: StreamType,
    /// Known codec, `None` for codecs without a [`CodecId`] mapping.
    pub codec_id: Option<CodecId>,
    pub time_base: Rational,
    /// First timestamp of the stream, if the container reports one.
    pub start_time: Option<Pts>,
    /// Nominal frame rate (video only).
    pub frame_rate: Option<Rational>,
}

impl StreamDescriptor {
    /**
        Stream start offset in seconds (0.0 when unknown).
    */
    pub fn start_seconds(&self) -> f64 {
        self.start_time
            .map(|pts| pts.to_seconds(self.time_base))
            .unwrap_or(0.0)
    }

    /**
        Nominal frames per second, 0.0 when unknown.
    */
    pub fn fps(&self) -> f64 {
        self.frame_rate.map(|r| r.to_f64()).unwrap_or(0.0)
    }
}

/**
    Information about a video stream.
*/
#[derive(Clone, Debug)]
pub struct VideoStreamInfo {
    /// Index of the stream in the container.
    pub index: usize,
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Native pixel format (`None` if it has no [`PixelFormat`] counterpart).
    pub pixel_format: Option<PixelFormat>,
    /// Frame rate (may be approximate or unavailable).
    pub frame_rate: Option<Rational>,
    /// Time base for timestamps.
    pub time_base: Rational,
    /// Total duration (may be unavailable for some streams).
    pub duration: Option<Duration>,
    /// Codec used (`None` if unknown to this crate).
    pub codec_id: Option<CodecId>,
    /// Bitrate in bits per second (if known).
    pub bitrate: Option<u64>,
}

impl VideoStreamInfo {
    /**
        Returns the frame rate as fps, if available.
    */
    pub fn fps(&self) -> Option<f64> {
        self.frame_rate.map(|r| r.to_f64())
    }
}

/**
    Information about an audio stream.
*/
#[derive(Clone, Debug)]
pub struct AudioStreamInfo {
    /// Index of the stream in the container.
    pub index: usize,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Channel layout.
    pub channels: ChannelLayout,
    /// Native sample format (`None` if it has no [`SampleFormat`] counterpart).
    pub sample_format: Option<SampleFormat>,
    /// Time base for timestamps.
    pub time_base: Rational,
    /// Total duration (may be unavailable for some streams).
    pub duration: Option<Duration>,
    /// Codec used (`None` if unknown to this crate).
    pub codec_id: Option<CodecId>,
    /// Bitrate in bits per second (if known).
    pub bitrate: Option<u64>,
}

impl AudioStreamInfo {
    /**
        Returns the number of channels.
    */
    pub fn channel_count(&self) -> u16 {
        self.channels.channels()
    }
}

/**
    Combined information about a media source.
*/
#[derive(Clone, Debug, Default)]
pub struct MediaInfo {
    /// Total duration of the media (may be unavailable).
    pub duration: Option<Duration>,
    /// Container start time (zero when the container reports none).
    pub start_time: Duration,
    /// Video stream information (if video is present).
    pub video: Option<VideoStreamInfo>,
    /// Audio stream information (if audio is present).
    pub audio: Option<AudioStreamInfo>,
}
