/*!
    Frames handed to the caller.

    These are the finished product of the pipeline: positioned on the media
    timeline (start offset removed), with pixels already in the configured
    output format. Fields are private; a frame is read-only once built.
*/

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use ffmpeg_types::{ChannelLayout, PixelFormat, SampleFormat, StreamType};

/**
    Interleaved RGB byte orders the converter can produce.
*/
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackedLayout {
    #[default]
    Rgb24,
    Rgba,
    Bgra,
}

impl PackedLayout {
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Rgb24 => 3,
            Self::Rgba | Self::Bgra => 4,
        }
    }

    pub(crate) const fn pixel_format(self) -> PixelFormat {
        match self {
            Self::Rgb24 => PixelFormat::Rgb24,
            Self::Rgba => PixelFormat::Rgba,
            Self::Bgra => PixelFormat::Bgra,
        }
    }
}

/**
    Output representation for video frames.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoFrameFormat {
    /// The decoder's own three-plane YUV, one buffer per plane.
    Yuv,
    /// One interleaved buffer.
    Rgb(PackedLayout),
}

impl Default for VideoFrameFormat {
    fn default() -> Self {
        Self::Rgb(PackedLayout::Rgb24)
    }
}

impl FromStr for VideoFrameFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "yuv" => Ok(Self::Yuv),
            "rgb" | "rgb24" => Ok(Self::Rgb(PackedLayout::Rgb24)),
            "rgba" => Ok(Self::Rgb(PackedLayout::Rgba)),
            "bgra" => Ok(Self::Rgb(PackedLayout::Bgra)),
            other => Err(format!(
                "unknown frame format '{other}' (expected yuv, rgb24, rgba or bgra)"
            )),
        }
    }
}

impl fmt::Display for VideoFrameFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Yuv => f.write_str("yuv"),
            Self::Rgb(PackedLayout::Rgb24) => f.write_str("rgb24"),
            Self::Rgb(PackedLayout::Rgba) => f.write_str("rgba"),
            Self::Rgb(PackedLayout::Bgra) => f.write_str("bgra"),
        }
    }
}

/**
    Pixel payload of a [`VideoFrame`].
*/
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VideoPixels {
    /// Three planes, chroma planes `chroma_width x chroma_height` each.
    Yuv {
        luma: Vec<u8>,
        chroma_b: Vec<u8>,
        chroma_r: Vec<u8>,
        chroma_width: u32,
        chroma_height: u32,
    },
    /// Rows start every `linesize` bytes, which may exceed
    /// `width * layout.bytes_per_pixel()`.
    Rgb {
        data: Vec<u8>,
        linesize: usize,
        layout: PackedLayout,
    },
}

impl VideoPixels {
    pub fn format(&self) -> VideoFrameFormat {
        match self {
            Self::Yuv { .. } => VideoFrameFormat::Yuv,
            Self::Rgb { layout, .. } => VideoFrameFormat::Rgb(*layout),
        }
    }
}

/**
    A decoded, converted video frame.
*/
#[derive(Clone, Debug, PartialEq)]
pub struct VideoFrame {
    position: f64,
    duration: f64,
    width: u32,
    height: u32,
    pixels: VideoPixels,
}

impl VideoFrame {
    pub(crate) fn new(
        position: f64,
        duration: f64,
        width: u32,
        height: u32,
        pixels: VideoPixels,
    ) -> Self {
        Self {
            position,
            duration,
            width,
            height,
            pixels,
        }
    }

    /// Seconds from the start of the media.
    pub fn position(&self) -> f64 {
        self.position
    }

    /// Display time in seconds.
    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> VideoFrameFormat {
        self.pixels.format()
    }

    pub fn pixels(&self) -> &VideoPixels {
        &self.pixels
    }

    pub fn into_pixels(self) -> VideoPixels {
        self.pixels
    }
}

/**
    A decoded audio frame with interleaved samples.
*/
#[derive(Clone, Debug, PartialEq)]
pub struct AudioFrame {
    position: f64,
    duration: f64,
    samples: Vec<u8>,
    sample_count: usize,
    format: SampleFormat,
    sample_rate: u32,
    channels: ChannelLayout,
}

impl AudioFrame {
    pub(crate) fn from_raw(raw: ffmpeg_types::AudioFrame, position: f64, duration: f64) -> Self {
        Self {
            position,
            duration,
            samples: raw.data,
            sample_count: raw.samples,
            format: raw.format,
            sample_rate: raw.sample_rate,
            channels: raw.channels,
        }
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Interleaved sample bytes in [`format`](Self::format).
    pub fn samples(&self) -> &[u8] {
        &self.samples
    }

    /// Samples per channel.
    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    pub fn format(&self) -> SampleFormat {
        self.format
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> ChannelLayout {
        self.channels
    }

    pub fn into_samples(self) -> Vec<u8> {
        self.samples
    }
}

/**
    One unit of pump output.
*/
#[derive(Clone, Debug, PartialEq)]
pub enum Frame {
    Video(VideoFrame),
    Audio(AudioFrame),
}

impl Frame {
    pub fn kind(&self) -> StreamType {
        match self {
            Self::Video(_) => StreamType::Video,
            Self::Audio(_) => StreamType::Audio,
        }
    }

    pub fn position(&self) -> f64 {
        match self {
            Self::Video(frame) => frame.position(),
            Self::Audio(frame) => frame.position(),
        }
    }

    pub fn duration(&self) -> f64 {
        match self {
            Self::Video(frame) => frame.duration(),
            Self::Audio(frame) => frame.duration(),
        }
    }

    pub fn as_video(&self) -> Option<&VideoFrame> {
        match self {
            Self::Video(frame) => Some(frame),
            Self::Audio(_) => None,
        }
    }

    pub fn as_audio(&self) -> Option<&AudioFrame> {
        match self {
            Self::Audio(frame) => Some(frame),
            Self::Video(_) => None,
        }
    }
}
