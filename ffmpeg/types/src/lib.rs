/*!
    Shared types for the movie decoding pipeline.

    This crate defines the vocabulary of the pipeline: the types that cross crate
    boundaries. It has no dependency on FFmpeg, making it lightweight and enabling
    consumers to depend on it without pulling in FFmpeg bindings.

    # Core Types

    - [`Rational`] - Rational numbers for time bases and frame rates
    - [`Pts`] and [`MediaDuration`] - Timestamps in time_base units
    - [`VideoFrame`] and [`AudioFrame`] - Raw decoded frame data
    - [`Packet`] - Encoded packet data

    # Format Types

    - [`PixelFormat`] and [`PlaneDimensions`] - Video pixel formats and plane geometry
    - [`SampleFormat`] - Audio sample formats
    - [`ChannelLayout`] - Audio channel layouts
    - [`CodecId`] - Codec identifiers

    # Stream Information

    - [`StreamDescriptor`] - Immutable metadata for a selected stream
    - [`VideoStreamInfo`] and [`AudioStreamInfo`] - Stream metadata
    - [`MediaInfo`] - Combined media information

    # Error Handling

    - [`Error`], [`MovieErrorKind`] and [`Result`] - Common error types
*/

mod codec;
mod error;
mod format;
mod frame;
mod packet;
mod rational;
mod stream;
mod timestamp;

pub use codec::CodecId;
pub use error::{Error, MovieErrorKind, Result};
pub use format::{ChannelLayout, PixelFormat, PlaneDimensions, SampleFormat};
pub use frame::{AudioFrame, VideoFrame};
pub use packet::{Packet, StreamType};
pub use rational::Rational;
pub use stream::{AudioStreamInfo, MediaInfo, StreamDescriptor, VideoStreamInfo};
pub use timestamp::{MediaDuration, Pts};
