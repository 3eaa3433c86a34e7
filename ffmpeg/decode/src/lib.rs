/*!
    Media decoding for the movie decoding pipeline.

    This crate turns encoded packets from `ffmpeg-source` into raw frames.
    Both decoders implement [`Decode`], the seam the frame pump drives.
*/

mod audio;
mod config;
mod session;
mod video;

use ffmpeg_types::{Packet, Result};

pub use audio::AudioDecoder;
pub use config::{AudioDecoderConfig, VideoDecoderConfig};
pub use video::VideoDecoder;

/**
    A codec session: packets in, frames out.

    Decoders may buffer internally, so one packet can produce zero, one or
    several frames, and frames still buffered at end of stream are only
    released by [`flush`](Decode::flush).
*/
pub trait Decode {
    type Frame;

    /**
        Decode one packet, returning every frame that became available.
    */
    fn decode(&mut self, packet: &Packet) -> Result<Vec<Self::Frame>>;

    /**
        Drain frames buffered inside the decoder at end of stream.
    */
    fn flush(&mut self) -> Result<Vec<Self::Frame>>;

    /**
        Discard buffered state, e.g. after a seek.
    */
    fn reset(&mut self);
}

impl Decode for VideoDecoder {
    type Frame = ffmpeg_types::VideoFrame;

    fn decode(&mut self, packet: &Packet) -> Result<Vec<Self::Frame>> {
        VideoDecoder::decode(self, packet)
    }

    fn flush(&mut self) -> Result<Vec<Self::Frame>> {
        VideoDecoder::flush(self)
    }

    fn reset(&mut self) {
        VideoDecoder::reset(self)
    }
}

impl Decode for AudioDecoder {
    type Frame = ffmpeg_types::AudioFrame;

    fn decode(&mut self, packet: &Packet) -> Result<Vec<Self::Frame>> {
        AudioDecoder::decode(self, packet)
    }

    fn flush(&mut self) -> Result<Vec<Self::Frame>> {
        AudioDecoder::flush(self)
    }

    fn reset(&mut self) {
        AudioDecoder::reset(self)
    }
}
