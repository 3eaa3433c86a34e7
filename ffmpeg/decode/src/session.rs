/*!
    Codec setup and packet submission shared by both decoders.
*/

use ffmpeg_next::{
    codec::{self, decoder::Decoder, decoder::Opened},
    ffi,
    packet::Mut as PacketMut,
};
use tracing::debug;

use ffmpeg_source::CodecConfig;
use ffmpeg_types::{Error, Packet, Result};

/**
    Find and open a decoder for the stream's codec.

    # Errors

    - [`Error::CodecNotFound`] if FFmpeg has no decoder for the codec
    - [`Error::OpenCodec`] if the decoder context cannot be set up or opened
*/
pub(crate) fn open_decoder(codec_config: &CodecConfig, thread_count: Option<usize>) -> Result<Opened> {
    let id = codec_config.ffmpeg_codec_id();
    let codec = codec::decoder::find(id).ok_or_else(|| Error::codec_not_found(id.name()))?;

    let mut context = codec::context::Context::from_parameters(codec_config.parameters().clone())
        .map_err(|e| Error::open_codec(format!("{}: {}", id.name(), e)))?;

    if let Some(count) = thread_count {
        // SAFETY: the context is not open yet; FFmpeg reads thread_count when opening
        unsafe {
            (*context.as_mut_ptr()).thread_count = count.min(i32::MAX as usize) as i32;
        }
    }

    let opened = context
        .decoder()
        .open_as(codec)
        .map_err(|e| Error::open_codec(format!("{}: {}", id.name(), e)))?;

    debug!(codec = id.name(), threads = ?thread_count, "opened decoder");
    Ok(opened)
}

/**
    Build an FFmpeg packet carrying our packet's payload and timing.
*/
pub(crate) fn packet_to_ffmpeg(packet: &Packet) -> ffmpeg_next::Packet {
    let mut ffmpeg_pkt = ffmpeg_next::Packet::copy(&packet.data);

    // SAFETY: the packet was just allocated and is exclusively owned here
    unsafe {
        let pkt_ptr = ffmpeg_pkt.as_mut_ptr();
        if let Some(pts) = packet.pts {
            (*pkt_ptr).pts = pts.0;
        }
        if let Some(dts) = packet.dts {
            (*pkt_ptr).dts = dts.0;
        }
        (*pkt_ptr).duration = packet.duration.0;
        if packet.is_keyframe {
            (*pkt_ptr).flags |= ffi::AV_PKT_FLAG_KEY;
        }
    }

    ffmpeg_pkt
}

/**
    Submit a packet. Returns false when the decoder is full (EAGAIN) and
    frames must be received before it accepts more input.
*/
pub(crate) fn send_packet(decoder: &mut Decoder, packet: &ffmpeg_next::Packet) -> Result<bool> {
    match decoder.send_packet(packet) {
        Ok(()) => Ok(true),
        Err(ffmpeg_next::Error::Other { errno }) if errno == ffi::EAGAIN => Ok(false),
        Err(e) => Err(Error::codec(e.to_string())),
    }
}

/**
    Signal end of stream. Returns false when frames must be drained first.
*/
pub(crate) fn send_eof(decoder: &mut Decoder) -> Result<bool> {
    match decoder.send_eof() {
        Ok(()) => Ok(true),
        Err(ffmpeg_next::Error::Other { errno }) if errno == ffi::EAGAIN => Ok(false),
        // Already at EOF, that's fine
        Err(ffmpeg_next::Error::Eof) => Ok(true),
        Err(e) => Err(Error::codec(e.to_string())),
    }
}
