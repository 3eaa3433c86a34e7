/*!
    Video decoder implementation.
*/

use ffmpeg_next::{
    codec::decoder::Video as VideoDecoderFFmpeg,
    ffi,
    format::Pixel,
    software::scaling::{context::Context as ScalerContext, flag::Flags as ScalerFlags},
    util::frame::video::Video as VideoFrameFFmpeg,
};
use tracing::warn;

use ffmpeg_source::{CodecConfig, pixel_format_from_ffmpeg, video_frame_data};
use ffmpeg_types::{Error, MediaDuration, Packet, PixelFormat, Pts, Rational, Result, VideoFrame};

use crate::config::VideoDecoderConfig;
use crate::session::{open_decoder, packet_to_ffmpeg, send_eof, send_packet};

/**
    Video decoder.

    Decodes video packets into tightly packed frames. Frames whose native
    pixel format has no [`PixelFormat`] counterpart are converted to
    [`PixelFormat::Yuv420p`] before they leave the decoder.
*/
pub struct VideoDecoder {
    decoder: VideoDecoderFFmpeg,
    time_base: Rational,
    /// Reused receive buffer.
    frame: VideoFrameFFmpeg,
    normalizer: Option<Normalizer>,
}

/// Converts frames in an unsupported native format to YUV 4:2:0.
struct Normalizer {
    context: ScalerContext,
    src_format: Pixel,
    width: u32,
    height: u32,
}

impl VideoDecoder {
    /**
        Create a new video decoder from codec configuration.

        # Arguments

        * `codec_config` - Codec configuration from the source
        * `time_base` - Time base for the video stream
        * `config` - Decoder configuration

        # Errors

        - [`Error::CodecNotFound`] if no decoder exists for the codec
        - [`Error::OpenCodec`] if the decoder cannot be opened
        - [`Error::AllocateFrame`] if the receive frame cannot be allocated
    */
    pub fn new(
        codec_config: CodecConfig,
        time_base: Rational,
        config: VideoDecoderConfig,
    ) -> Result<Self> {
        ffmpeg_source::init()?;

        let decoder = open_decoder(&codec_config, config.thread_count)?
            .video()
            .map_err(|e| Error::open_codec(e.to_string()))?;

        let frame = VideoFrameFFmpeg::empty();
        // SAFETY: only checks the allocation result
        if unsafe { frame.as_ptr().is_null() } {
            return Err(Error::AllocateFrame);
        }

        Ok(Self {
            decoder,
            time_base,
            frame,
            normalizer: None,
        })
    }

    /**
        Get the time base for this decoder.
    */
    pub fn time_base(&self) -> Rational {
        self.time_base
    }

    pub fn width(&self) -> u32 {
        self.decoder.width()
    }

    pub fn height(&self) -> u32 {
        self.decoder.height()
    }

    /**
        The format frames come out in, `None` until the codec reports one.
    */
    pub fn output_format(&self) -> Option<PixelFormat> {
        match self.decoder.format() {
            Pixel::None => None,
            native => Some(pixel_format_from_ffmpeg(native).unwrap_or(PixelFormat::Yuv420p)),
        }
    }

    /**
        Decode a packet, returning decoded frames.

        May return zero, one, or multiple frames depending on codec buffering.
        B-frames cause the decoder to buffer frames internally.
    */
    pub fn decode(&mut self, packet: &Packet) -> Result<Vec<VideoFrame>> {
        // An empty packet would put the codec into draining mode
        if packet.data.is_empty() {
            return Ok(Vec::new());
        }

        let ffmpeg_pkt = packet_to_ffmpeg(packet);

        if send_packet(&mut self.decoder, &ffmpeg_pkt)? {
            return self.receive_frames();
        }

        // Decoder buffer full: drain frames, then retry once
        let mut frames = self.receive_frames()?;
        if send_packet(&mut self.decoder, &ffmpeg_pkt)? {
            frames.extend(self.receive_frames()?);
        }
        Ok(frames)
    }

    /**
        Flush the decoder to get any remaining buffered frames.

        Call this at end of stream to retrieve frames the decoder has buffered.
    */
    pub fn flush(&mut self) -> Result<Vec<VideoFrame>> {
        let mut frames = self.receive_frames()?;

        if !send_eof(&mut self.decoder)? {
            frames.extend(self.receive_frames()?);
            send_eof(&mut self.decoder)?;
        }

        frames.extend(self.receive_frames()?);
        Ok(frames)
    }

    /**
        Reset the decoder after a seek.

        Clears internal buffers so no frame from before the seek is returned.
    */
    pub fn reset(&mut self) {
        self.decoder.flush();
    }

    fn receive_frames(&mut self) -> Result<Vec<VideoFrame>> {
        let mut frames = Vec::new();
        let mut dropped = None;

        loop {
            match self.decoder.receive_frame(&mut self.frame) {
                Ok(()) => match self.convert_frame() {
                    Ok(frame) => frames.push(frame),
                    Err(e) => {
                        warn!(error = %e, "dropping unconvertible video frame");
                        dropped = Some(e);
                    }
                },
                Err(ffmpeg_next::Error::Other { errno }) if errno == ffi::EAGAIN => break,
                Err(ffmpeg_next::Error::Eof) => break,
                Err(e) => {
                    // Keep what was already decoded
                    if frames.is_empty() {
                        return Err(Error::codec(e.to_string()));
                    }
                    break;
                }
            }
        }

        // A packet whose every frame was dropped counts as a decode failure
        match dropped {
            Some(e) if frames.is_empty() => Err(e),
            _ => Ok(frames),
        }
    }

    /**
        Convert the frame in the receive buffer to our VideoFrame type.
    */
    fn convert_frame(&mut self) -> Result<VideoFrame> {
        let width = self.frame.width();
        let height = self.frame.height();
        if width == 0 || height == 0 {
            return Err(Error::invalid_data("frame has zero dimensions"));
        }

        let pts = self.frame.timestamp().or_else(|| self.frame.pts()).map(Pts);

        // SAFETY: reading plain fields of the frame we own
        let (duration, repeat_pict) = unsafe {
            let ptr = self.frame.as_ptr();
            ((*ptr).duration, (*ptr).repeat_pict)
        };

        let native = self.frame.format();
        let (format, data) = match pixel_format_from_ffmpeg(native) {
            Some(format) => (format, video_frame_data(&self.frame, format)?),
            None => (PixelFormat::Yuv420p, self.normalize(native, width, height)?),
        };

        Ok(
            VideoFrame::new(data, width, height, format, pts, self.time_base)
                .with_duration(Some(MediaDuration(duration)))
                .with_repeat_pict(repeat_pict),
        )
    }

    fn normalize(&mut self, native: Pixel, width: u32, height: u32) -> Result<Vec<u8>> {
        let stale = match &self.normalizer {
            Some(n) => n.src_format != native || n.width != width || n.height != height,
            None => true,
        };

        if stale {
            let context = ScalerContext::get(
                native,
                width,
                height,
                Pixel::YUV420P,
                width,
                height,
                ScalerFlags::BILINEAR,
            )
            .map_err(|e| Error::unsupported_format(format!("{:?}: {}", native, e)))?;

            self.normalizer = Some(Normalizer {
                context,
                src_format: native,
                width,
                height,
            });
        }

        let Some(normalizer) = self.normalizer.as_mut() else {
            return Err(Error::codec("pixel normalizer missing"));
        };

        let mut converted = VideoFrameFFmpeg::new(Pixel::YUV420P, width, height);
        normalizer
            .context
            .run(&self.frame, &mut converted)
            .map_err(|e| Error::codec(format!("pixel normalization failed: {}", e)))?;

        video_frame_data(&converted, PixelFormat::Yuv420p)
    }
}

impl std::fmt::Debug for VideoDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoDecoder")
            .field("time_base", &self.time_base)
            .field("format", &self.decoder.format())
            .field("normalizing", &self.normalizer.is_some())
            .finish_non_exhaustive()
    }
}
