/*!
    Audio decoder implementation.
*/

use ffmpeg_next::{
    codec::decoder::Audio as AudioDecoderFFmpeg, ffi, util::frame::audio::Audio as AudioFrameFFmpeg,
};
use tracing::warn;

use ffmpeg_source::{CodecConfig, channel_layout_from_count, sample_format_from_ffmpeg};
use ffmpeg_types::{AudioFrame, Error, Packet, Pts, Rational, Result, SampleFormat};

use crate::config::AudioDecoderConfig;
use crate::session::{open_decoder, packet_to_ffmpeg, send_eof, send_packet};

/**
    Audio decoder.

    Decodes audio packets into frames with interleaved samples.
*/
pub struct AudioDecoder {
    decoder: AudioDecoderFFmpeg,
    time_base: Rational,
    frame: AudioFrameFFmpeg,
}

impl AudioDecoder {
    /**
        Create a new audio decoder from codec configuration.

        # Arguments

        * `codec_config` - Codec configuration from the source
        * `time_base` - Time base for the audio stream
        * `config` - Decoder configuration

        # Errors

        Same as [`VideoDecoder::new`](crate::VideoDecoder::new).
    */
    pub fn new(
        codec_config: CodecConfig,
        time_base: Rational,
        config: AudioDecoderConfig,
    ) -> Result<Self> {
        ffmpeg_source::init()?;

        let decoder = open_decoder(&codec_config, config.thread_count)?
            .audio()
            .map_err(|e| Error::open_codec(e.to_string()))?;

        let frame = AudioFrameFFmpeg::empty();
        // SAFETY: only checks the allocation result
        if unsafe { frame.as_ptr().is_null() } {
            return Err(Error::AllocateFrame);
        }

        Ok(Self {
            decoder,
            time_base,
            frame,
        })
    }

    /**
        Get the time base for this decoder.
    */
    pub fn time_base(&self) -> Rational {
        self.time_base
    }

    /**
        Get the sample rate of the decoded audio.
    */
    pub fn sample_rate(&self) -> u32 {
        self.decoder.rate()
    }

    /**
        Get the number of channels.
    */
    pub fn channels(&self) -> u16 {
        self.decoder.channels() as u16
    }

    /**
        Decode a packet, returning decoded frames.

        May return zero, one, or multiple frames depending on codec.
    */
    pub fn decode(&mut self, packet: &Packet) -> Result<Vec<AudioFrame>> {
        // An empty packet would put the codec into draining mode
        if packet.data.is_empty() {
            return Ok(Vec::new());
        }

        let ffmpeg_pkt = packet_to_ffmpeg(packet);

        if send_packet(&mut self.decoder, &ffmpeg_pkt)? {
            return self.receive_frames();
        }

        let mut frames = self.receive_frames()?;
        if send_packet(&mut self.decoder, &ffmpeg_pkt)? {
            frames.extend(self.receive_frames()?);
        }
        Ok(frames)
    }

    /**
        Flush the decoder to get any remaining buffered frames.
    */
    pub fn flush(&mut self) -> Result<Vec<AudioFrame>> {
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
    */
    pub fn reset(&mut self) {
        self.decoder.flush();
    }

    fn receive_frames(&mut self) -> Result<Vec<AudioFrame>> {
        let mut frames = Vec::new();
        let mut dropped = None;

        loop {
            match self.decoder.receive_frame(&mut self.frame) {
                Ok(()) => match convert_frame(&self.frame, self.time_base) {
                    Ok(frame) => frames.push(frame),
                    Err(e) => {
                        warn!(error = %e, "dropping unconvertible audio frame");
                        dropped = Some(e);
                    }
                },
                Err(ffmpeg_next::Error::Other { errno }) if errno == ffi::EAGAIN => break,
                Err(ffmpeg_next::Error::Eof) => break,
                Err(e) => {
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
}

/**
    Convert an FFmpeg audio frame to our AudioFrame type.
*/
fn convert_frame(frame: &AudioFrameFFmpeg, time_base: Rational) -> Result<AudioFrame> {
    let samples = frame.samples();
    let sample_rate = frame.rate();
    let channel_count = frame.channels() as u16;

    if samples == 0 {
        return Err(Error::invalid_data("audio frame has zero samples"));
    }

    if frame.planes() == 0 {
        return Err(Error::invalid_data(
            "audio frame has no data planes (linesize is 0)",
        ));
    }

    let ffmpeg_format = frame.format();
    let format = sample_format_from_ffmpeg(ffmpeg_format).ok_or_else(|| {
        Error::unsupported_format(format!("unsupported sample format: {:?}", ffmpeg_format))
    })?;

    let channels = channel_layout_from_count(channel_count)
        .ok_or_else(|| Error::invalid_data("audio frame has no channels"))?;

    let pts = frame.timestamp().or_else(|| frame.pts()).map(Pts);
    let data = copy_audio_data(frame, format, samples, channel_count)?;

    Ok(AudioFrame::new(
        data,
        samples,
        sample_rate,
        channels,
        format,
        pts,
        time_base,
    ))
}

/**
    Copy audio data from an FFmpeg frame, interleaving planar layouts.

    In planar audio only linesize[0] is set; every plane has that size, so
    planes past the first are read through the raw data pointers.
*/
fn copy_audio_data(
    frame: &AudioFrameFFmpeg,
    format: SampleFormat,
    samples: usize,
    channels: u16,
) -> Result<Vec<u8>> {
    let bytes_per_sample = format.bytes_per_sample();
    let channels = channels as usize;
    let total_bytes = samples * channels * bytes_per_sample;
    let plane_bytes = samples * bytes_per_sample;

    if frame.is_planar() && frame.planes() >= channels {
        let plane_size = frame.data(0).len();
        if plane_size < plane_bytes {
            return Err(Error::invalid_data(format!(
                "audio plane size {} is less than expected {} bytes for {} samples",
                plane_size, plane_bytes, samples
            )));
        }

        let mut output = vec![0u8; total_bytes];
        for ch in 0..channels {
            // SAFETY: planar frames allocate `channels` planes of plane_size bytes
            let plane = unsafe {
                let ptr = (*frame.as_ptr()).extended_data.add(ch).read();
                std::slice::from_raw_parts(ptr, plane_size)
            };

            for s in 0..samples {
                let src = s * bytes_per_sample;
                let dst = (s * channels + ch) * bytes_per_sample;
                output[dst..dst + bytes_per_sample]
                    .copy_from_slice(&plane[src..src + bytes_per_sample]);
            }
        }

        Ok(output)
    } else {
        let data = frame.data(0);
        if data.len() < total_bytes {
            return Err(Error::invalid_data(format!(
                "packed audio data has {} bytes, expected at least {}",
                data.len(),
                total_bytes
            )));
        }
        Ok(data[..total_bytes].to_vec())
    }
}

impl std::fmt::Debug for AudioDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioDecoder")
            .field("time_base", &self.time_base)
            .field("sample_rate", &self.decoder.rate())
            .field("channels", &self.decoder.channels())
            .finish_non_exhaustive()
    }
}
