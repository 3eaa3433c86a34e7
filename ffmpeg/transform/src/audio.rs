/*!
    Sample rate, channel layout and sample format conversion with swresample.
*/

use ffmpeg_next::{
    software::resampling::context::Context as ResamplerContext,
    util::frame::audio::Audio as AudioFrameFFmpeg,
};
use tracing::debug;

use ffmpeg_source::{channel_layout_to_ffmpeg, sample_format_to_ffmpeg};
use ffmpeg_types::{AudioFrame, ChannelLayout, Error, Pts, Rational, Result, SampleFormat};

/**
    Packed audio format produced by an [`AudioTransform`].
*/
#[derive(Clone, Debug, PartialEq)]
pub struct AudioTransformConfig {
    pub sample_rate: u32,
    pub channels: ChannelLayout,
    pub format: SampleFormat,
}

impl AudioTransformConfig {
    pub fn new(sample_rate: u32, channels: ChannelLayout, format: SampleFormat) -> Self {
        Self {
            sample_rate,
            channels,
            format,
        }
    }

    /**
        48 kHz stereo `F32`.
    */
    pub fn playback() -> Self {
        Self::new(48000, ChannelLayout::Stereo, SampleFormat::F32)
    }
}

/// Input side of a resampler; a change rebuilds the context.
#[derive(Clone, Copy, Debug, PartialEq)]
struct InputFormat {
    sample_rate: u32,
    channels: ChannelLayout,
    format: SampleFormat,
}

impl InputFormat {
    fn of(frame: &AudioFrame) -> Self {
        Self {
            sample_rate: frame.sample_rate,
            channels: frame.channels,
            format: frame.format,
        }
    }
}

struct Resampler {
    context: ResamplerContext,
    input: InputFormat,
}

/**
    Converts interleaved audio frames to one fixed packed format.

    Resampling keeps state between frames: feed frames in stream order,
    [`flush`](Self::flush) at end of stream and [`reset`](Self::reset) after a
    seek.
*/
pub struct AudioTransform {
    config: AudioTransformConfig,
    resampler: Option<Resampler>,
}

impl AudioTransform {
    pub fn new(config: AudioTransformConfig) -> Self {
        Self {
            config,
            resampler: None,
        }
    }

    pub fn config(&self) -> &AudioTransformConfig {
        &self.config
    }

    /**
        Convert one frame. Timestamps are carried over from the input.
    */
    pub fn transform(&mut self, frame: &AudioFrame) -> Result<AudioFrame> {
        if frame.samples == 0 || frame.data.is_empty() {
            return Err(Error::invalid_data("audio frame carries no samples"));
        }

        let input = InputFormat::of(frame);
        if self.resampler.as_ref().is_none_or(|r| r.input != input) {
            self.resampler = Some(self.build_resampler(input)?);
        }

        let mut src = AudioFrameFFmpeg::new(
            sample_format_to_ffmpeg(frame.format)?,
            frame.samples,
            channel_layout_to_ffmpeg(frame.channels),
        );
        src.set_rate(frame.sample_rate);
        fill_packed(&mut src, frame)?;

        // Rate conversion can emit a few samples more than the input implies
        let capacity = if frame.sample_rate == self.config.sample_rate {
            frame.samples
        } else {
            let scaled = frame.samples as u64 * u64::from(self.config.sample_rate)
                / u64::from(frame.sample_rate.max(1));
            scaled as usize + 64
        };
        let mut dst = self.output_frame(capacity)?;

        let Some(resampler) = self.resampler.as_mut() else {
            return Err(Error::codec("resampler missing after setup"));
        };
        resampler
            .context
            .run(&src, &mut dst)
            .map_err(|e| Error::codec(format!("resampling failed: {}", e)))?;

        self.packed_frame(&dst, frame.pts, frame.time_base)
    }

    /**
        Drain samples the resampler still holds. `None` when it holds none.
    */
    pub fn flush(&mut self) -> Result<Option<AudioFrame>> {
        let Some(resampler) = self.resampler.as_ref() else {
            return Ok(None);
        };

        let pending = resampler
            .context
            .delay()
            .map_or(0, |delay| delay.output.max(0) as usize);
        if pending == 0 {
            return Ok(None);
        }

        let mut dst = self.output_frame(pending)?;
        let Some(resampler) = self.resampler.as_mut() else {
            return Ok(None);
        };
        if let Err(e) = resampler.context.flush(&mut dst) {
            if dst.samples() == 0 {
                return Ok(None);
            }
            return Err(Error::codec(format!("resampler flush failed: {}", e)));
        }
        if dst.samples() == 0 {
            return Ok(None);
        }

        // Drained samples have no timestamp of their own
        let time_base = Rational::new(1, self.config.sample_rate as i32);
        self.packed_frame(&dst, None, time_base).map(Some)
    }

    /**
        Drop buffered samples, e.g. after a seek.
    */
    pub fn reset(&mut self) {
        self.resampler = None;
    }

    fn build_resampler(&self, input: InputFormat) -> Result<Resampler> {
        let context = ResamplerContext::get(
            sample_format_to_ffmpeg(input.format)?,
            channel_layout_to_ffmpeg(input.channels),
            input.sample_rate,
            sample_format_to_ffmpeg(self.config.format)?,
            channel_layout_to_ffmpeg(self.config.channels),
            self.config.sample_rate,
        )
        .map_err(|e| Error::codec(format!("failed to create resampler: {}", e)))?;

        debug!(from = ?input, to = ?self.config, "created resampler");
        Ok(Resampler { context, input })
    }

    fn output_frame(&self, samples: usize) -> Result<AudioFrameFFmpeg> {
        let mut frame = AudioFrameFFmpeg::new(
            sample_format_to_ffmpeg(self.config.format)?,
            samples,
            channel_layout_to_ffmpeg(self.config.channels),
        );
        frame.set_rate(self.config.sample_rate);
        Ok(frame)
    }

    fn packed_frame(
        &self,
        frame: &AudioFrameFFmpeg,
        pts: Option<Pts>,
        time_base: Rational,
    ) -> Result<AudioFrame> {
        let samples = frame.samples();
        let len = samples
            * self.config.channels.channels() as usize
            * self.config.format.bytes_per_sample();
        let plane = frame.data(0);
        let data = plane.get(..len).ok_or_else(|| {
            Error::invalid_data(format!(
                "resampled plane has {} bytes, expected {}",
                plane.len(),
                len
            ))
        })?;

        Ok(AudioFrame::new(
            data.to_vec(),
            samples,
            self.config.sample_rate,
            self.config.channels,
            self.config.format,
            pts,
            time_base,
        ))
    }
}

/**
    Copy interleaved samples into the first plane of a packed FFmpeg frame.
*/
fn fill_packed(dst: &mut AudioFrameFFmpeg, src: &AudioFrame) -> Result<()> {
    let len = src.samples * src.channels.channels() as usize * src.format.bytes_per_sample();
    let Some(samples) = src.data.get(..len) else {
        return Err(Error::invalid_data(format!(
            "audio frame has {} bytes, expected {}",
            src.data.len(),
            len
        )));
    };

    let plane = dst.data_mut(0);
    let Some(target) = plane.get_mut(..len) else {
        return Err(Error::invalid_data(format!(
            "resampler input plane holds {} bytes, need {}",
            plane.len(),
            len
        )));
    };
    target.copy_from_slice(samples);
    Ok(())
}

impl std::fmt::Debug for AudioTransform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioTransform")
            .field("config", &self.config)
            .field("input", &self.resampler.as_ref().map(|r| r.input))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn silence(samples: usize, channels: ChannelLayout) -> AudioFrame {
        let count = channels.channels() as usize;
        AudioFrame::new(
            vec![0; samples * count * 2],
            samples,
            44100,
            channels,
            SampleFormat::S16,
            None,
            Rational::new(1, 44100),
        )
    }

    #[test]
    fn converts_sample_format_at_same_rate() {
        let mut transform = AudioTransform::new(AudioTransformConfig::new(
            44100,
            ChannelLayout::Stereo,
            SampleFormat::F32,
        ));

        let frame = transform
            .transform(&silence(1024, ChannelLayout::Stereo))
            .unwrap();
        assert_eq!(frame.format, SampleFormat::F32);
        assert_eq!(frame.samples, 1024);
        assert_eq!(frame.data.len(), 1024 * 2 * 4);
        assert!(frame.data.iter().all(|&b| b == 0));
    }

    #[test]
    fn downmixes_unnamed_layouts() {
        let mut transform = AudioTransform::new(AudioTransformConfig::new(
            44100,
            ChannelLayout::Stereo,
            SampleFormat::S16,
        ));

        let frame = transform
            .transform(&silence(256, ChannelLayout::Other(4)))
            .unwrap();
        assert_eq!(frame.channels, ChannelLayout::Stereo);
        assert_eq!(frame.data.len(), frame.samples * 2 * 2);
    }

    #[test]
    fn rejects_empty_frames() {
        let mut transform = AudioTransform::new(AudioTransformConfig::playback());
        assert!(transform.transform(&silence(0, ChannelLayout::Stereo)).is_err());
    }

    #[test]
    fn flush_before_use_is_empty() {
        let mut transform = AudioTransform::new(AudioTransformConfig::playback());
        assert!(transform.flush().unwrap().is_none());
        transform.reset();
        assert!(transform.flush().unwrap().is_none());
    }
}
