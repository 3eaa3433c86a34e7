/*!
    Raw decoded frame types.

    These are what the decoders hand out: tightly packed pixel or sample data
    plus the timing information needed to place them on the timeline.
*/

use crate::{ChannelLayout, MediaDuration, PixelFormat, Pts, Rational, SampleFormat};

/**
    A raw decoded video frame.

    Pixel data is tightly packed (no row padding), plane after plane, in the
    layout described by [`PixelFormat::plane_dimensions`].
*/
#[derive(Clone, Debug)]
pub struct VideoFrame {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    /// Best-effort presentation timestamp.
    pub pts: Option<Pts>,
    /// Duration reported by the demuxer for the originating packet.
    pub duration: Option<MediaDuration>,
    /// Extra field repeats signalled by the codec (`repeat_pict`).
    pub repeat_pict: i32,
    pub time_base: Rational,
}

impl VideoFrame {
    pub fn new(
        data: Vec<u8>,
        width: u32,
        height: u32,
        format: PixelFormat,
        pts: Option<Pts>,
        time_base: Rational,
    ) -> Self {
        Self {
            data,
            width,
            height,
            format,
            pts,
            duration: None,
            repeat_pict: 0,
            time_base,
        }
    }

    pub fn with_duration(mut self, duration: Option<MediaDuration>) -> Self {
        self.duration = duration.filter(|d| d.0 > 0);
        self
    }

    pub fn with_repeat_pict(mut self, repeat_pict: i32) -> Self {
        self.repeat_pict = repeat_pict.max(0);
        self
    }

    /**
        Presentation time in seconds, if the frame carries a timestamp.
    */
    pub fn pts_seconds(&self) -> Option<f64> {
        self.pts.map(|pts| pts.to_seconds(self.time_base))
    }

    /**
        Split the packed data into its planes.

        Returns an error if the buffer is shorter than the format requires.
    */
    pub fn planes(&self) -> crate::Result<Vec<&[u8]>> {
        let dims = self.format.plane_dimensions(self.width, self.height);
        let needed: usize = dims.iter().map(|d| d.len()).sum();
        if self.data.len() < needed {
            return Err(crate::Error::invalid_data(format!(
                "video frame has {} bytes, {:?} {}x{} needs {}",
                self.data.len(),
                self.format,
                self.width,
                self.height,
                needed
            )));
        }

        let mut planes = Vec::with_capacity(dims.len());
        let mut offset = 0;
        for dim in dims {
            planes.push(&self.data[offset..offset + dim.len()]);
            offset += dim.len();
        }
        Ok(planes)
    }
}

/**
    A raw decoded audio frame with interleaved samples.
*/
#[derive(Clone, Debug)]
pub struct AudioFrame {
    pub data: Vec<u8>,
    /// Number of samples per channel.
    pub samples: usize,
    pub sample_rate: u32,
    pub channels: ChannelLayout,
    pub format: SampleFormat,
    pub pts: Option<Pts>,
    pub time_base: Rational,
}

impl AudioFrame {
    pub fn new(
        data: Vec<u8>,
        samples: usize,
        sample_rate: u32,
        channels: ChannelLayout,
        format: SampleFormat,
        pts: Option<Pts>,
        time_base: Rational,
    ) -> Self {
        Self {
            data,
            samples,
            sample_rate,
            channels,
            format,
            pts,
            time_base,
        }
    }

    /**
        Playback duration in seconds derived from the sample count.
    */
    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples as f64 / self.sample_rate as f64
    }

    pub fn pts_seconds(&self) -> Option<f64> {
        self.pts.map(|pts| pts.to_seconds(self.time_base))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn video_frame_planes_split_by_geometry() {
        let data: Vec<u8> = (0..12).collect();
        let frame = VideoFrame::new(data, 4, 2, PixelFormat::Yuv420p, None, Rational::new(1, 30));
        let planes = frame.planes().unwrap();
        assert_eq!(planes.len(), 3);
        assert_eq!(planes[0], &[0, 1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(planes[1], &[8, 9]);
        assert_eq!(planes[2], &[10, 11]);
    }

    #[test]
    fn video_frame_planes_reject_short_buffer() {
        let frame = VideoFrame::new(vec![0; 5], 4, 2, PixelFormat::Yuv420p, None, Rational::new(1, 30));
        assert!(frame.planes().is_err());
    }

    #[test]
    fn video_frame_ignores_non_positive_duration() {
        let frame = VideoFrame::new(vec![], 2, 2, PixelFormat::Rgb24, Some(Pts(3)), Rational::new(1, 30))
            .with_duration(Some(MediaDuration(0)))
            .with_repeat_pict(-1);
        assert_eq!(frame.duration, None);
        assert_eq!(frame.repeat_pict, 0);
        assert_eq!(frame.pts_seconds(), Some(0.1));
    }

    #[test]
    fn audio_frame_duration() {
        let frame = AudioFrame::new(
            vec![0; 4096],
            1024,
            48000,
            ChannelLayout::Stereo,
            SampleFormat::S16,
            None,
            Rational::new(1, 48000),
        );
        assert!((frame.duration_seconds() - 1024.0 / 48000.0).abs() < 1e-12);
    }
}
