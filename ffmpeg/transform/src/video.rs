/*!
    Video frame transformation.
*/

use ffmpeg_next::{
    software::scaling::{context::Context as ScalerContext, flag::Flags as ScalerFlags},
    util::frame::video::Video as VideoFrameFFmpeg,
};
use tracing::debug;

use ffmpeg_source::{fill_video_frame, pixel_format_to_ffmpeg, video_frame_data};
use ffmpeg_types::{Error, PixelFormat, Result, VideoFrame};

/**
    Target of a video transformation.

    Frames keep their size; only the pixel layout changes.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VideoTransformConfig {
    pub format: PixelFormat,
}

impl VideoTransformConfig {
    pub fn new(format: PixelFormat) -> Self {
        Self { format }
    }
}

/**
    One packed image exactly as swscale wrote it.

    Rows are `linesize` bytes apart; `linesize` may exceed
    `width * bytes_per_pixel` because of FFmpeg's stride alignment, and the
    padding bytes are zeroed.
*/
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PackedImage {
    pub data: Vec<u8>,
    pub linesize: usize,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
}

/**
    Pixel format converter backed by swscale.

    The scaler context is created on first use and rebuilt whenever the
    input size or format changes.
*/
pub struct VideoTransform {
    config: VideoTransformConfig,
    /// Cached scaler context and the input format it was created for.
    scaler_state: Option<ScalerState>,
}

struct ScalerState {
    context: ScalerContext,
    src_width: u32,
    src_height: u32,
    src_format: PixelFormat,
}

impl VideoTransform {
    /**
        Create a new video transformer with the given configuration.
    */
    pub fn new(config: VideoTransformConfig) -> Self {
        Self {
            config,
            scaler_state: None,
        }
    }

    /**
        Get the target configuration.
    */
    pub fn config(&self) -> &VideoTransformConfig {
        &self.config
    }

    /**
        Transform a video frame to the target format, tightly packed.
    */
    pub fn transform(&mut self, frame: &VideoFrame) -> Result<VideoFrame> {
        let dst_frame = self.scale(frame)?;
        let data = video_frame_data(&dst_frame, self.config.format)?;

        Ok(VideoFrame::new(
            data,
            dst_frame.width(),
            dst_frame.height(),
            self.config.format,
            frame.pts,
            frame.time_base,
        )
        .with_duration(frame.duration)
        .with_repeat_pict(frame.repeat_pict))
    }

    /**
        Transform a video frame to a packed target format, keeping the row
        stride swscale produced.

        Fails with [`Error::UnsupportedFormat`] if the target format is planar.
    */
    pub fn transform_packed(&mut self, frame: &VideoFrame) -> Result<PackedImage> {
        if self.config.format.packed_bytes_per_pixel().is_none() {
            return Err(Error::unsupported_format(format!(
                "{:?} is not a packed pixel format",
                self.config.format
            )));
        }

        let dst_frame = self.scale(frame)?;
        Ok(PackedImage {
            data: dst_frame.data(0).to_vec(),
            linesize: dst_frame.stride(0),
            width: dst_frame.width(),
            height: dst_frame.height(),
            format: self.config.format,
        })
    }

    fn scale(&mut self, frame: &VideoFrame) -> Result<VideoFrameFFmpeg> {
        if frame.width == 0 || frame.height == 0 {
            return Err(Error::invalid_data("input frame has zero dimensions"));
        }

        if frame.data.is_empty() {
            return Err(Error::invalid_data("input frame has no data"));
        }

        let needs_init = match &self.scaler_state {
            None => true,
            Some(state) => {
                state.src_width != frame.width
                    || state.src_height != frame.height
                    || state.src_format != frame.format
            }
        };

        if needs_init {
            self.init_scaler(frame)?;
        }

        let Some(state) = self.scaler_state.as_mut() else {
            return Err(Error::codec("scaler not initialized"));
        };

        let src_pixel = pixel_format_to_ffmpeg(frame.format)?;
        let mut src_frame = VideoFrameFFmpeg::new(src_pixel, frame.width, frame.height);
        zero_planes(&mut src_frame);
        fill_video_frame(&mut src_frame, frame)?;

        let dst_pixel = pixel_format_to_ffmpeg(self.config.format)?;
        let mut dst_frame = VideoFrameFFmpeg::new(dst_pixel, frame.width, frame.height);
        zero_planes(&mut dst_frame);

        state
            .context
            .run(&src_frame, &mut dst_frame)
            .map_err(|e| Error::codec(format!("scaling failed: {}", e)))?;

        Ok(dst_frame)
    }

    fn init_scaler(&mut self, frame: &VideoFrame) -> Result<()> {
        let src_pixel = pixel_format_to_ffmpeg(frame.format)?;
        let dst_pixel = pixel_format_to_ffmpeg(self.config.format)?;

        let context = ScalerContext::get(
            src_pixel,
            frame.width,
            frame.height,
            dst_pixel,
            frame.width,
            frame.height,
            ScalerFlags::BILINEAR,
        )
        .map_err(|e| Error::codec(format!("failed to create scaler: {}", e)))?;

        debug!(
            src = ?frame.format,
            dst = ?self.config.format,
            width = frame.width,
            height = frame.height,
            "created scaler"
        );

        self.scaler_state = Some(ScalerState {
            context,
            src_width: frame.width,
            src_height: frame.height,
            src_format: frame.format,
        });

        Ok(())
    }
}

/**
    Clear a freshly allocated frame, row padding included.

    SIMD paths in swscale read and write a few bytes past the visible width;
    with the padding zeroed the same input always yields the same bytes.
*/
fn zero_planes(frame: &mut VideoFrameFFmpeg) {
    for plane in 0..frame.planes() {
        frame.data_mut(plane).fill(0);
    }
}

impl std::fmt::Debug for VideoTransform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoTransform")
            .field("config", &self.config)
            .field("initialized", &self.scaler_state.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ffmpeg_types::Rational;

    fn gray_yuv(width: u32, height: u32) -> VideoFrame {
        let luma = (width * height) as usize;
        let chroma = PixelFormat::Yuv420p.frame_size(width, height) - luma;
        let mut data = vec![128u8; luma];
        data.extend(std::iter::repeat_n(128u8, chroma));
        VideoFrame::new(data, width, height, PixelFormat::Yuv420p, None, Rational::new(1, 25))
    }

    #[test]
    fn packed_output_reports_stride() {
        let mut transform = VideoTransform::new(VideoTransformConfig::new(PixelFormat::Rgb24));
        let image = transform.transform_packed(&gray_yuv(10, 4)).unwrap();

        assert_eq!((image.width, image.height), (10, 4));
        assert!(image.linesize >= 30);
        assert_eq!(image.data.len(), image.linesize * 4);
    }

    #[test]
    fn conversion_is_deterministic() {
        let frame = gray_yuv(16, 8);
        let mut transform = VideoTransform::new(VideoTransformConfig::new(PixelFormat::Rgba));

        let first = transform.transform_packed(&frame).unwrap();
        let second = transform.transform_packed(&frame).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn planar_target_rejected_for_packed_output() {
        let mut transform =
            VideoTransform::new(VideoTransformConfig::new(PixelFormat::Yuv444p));
        assert!(matches!(
            transform.transform_packed(&gray_yuv(4, 4)),
            Err(Error::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn transform_keeps_size_and_rebuilds_on_resize() {
        let mut transform = VideoTransform::new(VideoTransformConfig::new(PixelFormat::Bgra));

        let frame = transform.transform(&gray_yuv(16, 8)).unwrap();
        assert_eq!((frame.width, frame.height), (16, 8));
        assert_eq!(frame.data.len(), 16 * 8 * 4);

        let frame = transform.transform(&gray_yuv(6, 4)).unwrap();
        assert_eq!((frame.width, frame.height), (6, 4));
        assert_eq!(frame.data.len(), 6 * 4 * 4);
    }
}
