/*!
    Pixel conversion from decoder output to caller-facing frames.
*/

use ffmpeg_transform::{VideoTransform, VideoTransformConfig};
use ffmpeg_types::{PixelFormat, Result, VideoFrame as RawVideoFrame};

use crate::frame::{VideoFrame, VideoFrameFormat, VideoPixels};

/**
    Turns raw decoded video frames into [`VideoFrame`]s in one fixed output
    format.

    Three-plane YUV passes straight through when YUV output is configured.
    Everything else goes through swscale, whose context is created on first
    use and kept for as long as the source geometry stays the same.
*/
#[derive(Debug)]
pub struct PixelConverter {
    format: VideoFrameFormat,
    transform: Option<VideoTransform>,
}

impl PixelConverter {
    pub fn new(format: VideoFrameFormat) -> Self {
        Self {
            format,
            transform: None,
        }
    }

    pub fn format(&self) -> VideoFrameFormat {
        self.format
    }

    pub(crate) fn set_format(&mut self, format: VideoFrameFormat) {
        if self.format != format {
            self.format = format;
            self.transform = None;
        }
    }

    /**
        Convert one raw frame, attaching the given timing.
    */
    pub fn convert(
        &mut self,
        raw: &RawVideoFrame,
        position: f64,
        duration: f64,
    ) -> Result<VideoFrame> {
        let pixels = match self.format {
            VideoFrameFormat::Yuv if raw.format.is_three_plane_yuv() => split_planes(raw)?,
            VideoFrameFormat::Yuv => {
                // Semi-planar and high bit depth frames are brought down to 4:2:0
                let converted = self.transform_to(PixelFormat::Yuv420p).transform(raw)?;
                split_planes(&converted)?
            }
            VideoFrameFormat::Rgb(layout) => {
                let image = self.transform_to(layout.pixel_format()).transform_packed(raw)?;
                VideoPixels::Rgb {
                    data: image.data,
                    linesize: image.linesize,
                    layout,
                }
            }
        };

        Ok(VideoFrame::new(position, duration, raw.width, raw.height, pixels))
    }

    fn transform_to(&mut self, target: PixelFormat) -> &mut VideoTransform {
        if self
            .transform
            .as_ref()
            .is_some_and(|t| t.config().format != target)
        {
            self.transform = None;
        }

        self.transform
            .get_or_insert_with(|| VideoTransform::new(VideoTransformConfig::new(target)))
    }
}

fn split_planes(raw: &RawVideoFrame) -> Result<VideoPixels> {
    let planes = raw.planes()?;
    let (chroma_width, chroma_height) = raw
        .format
        .chroma_size(raw.width, raw.height)
        .unwrap_or((raw.width, raw.height));

    let [luma, chroma_b, chroma_r] = planes.as_slice() else {
        return Err(ffmpeg_types::Error::unsupported_format(format!(
            "{:?} does not have three planes",
            raw.format
        )));
    };

    Ok(VideoPixels::Yuv {
        luma: luma.to_vec(),
        chroma_b: chroma_b.to_vec(),
        chroma_r: chroma_r.to_vec(),
        chroma_width,
        chroma_height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::PackedLayout;
    use ffmpeg_types::Rational;

    fn yuv420(width: u32, height: u32) -> RawVideoFrame {
        let size = PixelFormat::Yuv420p.frame_size(width, height);
        let data = (0..size).map(|i| (i % 251) as u8).collect();
        RawVideoFrame::new(data, width, height, PixelFormat::Yuv420p, None, Rational::new(1, 25))
    }

    #[test]
    fn yuv_passthrough_rounds_odd_chroma_up() {
        let mut converter = PixelConverter::new(VideoFrameFormat::Yuv);
        let frame = converter.convert(&yuv420(5, 3), 1.0, 0.04).unwrap();

        assert_eq!((frame.width(), frame.height()), (5, 3));
        assert_eq!(frame.position(), 1.0);
        let VideoPixels::Yuv {
            luma,
            chroma_b,
            chroma_r,
            chroma_width,
            chroma_height,
        } = frame.pixels()
        else {
            panic!("expected yuv planes");
        };
        assert_eq!((*chroma_width, *chroma_height), (3, 2));
        assert_eq!(luma.len(), 15);
        assert_eq!(chroma_b.len(), 6);
        assert_eq!(chroma_r.len(), 6);
        assert_eq!(luma, &(0..15).collect::<Vec<u8>>());
    }

    #[test]
    fn nv12_is_converted_for_yuv_output() {
        let size = PixelFormat::Nv12.frame_size(8, 4);
        let raw = RawVideoFrame::new(
            vec![128; size],
            8,
            4,
            PixelFormat::Nv12,
            None,
            Rational::new(1, 25),
        );

        let mut converter = PixelConverter::new(VideoFrameFormat::Yuv);
        let frame = converter.convert(&raw, 0.0, 0.04).unwrap();
        let VideoPixels::Yuv { chroma_b, .. } = frame.pixels() else {
            panic!("expected yuv planes");
        };
        assert_eq!(chroma_b.len(), 4 * 2);
    }

    #[test]
    fn rgb_output_reports_linesize() {
        let mut converter = PixelConverter::new(VideoFrameFormat::Rgb(PackedLayout::Rgb24));
        let frame = converter.convert(&yuv420(10, 4), 0.0, 0.04).unwrap();

        let VideoPixels::Rgb {
            data,
            linesize,
            layout,
        } = frame.pixels()
        else {
            panic!("expected packed pixels");
        };
        assert_eq!(*layout, PackedLayout::Rgb24);
        assert!(*linesize >= 10 * 3);
        assert!(data.len() >= linesize * 4);
    }

    #[test]
    fn conversion_is_idempotent() {
        let raw = yuv420(17, 9);
        for format in [
            VideoFrameFormat::Yuv,
            VideoFrameFormat::Rgb(PackedLayout::Rgba),
            VideoFrameFormat::Rgb(PackedLayout::Bgra),
        ] {
            let mut converter = PixelConverter::new(format);
            let first = converter.convert(&raw, 0.5, 0.04).unwrap();
            let second = converter.convert(&raw, 0.5, 0.04).unwrap();
            assert_eq!(first, second);
            assert_eq!(first.format(), format);
        }
    }

    #[test]
    fn changing_format_rebuilds_scaler() {
        let raw = yuv420(4, 4);
        let mut converter = PixelConverter::new(VideoFrameFormat::Rgb(PackedLayout::Rgb24));
        converter.convert(&raw, 0.0, 0.04).unwrap();

        converter.set_format(VideoFrameFormat::Rgb(PackedLayout::Bgra));
        let frame = converter.convert(&raw, 0.0, 0.04).unwrap();
        assert_eq!(frame.format(), VideoFrameFormat::Rgb(PackedLayout::Bgra));
    }
}
