/*!
    Conversion utilities between ffmpeg-next types and ffmpeg-types.

    Shared by the decode and transform crates so every stage of the pipeline
    agrees on how formats and plane layouts map onto FFmpeg.
*/

use ffmpeg_next::{
    ChannelLayout as FFmpegChannelLayout, format::Pixel, format::Sample,
    util::frame::video::Video as VideoFrameFFmpeg,
};

use ffmpeg_types::{
    ChannelLayout, CodecId, Error, MediaDuration, PixelFormat, Pts, Rational, Result,
    SampleFormat, VideoFrame,
};

/**
    Convert ffmpeg_next::Rational to our Rational.
*/
pub fn rational_from_ffmpeg(r: ffmpeg_next::Rational) -> Rational {
    Rational::new(r.numerator(), r.denominator())
}

/**
    Convert ffmpeg_next pixel format to our PixelFormat.

    Full-range JPEG variants map onto their limited-range counterparts since
    their plane layout is identical.
*/
pub fn pixel_format_from_ffmpeg(format: Pixel) -> Option<PixelFormat> {
    match format {
        Pixel::YUV420P | Pixel::YUVJ420P => Some(PixelFormat::Yuv420p),
        Pixel::YUV422P | Pixel::YUVJ422P => Some(PixelFormat::Yuv422p),
        Pixel::YUV444P | Pixel::YUVJ444P => Some(PixelFormat::Yuv444p),
        Pixel::NV12 => Some(PixelFormat::Nv12),
        Pixel::BGRA => Some(PixelFormat::Bgra),
        Pixel::RGBA => Some(PixelFormat::Rgba),
        Pixel::RGB24 => Some(PixelFormat::Rgb24),
        Pixel::BGR24 => Some(PixelFormat::Bgr24),
        Pixel::YUV420P10LE => Some(PixelFormat::Yuv420p10),
        Pixel::P010LE => Some(PixelFormat::P010le),
        _ => None,
    }
}

/**
    Convert our PixelFormat to FFmpeg's Pixel format.
*/
pub fn pixel_format_to_ffmpeg(format: PixelFormat) -> Result<Pixel> {
    match format {
        PixelFormat::Yuv420p => Ok(Pixel::YUV420P),
        PixelFormat::Nv12 => Ok(Pixel::NV12),
        PixelFormat::Bgra => Ok(Pixel::BGRA),
        PixelFormat::Rgba => Ok(Pixel::RGBA),
        PixelFormat::Rgb24 => Ok(Pixel::RGB24),
        PixelFormat::Bgr24 => Ok(Pixel::BGR24),
        PixelFormat::Yuv422p => Ok(Pixel::YUV422P),
        PixelFormat::Yuv444p => Ok(Pixel::YUV444P),
        PixelFormat::Yuv420p10 => Ok(Pixel::YUV420P10LE),
        PixelFormat::P010le => Ok(Pixel::P010LE),
        _ => Err(Error::unsupported_format(format!(
            "pixel format {:?} not supported",
            format
        ))),
    }
}

/**
    Convert ffmpeg_next sample format to our SampleFormat.

    Planar and packed variants map to the same format; decoders interleave
    planar data on the way out.
*/
pub fn sample_format_from_ffmpeg(format: Sample) -> Option<SampleFormat> {
    match format {
        Sample::F32(_) => Some(SampleFormat::F32),
        Sample::F64(_) => Some(SampleFormat::F64),
        Sample::I16(_) => Some(SampleFormat::S16),
        Sample::I32(_) => Some(SampleFormat::S32),
        Sample::U8(_) => Some(SampleFormat::U8),
        _ => None,
    }
}

/**
    Convert our SampleFormat to FFmpeg's packed Sample format.
*/
pub fn sample_format_to_ffmpeg(format: SampleFormat) -> Result<Sample> {
    use ffmpeg_next::format::sample::Type;

    match format {
        SampleFormat::F32 => Ok(Sample::F32(Type::Packed)),
        SampleFormat::F64 => Ok(Sample::F64(Type::Packed)),
        SampleFormat::S16 => Ok(Sample::I16(Type::Packed)),
        SampleFormat::S32 => Ok(Sample::I32(Type::Packed)),
        SampleFormat::U8 => Ok(Sample::U8(Type::Packed)),
        _ => Err(Error::unsupported_format(format!(
            "sample format {:?} not supported",
            format
        ))),
    }
}

/**
    Convert our ChannelLayout to FFmpeg's ChannelLayout.
*/
pub fn channel_layout_to_ffmpeg(layout: ChannelLayout) -> FFmpegChannelLayout {
    match layout {
        ChannelLayout::Mono => FFmpegChannelLayout::MONO,
        ChannelLayout::Stereo => FFmpegChannelLayout::STEREO,
        ChannelLayout::Surround5_1 => FFmpegChannelLayout::_5POINT1,
        ChannelLayout::Surround7_1 => FFmpegChannelLayout::_7POINT1,
        other => FFmpegChannelLayout::default(i32::from(other.channels())),
    }
}

/**
    Map a channel count onto a layout with exactly that many channels.

    Returns `None` for zero, which no layout can carry.
*/
pub fn channel_layout_from_count(channels: u16) -> Option<ChannelLayout> {
    let layout = ChannelLayout::from_count(channels);
    (layout.channels() == channels).then_some(layout)
}

/**
    Convert ffmpeg_next codec ID to our CodecId.
*/
pub fn codec_id_from_ffmpeg(id: ffmpeg_next::codec::Id) -> Option<CodecId> {
    use ffmpeg_next::codec::Id;

    match id {
        // Video
        Id::H264 => Some(CodecId::H264),
        Id::HEVC => Some(CodecId::H265),
        Id::VP8 => Some(CodecId::Vp8),
        Id::VP9 => Some(CodecId::Vp9),
        Id::AV1 => Some(CodecId::Av1),
        Id::MPEG4 => Some(CodecId::Mpeg4),
        Id::MPEG2VIDEO => Some(CodecId::Mpeg2Video),
        Id::MJPEG => Some(CodecId::Mjpeg),
        // Audio
        Id::AAC => Some(CodecId::Aac),
        Id::OPUS => Some(CodecId::Opus),
        Id::MP3 => Some(CodecId::Mp3),
        Id::VORBIS => Some(CodecId::Vorbis),
        Id::FLAC => Some(CodecId::Flac),
        Id::PCM_S16LE => Some(CodecId::PcmS16Le),
        Id::PCM_S16BE => Some(CodecId::PcmS16Be),
        Id::PCM_F32LE => Some(CodecId::PcmF32Le),
        Id::AC3 => Some(CodecId::Ac3),
        _ => None,
    }
}

/**
    Timestamps FFmpeg leaves unset come through as `None`.
*/
pub fn pts_from_ffmpeg(pts: Option<i64>) -> Option<Pts> {
    pts.map(Pts)
}

pub fn duration_from_ffmpeg(duration: i64) -> MediaDuration {
    MediaDuration(duration.max(0))
}

/**
    Copy the visible area of an FFmpeg frame into a tightly packed buffer.

    Row padding introduced by FFmpeg's stride alignment is dropped, planes
    are laid out one after another per [`PixelFormat::plane_dimensions`].
*/
pub fn video_frame_data(frame: &VideoFrameFFmpeg, format: PixelFormat) -> Result<Vec<u8>> {
    let dims = format.plane_dimensions(frame.width(), frame.height());
    if frame.planes() < dims.len() {
        return Err(Error::invalid_data(format!(
            "frame has {} planes, {:?} needs {}",
            frame.planes(),
            format,
            dims.len()
        )));
    }

    let mut output = Vec::with_capacity(format.frame_size(frame.width(), frame.height()));
    for (index, dim) in dims.iter().enumerate() {
        let stride = frame.stride(index);
        let data = frame.data(index);
        for row in 0..dim.rows {
            let start = row * stride;
            output.extend_from_slice(&data[start..start + dim.row_bytes]);
        }
    }

    Ok(output)
}

/**
    Fill an allocated FFmpeg frame from a tightly packed [`VideoFrame`].

    The destination must have been allocated with the same format and size.
*/
pub fn fill_video_frame(dst: &mut VideoFrameFFmpeg, src: &VideoFrame) -> Result<()> {
    let planes = src.planes()?;
    let dims = src.format.plane_dimensions(src.width, src.height);

    for (index, (plane, dim)) in planes.iter().zip(dims.iter()).enumerate() {
        let stride = dst.stride(index);
        let data = dst.data_mut(index);
        for row in 0..dim.rows {
            let src_start = row * dim.row_bytes;
            let dst_start = row * stride;
            data[dst_start..dst_start + dim.row_bytes]
                .copy_from_slice(&plane[src_start..src_start + dim.row_bytes]);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jpeg_range_formats_share_layout() {
        assert_eq!(
            pixel_format_from_ffmpeg(Pixel::YUVJ420P),
            Some(PixelFormat::Yuv420p)
        );
        assert_eq!(
            pixel_format_from_ffmpeg(Pixel::YUVJ444P),
            Some(PixelFormat::Yuv444p)
        );
        assert_eq!(pixel_format_from_ffmpeg(Pixel::GRAY8), None);
    }

    #[test]
    fn pixel_formats_map_both_ways() {
        for format in [
            PixelFormat::Yuv420p,
            PixelFormat::Yuv422p,
            PixelFormat::Yuv444p,
            PixelFormat::Rgb24,
            PixelFormat::Rgba,
            PixelFormat::Bgra,
        ] {
            let pixel = pixel_format_to_ffmpeg(format).unwrap();
            assert_eq!(pixel_format_from_ffmpeg(pixel), Some(format));
        }
    }

    #[test]
    fn channel_counts_map_to_exact_layouts() {
        assert_eq!(channel_layout_from_count(1), Some(ChannelLayout::Mono));
        assert_eq!(channel_layout_from_count(2), Some(ChannelLayout::Stereo));
        assert_eq!(
            channel_layout_from_count(6),
            Some(ChannelLayout::Surround5_1)
        );
        assert_eq!(
            channel_layout_from_count(4),
            Some(ChannelLayout::Other(4))
        );
        assert_eq!(channel_layout_from_count(0), None);
    }

    #[test]
    fn unnamed_layouts_keep_their_channel_count() {
        for count in [3u16, 4, 5, 7] {
            let layout = channel_layout_to_ffmpeg(ChannelLayout::Other(count));
            assert_eq!(layout.channels(), i32::from(count));
        }
        assert_eq!(
            channel_layout_to_ffmpeg(ChannelLayout::Surround5_1).channels(),
            6
        );
    }

    #[test]
    fn negative_durations_clamp_to_zero() {
        assert_eq!(duration_from_ffmpeg(-5), MediaDuration(0));
        assert_eq!(duration_from_ffmpeg(1024), MediaDuration(1024));
    }

    #[test]
    fn frame_planes_round_trip_through_ffmpeg() {
        let (width, height) = (6, 3);
        let size = PixelFormat::Yuv420p.frame_size(width, height);
        let data: Vec<u8> = (0..size).map(|i| i as u8).collect();
        let frame = VideoFrame::new(
            data.clone(),
            width,
            height,
            PixelFormat::Yuv420p,
            None,
            Rational::new(1, 25),
        );

        let mut ffmpeg_frame = VideoFrameFFmpeg::new(Pixel::YUV420P, width, height);
        fill_video_frame(&mut ffmpeg_frame, &frame).unwrap();
        let copied = video_frame_data(&ffmpeg_frame, PixelFormat::Yuv420p).unwrap();
        assert_eq!(copied, data);
    }
}
