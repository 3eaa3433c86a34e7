/*!
    Pixel and sample format types.
*/

/**
    Video pixel formats.

    This is a subset of formats commonly encountered in media pipelines.
    Not all FFmpeg pixel formats are represented.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum PixelFormat {
    /// Planar YUV 4:2:0, 12bpp (most common video format)
    Yuv420p,
    /// Semi-planar YUV 4:2:0, 12bpp (common hardware decoder output)
    Nv12,
    /// Packed BGRA, 32bpp (common for display on macOS/Windows)
    Bgra,
    /// Packed RGBA, 32bpp (common for display)
    Rgba,
    /// Packed RGB, 24bpp
    Rgb24,
    /// Packed BGR, 24bpp
    Bgr24,
    /// Planar YUV 4:2:2, 16bpp
    Yuv422p,
    /// Planar YUV 4:4:4, 24bpp
    Yuv444p,
    /// Planar YUV 4:2:0, 10-bit (HDR content)
    Yuv420p10,
    /// Semi-planar YUV 4:2:0, 10-bit little-endian (HDR hardware decoder output)
    P010le,
}

/**
    Geometry of one tightly packed plane: bytes per row and number of rows.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlaneDimensions {
    pub row_bytes: usize,
    pub rows: usize,
}

impl PlaneDimensions {
    pub const fn len(self) -> usize {
        self.row_bytes * self.rows
    }

    pub const fn is_empty(self) -> bool {
        self.len() == 0
    }
}

impl PixelFormat {
    /**
        Returns the number of bits per pixel for this format.

        For planar formats, this is the average bits per pixel.
    */
    pub const fn bits_per_pixel(self) -> u32 {
        match self {
            Self::Yuv420p | Self::Nv12 => 12,
            Self::Yuv420p10 | Self::P010le => 15, // 10 bits * 1.5 planes average
            Self::Yuv422p => 16,
            Self::Rgb24 | Self::Bgr24 | Self::Yuv444p => 24,
            Self::Bgra | Self::Rgba => 32,
        }
    }

    /**
        Returns true if this is a planar format.
    */
    pub const fn is_planar(self) -> bool {
        match self {
            Self::Yuv420p | Self::Yuv422p | Self::Yuv444p | Self::Yuv420p10 => true,
            Self::Nv12 | Self::P010le => true, // semi-planar counts as planar
            Self::Bgra | Self::Rgba | Self::Rgb24 | Self::Bgr24 => false,
        }
    }

    /**
        Returns true for 8-bit YUV with three separate planes.

        These are the formats that can be handed out as luma/chroma buffers
        without any numeric conversion.
    */
    pub const fn is_three_plane_yuv(self) -> bool {
        matches!(self, Self::Yuv420p | Self::Yuv422p | Self::Yuv444p)
    }

    /**
        Bytes per pixel for packed formats, `None` for planar ones.
    */
    pub const fn packed_bytes_per_pixel(self) -> Option<usize> {
        match self {
            Self::Rgb24 | Self::Bgr24 => Some(3),
            Self::Bgra | Self::Rgba => Some(4),
            _ => None,
        }
    }

    /**
        Chroma subsampling as `(log2 horizontal, log2 vertical)`.
    */
    pub const fn chroma_shift(self) -> Option<(u32, u32)> {
        match self {
            Self::Yuv420p | Self::Yuv420p10 | Self::Nv12 | Self::P010le => Some((1, 1)),
            Self::Yuv422p => Some((1, 0)),
            Self::Yuv444p => Some((0, 0)),
            Self::Bgra | Self::Rgba | Self::Rgb24 | Self::Bgr24 => None,
        }
    }

    /**
        Size of one chroma plane in samples, rounding odd dimensions up.
    */
    pub const fn chroma_size(self, width: u32, height: u32) -> Option<(u32, u32)> {
        match self.chroma_shift() {
            Some((sx, sy)) => Some((
                (width + (1 << sx) - 1) >> sx,
                (height + (1 << sy) - 1) >> sy,
            )),
            None => None,
        }
    }

    const fn bytes_per_component(self) -> usize {
        match self {
            Self::Yuv420p10 | Self::P010le => 2,
            _ => 1,
        }
    }

    /**
        Tightly packed plane layout for a frame of the given size.

        Packed formats have one plane, semi-planar formats two (luma and
        interleaved chroma), planar YUV three.
    */
    pub fn plane_dimensions(self, width: u32, height: u32) -> Vec<PlaneDimensions> {
        let width = width as usize;
        let height = height as usize;

        if let Some(bpp) = self.packed_bytes_per_pixel() {
            return vec![PlaneDimensions {
                row_bytes: width * bpp,
                rows: height,
            }];
        }

        let bpc = self.bytes_per_component();
        let luma = PlaneDimensions {
            row_bytes: width * bpc,
            rows: height,
        };
        let (cw, ch) = match self.chroma_size(width as u32, height as u32) {
            Some((w, h)) => (w as usize, h as usize),
            None => (0, 0),
        };

        match self {
            Self::Nv12 | Self::P010le => vec![
                luma,
                PlaneDimensions {
                    row_bytes: cw * 2 * bpc,
                    rows: ch,
                },
            ],
            _ => {
                let chroma = PlaneDimensions {
                    row_bytes: cw * bpc,
                    rows: ch,
                };
                vec![luma, chroma, chroma]
            }
        }
    }

    /**
        Total bytes of a tightly packed frame of the given size.
    */
    pub fn frame_size(self, width: u32, height: u32) -> usize {
        self.plane_dimensions(width, height)
            .iter()
            .map(|p| p.len())
            .sum()
    }
}

/**
    Audio sample formats.

    All formats are interleaved when stored in an [`AudioFrame`](crate::AudioFrame).
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum SampleFormat {
    /// 32-bit floating point, range [-1.0, 1.0]
    F32,
    /// 64-bit floating point
    F64,
    /// Signed 16-bit integer
    S16,
    /// Signed 32-bit integer
    S32,
    /// Unsigned 8-bit integer
    U8,
}

impl SampleFormat {
    /**
        Returns the number of bytes per sample.
    */
    pub const fn bytes_per_sample(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::S16 => 2,
            Self::S32 | Self::F32 => 4,
            Self::F64 => 8,
        }
    }

    /**
        Returns true if this is a floating-point format.
    */
    pub const fn is_float(self) -> bool {
        matches!(self, Self::F32 | Self::F64)
    }
}

/**
    Audio channel layout.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ChannelLayout {
    /// Single channel
    Mono,
    /// Left and right channels
    Stereo,
    /// 5.1 surround (FL, FR, FC, LFE, BL, BR)
    Surround5_1,
    /// 7.1 surround (FL, FR, FC, LFE, BL, BR, SL, SR)
    Surround7_1,
    /// Any other channel count, in FFmpeg's default order for that count
    Other(u16),
}

impl ChannelLayout {
    /**
        Returns the number of channels.
    */
    pub const fn channels(self) -> u16 {
        match self {
            Self::Mono => 1,
            Self::Stereo => 2,
            Self::Surround5_1 => 6,
            Self::Surround7_1 => 8,
            Self::Other(count) => count,
        }
    }

    /**
        Create a channel layout from a channel count.

        Counts without a named layout become [`ChannelLayout::Other`], so the
        channel count always survives. Zero is treated as mono.
    */
    pub const fn from_count(count: u16) -> Self {
        match count {
            0 | 1 => Self::Mono,
            2 => Self::Stereo,
            6 => Self::Surround5_1,
            8 => Self::Surround7_1,
            n => Self::Other(n),
        }
    }
}
