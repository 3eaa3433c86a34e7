/*!
    Error types shared across the pipeline crates.
*/

use thiserror::Error;

/**
    Result alias used throughout the pipeline.
*/
pub type Result<T> = std::result::Result<T, Error>;

/**
    Errors produced by the pipeline.

    The first group of variants is reported synchronously while opening a
    resource and leaves nothing usable behind. The rest are general failures
    from codec, conversion and configuration calls.
*/
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("failed to open media: {0}")]
    OpenFile(String),

    #[error("failed to read stream information: {0}")]
    StreamInfoNotFound(String),

    #[error("no audio or video stream found")]
    StreamNotFound,

    #[error("decoder not found: {0}")]
    CodecNotFound(String),

    #[error("failed to open codec: {0}")]
    OpenCodec(String),

    #[error("failed to allocate frame")]
    AllocateFrame,

    #[error("operation interrupted")]
    Interrupted,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("codec error: {0}")]
    Codec(String),

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("video frame format cannot change once frames have been produced")]
    FormatLocked,
}

impl Error {
    pub fn open_file(msg: impl Into<String>) -> Self {
        Self::OpenFile(msg.into())
    }

    pub fn stream_info_not_found(msg: impl Into<String>) -> Self {
        Self::StreamInfoNotFound(msg.into())
    }

    pub fn codec_not_found(msg: impl Into<String>) -> Self {
        Self::CodecNotFound(msg.into())
    }

    pub fn open_codec(msg: impl Into<String>) -> Self {
        Self::OpenCodec(msg.into())
    }

    pub fn codec(msg: impl Into<String>) -> Self {
        Self::Codec(msg.into())
    }

    pub fn invalid_data(msg: impl Into<String>) -> Self {
        Self::InvalidData(msg.into())
    }

    pub fn unsupported_format(msg: impl Into<String>) -> Self {
        Self::UnsupportedFormat(msg.into())
    }

    /**
        Returns the open-time error category, if this is an open-time error.
    */
    pub fn kind(&self) -> Option<MovieErrorKind> {
        match self {
            Self::OpenFile(_) => Some(MovieErrorKind::OpenFile),
            Self::StreamInfoNotFound(_) => Some(MovieErrorKind::StreamInfoNotFound),
            Self::StreamNotFound => Some(MovieErrorKind::StreamNotFound),
            Self::CodecNotFound(_) => Some(MovieErrorKind::CodecNotFound),
            Self::OpenCodec(_) => Some(MovieErrorKind::OpenCodec),
            Self::AllocateFrame => Some(MovieErrorKind::AllocateFrame),
            _ => None,
        }
    }

    /**
        Returns true if this error was caused by the interrupt gate.
    */
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::Interrupted)
    }
}

/**
    Categories of errors that make an open attempt fail.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MovieErrorKind {
    OpenFile,
    StreamInfoNotFound,
    StreamNotFound,
    CodecNotFound,
    OpenCodec,
    AllocateFrame,
}
