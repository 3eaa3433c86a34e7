/*!
    Decoder configuration types.
*/

/**
    Configuration for video decoding.
*/
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VideoDecoderConfig {
    /// Decoder worker threads (None = let FFmpeg decide).
    pub thread_count: Option<usize>,
}

/**
    Configuration for audio decoding.
*/
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AudioDecoderConfig {
    /// Decoder worker threads (None = let FFmpeg decide).
    pub thread_count: Option<usize>,
}
