/*!
    Opaque codec configuration for passing to decoders.
*/

use ffmpeg_next::codec;

use ffmpeg_types::CodecId;

use crate::convert::codec_id_from_ffmpeg;

/**
    Opaque codec configuration extracted from a source stream.

    Holds an owned copy of the stream's codec parameters, so it stays valid
    after the source is dropped. Pass it to `ffmpeg-decode` to create a
    decoder for the stream.
*/
pub struct CodecConfig {
    parameters: codec::Parameters,
}

// SAFETY: the parameters are a deep copy with no shared owner, so moving
// them to another thread cannot alias the demuxer's state.
unsafe impl Send for CodecConfig {}

impl CodecConfig {
    pub(crate) fn new(parameters: &codec::Parameters) -> Self {
        Self {
            parameters: parameters.clone(),
        }
    }

    /**
        FFmpeg's codec id, used to look up a decoder.
    */
    pub fn ffmpeg_codec_id(&self) -> codec::Id {
        self.parameters.id()
    }

    /**
        The codec, if it is one this pipeline knows by name.
    */
    pub fn codec_id(&self) -> Option<CodecId> {
        codec_id_from_ffmpeg(self.parameters.id())
    }

    pub fn parameters(&self) -> &codec::Parameters {
        &self.parameters
    }
}

impl Clone for CodecConfig {
    fn clone(&self) -> Self {
        Self::new(&self.parameters)
    }
}

impl std::fmt::Debug for CodecConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodecConfig")
            .field("codec_id", &self.parameters.id())
            .finish_non_exhaustive()
    }
}
