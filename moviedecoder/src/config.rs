/*!
    Decoder configuration.
*/

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use ffmpeg_transform::AudioTransformConfig;
use ffmpeg_types::{AudioStreamInfo, ChannelLayout, Error, Result, SampleFormat};

use crate::frame::VideoFrameFormat;
use crate::pump::DEFAULT_MAX_CONSECUTIVE_ERRORS;

/**
    Everything that shapes a [`MovieDecoder`](crate::MovieDecoder) besides
    the location itself.

    Missing fields take their defaults when deserialized, so a config file
    only needs the keys it changes:

    ```json
    { "video_format": "yuv", "network_options": { "rtsp_transport": "tcp" } }
    ```
*/
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovieDecoderConfig {
    /// Output representation for video frames.
    pub video_format: VideoFrameFormat,
    /// Consecutive undecodable packets after which decoding stops as if
    /// the stream had ended.
    pub max_consecutive_errors: u32,
    /// After a seek, drop frames that end before the target.
    pub skip_to_seek_target: bool,
    /// Decoder thread count (None = FFmpeg's choice).
    pub decoder_threads: Option<usize>,
    /// Convert decoded audio to this format (None = hand out native audio).
    pub audio_output: Option<AudioOutputConfig>,
    /// Demuxer options applied to network locations.
    pub network_options: BTreeMap<String, String>,
}

impl Default for MovieDecoderConfig {
    fn default() -> Self {
        Self {
            video_format: VideoFrameFormat::default(),
            max_consecutive_errors: DEFAULT_MAX_CONSECUTIVE_ERRORS,
            skip_to_seek_target: true,
            decoder_threads: None,
            audio_output: None,
            network_options: BTreeMap::new(),
        }
    }
}

impl MovieDecoderConfig {
    /**
        Read a configuration from a JSON file.
    */
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        serde_json::from_str(&text)
            .map_err(|e| Error::invalid_data(format!("{}: {}", path.display(), e)))
    }

    pub fn with_video_format(mut self, format: VideoFrameFormat) -> Self {
        self.video_format = format;
        self
    }

    pub fn with_max_consecutive_errors(mut self, count: u32) -> Self {
        self.max_consecutive_errors = count;
        self
    }

    pub fn with_skip_to_seek_target(mut self, skip: bool) -> Self {
        self.skip_to_seek_target = skip;
        self
    }

    pub fn with_decoder_threads(mut self, threads: usize) -> Self {
        self.decoder_threads = Some(threads);
        self
    }

    pub fn with_audio_output(mut self, output: AudioOutputConfig) -> Self {
        self.audio_output = Some(output);
        self
    }

    pub fn with_network_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.network_options.insert(key.into(), value.into());
        self
    }

    pub(crate) fn network_option_pairs(&self) -> Vec<(String, String)> {
        self.network_options
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

/**
    Target format for decoded audio. Unset fields keep the source's value.
*/
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioOutputConfig {
    pub sample_rate: Option<u32>,
    /// Channel count, at least 1.
    pub channels: Option<u16>,
    pub format: OutputSampleFormat,
}

impl AudioOutputConfig {
    /**
        Resolve against the stream being decoded.
    */
    pub fn resolve(&self, stream: &AudioStreamInfo) -> Result<AudioTransformConfig> {
        let channels = match self.channels {
            Some(count) => ffmpeg_source::channel_layout_from_count(count).ok_or_else(|| {
                Error::unsupported_format(format!("no channel layout with {} channels", count))
            })?,
            None => stream.channels,
        };

        Ok(AudioTransformConfig::new(
            self.sample_rate.unwrap_or(stream.sample_rate),
            channels,
            self.format.into(),
        ))
    }

    /**
        48 kHz stereo float, what most audio output APIs expect.
    */
    pub fn playback() -> Self {
        let playback = AudioTransformConfig::playback();
        Self {
            sample_rate: Some(playback.sample_rate),
            channels: Some(ChannelLayout::Stereo.channels()),
            format: OutputSampleFormat::F32,
        }
    }
}

/**
    Packed sample formats audio can be converted to.
*/
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputSampleFormat {
    #[default]
    F32,
    F64,
    S16,
    S32,
    U8,
}

impl From<OutputSampleFormat> for SampleFormat {
    fn from(format: OutputSampleFormat) -> Self {
        match format {
            OutputSampleFormat::F32 => SampleFormat::F32,
            OutputSampleFormat::F64 => SampleFormat::F64,
            OutputSampleFormat::S16 => SampleFormat::S16,
            OutputSampleFormat::S32 => SampleFormat::S32,
            OutputSampleFormat::U8 => SampleFormat::U8,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use ffmpeg_types::Rational;

    use super::*;
    use crate::frame::PackedLayout;

    fn stereo_44k() -> AudioStreamInfo {
        AudioStreamInfo {
            index: 1,
            sample_rate: 44100,
            channels: ChannelLayout::Stereo,
            sample_format: Some(SampleFormat::S16),
            time_base: Rational::new(1, 44100),
            duration: None,
            codec_id: None,
            bitrate: None,
        }
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: MovieDecoderConfig =
            serde_json::from_str(r#"{ "video_format": "yuv", "decoder_threads": 2 }"#).unwrap();

        assert_eq!(config.video_format, VideoFrameFormat::Yuv);
        assert_eq!(config.decoder_threads, Some(2));
        assert_eq!(config.max_consecutive_errors, 16);
        assert!(config.skip_to_seek_target);
        assert!(config.audio_output.is_none());
    }

    #[test]
    fn packed_format_is_tagged() {
        let config: MovieDecoderConfig =
            serde_json::from_str(r#"{ "video_format": { "rgb": "bgra" } }"#).unwrap();
        assert_eq!(
            config.video_format,
            VideoFrameFormat::Rgb(PackedLayout::Bgra)
        );
    }

    #[test]
    fn load_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "max_consecutive_errors": 4, "network_options": {{ "rtsp_transport": "tcp" }} }}"#
        )
        .unwrap();

        let config = MovieDecoderConfig::load(file.path()).unwrap();
        assert_eq!(config.max_consecutive_errors, 4);
        assert_eq!(
            config.network_option_pairs(),
            vec![("rtsp_transport".to_string(), "tcp".to_string())]
        );
    }

    #[test]
    fn load_rejects_malformed_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();

        assert!(matches!(
            MovieDecoderConfig::load(file.path()),
            Err(Error::InvalidData(_))
        ));
    }

    #[test]
    fn load_reports_missing_file() {
        assert!(matches!(
            MovieDecoderConfig::load("/nonexistent/moviedecoder.json"),
            Err(Error::Io(_))
        ));
    }

    #[test]
    fn audio_output_defaults_to_source_layout() {
        let resolved = AudioOutputConfig::default().resolve(&stereo_44k()).unwrap();
        assert_eq!(resolved.sample_rate, 44100);
        assert_eq!(resolved.channels, ChannelLayout::Stereo);
        assert_eq!(resolved.format, SampleFormat::F32);
    }

    #[test]
    fn audio_output_overrides_apply() {
        let output = AudioOutputConfig {
            sample_rate: Some(48000),
            channels: Some(1),
            format: OutputSampleFormat::S16,
        };
        let resolved = output.resolve(&stereo_44k()).unwrap();
        assert_eq!(resolved.sample_rate, 48000);
        assert_eq!(resolved.channels, ChannelLayout::Mono);
        assert_eq!(resolved.format, SampleFormat::S16);

        let quad = AudioOutputConfig {
            channels: Some(4),
            ..AudioOutputConfig::default()
        };
        assert_eq!(
            quad.resolve(&stereo_44k()).unwrap().channels,
            ChannelLayout::Other(4)
        );

        let silent = AudioOutputConfig {
            channels: Some(0),
            ..AudioOutputConfig::default()
        };
        assert!(silent.resolve(&stereo_44k()).is_err());
    }

    #[test]
    fn builders_set_fields() {
        let config = MovieDecoderConfig::default()
            .with_video_format(VideoFrameFormat::Yuv)
            .with_skip_to_seek_target(false)
            .with_audio_output(AudioOutputConfig::playback())
            .with_network_option("timeout", "5000000");

        assert_eq!(config.video_format, VideoFrameFormat::Yuv);
        assert!(!config.skip_to_seek_target);
        assert_eq!(
            config.audio_output.and_then(|a| a.sample_rate),
            Some(48000)
        );
        assert_eq!(config.network_options["timeout"], "5000000");
    }
}
