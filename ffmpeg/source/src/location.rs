/*!
    Classification of media locations into local files and network URLs.
*/

use std::path::{Path, PathBuf};

use url::Url;

/**
    URL schemes FFmpeg treats as local I/O.
*/
const LOCAL_SCHEMES: &[&str] = &["file", "pipe", "fd", "data"];

/**
    Where a media resource lives.

    Plain paths and `file:` URLs are local. Any other URL scheme (`http`,
    `https`, `rtmp`, `rtsp`, `udp`, `tcp`, `hls`, ...) is network-backed, which
    means reads may block on the network and should be guarded by an
    [`InterruptGate`](crate::InterruptGate).
*/
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Location {
    File(PathBuf),
    /// `input` is the caller's string, kept verbatim for FFmpeg since
    /// `url` normalizes (trailing slashes, percent-encoding).
    Network { url: Url, input: String },
}

impl Location {
    /**
        Parse a path or URL string.
    */
    pub fn parse(input: &str) -> Self {
        match Url::parse(input) {
            // Single-letter schemes are Windows drive letters, not URLs
            Ok(url) if url.scheme().len() > 1 => {
                if url.scheme() == "file" {
                    match url.to_file_path() {
                        Ok(path) => Self::File(path),
                        Err(()) => Self::File(PathBuf::from(input)),
                    }
                } else if LOCAL_SCHEMES.contains(&url.scheme()) {
                    Self::File(PathBuf::from(input))
                } else {
                    Self::Network {
                        url,
                        input: input.to_owned(),
                    }
                }
            }
            _ => Self::File(PathBuf::from(input)),
        }
    }

    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network { .. })
    }

    /**
        The local path, if this is a file location.
    */
    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Self::File(path) => Some(path),
            Self::Network { .. } => None,
        }
    }

    /**
        The parsed URL, if this is a network location.
    */
    pub fn url(&self) -> Option<&Url> {
        match self {
            Self::File(_) => None,
            Self::Network { url, .. } => Some(url),
        }
    }

    /**
        The string handed to `avformat_open_input`.
    */
    pub fn to_ffmpeg_string(&self) -> String {
        match self {
            Self::File(path) => path.to_string_lossy().into_owned(),
            Self::Network { input, .. } => input.clone(),
        }
    }
}

impl From<&str> for Location {
    fn from(input: &str) -> Self {
        Self::parse(input)
    }
}

impl From<String> for Location {
    fn from(input: String) -> Self {
        Self::parse(&input)
    }
}

impl From<&Path> for Location {
    fn from(path: &Path) -> Self {
        Self::File(path.to_path_buf())
    }
}

impl From<PathBuf> for Location {
    fn from(path: PathBuf) -> Self {
        Self::File(path)
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Network { input, .. } => f.write_str(input),
        }
    }
}
