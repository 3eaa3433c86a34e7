/*!
    Stream selection policy.
*/

use ffmpeg_types::StreamType;

/**
    One entry of a container's stream table, as seen by the selector.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StreamCandidate {
    pub index: usize,
    pub kind: StreamType,
    /// Cover art and thumbnails are stored as single-picture video streams.
    pub attached_picture: bool,
}

impl StreamCandidate {
    fn is_playable(&self, kind: StreamType) -> bool {
        self.kind == kind && !self.attached_picture
    }
}

/**
    Pick the stream of `kind` to decode.

    `best` is the demuxer's own best-stream guess. It wins when it names a
    playable stream of the requested kind; otherwise the playable stream with
    the lowest index is chosen. Returns `None` when the kind is absent.
*/
pub fn select_stream(
    candidates: &[StreamCandidate],
    kind: StreamType,
    best: Option<usize>,
) -> Option<usize> {
    if let Some(best) = best
        && candidates
            .iter()
            .any(|c| c.index == best && c.is_playable(kind))
    {
        return Some(best);
    }

    candidates
        .iter()
        .filter(|c| c.is_playable(kind))
        .map(|c| c.index)
        .min()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(index: usize, kind: StreamType) -> StreamCandidate {
        StreamCandidate {
            index,
            kind,
            attached_picture: false,
        }
    }

    #[test]
    fn prefers_demuxer_best_stream() {
        let table = [
            candidate(0, StreamType::Video),
            candidate(1, StreamType::Audio),
            candidate(2, StreamType::Video),
        ];
        assert_eq!(select_stream(&table, StreamType::Video, Some(2)), Some(2));
    }

    #[test]
    fn falls_back_to_lowest_index() {
        let table = [
            candidate(3, StreamType::Audio),
            candidate(1, StreamType::Audio),
            candidate(0, StreamType::Video),
        ];
        assert_eq!(select_stream(&table, StreamType::Audio, None), Some(1));
        // A best guess of the wrong kind is ignored
        assert_eq!(select_stream(&table, StreamType::Audio, Some(0)), Some(1));
    }

    #[test]
    fn skips_attached_pictures() {
        let table = [
            StreamCandidate {
                index: 0,
                kind: StreamType::Video,
                attached_picture: true,
            },
            candidate(1, StreamType::Audio),
        ];
        assert_eq!(select_stream(&table, StreamType::Video, Some(0)), None);
        assert_eq!(select_stream(&table, StreamType::Audio, None), Some(1));
    }

    #[test]
    fn missing_kind_selects_nothing() {
        let table = [candidate(0, StreamType::Audio)];
        assert_eq!(select_stream(&table, StreamType::Video, None), None);
        assert_eq!(select_stream(&[], StreamType::Audio, None), None);
    }
}
