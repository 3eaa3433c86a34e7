use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use moviedecoder::{
    AudioOutputConfig, ChannelLayout, Error, Frame, InterruptGate, MovieDecoder,
    MovieDecoderConfig, MovieErrorKind, OutputSampleFormat, PackedLayout, SampleFormat, StreamType,
    VideoFrameFormat, VideoPixels,
};

const RATE: u32 = 8000;
const SECONDS: f64 = 2.0;

/// Writes a 16-bit PCM WAV with a 440 Hz tone on every channel.
fn write_wav(dir: &Path, channels: u16) -> PathBuf {
    let samples = (RATE as f64 * SECONDS) as u32;
    let frame_bytes = u32::from(channels) * 2;
    let data_len = samples * frame_bytes;

    let mut bytes = Vec::with_capacity(44 + data_len as usize);
    bytes.extend_from_slice(b"RIFF");
    bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
    bytes.extend_from_slice(b"WAVE");
    bytes.extend_from_slice(b"fmt ");
    bytes.extend_from_slice(&16u32.to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes()); // PCM
    bytes.extend_from_slice(&channels.to_le_bytes());
    bytes.extend_from_slice(&RATE.to_le_bytes());
    bytes.extend_from_slice(&(RATE * frame_bytes).to_le_bytes());
    bytes.extend_from_slice(&(frame_bytes as u16).to_le_bytes());
    bytes.extend_from_slice(&16u16.to_le_bytes());
    bytes.extend_from_slice(b"data");
    bytes.extend_from_slice(&data_len.to_le_bytes());

    for i in 0..samples {
        let t = i as f64 / RATE as f64;
        let value = ((t * 440.0 * std::f64::consts::TAU).sin() * 8000.0) as i16;
        for _ in 0..channels {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
    }

    let path = dir.join(format!("tone{channels}.wav"));
    fs::write(&path, bytes).unwrap();
    path
}

const WIDTH: u32 = 33;
const HEIGHT: u32 = 17;
const FPS: u32 = 25;
const FRAMES: u32 = 50;

/// Writes an uncompressed 4:2:0 YUV4MPEG2 clip of `FRAMES` frames whose
/// luma brightness encodes the frame index.
fn write_y4m(dir: &Path) -> PathBuf {
    let chroma = ((WIDTH + 1) / 2 * ((HEIGHT + 1) / 2)) as usize;
    let luma = (WIDTH * HEIGHT) as usize;

    let mut bytes =
        format!("YUV4MPEG2 W{WIDTH} H{HEIGHT} F{FPS}:1 Ip A1:1 C420jpeg\n").into_bytes();
    for frame in 0..FRAMES {
        bytes.extend_from_slice(b"FRAME\n");
        bytes.extend(std::iter::repeat_n((frame * 4) as u8, luma));
        bytes.extend(std::iter::repeat_n(96u8, chroma));
        bytes.extend(std::iter::repeat_n(160u8, chroma));
    }

    let path = dir.join("clip.y4m");
    fs::write(&path, bytes).unwrap();
    path
}

/// Writes a 4x2 24-bit BMP, which decodes to packed BGR.
fn write_bmp(dir: &Path) -> PathBuf {
    let pixels = 4 * 2 * 3u32;
    let mut bytes = Vec::new();
    bytes.extend_from_slice(b"BM");
    bytes.extend_from_slice(&(54 + pixels).to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&54u32.to_le_bytes());
    bytes.extend_from_slice(&40u32.to_le_bytes());
    bytes.extend_from_slice(&4i32.to_le_bytes());
    bytes.extend_from_slice(&2i32.to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.extend_from_slice(&24u16.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes()); // uncompressed
    bytes.extend_from_slice(&pixels.to_le_bytes());
    bytes.extend_from_slice(&2835i32.to_le_bytes());
    bytes.extend_from_slice(&2835i32.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend((0..pixels).map(|i| (i * 10) as u8));

    let path = dir.join("still.bmp");
    fs::write(&path, bytes).unwrap();
    path
}

fn open_clip(config: MovieDecoderConfig) -> (TempDir, MovieDecoder) {
    let dir = tempfile::tempdir().unwrap();
    let path = write_y4m(dir.path());
    let decoder = MovieDecoder::open_with(path.as_path(), config, InterruptGate::new()).unwrap();
    (dir, decoder)
}

fn open_tone() -> (TempDir, MovieDecoder) {
    let dir = tempfile::tempdir().unwrap();
    let path = write_wav(dir.path(), 1);
    let decoder = MovieDecoder::open(path.as_path()).unwrap();
    (dir, decoder)
}

fn decode_to_end(decoder: &mut MovieDecoder, budget: f64) -> Vec<Frame> {
    let mut frames = Vec::new();
    for _ in 0..1000 {
        if decoder.is_eof() {
            break;
        }
        frames.extend(decoder.decode_frames(budget));
    }
    assert!(decoder.is_eof(), "stream never ended");
    frames
}

#[test]
fn audio_only_resource_opens_without_video() {
    let (_dir, mut decoder) = open_tone();

    assert!(!decoder.valid_video());
    assert!(decoder.valid_audio());
    assert!(!decoder.is_network());
    assert!(!decoder.is_eof());
    assert_eq!(decoder.fps(), 0.0);
    assert_eq!(decoder.frame_width(), 0);
    assert_eq!(decoder.sample_rate(), RATE);
    assert_eq!(decoder.channels(), 1);
    assert_eq!(decoder.start_time(), 0.0);
    assert_eq!(decoder.position(), 0.0);

    let duration = decoder.duration().expect("wav duration is known");
    assert!((duration - SECONDS).abs() < 0.01, "duration {duration}");

    // Nothing to reconfigure without video
    decoder
        .setup_video_frame_format(VideoFrameFormat::Yuv)
        .unwrap();
}

#[test]
fn budgeted_calls_cover_the_whole_stream() {
    let (_dir, mut decoder) = open_tone();
    let budget = 0.25;

    let mut frames = Vec::new();
    for _ in 0..1000 {
        if decoder.is_eof() {
            break;
        }
        let batch = decoder.decode_frames(budget);
        let decoded: f64 = batch.iter().map(Frame::duration).sum();
        if !decoder.is_eof() {
            assert!(decoded >= budget, "call stopped after {decoded}s");
        }
        frames.extend(batch);
    }

    assert!(decoder.is_eof());
    assert!(decoder.decode_frames(budget).is_empty());

    assert!(frames.iter().all(|f| f.kind() == StreamType::Audio));
    assert!((frames[0].position()).abs() < 1e-6);
    assert!(frames.windows(2).all(|w| w[0].position() <= w[1].position()));

    let total: f64 = frames.iter().map(Frame::duration).sum();
    assert!((total - SECONDS).abs() < 0.01, "decoded {total}s");

    let audio = frames[0].as_audio().unwrap();
    assert_eq!(audio.sample_rate(), RATE);
    assert_eq!(audio.channels(), ChannelLayout::Mono);
    assert_eq!(audio.format(), SampleFormat::S16);
    assert_eq!(audio.samples().len(), audio.sample_count() * 2);
}

#[test]
fn seek_lands_within_one_frame_of_target() {
    let (_dir, mut decoder) = open_tone();
    decoder.decode_frames(0.5);

    decoder.set_position(1.0);
    assert_eq!(decoder.position(), 1.0);
    assert!(!decoder.is_eof());

    let frames = decoder.decode_frames(0.0);
    let first = frames.first().expect("frames after seek");
    assert!(
        (first.position() - 1.0).abs() <= first.duration() + 1e-6,
        "landed at {}",
        first.position()
    );
}

#[test]
fn seek_target_is_clamped() {
    let (_dir, mut decoder) = open_tone();
    let duration = decoder.duration().unwrap();

    decoder.set_position(-3.0);
    assert_eq!(decoder.position(), 0.0);

    decoder.set_position(duration + 10.0);
    assert_eq!(decoder.position(), duration);

    decode_to_end(&mut decoder, 0.1);

    // Seeking clears end of stream
    decoder.set_position(0.0);
    assert!(!decoder.is_eof());
    assert!(!decoder.decode_frames(0.1).is_empty());
}

#[test]
fn interrupt_is_consumed_by_the_next_call() {
    let (_dir, mut decoder) = open_tone();

    assert!(decoder.interrupt_decoder());
    assert!(!decoder.interrupt_decoder());

    assert!(decoder.decode_frames(1.0).is_empty());
    assert!(!decoder.is_eof());

    let frames = decoder.decode_frames(0.1);
    assert!(!frames.is_empty());
    assert!(frames[0].position().abs() < 1e-6);
}

#[test]
fn interrupt_callback_stays_until_removed() {
    let (_dir, mut decoder) = open_tone();

    decoder.set_interrupt_callback(Some(|| true));
    assert!(decoder.decode_frames(0.1).is_empty());
    assert!(decoder.decode_frames(0.1).is_empty());

    decoder.set_interrupt_callback(None::<fn() -> bool>);
    assert!(!decoder.decode_frames(0.1).is_empty());
}

#[test]
fn gate_raised_from_another_thread_stops_a_call() {
    let (_dir, mut decoder) = open_tone();
    let gate = decoder.interrupt_gate();

    std::thread::spawn(move || gate.interrupt()).join().unwrap();

    assert!(decoder.decode_frames(10.0).is_empty());
    assert!(!decoder.decode_frames(0.1).is_empty());
}

#[test]
fn audio_output_converts_samples() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_wav(dir.path(), 1);
    let config = MovieDecoderConfig::default().with_audio_output(AudioOutputConfig {
        sample_rate: None,
        channels: Some(2),
        format: OutputSampleFormat::F32,
    });

    let mut decoder =
        MovieDecoder::open_with(path.as_path(), config, InterruptGate::new())
            .unwrap();
    assert_eq!(decoder.sample_rate(), RATE);
    assert_eq!(decoder.channels(), 2);

    let frames = decode_to_end(&mut decoder, 0.5);
    let audio: Vec<_> = frames.iter().filter_map(Frame::as_audio).collect();
    assert!(!audio.is_empty());
    for frame in &audio {
        assert_eq!(frame.format(), SampleFormat::F32);
        assert_eq!(frame.channels(), ChannelLayout::Stereo);
        assert_eq!(frame.samples().len(), frame.sample_count() * 2 * 4);
    }

    let samples: usize = audio.iter().map(|f| f.sample_count()).sum();
    assert_eq!(samples, (RATE as f64 * SECONDS) as usize);
}

#[test]
fn subtitle_only_resource_has_no_stream() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("captions.srt");
    fs::write(
        &path,
        "1\n00:00:00,000 --> 00:00:01,000\nHello\n\n2\n00:00:01,000 --> 00:00:02,000\nWorld\n",
    )
    .unwrap();

    let err = MovieDecoder::open(path.as_path()).unwrap_err();
    assert_eq!(err.kind(), Some(MovieErrorKind::StreamNotFound));
}

#[test]
fn missing_file_fails_to_open() {
    let dir = tempfile::tempdir().unwrap();
    let err = MovieDecoder::open(dir.path().join("missing.mp4").as_path()).unwrap_err();
    assert_eq!(err.kind(), Some(MovieErrorKind::OpenFile));
}

#[test]
fn probe_reports_audio_stream() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_wav(dir.path(), 1);

    let info = moviedecoder::probe(path.as_path()).unwrap();
    assert!(info.video.is_none());
    let audio = info.audio.expect("audio stream");
    assert_eq!(audio.sample_rate, RATE);
    assert_eq!(audio.channel_count(), 1);
}

#[test]
fn unnamed_channel_counts_are_decoded() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_wav(dir.path(), 4);

    let mut decoder = MovieDecoder::open(path.as_path()).unwrap();
    assert_eq!(decoder.channels(), 4);

    let frames = decode_to_end(&mut decoder, 0.5);
    let audio: Vec<_> = frames
        .into_iter()
        .filter_map(|f| match f {
            Frame::Audio(audio) => Some(audio),
            Frame::Video(_) => None,
        })
        .collect();
    assert!(!audio.is_empty());

    let mut samples = 0;
    for frame in audio {
        assert_eq!(frame.channels(), ChannelLayout::Other(4));
        let count = frame.sample_count();
        assert_eq!(frame.into_samples().len(), count * 4 * 2);
        samples += count;
    }
    assert_eq!(samples, (RATE as f64 * SECONDS) as usize);
}

#[test]
fn video_resource_reports_geometry_and_rate() {
    let (_dir, decoder) = open_clip(MovieDecoderConfig::default());

    assert!(decoder.valid_video());
    assert!(!decoder.valid_audio());
    assert_eq!(decoder.frame_width(), WIDTH);
    assert_eq!(decoder.frame_height(), HEIGHT);
    assert!((decoder.fps() - f64::from(FPS)).abs() < 1e-6);
    assert_eq!(decoder.sample_rate(), 0);
    assert_eq!(decoder.video_frame_format(), VideoFrameFormat::default());
}

#[test]
fn yuv_frames_carry_rounded_up_chroma_planes() {
    let config = MovieDecoderConfig::default()
        .with_video_format(VideoFrameFormat::Yuv)
        .with_decoder_threads(1);
    let (_dir, mut decoder) = open_clip(config);
    assert_eq!(decoder.video_frame_format(), VideoFrameFormat::Yuv);

    let frames = decoder.decode_frames(0.0);
    let video = frames[0].as_video().expect("video frame");
    assert_eq!((video.width(), video.height()), (WIDTH, HEIGHT));

    let VideoPixels::Yuv {
        luma,
        chroma_b,
        chroma_r,
        chroma_width,
        chroma_height,
    } = video.clone().into_pixels()
    else {
        panic!("expected yuv planes");
    };
    assert_eq!((chroma_width, chroma_height), (17, 9));
    assert_eq!(luma.len(), (WIDTH * HEIGHT) as usize);
    assert_eq!(chroma_b.len(), 17 * 9);
    assert_eq!(chroma_r.len(), 17 * 9);
    assert!(chroma_b.iter().all(|&b| b == 96));
    assert!(chroma_r.iter().all(|&b| b == 160));
}

#[test]
fn rgb_frames_report_their_row_stride() {
    let (_dir, mut decoder) = open_clip(MovieDecoderConfig::default());

    let frames = decoder.decode_frames(0.0);
    let video = frames[0].as_video().expect("video frame");
    let VideoPixels::Rgb {
        data,
        linesize,
        layout,
    } = video.pixels()
    else {
        panic!("expected packed pixels");
    };
    assert_eq!(*layout, PackedLayout::Rgb24);
    assert!(*linesize >= WIDTH as usize * 3);
    assert_eq!(data.len(), linesize * HEIGHT as usize);
}

#[test]
fn video_decodes_fps_times_duration_frames() {
    let config = MovieDecoderConfig::default().with_max_consecutive_errors(4);
    let (_dir, mut decoder) = open_clip(config);

    let duration = decoder.duration().expect("clip duration is known");
    assert!((duration - 2.0).abs() < 0.05, "duration {duration}");

    let frames = decode_to_end(&mut decoder, 0.5);
    assert!(frames.iter().all(|f| f.kind() == StreamType::Video));
    assert_eq!(frames.len() as f64, (decoder.fps() * duration).round());
    assert_eq!(frames.len(), FRAMES as usize);

    assert!(frames[0].position().abs() < 1e-6);
    assert!((frames[0].duration() - 1.0 / f64::from(FPS)).abs() < 1e-6);
    assert!(frames.windows(2).all(|w| w[0].position() < w[1].position()));
}

#[test]
fn format_is_locked_after_the_first_video_frame() {
    let (_dir, mut decoder) = open_clip(MovieDecoderConfig::default());

    // Switching before any frame is fine
    decoder
        .setup_video_frame_format(VideoFrameFormat::Rgb(PackedLayout::Bgra))
        .unwrap();
    assert!(!decoder.decode_frames(0.0).is_empty());

    let err = decoder
        .setup_video_frame_format(VideoFrameFormat::Yuv)
        .unwrap_err();
    assert!(matches!(err, Error::FormatLocked), "{err:?}");
    assert_eq!(
        decoder.video_frame_format(),
        VideoFrameFormat::Rgb(PackedLayout::Bgra)
    );

    // Asking for the current format is not a change
    decoder
        .setup_video_frame_format(VideoFrameFormat::Rgb(PackedLayout::Bgra))
        .unwrap();
}

#[test]
fn yuv_is_refused_for_packed_sources() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_bmp(dir.path());

    let mut decoder = MovieDecoder::open(path.as_path()).unwrap();
    assert!(decoder.valid_video());
    let err = decoder
        .setup_video_frame_format(VideoFrameFormat::Yuv)
        .unwrap_err();
    assert!(matches!(err, Error::UnsupportedFormat(_)), "{err:?}");

    // Requesting it at open falls back to the default
    let config = MovieDecoderConfig::default().with_video_format(VideoFrameFormat::Yuv);
    let decoder = MovieDecoder::open_with(path.as_path(), config, InterruptGate::new()).unwrap();
    assert_eq!(decoder.video_frame_format(), VideoFrameFormat::default());
}

#[test]
fn video_seek_lands_within_one_frame_of_target() {
    let (_dir, mut decoder) = open_clip(MovieDecoderConfig::default());
    decoder.decode_frames(0.2);

    decoder.set_position(1.0);
    let frames = decoder.decode_frames(0.0);
    let first = frames.first().expect("frames after seek");
    assert!(
        (first.position() - 1.0).abs() <= first.duration() + 1e-6,
        "landed at {}",
        first.position()
    );
}
