use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::warn;

use moviedecoder::{Frame, InterruptGate, MovieDecoder, MovieDecoderConfig, VideoFrameFormat};

#[derive(Parser, Debug)]
pub struct DecodeCommand {
    /// File path or URL to decode
    pub input: String,

    /// JSON configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Video frame format: yuv, rgb24, rgba or bgra
    #[arg(short, long)]
    pub format: Option<VideoFrameFormat>,

    /// Seconds of playback to decode per call
    #[arg(short, long, default_value = "0.1")]
    pub budget: f64,

    /// Seek to this position (seconds) before decoding
    #[arg(short, long)]
    pub seek: Option<f64>,

    /// Interrupt the open and each decode call after this many seconds
    #[arg(short, long)]
    pub timeout: Option<f64>,

    /// Stop after this many decode calls
    #[arg(short = 'n', long)]
    pub max_calls: Option<usize>,
}

impl DecodeCommand {
    pub fn run(self) -> Result<()> {
        let mut config = match &self.config {
            Some(path) => MovieDecoderConfig::load(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => MovieDecoderConfig::default(),
        };
        if let Some(format) = self.format {
            config.video_format = format;
        }

        if !self.budget.is_finite() {
            bail!("budget must be a finite number of seconds");
        }
        if self.timeout.is_some_and(|t| !t.is_finite()) {
            bail!("timeout must be a finite number of seconds");
        }

        let deadline = self
            .timeout
            .map(|secs| Duration::try_from_secs_f64(secs.max(0.0)).map(Deadline::new))
            .transpose()
            .context("timeout is out of range")?;
        let gate = match &deadline {
            Some(deadline) => {
                deadline.arm();
                InterruptGate::with_callback(deadline.predicate())
            }
            None => InterruptGate::new(),
        };

        let mut decoder = MovieDecoder::open_with(self.input.as_str(), config, gate)
            .with_context(|| format!("failed to open {}", self.input))?;

        println!(
            "{}: video={} audio={} duration={} start={:.3}s fps={:.3} format={}",
            decoder.location(),
            decoder.valid_video(),
            decoder.valid_audio(),
            decoder
                .duration()
                .map(|d| format!("{:.3}s", d))
                .unwrap_or_else(|| "unknown".to_string()),
            decoder.start_time(),
            decoder.fps(),
            decoder.video_frame_format(),
        );

        if let Some(seek) = self.seek {
            decoder.set_position(seek);
        }

        let mut totals = Totals::default();
        let mut calls = 0;
        while !decoder.is_eof() && self.max_calls.is_none_or(|max| calls < max) {
            if let Some(deadline) = &deadline {
                deadline.arm();
            }

            let frames = decoder.decode_frames(self.budget);
            calls += 1;

            if frames.is_empty() && !decoder.is_eof() {
                warn!(call = calls, "decode call interrupted before producing frames");
                break;
            }

            let batch = Totals::of(&frames);
            println!(
                "call {:>4}: {:>3} video {:>3} audio, {:.3}s decoded, position {:.3}s",
                calls,
                batch.video,
                batch.audio,
                batch.seconds,
                decoder.position()
            );
            totals.add(&batch);
        }

        println!(
            "{} calls, {} video frames, {} audio frames, eof={}",
            calls,
            totals.video,
            totals.audio,
            decoder.is_eof()
        );

        Ok(())
    }
}

/**
    Restartable time limit checked by the interrupt gate.
*/
struct Deadline {
    started: Instant,
    timeout: Duration,
    /// Milliseconds since `started` after which the gate reads as interrupted.
    expires_ms: Arc<AtomicU64>,
}

impl Deadline {
    fn new(timeout: Duration) -> Self {
        Self {
            started: Instant::now(),
            timeout,
            expires_ms: Arc::new(AtomicU64::new(u64::MAX)),
        }
    }

    fn arm(&self) {
        let expires = self.started.elapsed().saturating_add(self.timeout);
        let expires_ms = u64::try_from(expires.as_millis()).unwrap_or(u64::MAX);
        self.expires_ms.store(expires_ms, Ordering::Relaxed);
    }

    fn predicate(&self) -> impl Fn() -> bool + Send + Sync + 'static {
        let started = self.started;
        let expires_ms = Arc::clone(&self.expires_ms);
        move || started.elapsed().as_millis() as u64 >= expires_ms.load(Ordering::Relaxed)
    }
}

#[derive(Default)]
struct Totals {
    video: usize,
    audio: usize,
    seconds: f64,
}

impl Totals {
    /// Counts frames and sums the duration of the stream that drove the call.
    fn of(frames: &[Frame]) -> Self {
        let mut totals = Self::default();
        let mut audio_seconds = 0.0;
        for frame in frames {
            match frame {
                Frame::Video(video) => {
                    totals.video += 1;
                    totals.seconds += video.duration();
                }
                Frame::Audio(audio) => {
                    totals.audio += 1;
                    audio_seconds += audio.duration();
                }
            }
        }
        if totals.video == 0 {
            totals.seconds = audio_seconds;
        }
        totals
    }

    fn add(&mut self, other: &Totals) {
        self.video += other.video;
        self.audio += other.audio;
        self.seconds += other.seconds;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expired_deadline_interrupts() {
        let deadline = Deadline::new(Duration::ZERO);
        let expired = deadline.predicate();
        assert!(!expired());

        deadline.arm();
        assert!(expired());
    }

    #[test]
    fn huge_deadline_never_fires() {
        let timeout = Duration::try_from_secs_f64(1e19).unwrap();
        let deadline = Deadline::new(timeout);
        deadline.arm();
        assert!(!deadline.predicate()());

        assert!(Duration::try_from_secs_f64(1e20).is_err());
    }
}
