use anyhow::{Context, Result};
use clap::Parser;

use moviedecoder::{Location, probe};

#[derive(Parser, Debug)]
pub struct ProbeCommand {
    /// File path or URL
    pub input: String,
}

impl ProbeCommand {
    pub fn run(self) -> Result<()> {
        let location = Location::parse(&self.input);
        let info =
            probe(location.clone()).with_context(|| format!("failed to probe {}", location))?;

        println!("{}", location);
        match info.duration {
            Some(duration) => println!("  duration: {:.3}s", duration.as_secs_f64()),
            None => println!("  duration: unknown"),
        }
        println!("  start:    {:.3}s", info.start_time.as_secs_f64());

        if let Some(video) = &info.video {
            println!(
                "  video #{}: {}x{} {:?} {:?} {}",
                video.index,
                video.width,
                video.height,
                video.codec_id,
                video.pixel_format,
                video
                    .fps()
                    .map(|fps| format!("{:.3} fps", fps))
                    .unwrap_or_else(|| "unknown rate".to_string()),
            );
        }

        if let Some(audio) = &info.audio {
            println!(
                "  audio #{}: {} Hz {} ch {:?} {:?}",
                audio.index,
                audio.sample_rate,
                audio.channel_count(),
                audio.codec_id,
                audio.sample_format,
            );
        }

        Ok(())
    }
}
