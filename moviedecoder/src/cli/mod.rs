use anyhow::Result;
use clap::{Parser, Subcommand};

mod decode;
mod probe;

pub use decode::DecodeCommand;
pub use probe::ProbeCommand;

#[derive(Parser, Debug)]
#[command(name = "moviedecoder")]
#[command(about = "Decode audio and video frames from files and network streams")]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Decode a resource in budgeted batches and report what comes out
    Decode(DecodeCommand),
    /// Print stream information without decoding
    Probe(ProbeCommand),
}

impl Args {
    pub fn run(self) -> Result<()> {
        match self.command {
            Command::Decode(cmd) => cmd.run(),
            Command::Probe(cmd) => cmd.run(),
        }
    }
}
