//! Command-line interface definitions for replay.

use std::path::PathBuf;

use clap::Parser;
use logging::LogArgs;

/// Command-line interface for the `replay` binary.
#[derive(Parser, Debug)]
#[command(
    name = "replay",
    about = "Replay a scripted key session through the command registry",
    version
)]
pub struct Cli {
    /// Logging controls shared across keygrab binaries.
    #[command(flatten)]
    pub log: LogArgs,

    /// Session file (RON).
    #[arg(value_name = "SESSION")]
    pub session: PathBuf,

    /// Override file (.ron or .json) applied over the session's overrides.
    #[arg(long, value_name = "FILE")]
    pub overrides: Option<PathBuf>,

    /// Start on the laptop layout regardless of the session.
    #[arg(long)]
    pub laptop: bool,

    /// Accept every grab silently instead of logging grab changes.
    #[arg(long)]
    pub null_grabs: bool,
}
