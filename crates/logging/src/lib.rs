#![warn(missing_docs)]

//! Shared logging helpers, CLI argument definitions, and tracing utilities for the keygrab workspace.
//!
//! This crate consolidates logging infrastructure:
//! - [`fmt`]: Render tracing events to logfmt strings
//! - [`capture`]: Keep rendered events in memory for later inspection
//! - CLI argument parsing for log level configuration

use std::{env, io};

use clap::Args;
use tracing_subscriber::{EnvFilter, fmt::layer as fmt_layer, prelude::*, registry};

pub mod capture;
pub mod fmt;

pub use capture::CaptureLayer;
pub use fmt::{RenderedLog, render_event};

/// Logging controls for CLI apps.
#[derive(Debug, Clone, Default, Args)]
pub struct LogArgs {
    /// Set global log level to trace (our crates only)
    #[arg(long, conflicts_with_all = ["debug", "log_level", "log_filter"])]
    pub trace: bool,

    /// Set global log level to debug (our crates only)
    #[arg(long, conflicts_with_all = ["trace", "log_level", "log_filter"])]
    pub debug: bool,

    /// Set a single global log level for our crates (error|warn|info|debug|trace)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Set an explicit tracing filter directive (overrides other flags)
    /// e.g. "command_registry=trace,dispatch=debug"
    #[arg(long)]
    pub log_filter: Option<String>,
}

impl LogArgs {
    /// The filter spec these arguments select.
    pub fn spec(&self) -> String {
        compute_spec(
            self.trace,
            self.debug,
            self.log_level.as_deref(),
            self.log_filter.as_deref(),
        )
    }
}

/// List of crate targets that constitute "our" logs.
pub fn our_crates() -> &'static [&'static str] {
    &[
        // Core crates
        "keysym",
        "grab",
        "overrides",
        "command_registry",
        "dispatch",
        // Tools
        "replay",
        "logging",
    ]
}

/// Build a filter directive string that sets the same `level` for all of our crates.
pub fn level_spec_for(level: &str) -> String {
    let lvl = level.to_ascii_lowercase();
    our_crates()
        .iter()
        .map(|t| format!("{}={}", t, lvl))
        .collect::<Vec<_>>()
        .join(",")
}

/// Compute the final filter spec string with precedence:
/// - `log_filter`
/// - `trace`/`debug`/`log_level` (crate-scoped)
/// - `RUST_LOG` env
/// - default to crate-scoped `info`
pub fn compute_spec(
    trace: bool,
    debug: bool,
    log_level: Option<&str>,
    log_filter: Option<&str>,
) -> String {
    if let Some(spec) = log_filter {
        return spec.to_string();
    }
    if trace {
        return level_spec_for("trace");
    }
    if debug {
        return level_spec_for("debug");
    }
    if let Some(lvl) = log_level {
        return level_spec_for(lvl);
    }
    env::var("RUST_LOG").unwrap_or_else(|_| level_spec_for("info"))
}

/// Create an `EnvFilter` from a spec string.
pub fn env_filter_from_spec(spec: &str) -> EnvFilter {
    EnvFilter::new(spec)
}

/// Install the global subscriber: `spec` filtering, compact fmt output on
/// stderr, and `capture` when given.
///
/// Returns false if a global subscriber was already installed.
pub fn init(spec: &str, capture: Option<CaptureLayer>) -> bool {
    registry()
        .with(env_filter_from_spec(spec))
        .with(fmt_layer().without_time().with_writer(io::stderr))
        .with(capture)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_spec_covers_every_crate() {
        let spec = level_spec_for("DEBUG");
        assert!(spec.starts_with("keysym=debug,"));
        assert_eq!(spec.split(',').count(), our_crates().len());
        assert!(spec.contains("command_registry=debug"));
    }

    #[test]
    fn explicit_flags_take_precedence() {
        assert_eq!(
            compute_spec(true, false, Some("warn"), Some("dispatch=trace")),
            "dispatch=trace"
        );
        assert_eq!(compute_spec(true, false, Some("warn"), None), level_spec_for("trace"));
        assert_eq!(compute_spec(false, true, Some("warn"), None), level_spec_for("debug"));
        assert_eq!(compute_spec(false, false, Some("warn"), None), level_spec_for("warn"));
    }

    #[test]
    fn args_parse_and_conflict() {
        use clap::Parser;

        /// Minimal host for the flattened arguments.
        #[derive(Parser)]
        struct Cli {
            /// Logging controls.
            #[command(flatten)]
            log: LogArgs,
        }

        let cli = Cli::try_parse_from(["t", "--log-level", "warn"]).expect("parse");
        assert_eq!(cli.log.spec(), level_spec_for("warn"));
        assert!(Cli::try_parse_from(["t", "--trace", "--debug"]).is_err());
    }
}
