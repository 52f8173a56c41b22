#![warn(missing_docs)]

//! Entry point for the `replay` binary.
//!
//! Loads a session, registers its commands against a logging grab backend,
//! and feeds its inputs through the dispatcher's event loop on a paused tokio
//! clock. Prints one line per step, then the final bindings.

mod cli;
mod error;
mod player;
mod session;

use std::{
    io::{self, Write},
    path::Path,
    process,
};

use clap::Parser;
use command_registry::Layout;
use grab::{GrabBackend, LoggingGrabBackend, NullGrabBackend};
use logging::CaptureLayer;
use overrides::OverrideMap;
use tokio::runtime::Builder;
use tracing::{Level, error, warn};

use crate::{
    cli::Cli,
    error::{Error, Result},
    session::{Session, Step},
};

fn main() {
    if let Err(err) = run() {
        error!("{err}");
        eprintln!("error: {err}");
        process::exit(1);
    }
}

/// Load an override file, logging and skipping malformed entries.
fn load_overrides(path: &Path) -> Result<OverrideMap> {
    let loaded = overrides::load_from_path(path)?;
    for e in &loaded.malformed {
        warn!("{}", e.pretty());
    }
    Ok(loaded.map)
}

/// Parse CLI arguments, install logging, and replay the session.
fn run() -> Result<()> {
    let Cli {
        log,
        session,
        overrides,
        laptop,
        null_grabs,
    } = Cli::parse();
    let capture = CaptureLayer::new(Level::WARN);
    logging::init(&log.spec(), Some(capture.clone()));

    let mut session = Session::load(&session)?;
    if laptop {
        session.layout = Layout::Laptop;
    }
    let extra = overrides.as_deref().map(load_overrides).transpose()?;

    let rt = Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()?;
    let backend: Box<dyn GrabBackend> = if null_grabs {
        Box::new(NullGrabBackend::default())
    } else {
        Box::new(LoggingGrabBackend::default())
    };
    let mut out = io::stdout().lock();
    let summary = rt.block_on(player::play(
        &session,
        backend,
        extra.as_ref(),
        &mut out,
    ))?;
    write!(out, "{summary}")?;
    let warnings = capture.take();
    if !warnings.is_empty() {
        writeln!(out, "{} warnings:", warnings.len())?;
        for w in warnings {
            writeln!(out, "  {w}")?;
        }
    }
    Ok(())
}
