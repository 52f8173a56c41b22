//! Error handling for the replay tool.

use std::{io, result::Result as StdResult};

use thiserror::Error;

/// Convenient result type for the replay tool.
pub type Result<T> = StdResult<T, Error>;

/// Errors surfaced by the replay tool.
#[derive(Debug, Error)]
pub enum Error {
    /// Reading the session or writing output failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The session document is not valid.
    #[error("invalid session {origin}: {message}")]
    Session {
        /// Where the session came from: a path, or `<inline>`.
        origin: String,
        /// Parser message, including the location.
        message: String,
    },

    /// A chord in the session does not parse.
    #[error("bad chord in session: {0:?}")]
    BadChord(String),

    /// The override file could not be loaded.
    #[error("{}", .0.pretty())]
    Overrides(#[from] overrides::Error),

    /// Registering a command failed.
    #[error(transparent)]
    Registry(#[from] command_registry::Error),

    /// The dispatcher failed.
    #[error(transparent)]
    Dispatch(#[from] dispatch::Error),

    /// The event loop task panicked or was aborted.
    #[error("event loop task failed: {0}")]
    Join(String),
}
