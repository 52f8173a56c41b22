use std::result::Result as StdResult;

use thiserror::Error;

/// Convenient result type for the dispatch crate.
pub type Result<T> = StdResult<T, Error>;

/// Errors surfaced by dispatch and the event loop.
#[derive(Debug, Error)]
pub enum Error {
    /// The report channel has been closed by the receiver.
    #[error("report channel closed")]
    ChannelClosed,

    /// Errors originating from the command registry.
    #[error("registry error: {0}")]
    Registry(#[from] command_registry::Error),
}
