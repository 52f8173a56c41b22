use std::result::Result as StdResult;

use thiserror::Error;

/// Convenient result type for the registry crate.
pub type Result<T> = StdResult<T, Error>;

/// Errors surfaced by the command registry.
///
/// Grab failures and malformed overrides are recovered inside the registry and
/// only logged; the variants here are the conditions a caller must act on.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// A command with this name is already registered.
    #[error("duplicate command name: {0}")]
    DuplicateCommand(String),

    /// No command with this name is registered.
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// The named command is a braille command.
    #[error("{0} is not a keyboard command")]
    NotKeyboardCommand(String),

    /// A rebinding collides with a binding another command already holds.
    #[error("{chord} is already bound to {owner}")]
    BindingConflict {
        /// Command being rebound.
        command: String,
        /// Command that currently owns the chord.
        owner: String,
        /// The contested chord, rendered canonically.
        chord: String,
    },

    /// The key symbol name does not resolve.
    #[error("unresolvable key symbol: {0:?}")]
    UnresolvableKeysym(String),

    /// A rebinding was committed before any chord was captured.
    #[error("no chord captured for {0}")]
    NothingCaptured(String),
}
