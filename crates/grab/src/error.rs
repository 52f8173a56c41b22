//! Error types and result alias for the grab crate.
use std::result::Result as StdResult;

use thiserror::Error;

use crate::GrabHandle;

/// Convenient result type used throughout this crate.
pub type Result<T> = StdResult<T, Error>;

/// Error variants produced by grab backends.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The platform refused the grab, usually because another client owns it.
    #[error("grab refused for {0}")]
    Refused(String),
    /// The key symbol has no hardware code on the current layout.
    #[error("no keycode for key symbol {0:?}")]
    UnknownKey(String),
    /// The handle is not live in this backend.
    #[error("invalid grab handle {0}")]
    InvalidHandle(GrabHandle),
    /// Any other backend failure.
    #[error("grab backend error: {0}")]
    Backend(String),
}
