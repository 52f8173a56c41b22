//! dispatch: from platform key events to executed commands.
//!
//! - [`InputEventClassifier`] turns a [`RawKeyEvent`] into a classified
//!   [`KeyboardEvent`] with a category, click count and command-modifier state,
//!   and keeps the recent-event history.
//! - [`Dispatcher`] runs the two dispatch phases against a
//!   [`command_registry::CommandRegistry`]: present (narrate, maybe intercept)
//!   and, on the next tick, consume (execute).
//! - [`EventLoop`] drives a dispatcher from a channel on a single task.

mod classifier;
mod config;
mod dispatcher;
mod error;
mod event;
mod event_loop;
mod learn_mode;
mod present;

/// Threshold for warning about slow key processing.
pub const KEY_PROC_WARN_MS: u64 = 5;

pub use classifier::{InputEventClassifier, is_release_for};
pub use config::DispatchConfig;
pub use dispatcher::{Consumed, Dispatcher, Verdict};
pub use error::{Error, Result};
pub use event::{KeyCategory, KeyboardEvent, RawKeyEvent};
pub use event_loop::{EventLoop, LoopInput, Report};
pub use learn_mode::{LEARN_MODE_START, LEARN_MODE_STOP, LearnMode};
pub use present::{Interceptor, Presentation, Presenter, RecordingPresenter};
