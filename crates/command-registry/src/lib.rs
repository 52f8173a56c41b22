//! command-registry: the command model and the key-grab lifecycle.
//!
//! - [`KeyBinding`]: a chord plus the grab handles it owns.
//! - [`Command`]: keyboard or braille command, with shared [`CommandBase`]
//!   accessors and an opaque [`CommandHandler`].
//! - [`CommandRegistry`]: owns all commands, the keyval/keycode indices and the
//!   grab backend, and keeps exactly the active bindings grabbed.
//!
//! Grab reconciliation is split between a pure planner ([`diff::plan`]) and the
//! registry, which applies plans against a [`grab::GrabBackend`].
use serde::{Deserialize, Serialize};

mod command;
pub mod diff;
mod error;
mod event;
mod index;
mod key_binding;
mod rebind;
mod registry;

pub use command::{
    BrailleCommand, Command, CommandBase, CommandHandler, CommandInfo, ExecContext,
    KeyboardCommand,
};
pub use error::{Error, Result};
pub use event::{InputEvent, KeyEvent};
pub use key_binding::{IdentityKey, KeyBinding};
pub use rebind::{RebindCapture, RebindOutcome};
pub use registry::CommandRegistry;

/// Which default binding table is in force.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layout {
    /// Full keyboard with a numeric keypad.
    #[default]
    Desktop,
    /// Compact keyboard without a keypad.
    Laptop,
}

impl Layout {
    /// `Desktop` when `is_desktop`, otherwise `Laptop`.
    pub fn from_is_desktop(is_desktop: bool) -> Self {
        if is_desktop { Self::Desktop } else { Self::Laptop }
    }

    /// True for the desktop layout.
    pub fn is_desktop(self) -> bool {
        self == Self::Desktop
    }
}
