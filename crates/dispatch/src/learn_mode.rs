//! Learn mode: every key is announced instead of run.

use command_registry::{CommandBase, KeyboardCommand};
use tracing::debug;

use crate::{Interceptor, KeyboardEvent, Presenter};

/// Announced when learn mode starts.
pub const LEARN_MODE_START: &str = "Entering learn mode. Press Escape to exit.";
/// Announced when learn mode stops.
pub const LEARN_MODE_STOP: &str = "Exiting learn mode.";

/// Claims every key while active. Pressing a key announces the description of
/// the command it is bound to; Escape leaves the mode.
#[derive(Debug, Default)]
pub struct LearnMode {
    /// Whether the mode is claiming keys.
    active: bool,
}

impl LearnMode {
    /// Inactive learn mode.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter learn mode. Returns false if it was already active.
    pub fn start(&mut self, presenter: &mut dyn Presenter) -> bool {
        if self.active {
            debug!("learn_mode_already_active");
            return false;
        }
        self.active = true;
        presenter.present_message(LEARN_MODE_START);
        debug!("learn_mode_started");
        true
    }

    /// Leave learn mode. Returns false if it was not active.
    pub fn quit(&mut self, presenter: &mut dyn Presenter) -> bool {
        if !self.active {
            debug!("learn_mode_already_inactive");
            return false;
        }
        self.active = false;
        presenter.present_message(LEARN_MODE_STOP);
        debug!("learn_mode_stopped");
        true
    }
}

impl Interceptor for LearnMode {
    fn is_active(&self) -> bool {
        self.active
    }

    fn intercept(
        &mut self,
        event: &KeyboardEvent,
        command: Option<&KeyboardCommand>,
        presenter: &mut dyn Presenter,
    ) -> bool {
        if !self.active {
            return false;
        }
        if !event.is_pressed() {
            return true;
        }
        if event.keysym() == "Escape" {
            self.quit(presenter);
            return true;
        }
        if let Some(cmd) = command
            && cmd.learn_mode_enabled()
            && !cmd.description().is_empty()
        {
            debug!(command = cmd.name(), "learn_mode_described");
            presenter.present_message(cmd.description());
        }
        true
    }
}
