//! Narration and interception seams.

use std::{mem, sync::Arc};

use command_registry::KeyboardCommand;
use parking_lot::Mutex;

use crate::KeyboardEvent;

/// Receives what the user should hear or read.
pub trait Presenter: Send {
    /// Narrate a key as it is typed.
    fn present_key(&mut self, event: &KeyboardEvent);
    /// Announce a message.
    fn present_message(&mut self, message: &str);
}

/// A mode that can claim key events during the present phase.
///
/// A claimed event never reaches its command: the consume phase becomes a
/// no-op for it.
pub trait Interceptor: Send {
    /// True while the mode is claiming events.
    fn is_active(&self) -> bool;

    /// Offer `event` to the mode. `command` is the command the event would
    /// otherwise run. Returns true when the event is claimed.
    fn intercept(
        &mut self,
        event: &KeyboardEvent,
        command: Option<&KeyboardCommand>,
        presenter: &mut dyn Presenter,
    ) -> bool;
}

/// One recorded presentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Presentation {
    /// A narrated key, as [`KeyboardEvent::describe`] renders it.
    Key(String),
    /// An announced message.
    Message(String),
}

/// Presenter that records everything it is given.
///
/// Clones share the record, so one clone can go to a dispatcher while another
/// is kept for inspection.
#[derive(Debug, Clone, Default)]
pub struct RecordingPresenter {
    /// Shared record.
    log: Arc<Mutex<Vec<Presentation>>>,
}

impl RecordingPresenter {
    /// Empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything presented so far.
    pub fn presentations(&self) -> Vec<Presentation> {
        self.log.lock().clone()
    }

    /// Only the announced messages.
    pub fn messages(&self) -> Vec<String> {
        self.log
            .lock()
            .iter()
            .filter_map(|p| match p {
                Presentation::Message(m) => Some(m.clone()),
                Presentation::Key(_) => None,
            })
            .collect()
    }

    /// Drain the record.
    pub fn take(&self) -> Vec<Presentation> {
        mem::take(&mut *self.log.lock())
    }
}

impl Presenter for RecordingPresenter {
    fn present_key(&mut self, event: &KeyboardEvent) {
        self.log.lock().push(Presentation::Key(event.describe()));
    }

    fn present_message(&mut self, message: &str) {
        self.log.lock().push(Presentation::Message(message.to_string()));
    }
}
