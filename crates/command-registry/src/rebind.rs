//! Interactive rebinding: capture a chord, then commit or abort.
use keysym::{DEFAULT_MODIFIER_MASK, Modifiers, names};
use tracing::debug;

use crate::{IdentityKey, KeyBinding, KeyEvent};

/// An in-progress rebinding of one command.
///
/// Capturing never touches the registry. Commit the capture with
/// [`crate::CommandRegistry::commit_rebind`], or drop it with [`Self::abort`].
#[derive(Debug)]
#[must_use]
pub struct RebindCapture {
    /// Command being rebound.
    command: String,
    /// Most recent captured chord.
    captured: Option<KeyBinding>,
}

impl RebindCapture {
    /// Empty capture for `command`.
    pub(crate) fn new(command: &str) -> Self {
        Self {
            command: command.to_string(),
            captured: None,
        }
    }

    /// Command being rebound.
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Record the chord for `event`.
    ///
    /// Releases and bare modifier or lock presses are ignored and return false.
    /// A later capture replaces an earlier one.
    pub fn capture(&mut self, event: &KeyEvent) -> bool {
        if !event.pressed || names::is_modifier_key(&event.keysym) || names::is_locking_key(&event.keysym) {
            return false;
        }
        let modifiers = event.modifiers & DEFAULT_MODIFIER_MASK;
        let binding = KeyBinding::new(
            base_symbol(&event.keysym, modifiers),
            modifiers,
            event.click_count.max(1),
        );
        debug!(command = %self.command, chord = %binding, "rebind_captured");
        self.captured = Some(binding);
        true
    }

    /// The chord captured so far.
    pub fn captured(&self) -> Option<&KeyBinding> {
        self.captured.as_ref()
    }

    /// Abandon the capture. The registry is left untouched.
    pub fn abort(self) {
        debug!(command = %self.command, "rebind_aborted");
    }

    /// Command name and captured chord.
    pub(crate) fn into_parts(self) -> (String, Option<KeyBinding>) {
        (self.command, self.captured)
    }
}

/// Store a shifted letter under its unshifted symbol; Shift stays in the modifiers.
fn base_symbol(keysym: &str, modifiers: u32) -> String {
    let shifted = modifiers & Modifiers::SHIFT.bits() != 0;
    let mut chars = keysym.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if shifted && c.is_ascii_uppercase() => c.to_ascii_lowercase().to_string(),
        _ => keysym.to_string(),
    }
}

/// Result of a committed rebinding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebindOutcome {
    /// Command that was rebound.
    pub command: String,
    /// Identity in force before the commit.
    pub previous: Option<IdentityKey>,
    /// Identity in force after the commit.
    pub binding: IdentityKey,
    /// False when the captured chord equals the previous binding.
    pub changed: bool,
    /// Whether the new binding holds a grab.
    pub grabbed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modifier_presses_and_releases_are_ignored() {
        let mut cap = RebindCapture::new("say_all");
        let shift = KeyEvent::press("Shift_L", Modifiers::SHIFT.bits()).expect("event");
        assert!(!cap.capture(&shift));
        let mut release = KeyEvent::press("a", 0).expect("event");
        release.pressed = false;
        assert!(!cap.capture(&release));
        assert!(cap.captured().is_none());
    }

    #[test]
    fn shifted_letter_is_stored_lowercase() {
        let mut cap = RebindCapture::new("say_all");
        let mods = (Modifiers::SHIFT | Modifiers::COMMAND | Modifiers::NUM_LOCK).bits();
        let ev = KeyEvent::press("H", mods).expect("event");
        assert!(cap.capture(&ev));
        let b = cap.captured().expect("captured");
        assert_eq!(b.keysym(), "h");
        assert_eq!(b.modifiers(), (Modifiers::SHIFT | Modifiers::COMMAND).bits());
        cap.abort();
    }
}
