//! Event classification, click counting and the recent-event history.
//!
//! The classifier turns each [`RawKeyEvent`] into a [`KeyboardEvent`]: it
//! resolves the symbol name, computes the category once, folds held command
//! modifiers into the modifier state, and assigns a click count from the
//! previous events. It also answers "what was the last thing the user did"
//! questions for code that reacts to caret and focus changes.
use std::{collections::BTreeSet, time::Duration};

use command_registry::KeyEvent;
use keysym::{Keysym, Modifiers};
use tracing::{debug, trace};

use crate::{DispatchConfig, KeyCategory, KeyboardEvent, RawKeyEvent};

/// The most recent input of any kind.
#[derive(Debug, Clone)]
enum LastInput {
    /// A keyboard event.
    Key(KeyboardEvent),
    /// A braille display command code.
    Braille(i32),
}

/// Builds classified events and keeps the event history.
#[derive(Debug)]
pub struct InputEventClassifier {
    /// Multi-click window.
    double_click_timeout: Duration,
    /// Canonical names of the command-modifier keys.
    command_modifiers: BTreeSet<String>,
    /// Command modifiers currently held down.
    held: BTreeSet<String>,
    /// Most recent input.
    last_input: Option<LastInput>,
    /// Most recent key that is not a modifier; cleared by a lone modifier tap.
    last_non_modifier: Option<KeyboardEvent>,
}

impl InputEventClassifier {
    /// Classifier using `config` for timing and command modifiers.
    pub fn new(config: &DispatchConfig) -> Self {
        let mut c = Self {
            double_click_timeout: config.double_click_timeout(),
            command_modifiers: BTreeSet::new(),
            held: BTreeSet::new(),
            last_input: None,
            last_non_modifier: None,
        };
        c.set_command_modifiers(&config.command_modifiers);
        c
    }

    /// Replace the command-modifier keys. Unknown names are ignored.
    pub fn set_command_modifiers(&mut self, names: &[String]) {
        self.command_modifiers = names
            .iter()
            .filter_map(|n| Keysym::resolve(n))
            .map(|k| k.name)
            .collect();
        self.held.retain(|h| self.command_modifiers.contains(h));
    }

    /// True when `keysym` is a command-modifier key.
    pub fn is_command_modifier(&self, keysym: &str) -> bool {
        self.command_modifiers.contains(keysym)
    }

    /// True while any command modifier is held down.
    pub fn command_modifier_held(&self) -> bool {
        !self.held.is_empty()
    }

    /// Classify `raw`, observed at `time`. Returns `None` for a duplicate of
    /// the last input or the last non-modifier key.
    pub fn classify(&mut self, raw: &RawKeyEvent, time: Duration) -> Option<KeyboardEvent> {
        if self.is_duplicate(raw, time) {
            debug!(keyval = raw.resolved_symbol, pressed = raw.pressed, "duplicate_event");
            return None;
        }
        let keysym = Keysym::from_keyval(raw.resolved_symbol).name;
        let is_command_modifier = self.is_command_modifier(&keysym);
        if is_command_modifier {
            if raw.pressed {
                self.held.insert(keysym.clone());
            } else {
                self.held.remove(&keysym);
            }
        }
        let mut modifiers = raw.modifiers;
        if self.command_modifier_held() {
            modifiers |= Modifiers::COMMAND.bits();
        }
        let category = KeyCategory::of(&keysym, &raw.text, is_command_modifier);
        let mut event = KeyboardEvent {
            key: KeyEvent {
                pressed: raw.pressed,
                keyval: raw.resolved_symbol,
                keycode: raw.hardware_code,
                modifiers,
                keysym,
                text: raw.text.clone(),
                click_count: 1,
            },
            category,
            is_command_modifier,
            time,
            raw_modifiers: raw.modifiers,
            toggles_modifier: false,
        };
        let (count, previous) = self.click_count(&event);
        event.key.click_count = count;
        event.toggles_modifier =
            is_command_modifier && event.is_pressed() && count == 2 && previous == Some(1);
        self.record(&event);
        trace!(event = %event.describe(), ?category, "event_classified");
        Some(event)
    }

    /// Record a braille command as the most recent input.
    pub fn note_braille(&mut self, code: i32) {
        self.last_input = Some(LastInput::Braille(code));
        self.last_non_modifier = None;
    }

    /// True when `raw` repeats the last input or the last non-modifier key.
    fn is_duplicate(&self, raw: &RawKeyEvent, time: Duration) -> bool {
        let last = match &self.last_input {
            Some(LastInput::Key(e)) => Some(e),
            _ => None,
        };
        last.into_iter()
            .chain(self.last_non_modifier.as_ref())
            .any(|e| e.same_input(raw, time))
    }

    /// Click count for `event`, and the count of the event it continues.
    ///
    /// A release repeats the count of what it follows, as does a press that
    /// follows a press. Ordinary keys wrap to 1 after three clicks and other
    /// modifiers after two; command modifiers stay at two.
    fn click_count(&self, event: &KeyboardEvent) -> (u8, Option<u8>) {
        let Some(LastInput::Key(last_input)) = &self.last_input else {
            return (1, None);
        };
        let last = if event.is_modifier_key() {
            last_input
        } else {
            self.last_non_modifier.as_ref().unwrap_or(last_input)
        };
        if event.time.saturating_sub(last.time) > self.double_click_timeout
            || event.keysym() != last.keysym()
        {
            return (1, None);
        }
        let last_count = last.click_count();
        let count = if !event.is_pressed() || last.is_pressed() {
            last_count
        } else if event.is_command_modifier {
            last_count.saturating_add(1).min(2)
        } else if (event.is_modifier_key() && last_count == 2) || last_count >= 3 {
            1
        } else {
            last_count + 1
        };
        (count, Some(last_count))
    }

    /// Update the history with `event`.
    fn record(&mut self, event: &KeyboardEvent) {
        if event.is_modifier_key() {
            if let Some(LastInput::Key(last)) = &self.last_input
                && is_release_for(event, last)
            {
                trace!(keysym = event.keysym(), "last_non_modifier_cleared");
                self.last_non_modifier = None;
            }
        } else {
            self.last_non_modifier = Some(event.clone());
        }
        self.last_input = Some(LastInput::Key(event.clone()));
    }

    // ---- history queries ----

    /// The most recent keyboard event, if the last input was one.
    pub fn last_keyboard_event(&self) -> Option<&KeyboardEvent> {
        match &self.last_input {
            Some(LastInput::Key(e)) => Some(e),
            _ => None,
        }
    }

    /// True when the last input came from the keyboard.
    pub fn last_event_was_keyboard(&self) -> bool {
        matches!(self.last_input, Some(LastInput::Key(_)))
    }

    /// True when the last input came from a braille display.
    pub fn last_event_was_braille(&self) -> bool {
        matches!(self.last_input, Some(LastInput::Braille(_)))
    }

    /// Last non-modifier key name, with the modifier state of the last input.
    fn last_key_and_modifiers(&self) -> (&str, Modifiers) {
        let Some(key) = &self.last_non_modifier else {
            return ("", Modifiers::empty());
        };
        let mods = self
            .last_keyboard_event()
            .map_or(0, KeyboardEvent::modifiers);
        (key.keysym(), Modifiers::from_raw(mods))
    }

    /// True when Control was held for the last key.
    pub fn last_event_was_command(&self) -> bool {
        self.last_key_and_modifiers().1.contains(Modifiers::CONTROL)
    }

    /// True when the last input was a key that produces text.
    pub fn last_event_was_printable_key(&self) -> bool {
        self.last_keyboard_event()
            .is_some_and(KeyboardEvent::is_printable_key)
    }

    /// Any kind of caret movement.
    pub fn last_event_was_caret_navigation(&self) -> bool {
        self.last_event_was_character_navigation()
            || self.last_event_was_word_navigation()
            || self.last_event_was_line_navigation()
            || self.last_event_was_line_boundary_navigation()
            || self.last_event_was_file_boundary_navigation()
            || self.last_event_was_page_navigation()
    }

    /// Shift with an arrow, Home or End.
    pub fn last_event_was_caret_selection(&self) -> bool {
        let (key, mods) = self.last_key_and_modifiers();
        matches!(key, "Home" | "End" | "Up" | "Down" | "Left" | "Right")
            && mods.contains(Modifiers::SHIFT)
    }

    /// Left or Right without Control or Alt.
    pub fn last_event_was_character_navigation(&self) -> bool {
        let (key, mods) = self.last_key_and_modifiers();
        matches!(key, "Left" | "Right") && !mods.intersects(Modifiers::CONTROL | Modifiers::ALT)
    }

    /// Control with Left or Right.
    pub fn last_event_was_word_navigation(&self) -> bool {
        let (key, mods) = self.last_key_and_modifiers();
        matches!(key, "Left" | "Right") && mods.contains(Modifiers::CONTROL)
    }

    /// Up or Down without Control.
    pub fn last_event_was_line_navigation(&self) -> bool {
        let (key, mods) = self.last_key_and_modifiers();
        matches!(key, "Up" | "Down") && !mods.contains(Modifiers::CONTROL)
    }

    /// Home or End without Control.
    pub fn last_event_was_line_boundary_navigation(&self) -> bool {
        let (key, mods) = self.last_key_and_modifiers();
        matches!(key, "Home" | "End") && !mods.contains(Modifiers::CONTROL)
    }

    /// Control with Home or End.
    pub fn last_event_was_file_boundary_navigation(&self) -> bool {
        let (key, mods) = self.last_key_and_modifiers();
        matches!(key, "Home" | "End") && mods.contains(Modifiers::CONTROL)
    }

    /// Page Up or Page Down without Control.
    pub fn last_event_was_page_navigation(&self) -> bool {
        let (key, mods) = self.last_key_and_modifiers();
        matches!(key, "Page_Up" | "Page_Down") && !mods.contains(Modifiers::CONTROL)
    }

    /// Tab or Shift+Tab without Control or Alt.
    pub fn last_event_was_tab_navigation(&self) -> bool {
        let (key, mods) = self.last_key_and_modifiers();
        matches!(key, "Tab" | "ISO_Left_Tab") && !mods.intersects(Modifiers::CONTROL | Modifiers::ALT)
    }

    /// An arrow with no Control, Shift, Alt or command modifier.
    pub fn last_event_was_unmodified_arrow(&self) -> bool {
        let (key, mods) = self.last_key_and_modifiers();
        let blocking = Modifiers::CONTROL | Modifiers::SHIFT | Modifiers::ALT | Modifiers::COMMAND;
        matches!(key, "Left" | "Right" | "Up" | "Down") && !mods.intersects(blocking)
    }

    /// Return or the space bar.
    pub fn last_event_was_return_or_space(&self) -> bool {
        matches!(self.last_key_and_modifiers().0, "Return" | "space" | " ")
    }
}

/// True when `release` is the release of the key pressed in `press`.
///
/// Modifier keys only need the same key; other keys also need the same
/// modifier state.
pub fn is_release_for(release: &KeyboardEvent, press: &KeyboardEvent) -> bool {
    if release.is_pressed() || !press.is_pressed() {
        return false;
    }
    let same_key = release.key.keycode == press.key.keycode && release.keysym() == press.keysym();
    same_key && (release.is_modifier_key() || release.modifiers() == press.modifiers())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CTRL: u32 = Modifiers::CONTROL.bits();
    const SHIFT: u32 = Modifiers::SHIFT.bits();

    fn classifier() -> InputEventClassifier {
        InputEventClassifier::new(&DispatchConfig::default())
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn press(c: &mut InputEventClassifier, name: &str, mods: u32, at: u64) -> KeyboardEvent {
        let raw = RawKeyEvent::press(name, mods).expect("key");
        c.classify(&raw, ms(at)).expect("not a duplicate")
    }

    fn release(c: &mut InputEventClassifier, name: &str, mods: u32, at: u64) -> KeyboardEvent {
        let raw = RawKeyEvent::release(name, mods).expect("key");
        c.classify(&raw, ms(at)).expect("not a duplicate")
    }

    fn tap(c: &mut InputEventClassifier, name: &str, mods: u32, at: u64) -> u8 {
        let p = press(c, name, mods, at);
        let r = release(c, name, mods, at + 10);
        assert_eq!(p.click_count(), r.click_count(), "release inherits the count");
        p.click_count()
    }

    #[test]
    fn ordinary_keys_count_to_three_then_wrap() {
        let mut c = classifier();
        let counts: Vec<u8> = [0, 100, 200, 300].iter().map(|t| tap(&mut c, "h", 0, *t)).collect();
        assert_eq!(counts, vec![1, 2, 3, 1]);
    }

    #[test]
    fn timeout_and_different_keys_reset_the_count() {
        let mut c = classifier();
        assert_eq!(tap(&mut c, "h", 0, 0), 1);
        assert_eq!(tap(&mut c, "h", 0, 700), 1);
        assert_eq!(tap(&mut c, "h", 0, 800), 2);
        assert_eq!(tap(&mut c, "j", 0, 850), 1);
    }

    #[test]
    fn held_key_repeats_keep_the_count() {
        let mut c = classifier();
        assert_eq!(press(&mut c, "h", 0, 0).click_count(), 1);
        assert_eq!(press(&mut c, "h", 0, 30).click_count(), 1);
    }

    #[test]
    fn command_modifier_saturates_and_toggles_once() {
        let mut c = classifier();
        let first = press(&mut c, "Insert", 0, 0);
        assert!(first.is_command_modifier && !first.toggles_modifier);
        release(&mut c, "Insert", 0, 10);
        let second = press(&mut c, "Insert", 0, 40);
        assert_eq!(second.click_count(), 2);
        assert!(second.toggles_modifier);
        release(&mut c, "Insert", 0, 50);
        for t in [80, 120] {
            let extra = press(&mut c, "Insert", 0, t);
            assert_eq!(extra.click_count(), 2);
            assert!(!extra.toggles_modifier);
            release(&mut c, "Insert", 0, t + 10);
        }
    }

    #[test]
    fn other_modifiers_wrap_after_two() {
        let mut c = classifier();
        let counts: Vec<u8> = [0, 50, 100].iter().map(|t| tap(&mut c, "Shift_L", 0, *t)).collect();
        assert_eq!(counts, vec![1, 2, 1]);
    }

    #[test]
    fn held_command_modifier_sets_the_command_bit() {
        let mut c = classifier();
        press(&mut c, "KP_Insert", 0, 0);
        assert!(c.command_modifier_held());
        let h = press(&mut c, "h", 0, 20);
        assert!(h.has_command_modifier());
        assert_eq!(h.raw_modifiers, 0);
        assert_eq!(h.click_count(), 1);
        release(&mut c, "h", 0, 30);
        release(&mut c, "KP_Insert", 0, 40);
        assert!(!c.command_modifier_held());
        assert!(!press(&mut c, "h", 0, 50).has_command_modifier());
    }

    #[test]
    fn duplicates_are_dropped() {
        let mut c = classifier();
        let raw = RawKeyEvent::press("h", 0).expect("key");
        assert!(c.classify(&raw, ms(5)).is_some());
        assert!(c.classify(&raw, ms(5)).is_none());
        assert!(c.classify(&raw, ms(6)).is_some());
    }

    #[test]
    fn release_matching() {
        let mut c = classifier();
        let p = press(&mut c, "h", CTRL, 0);
        let r = release(&mut c, "h", CTRL, 10);
        assert!(is_release_for(&r, &p));
        assert!(!is_release_for(&p, &r));
        let other = release(&mut c, "h", 0, 20);
        assert!(!is_release_for(&other, &p));
        let sp = press(&mut c, "Shift_L", 0, 30);
        let sr = release(&mut c, "Shift_L", SHIFT, 40);
        assert!(is_release_for(&sr, &sp));
    }

    #[test]
    fn history_queries() {
        let mut c = classifier();
        tap(&mut c, "Right", CTRL, 0);
        assert!(c.last_event_was_word_navigation());
        assert!(!c.last_event_was_character_navigation());
        assert!(c.last_event_was_caret_navigation());
        assert!(c.last_event_was_command());

        tap(&mut c, "Home", SHIFT, 1000);
        assert!(c.last_event_was_caret_selection());
        assert!(c.last_event_was_line_boundary_navigation());

        tap(&mut c, "Page_Down", 0, 2000);
        assert!(c.last_event_was_page_navigation());
        tap(&mut c, "Tab", 0, 3000);
        assert!(c.last_event_was_tab_navigation());
        assert!(!c.last_event_was_caret_navigation());

        tap(&mut c, "Up", 0, 4000);
        assert!(c.last_event_was_unmodified_arrow());
        assert!(c.last_event_was_line_navigation());

        tap(&mut c, "Return", 0, 5000);
        assert!(c.last_event_was_return_or_space());
        tap(&mut c, "h", 0, 6000);
        assert!(c.last_event_was_printable_key());

        c.note_braille(11);
        assert!(c.last_event_was_braille());
        assert!(!c.last_event_was_keyboard());
        assert!(!c.last_event_was_printable_key());
        assert!(!c.last_event_was_return_or_space());
    }

    #[test]
    fn lone_modifier_tap_clears_the_last_key() {
        let mut c = classifier();
        tap(&mut c, "Up", 0, 0);
        assert!(c.last_event_was_unmodified_arrow());
        tap(&mut c, "Shift_L", 0, 100);
        assert!(!c.last_event_was_unmodified_arrow());
    }
}
