//! Raw and classified keyboard events.

use std::time::Duration;

use command_registry::KeyEvent;
use keysym::{Chord, Keycode, Keysym, Keyval, Modifiers, names};
use serde::{Deserialize, Serialize};

/// A key event as delivered by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawKeyEvent {
    /// True for a press, false for a release.
    pub pressed: bool,
    /// Hardware code.
    pub hardware_code: Keycode,
    /// Symbol value resolved by the platform.
    pub resolved_symbol: Keyval,
    /// Platform modifier state.
    pub modifiers: u32,
    /// Text the key produced, if any.
    pub text: String,
}

impl RawKeyEvent {
    /// Press of the named key using the key table for values.
    pub fn press(name: &str, modifiers: u32) -> Option<Self> {
        let sym = Keysym::resolve(name)?;
        Some(Self {
            pressed: true,
            hardware_code: sym.keycode.unwrap_or(0),
            resolved_symbol: sym.keyval,
            modifiers,
            text: sym.char().map(String::from).unwrap_or_default(),
        })
    }

    /// Release of the named key.
    pub fn release(name: &str, modifiers: u32) -> Option<Self> {
        Self::press(name, modifiers).map(|e| Self {
            pressed: false,
            ..e
        })
    }
}

/// Coarse category of a key, used by learn mode and the event history queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyCategory {
    /// Arrows, Home, End.
    Navigation,
    /// Return, Escape, Tab, paging and deletion keys.
    Action,
    /// Shift, Control, Alt and friends, and command modifiers.
    Modifier,
    /// `F1`..`F24`.
    Function,
    /// Dead keys.
    Diacritical,
    /// Caps, Num and Scroll lock.
    Locking,
    /// Letters.
    Alphabetic,
    /// Digits.
    Numeric,
    /// Printable punctuation and symbols.
    Punctuation,
    /// The space bar.
    Space,
    /// Anything else.
    Unknown,
}

impl KeyCategory {
    /// Classify a key. The first matching category wins, in declaration order.
    pub fn of(keysym: &str, text: &str, command_modifier: bool) -> Self {
        if names::is_navigation_key(keysym) {
            return Self::Navigation;
        }
        if names::is_action_key(keysym) {
            return Self::Action;
        }
        if command_modifier || names::is_modifier_key(keysym) {
            return Self::Modifier;
        }
        if names::is_function_key(keysym) {
            return Self::Function;
        }
        if names::is_diacritical_key(keysym) {
            return Self::Diacritical;
        }
        if names::is_locking_key(keysym) {
            return Self::Locking;
        }
        let mut chars = text.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if c.is_alphabetic() => Self::Alphabetic,
            (Some(c), None) if c.is_numeric() => Self::Numeric,
            (Some(' '), None) => Self::Space,
            (Some(c), None) if !c.is_control() && !c.is_whitespace() => Self::Punctuation,
            _ if keysym == "space" => Self::Space,
            _ => Self::Unknown,
        }
    }
}

/// A classified keyboard event.
///
/// `key` carries the values command handlers see: the resolved symbol name,
/// the effective modifiers (the command-modifier bit is set while a command
/// modifier is held) and the click count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyboardEvent {
    /// Handler-facing event.
    pub key: KeyEvent,
    /// Category, computed once at classification.
    pub category: KeyCategory,
    /// True when this key is one of the configured command modifiers.
    pub is_command_modifier: bool,
    /// Time since the loop started.
    pub time: Duration,
    /// Modifier state exactly as the platform reported it.
    pub raw_modifiers: u32,
    /// True for the second press of a command modifier, which toggles it.
    pub toggles_modifier: bool,
}

impl KeyboardEvent {
    /// Symbol name.
    pub fn keysym(&self) -> &str {
        &self.key.keysym
    }

    /// True for a press.
    pub fn is_pressed(&self) -> bool {
        self.key.pressed
    }

    /// Effective modifier state.
    pub fn modifiers(&self) -> u32 {
        self.key.modifiers
    }

    /// Click count.
    pub fn click_count(&self) -> u8 {
        self.key.click_count
    }

    /// True for modifier keys, command modifiers included.
    pub fn is_modifier_key(&self) -> bool {
        self.category == KeyCategory::Modifier
    }

    /// True when the key produces visible text.
    pub fn is_printable_key(&self) -> bool {
        matches!(
            self.category,
            KeyCategory::Alphabetic
                | KeyCategory::Numeric
                | KeyCategory::Punctuation
                | KeyCategory::Space
        )
    }

    /// True when the command-modifier bit is part of the effective state.
    pub fn has_command_modifier(&self) -> bool {
        Modifiers::from_raw(self.key.modifiers).has_command()
    }

    /// Same platform event: everything but the derived fields is equal.
    pub(crate) fn same_input(&self, raw: &RawKeyEvent, time: Duration) -> bool {
        self.time == time
            && self.key.pressed == raw.pressed
            && self.key.keycode == raw.hardware_code
            && self.key.keyval == raw.resolved_symbol
            && self.raw_modifiers == raw.modifiers
            && self.key.text == raw.text
    }

    /// One-line rendering for logs and reports.
    pub fn describe(&self) -> String {
        let chord = Chord::new(self.keysym(), self.modifiers() & !Modifiers::NUM_LOCK.bits());
        let dir = if self.is_pressed() { "press" } else { "release" };
        match self.click_count() {
            1 => format!("{dir} {chord}"),
            n => format!("{dir} {chord} x{n}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_follow_precedence() {
        assert_eq!(KeyCategory::of("Left", "", false), KeyCategory::Navigation);
        assert_eq!(KeyCategory::of("Return", "\r", false), KeyCategory::Action);
        assert_eq!(KeyCategory::of("Shift_L", "", false), KeyCategory::Modifier);
        assert_eq!(KeyCategory::of("Insert", "", true), KeyCategory::Modifier);
        assert_eq!(KeyCategory::of("Insert", "", false), KeyCategory::Unknown);
        assert_eq!(KeyCategory::of("F5", "", false), KeyCategory::Function);
        assert_eq!(KeyCategory::of("dead_acute", "", false), KeyCategory::Diacritical);
        assert_eq!(KeyCategory::of("Caps_Lock", "", false), KeyCategory::Locking);
        assert_eq!(KeyCategory::of("h", "h", false), KeyCategory::Alphabetic);
        assert_eq!(KeyCategory::of("5", "5", false), KeyCategory::Numeric);
        assert_eq!(KeyCategory::of("comma", ",", false), KeyCategory::Punctuation);
        assert_eq!(KeyCategory::of("space", " ", false), KeyCategory::Space);
        assert_eq!(KeyCategory::of("space", "", false), KeyCategory::Space);
    }

    #[test]
    fn raw_constructors_use_the_key_table() {
        let p = RawKeyEvent::press("h", 0).expect("press");
        assert_eq!((p.hardware_code, p.resolved_symbol, p.text.as_str()), (43, 0x68, "h"));
        let r = RawKeyEvent::release("Insert", 0).expect("release");
        assert!(!r.pressed);
        assert_eq!(r.hardware_code, 118);
        assert!(RawKeyEvent::press("NoSuchKey", 0).is_none());
    }
}
