use bitflags::bitflags;

bitflags! {
    /// Modifier state bits carried by bindings and key events.
    ///
    /// The low byte follows the X11 modifier-state layout. `COMMAND` is the
    /// application's own command modifier, latched while a command-modifier key
    /// (for example `Insert`) is held.
    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, PartialOrd, Ord)]
    pub struct Modifiers: u32 {
        /// Shift.
        const SHIFT = 1 << 0;
        /// Caps Lock (locking state).
        const LOCK = 1 << 1;
        /// Control.
        const CONTROL = 1 << 2;
        /// Alt / Mod1.
        const ALT = 1 << 3;
        /// Num Lock / Mod2 (locking state).
        const NUM_LOCK = 1 << 4;
        /// Mod3.
        const MOD3 = 1 << 5;
        /// Super / Mod4.
        const SUPER = 1 << 6;
        /// Mod5 / AltGr.
        const MOD5 = 1 << 7;
        /// The command modifier.
        const COMMAND = 1 << 8;
    }
}

/// Mask of the modifiers a default binding cares about.
pub const DEFAULT_MODIFIER_MASK: u32 = Modifiers::COMMAND.bits()
    | Modifiers::SHIFT.bits()
    | Modifiers::ALT.bits()
    | Modifiers::CONTROL.bits();

/// Mask that ignores all modifiers.
pub const NO_MODIFIER_MASK: u32 = 0;

// Canonical rendering order; the first name in each row is the canonical one.
const NAMES: &[(Modifiers, &[&str])] = &[
    (Modifiers::COMMAND, &["command", "cmd", "orca"]),
    (Modifiers::CONTROL, &["ctrl", "control"]),
    (Modifiers::ALT, &["alt", "mod1"]),
    (Modifiers::SHIFT, &["shift"]),
    (Modifiers::SUPER, &["super", "mod4"]),
    (Modifiers::MOD3, &["mod3"]),
    (Modifiers::MOD5, &["mod5", "altgr"]),
    (Modifiers::LOCK, &["lock", "caps"]),
    (Modifiers::NUM_LOCK, &["numlock", "mod2"]),
];

impl Modifiers {
    /// Parse a single modifier name, case-insensitively.
    pub fn from_spec(s: &str) -> Option<Self> {
        let s = s.trim();
        NAMES
            .iter()
            .find(|(_, names)| names.iter().any(|n| n.eq_ignore_ascii_case(s)))
            .map(|(m, _)| *m)
    }

    /// Canonical lowercase names of the set bits, in canonical order.
    pub fn to_specs(self) -> Vec<&'static str> {
        NAMES
            .iter()
            .filter(|(m, _)| self.contains(*m))
            .map(|(_, names)| names[0])
            .collect()
    }

    /// Build from raw state bits, dropping unknown bits.
    pub fn from_raw(bits: u32) -> Self {
        Self::from_bits_truncate(bits)
    }

    /// True when the command modifier is latched.
    pub fn has_command(self) -> bool {
        self.contains(Self::COMMAND)
    }
}
