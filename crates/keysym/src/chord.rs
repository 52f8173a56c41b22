use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Keysym, Modifiers};

/// A key chord: a modifier set plus a single key symbol.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Chord {
    /// Raw modifier bits held for this chord.
    pub modifiers: u32,
    /// Canonical key symbol name.
    pub keysym: String,
}

impl Chord {
    /// Build a chord from a symbol name and raw modifier bits.
    pub fn new(keysym: impl Into<String>, modifiers: u32) -> Self {
        Self {
            modifiers,
            keysym: keysym.into(),
        }
    }

    /// Parses a chord specification of the form "command+shift+h".
    ///
    /// - Components are separated by "+"; the last component is the key symbol.
    /// - Modifier names are case-insensitive (`command`/`orca`, `ctrl`, `alt`, `shift`...).
    /// - The symbol accepts canonical names, aliases and single characters; it is
    ///   stored in canonical form.
    pub fn parse(s: &str) -> Option<Self> {
        let mut parts: Vec<&str> = s.split('+').collect();
        let key_raw = parts.pop()?;
        // A literal trailing "+" splits into an empty final component.
        let key_raw = if key_raw.is_empty() && s.ends_with("++") {
            parts.pop();
            "plus"
        } else if key_raw == " " {
            key_raw
        } else {
            key_raw.trim()
        };
        let keysym = Keysym::resolve(key_raw)?;
        let mut modifiers = Modifiers::empty();
        for m in parts {
            modifiers |= Modifiers::from_spec(m)?;
        }
        Some(Self {
            modifiers: modifiers.bits(),
            keysym: keysym.name,
        })
    }

    /// Canonical string form: modifiers in canonical order, then the symbol.
    pub fn to_string_canonical(&self) -> String {
        let mut out: Vec<&str> = Modifiers::from_raw(self.modifiers).to_specs();
        out.push(&self.keysym);
        out.join("+")
    }
}

impl fmt::Display for Chord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_string_canonical())
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn parse_basic_chord() {
        let c = Chord::parse("shift+orca+h").expect("parse");
        assert_eq!(c.modifiers, (Modifiers::SHIFT | Modifiers::COMMAND).bits());
        assert_eq!(c.keysym, "h");
        assert_eq!(c.to_string(), "command+shift+h");
    }

    #[test]
    fn aliases_are_canonicalized() {
        let c = Chord::parse("ctrl+esc").expect("parse");
        assert_eq!(c.keysym, "Escape");
        assert_eq!(c.to_string(), "ctrl+Escape");

        let c = Chord::parse("alt+,").expect("parse");
        assert_eq!(c.keysym, "comma");

        let c = Chord::parse("ctrl++").expect("parse");
        assert_eq!(c.keysym, "plus");
    }

    #[test]
    fn rejects_bad_components() {
        assert_eq!(Chord::parse(""), None);
        assert_eq!(Chord::parse("hyper+h"), None);
        assert_eq!(Chord::parse("shift+NoSuchKey"), None);
    }

    #[test]
    fn parse_no_modifiers() {
        let c = Chord::parse("KP_Insert").expect("parse");
        assert_eq!(c.modifiers, 0);
        assert_eq!(c.to_string(), "KP_Insert");
    }

    const SYMS: &[&str] = &["h", "H", "Insert", "KP_Enter", "F5", "comma", "space", "Page_Down"];

    proptest! {
        #[test]
        fn canonical_roundtrip(idx in 0..SYMS.len(), bits in 0u32..0x200) {
            let c = Chord::new(SYMS[idx], bits);
            let back = Chord::parse(&c.to_string()).expect("reparse");
            prop_assert_eq!(back, c);
        }
    }
}
