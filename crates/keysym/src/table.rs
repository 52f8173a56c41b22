use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Keycode, Keyval};

// Central table of known key symbols: name => (keyval, keycode).
// A keycode of 0 means the symbol has no physical key on the default layout.
macro_rules! keysym_table {
    ($m:ident, $arg:tt) => {
        $m! { $arg,
            // letters
            "a" => (0x061, 38), "b" => (0x062, 56), "c" => (0x063, 54), "d" => (0x064, 40),
            "e" => (0x065, 26), "f" => (0x066, 41), "g" => (0x067, 42), "h" => (0x068, 43),
            "i" => (0x069, 31), "j" => (0x06a, 44), "k" => (0x06b, 45), "l" => (0x06c, 46),
            "m" => (0x06d, 58), "n" => (0x06e, 57), "o" => (0x06f, 32), "p" => (0x070, 33),
            "q" => (0x071, 24), "r" => (0x072, 27), "s" => (0x073, 39), "t" => (0x074, 28),
            "u" => (0x075, 30), "v" => (0x076, 55), "w" => (0x077, 25), "x" => (0x078, 53),
            "y" => (0x079, 29), "z" => (0x07a, 52),
            "A" => (0x041, 38), "B" => (0x042, 56), "C" => (0x043, 54), "D" => (0x044, 40),
            "E" => (0x045, 26), "F" => (0x046, 41), "G" => (0x047, 42), "H" => (0x048, 43),
            "I" => (0x049, 31), "J" => (0x04a, 44), "K" => (0x04b, 45), "L" => (0x04c, 46),
            "M" => (0x04d, 58), "N" => (0x04e, 57), "O" => (0x04f, 32), "P" => (0x050, 33),
            "Q" => (0x051, 24), "R" => (0x052, 27), "S" => (0x053, 39), "T" => (0x054, 28),
            "U" => (0x055, 30), "V" => (0x056, 55), "W" => (0x057, 25), "X" => (0x058, 53),
            "Y" => (0x059, 29), "Z" => (0x05a, 52),

            // digits and their shifted symbols
            "1" => (0x031, 10), "2" => (0x032, 11), "3" => (0x033, 12), "4" => (0x034, 13),
            "5" => (0x035, 14), "6" => (0x036, 15), "7" => (0x037, 16), "8" => (0x038, 17),
            "9" => (0x039, 18), "0" => (0x030, 19),
            "exclam" => (0x021, 10), "at" => (0x040, 11), "numbersign" => (0x023, 12),
            "dollar" => (0x024, 13), "percent" => (0x025, 14), "asciicircum" => (0x05e, 15),
            "ampersand" => (0x026, 16), "asterisk" => (0x02a, 17), "parenleft" => (0x028, 18),
            "parenright" => (0x029, 19),

            // punctuation
            "minus" => (0x02d, 20), "underscore" => (0x05f, 20),
            "equal" => (0x03d, 21), "plus" => (0x02b, 21),
            "bracketleft" => (0x05b, 34), "braceleft" => (0x07b, 34),
            "bracketright" => (0x05d, 35), "braceright" => (0x07d, 35),
            "semicolon" => (0x03b, 47), "colon" => (0x03a, 47),
            "apostrophe" => (0x027, 48), "quotedbl" => (0x022, 48),
            "grave" => (0x060, 49), "asciitilde" => (0x07e, 49),
            "backslash" => (0x05c, 51), "bar" => (0x07c, 51),
            "comma" => (0x02c, 59), "less" => (0x03c, 59),
            "period" => (0x02e, 60), "greater" => (0x03e, 60),
            "slash" => (0x02f, 61), "question" => (0x03f, 61),
            "space" => (0x020, 65),

            // editing and navigation
            "Escape" => (0xff1b, 9), "BackSpace" => (0xff08, 22), "Tab" => (0xff09, 23),
            "ISO_Left_Tab" => (0xfe20, 23), "Return" => (0xff0d, 36),
            "Home" => (0xff50, 110), "Up" => (0xff52, 111), "Page_Up" => (0xff55, 112),
            "Left" => (0xff51, 113), "Right" => (0xff53, 114), "End" => (0xff57, 115),
            "Down" => (0xff54, 116), "Page_Down" => (0xff56, 117), "Insert" => (0xff63, 118),
            "Delete" => (0xffff, 119), "Print" => (0xff61, 107), "Menu" => (0xff67, 135),

            // modifiers and locks
            "Shift_L" => (0xffe1, 50), "Shift_R" => (0xffe2, 62),
            "Control_L" => (0xffe3, 37), "Control_R" => (0xffe4, 105),
            "Caps_Lock" => (0xffe5, 66), "Shift_Lock" => (0xffe6, 0),
            "Meta_L" => (0xffe7, 0), "Meta_R" => (0xffe8, 0),
            "Alt_L" => (0xffe9, 64), "Alt_R" => (0xffea, 108),
            "Super_L" => (0xffeb, 133), "Super_R" => (0xffec, 134),
            "ISO_Level3_Shift" => (0xfe03, 92),
            "Num_Lock" => (0xff7f, 77), "Scroll_Lock" => (0xff14, 78),

            // function keys
            "F1" => (0xffbe, 67), "F2" => (0xffbf, 68), "F3" => (0xffc0, 69),
            "F4" => (0xffc1, 70), "F5" => (0xffc2, 71), "F6" => (0xffc3, 72),
            "F7" => (0xffc4, 73), "F8" => (0xffc5, 74), "F9" => (0xffc6, 75),
            "F10" => (0xffc7, 76), "F11" => (0xffc8, 95), "F12" => (0xffc9, 96),

            // keypad
            "KP_Home" => (0xff95, 79), "KP_Up" => (0xff97, 80), "KP_Page_Up" => (0xff9a, 81),
            "KP_Subtract" => (0xffad, 82), "KP_Left" => (0xff96, 83), "KP_Begin" => (0xff9d, 84),
            "KP_Right" => (0xff98, 85), "KP_Add" => (0xffab, 86), "KP_End" => (0xff9c, 87),
            "KP_Down" => (0xff99, 88), "KP_Page_Down" => (0xff9b, 89),
            "KP_Insert" => (0xff9e, 90), "KP_Delete" => (0xff9f, 91),
            "KP_Enter" => (0xff8d, 104), "KP_Divide" => (0xffaf, 106),
            "KP_Multiply" => (0xffaa, 63),

            // dead keys
            "dead_grave" => (0xfe50, 0), "dead_acute" => (0xfe51, 0),
            "dead_circumflex" => (0xfe52, 0), "dead_tilde" => (0xfe53, 0),
            "dead_diaeresis" => (0xfe57, 0), "dead_cedilla" => (0xfe5b, 0),
        }
    };
}

// Aliases accepted when parsing specs; never emitted.
macro_rules! keysym_aliases {
    ($m:ident, $arg:tt) => {
        $m! { $arg,
            "esc" => "Escape",
            "enter" => "Return",
            "ret" => "Return",
            "backspace" => "BackSpace",
            "del" => "Delete",
            "ins" => "Insert",
            "pgup" => "Page_Up",
            "pgdn" => "Page_Down",
            "caps" => "Caps_Lock",
            "kpinsert" => "KP_Insert",
            "kpenter" => "KP_Enter",
            " " => "space",
            "-" => "minus",
            "=" => "equal",
            "[" => "bracketleft",
            "]" => "bracketright",
            "\\" => "backslash",
            ";" => "semicolon",
            "'" => "apostrophe",
            "," => "comma",
            "." => "period",
            "/" => "slash",
            "`" => "grave",
        }
    };
}

macro_rules! name_match {
    ( $s:expr, $( $n:literal => ($v:expr, $c:expr), )* ) => {
        match $s {
            $( $n => Some(($n, $v, $c)), )*
            _ => None,
        }
    };
}

macro_rules! keyval_match {
    ( $v:expr, $( $n:literal => ($val:expr, $c:expr), )* ) => {{
        $( if $v == $val { return Some(($n, $c)); } )*
        None
    }};
}

macro_rules! lowercase_match {
    ( $s:expr, $( $n:literal => ($v:expr, $c:expr), )* ) => {{
        $( if $n.len() > 1 && $n.eq_ignore_ascii_case($s) { return Some($n); } )*
        None
    }};
}

macro_rules! alias_match {
    ( $s:expr, $( $a:literal => $n:literal, )* ) => {
        match $s {
            $( $a => Some($n), )*
            _ => None,
        }
    };
}

/// Exact table lookup: (canonical name, keyval, raw keycode).
fn lookup_exact(name: &str) -> Option<(&'static str, Keyval, Keycode)> {
    keysym_table!(name_match, name)
}

/// Reverse lookup by keyval; the first table entry wins.
fn lookup_keyval(keyval: Keyval) -> Option<(&'static str, Keycode)> {
    keysym_table!(keyval_match, keyval)
}

/// Case-insensitive lookup for multi-character names ("insert" => "Insert").
fn lookup_folded(name: &str) -> Option<&'static str> {
    keysym_table!(lowercase_match, name)
}

/// Map a spec alias ("esc", ",") to its canonical table name.
fn lookup_alias(name: &str) -> Option<&'static str> {
    let lowered = name.to_ascii_lowercase();
    let s = if name.chars().count() == 1 { name } else { lowered.as_str() };
    keysym_aliases!(alias_match, s)
}

/// Keyval for a single character outside the table, per the X11 Unicode rule.
fn keyval_for_char(ch: char) -> Keyval {
    let cp = ch as u32;
    if cp < 0x100 { cp } else { 0x0100_0000 | cp }
}

/// A resolved key symbol.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Keysym {
    /// Canonical symbol name (e.g. `"KP_Insert"`, `"h"`).
    pub name: String,
    /// Symbol value.
    pub keyval: Keyval,
    /// Hardware code on the default layout, when the symbol has a physical key.
    pub keycode: Option<Keycode>,
}

impl Keysym {
    /// Resolve a symbol name, accepting canonical names, case-folded
    /// multi-character names, spec aliases, and single Unicode characters.
    pub fn resolve(name: &str) -> Option<Self> {
        if name.is_empty() {
            return None;
        }
        let canonical = lookup_exact(name)
            .map(|(n, _, _)| n)
            .or_else(|| lookup_alias(name))
            .or_else(|| lookup_folded(name));
        if let Some(n) = canonical
            && let Some((n, keyval, code)) = lookup_exact(n)
        {
            return Some(Self {
                name: n.to_string(),
                keyval,
                keycode: (code != 0).then_some(code),
            });
        }
        let mut chars = name.chars();
        match (chars.next(), chars.next()) {
            (Some(ch), None) => {
                let keyval = keyval_for_char(ch);
                Some(Self {
                    name: name.to_string(),
                    keyval,
                    keycode: keycode_for_keyval(keyval),
                })
            }
            _ => None,
        }
    }

    /// Build from a keyval reported by the input layer.
    pub fn from_keyval(keyval: Keyval) -> Self {
        match lookup_keyval(keyval) {
            Some((name, code)) => Self {
                name: name.to_string(),
                keyval,
                keycode: (code != 0).then_some(code),
            },
            None => Self {
                name: char_for_keyval(keyval)
                    .map(String::from)
                    .unwrap_or_else(|| format!("0x{keyval:x}")),
                keyval,
                keycode: None,
            },
        }
    }

    /// The printable character this symbol produces, if any.
    pub fn char(&self) -> Option<char> {
        char_for_keyval(self.keyval)
    }
}

impl fmt::Display for Keysym {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Printable character for a keyval in the Latin-1 or Unicode ranges.
fn char_for_keyval(keyval: Keyval) -> Option<char> {
    match keyval {
        0x20..=0x7e | 0xa0..=0xff => char::from_u32(keyval),
        v if v & 0xff00_0000 == 0x0100_0000 => char::from_u32(v & 0x00ff_ffff),
        _ => None,
    }
}

/// Hardware code for a keyval on the default layout.
pub fn keycode_for_keyval(keyval: Keyval) -> Option<Keycode> {
    lookup_keyval(keyval).and_then(|(_, code)| (code != 0).then_some(code))
}

/// Canonical name for a keyval, if it is in the table.
pub fn name_for_keyval(keyval: Keyval) -> Option<&'static str> {
    lookup_keyval(keyval).map(|(name, _)| name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_canonical_names() {
        let k = Keysym::resolve("Insert").expect("resolve");
        assert_eq!(k.keyval, 0xff63);
        assert_eq!(k.keycode, Some(118));

        let h = Keysym::resolve("h").expect("resolve");
        let upper = Keysym::resolve("H").expect("resolve");
        assert_ne!(h.keyval, upper.keyval);
        assert_eq!(h.keycode, upper.keycode);
    }

    #[test]
    fn resolve_aliases_and_folding() {
        assert_eq!(Keysym::resolve("esc").map(|k| k.name), Some("Escape".into()));
        assert_eq!(Keysym::resolve(",").map(|k| k.name), Some("comma".into()));
        assert_eq!(Keysym::resolve(" ").map(|k| k.name), Some("space".into()));
        assert_eq!(Keysym::resolve("kp_insert").map(|k| k.name), Some("KP_Insert".into()));
        assert_eq!(Keysym::resolve("page_down").map(|k| k.name), Some("Page_Down".into()));
    }

    #[test]
    fn unknown_and_empty() {
        assert_eq!(Keysym::resolve(""), None);
        assert_eq!(Keysym::resolve("NotAKey"), None);
        // Single characters outside the table still resolve to a keyval.
        let e = Keysym::resolve("é").expect("resolve");
        assert_eq!(e.keyval, 0xe9);
        assert_eq!(e.keycode, None);
    }

    #[test]
    fn dead_keys_have_no_keycode() {
        let k = Keysym::resolve("dead_acute").expect("resolve");
        assert_eq!(k.keyval, 0xfe51);
        assert_eq!(k.keycode, None);
    }

    #[test]
    fn keyval_reverse_lookup() {
        assert_eq!(name_for_keyval(0xff9e), Some("KP_Insert"));
        assert_eq!(keycode_for_keyval(0x068), Some(43));
        let k = Keysym::from_keyval(0x048);
        assert_eq!(k.name, "H");
        assert_eq!(k.char(), Some('H'));
        assert_eq!(Keysym::from_keyval(0xff63).char(), None);
    }
}
