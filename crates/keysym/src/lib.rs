//! keysym: key symbols, hardware codes and modifier masks.
//!
//! - `Keysym`: a resolved key symbol (name, keyval, optional keycode).
//! - `Modifiers`: the modifier bitmask carried by bindings and events.
//! - `Chord`: a modifier set plus a single key symbol, with spec parsing.
//! - [`names`]: category predicates over symbol names (navigation, action,
//!   modifier and so on).
//!
//! Keyvals follow the X11 keysym numbering. Keycodes are the hardware codes of
//! a standard US keyboard as reported by the input layer (evdev + 8). Symbols
//! that have no physical key on that layout (dead keys, `Shift_Lock`) resolve
//! to a keyval but no keycode.

mod table;
pub use table::{Keysym, keycode_for_keyval, name_for_keyval};

mod modifiers;
pub use modifiers::{DEFAULT_MODIFIER_MASK, Modifiers, NO_MODIFIER_MASK};

mod chord;
pub use chord::Chord;

pub mod names;

/// Hardware keycode as reported by the input layer.
pub type Keycode = u32;

/// Resolved key symbol value (X11 keysym numbering).
pub type Keyval = u32;
