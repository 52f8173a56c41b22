use keysym::{Keycode, Keysym, Keyval};

/// A key press or release as seen by command handlers and the registry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyEvent {
    /// True for a press, false for a release.
    pub pressed: bool,
    /// Resolved symbol value.
    pub keyval: Keyval,
    /// Hardware code.
    pub keycode: Keycode,
    /// Modifier state bits, including the command modifier when latched.
    pub modifiers: u32,
    /// Symbol name for `keyval`.
    pub keysym: String,
    /// Text the key produced, if any.
    pub text: String,
    /// Observed click count.
    pub click_count: u8,
}

impl KeyEvent {
    /// A single press of the named key, using the key table for values.
    pub fn press(name: &str, modifiers: u32) -> Option<Self> {
        let sym = Keysym::resolve(name)?;
        Some(Self {
            pressed: true,
            keyval: sym.keyval,
            keycode: sym.keycode.unwrap_or(0),
            modifiers,
            text: sym.char().map(String::from).unwrap_or_default(),
            keysym: sym.name,
            click_count: 1,
        })
    }

    /// Same event with a different click count.
    pub fn with_click_count(mut self, click_count: u8) -> Self {
        self.click_count = click_count;
        self
    }
}

/// Any input a command can be executed for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputEvent {
    /// Keyboard input.
    Key(KeyEvent),
    /// A braille display key, identified by its vendor command code.
    Braille(i32),
}
