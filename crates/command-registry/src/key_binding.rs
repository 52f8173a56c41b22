use std::{fmt, sync::OnceLock};

use grab::{GrabHandle, GrabKey};
use keysym::{Chord, DEFAULT_MODIFIER_MASK, Keycode, Keysym, Keyval};
use overrides::BindingSpec;

/// The `(keysym, modifiers, click_count)` triple that identifies a bindable
/// combination. Bindings with equal identity are interchangeable for grab
/// transfer.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdentityKey {
    /// Key symbol name.
    pub keysym: String,
    /// Required modifier bits.
    pub modifiers: u32,
    /// Number of presses.
    pub click_count: u8,
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let chord = Chord::new(self.keysym.as_str(), self.modifiers);
        match self.click_count {
            1 => write!(f, "{chord}"),
            n => write!(f, "{chord} x{n}"),
        }
    }
}

/// A physical chord plus the grab handles it currently owns.
///
/// The keyval and keycode are resolved from the symbol name on first use and
/// cached; resolution depends only on the name.
#[derive(Clone, Debug)]
pub struct KeyBinding {
    /// Key symbol name, canonical where the table knows it.
    keysym: String,
    /// Required modifier bits.
    modifiers: u32,
    /// Modifier bits that participate in matching.
    modifier_mask: u32,
    /// Number of presses.
    click_count: u8,
    /// Lazily resolved `(keyval, keycode)`.
    resolved: OnceLock<(Option<Keyval>, Option<Keycode>)>,
    /// Grabs owned by this binding; non-empty only while it is live.
    pub(crate) grab_handles: Vec<GrabHandle>,
}

impl KeyBinding {
    /// Binding with the default modifier mask.
    pub fn new(keysym: impl Into<String>, modifiers: u32, click_count: u8) -> Self {
        Self::with_mask(keysym, modifiers, DEFAULT_MODIFIER_MASK, click_count)
    }

    /// Binding with an explicit modifier mask.
    pub fn with_mask(
        keysym: impl Into<String>,
        modifiers: u32,
        modifier_mask: u32,
        click_count: u8,
    ) -> Self {
        Self {
            keysym: keysym.into(),
            modifiers,
            modifier_mask,
            click_count: click_count.max(1),
            resolved: OnceLock::new(),
            grab_handles: Vec::new(),
        }
    }

    /// Parse a chord spec such as `"command+shift+h"`.
    pub fn parse(spec: &str, click_count: u8) -> Option<Self> {
        let chord = Chord::parse(spec)?;
        Some(Self::new(chord.keysym, chord.modifiers, click_count))
    }

    /// Build from a persisted spec.
    ///
    /// Returns `None` when the spec is an unbind request: an empty symbol, or a
    /// symbol the key table cannot resolve.
    pub fn from_spec(spec: &BindingSpec) -> Option<Self> {
        if spec.is_unbind() {
            return None;
        }
        let sym = Keysym::resolve(spec.keysym.trim())?;
        let clicks = u8::try_from(spec.click_count).unwrap_or(u8::MAX);
        Some(Self::with_mask(sym.name, spec.modifiers, spec.modifier_mask, clicks))
    }

    /// Persisted form of this binding.
    pub fn to_spec(&self) -> BindingSpec {
        BindingSpec::new(
            self.keysym.as_str(),
            self.modifier_mask,
            self.modifiers,
            u32::from(self.click_count),
        )
    }

    /// Key symbol name.
    pub fn keysym(&self) -> &str {
        &self.keysym
    }

    /// Required modifier bits.
    pub fn modifiers(&self) -> u32 {
        self.modifiers
    }

    /// Modifier bits that participate in matching.
    pub fn modifier_mask(&self) -> u32 {
        self.modifier_mask
    }

    /// Number of presses.
    pub fn click_count(&self) -> u8 {
        self.click_count
    }

    /// Identity of this binding.
    pub fn identity(&self) -> IdentityKey {
        IdentityKey {
            keysym: self.keysym.clone(),
            modifiers: self.modifiers,
            click_count: self.click_count,
        }
    }

    /// True when both bindings share an identity.
    pub fn same_identity(&self, other: &Self) -> bool {
        self.keysym == other.keysym
            && self.modifiers == other.modifiers
            && self.click_count == other.click_count
    }

    fn resolve(&self) -> (Option<Keyval>, Option<Keycode>) {
        *self.resolved.get_or_init(|| match Keysym::resolve(&self.keysym) {
            Some(k) => (Some(k.keyval), k.keycode),
            None => (None, None),
        })
    }

    /// Resolved symbol value.
    pub fn keyval(&self) -> Option<Keyval> {
        self.resolve().0
    }

    /// Resolved hardware code on the default layout.
    pub fn keycode(&self) -> Option<Keycode> {
        self.resolve().1
    }

    /// True when an event with these values triggers this binding.
    ///
    /// The symbol value or the hardware code may match; Shift can change the
    /// symbol while the code stays put. Only masked modifier bits are compared,
    /// so locking-key state does not interfere. Click count is checked by the
    /// caller.
    pub fn matches(&self, keyval: Keyval, keycode: Keycode, modifiers: u32) -> bool {
        let (kv, kc) = self.resolve();
        let key_hit = kv == Some(keyval) || (keycode != 0 && kc == Some(keycode));
        key_hit && (modifiers & self.modifier_mask) == self.modifiers
    }

    /// Grab handles currently owned.
    pub fn grab_handles(&self) -> &[GrabHandle] {
        &self.grab_handles
    }

    /// True when this binding owns at least one grab.
    pub fn has_grabs(&self) -> bool {
        !self.grab_handles.is_empty()
    }

    /// A fresh instance with the same identity and no grabs.
    pub fn fresh(&self) -> Self {
        Self {
            grab_handles: Vec::new(),
            ..self.clone()
        }
    }

    /// View handed to the grab backend.
    pub fn grab_key(&self) -> GrabKey<'_> {
        GrabKey {
            keysym: &self.keysym,
            keyval: self.keyval(),
            keycode: self.keycode(),
            modifiers: self.modifiers,
            modifier_mask: self.modifier_mask,
            click_count: self.click_count,
        }
    }
}

impl fmt::Display for KeyBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.identity().fmt(f)
    }
}
