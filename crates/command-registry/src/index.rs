use std::collections::{BTreeSet, HashMap};

use keysym::{Keycode, Keyval};

use crate::KeyBinding;

/// The two lookup indices over active bindings: symbol value and hardware code.
#[derive(Debug, Default)]
pub(crate) struct BindingIndex {
    /// Command names by bound keyval.
    by_keyval: HashMap<Keyval, BTreeSet<String>>,
    /// Command names by bound keycode.
    by_keycode: HashMap<Keycode, BTreeSet<String>>,
}

impl BindingIndex {
    /// Add `name` under both keys of `binding`.
    pub(crate) fn insert(&mut self, name: &str, binding: &KeyBinding) {
        if let Some(kv) = binding.keyval() {
            self.by_keyval.entry(kv).or_default().insert(name.to_string());
        }
        if let Some(kc) = binding.keycode() {
            self.by_keycode.entry(kc).or_default().insert(name.to_string());
        }
    }

    /// Remove `name` from both keys of `binding`.
    pub(crate) fn remove(&mut self, name: &str, binding: &KeyBinding) {
        if let Some(kv) = binding.keyval()
            && let Some(set) = self.by_keyval.get_mut(&kv)
        {
            set.remove(name);
            if set.is_empty() {
                self.by_keyval.remove(&kv);
            }
        }
        if let Some(kc) = binding.keycode()
            && let Some(set) = self.by_keycode.get_mut(&kc)
        {
            set.remove(name);
            if set.is_empty() {
                self.by_keycode.remove(&kc);
            }
        }
    }

    /// Union of both indices for an event, in name order.
    pub(crate) fn candidates(&self, keyval: Keyval, keycode: Keycode) -> BTreeSet<&str> {
        let mut out: BTreeSet<&str> = BTreeSet::new();
        if let Some(set) = self.by_keyval.get(&keyval) {
            out.extend(set.iter().map(String::as_str));
        }
        if let Some(set) = self.by_keycode.get(&keycode) {
            out.extend(set.iter().map(String::as_str));
        }
        out
    }

    /// Names indexed under `keyval`.
    pub(crate) fn for_keyval(&self, keyval: Keyval) -> Option<&BTreeSet<String>> {
        self.by_keyval.get(&keyval)
    }

    /// Names indexed under `keycode`.
    pub(crate) fn for_keycode(&self, keycode: Keycode) -> Option<&BTreeSet<String>> {
        self.by_keycode.get(&keycode)
    }

    /// Every `(keyval, name)` and `(keycode, name)` entry.
    pub(crate) fn entries(&self) -> (Vec<(Keyval, &str)>, Vec<(Keycode, &str)>) {
        (flatten(&self.by_keyval), flatten(&self.by_keycode))
    }

    /// Drop every entry.
    pub(crate) fn clear(&mut self) {
        self.by_keyval.clear();
        self.by_keycode.clear();
    }
}

/// Flatten one index into `(key, name)` pairs.
fn flatten(m: &HashMap<u32, BTreeSet<String>>) -> Vec<(u32, &str)> {
    let mut v = Vec::new();
    for (k, names) in m {
        v.extend(names.iter().map(|n| (*k, n.as_str())));
    }
    v
}
