use std::collections::{BTreeMap, btree_map};

use serde::{Deserialize, Serialize};

/// Wire form of a binding spec: `(keysym, modifier_mask, modifiers, click_count)`.
pub type SpecTuple = (String, u32, u32, u32);

/// One persisted binding for a command.
///
/// An empty `keysym` is an explicit unbind.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "SpecTuple", into = "SpecTuple")]
pub struct BindingSpec {
    /// Key symbol name.
    pub keysym: String,
    /// Modifier bits that participate in matching.
    pub modifier_mask: u32,
    /// Required modifier bits.
    pub modifiers: u32,
    /// Number of presses.
    pub click_count: u32,
}

impl BindingSpec {
    /// Construct a spec.
    pub fn new(keysym: impl Into<String>, modifier_mask: u32, modifiers: u32, click_count: u32) -> Self {
        Self {
            keysym: keysym.into(),
            modifier_mask,
            modifiers,
            click_count,
        }
    }

    /// True when this spec requests that the command be unbound.
    pub fn is_unbind(&self) -> bool {
        self.keysym.trim().is_empty()
    }
}

impl From<SpecTuple> for BindingSpec {
    fn from((keysym, modifier_mask, modifiers, click_count): SpecTuple) -> Self {
        Self {
            keysym,
            modifier_mask,
            modifiers,
            click_count,
        }
    }
}

impl From<BindingSpec> for SpecTuple {
    fn from(s: BindingSpec) -> Self {
        (s.keysym, s.modifier_mask, s.modifiers, s.click_count)
    }
}

/// Flat mapping of command name to its persisted bindings.
///
/// An empty list means the user unbound the command.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OverrideMap {
    /// Entries keyed by command name.
    entries: BTreeMap<String, Vec<BindingSpec>>,
}

impl OverrideMap {
    /// Empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the bindings for `command`, replacing any earlier entry.
    pub fn insert(&mut self, command: impl Into<String>, specs: Vec<BindingSpec>) {
        self.entries.insert(command.into(), specs);
    }

    /// Record an explicit unbind for `command`.
    pub fn unbind(&mut self, command: impl Into<String>) {
        self.entries.insert(command.into(), Vec::new());
    }

    /// Drop any entry for `command`, reverting it to its layout default.
    pub fn remove(&mut self, command: &str) -> Option<Vec<BindingSpec>> {
        self.entries.remove(command)
    }

    /// Bindings recorded for `command`.
    pub fn get(&self, command: &str) -> Option<&[BindingSpec]> {
        self.entries.get(command).map(Vec::as_slice)
    }

    /// Iterate entries in name order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, Vec<BindingSpec>> {
        self.entries.iter()
    }

    /// Number of commands with an entry.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no command has an entry.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, Vec<BindingSpec>)> for OverrideMap {
    fn from_iter<I: IntoIterator<Item = (String, Vec<BindingSpec>)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a OverrideMap {
    type Item = (&'a String, &'a Vec<BindingSpec>);
    type IntoIter = btree_map::Iter<'a, String, Vec<BindingSpec>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
