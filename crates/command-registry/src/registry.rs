use std::{
    collections::{BTreeMap, BTreeSet, btree_map::Entry},
    mem,
    time::{Duration, Instant},
};

use grab::GrabBackend;
use keysym::{Keycode, Keysym, Keyval, NO_MODIFIER_MASK};
use overrides::{BindingSpec, OverrideMap};
use tracing::{debug, trace, warn};

use crate::{
    BrailleCommand, Command, CommandBase, Error, IdentityKey, KeyBinding, KeyEvent,
    KeyboardCommand, Layout, RebindCapture, RebindOutcome, Result, diff, index::BindingIndex,
};

/// Threshold for warning about slow binding updates that may cause key drops
const BIND_UPDATE_WARN_MS: u64 = 10;

/// A grab taken out of the command table ahead of a full diff.
struct Held {
    /// Command that held it.
    owner: String,
    /// Snapshot of the binding, handles included.
    binding: KeyBinding,
}

/// Owns every command, the binding indices, and the grab backend.
///
/// All grab changes go through this type. Whenever the set of active bindings
/// changes wholesale (layout switch, override application, rebinding) the
/// registry lifts every live handle out of the command table, applies the
/// change, and reconciles: identities present before and after keep their
/// handles, vanished identities are released, and new ones are acquired.
/// Enabling or suspending commands takes an incremental path instead.
pub struct CommandRegistry {
    /// Commands by name.
    commands: BTreeMap<String, Command>,
    /// Keyval and keycode indices over active bindings.
    index: BindingIndex,
    /// Layout whose defaults are in force.
    layout: Layout,
    /// Last applied user overrides, re-layered on every layout switch.
    overrides: OverrideMap,
    /// Grabbed command-modifier keys by symbol name.
    modifier_grabs: BTreeMap<String, KeyBinding>,
    /// The only path to the platform grab primitive.
    backend: Box<dyn GrabBackend>,
}

impl CommandRegistry {
    /// Empty registry using the desktop layout.
    pub fn new(backend: Box<dyn GrabBackend>) -> Self {
        Self::with_layout(backend, Layout::Desktop)
    }

    /// Empty registry using `layout`.
    pub fn with_layout(backend: Box<dyn GrabBackend>, layout: Layout) -> Self {
        Self {
            commands: BTreeMap::new(),
            index: BindingIndex::default(),
            layout,
            overrides: OverrideMap::new(),
            modifier_grabs: BTreeMap::new(),
            backend,
        }
    }

    // ---- registration ----

    /// Register a command.
    ///
    /// A keyboard command is bound to the current layout's default, with any
    /// stored user override layered on top, indexed, and grabbed if active.
    /// Duplicate names are rejected.
    pub fn add_command(&mut self, cmd: impl Into<Command>) -> Result<()> {
        let mut cmd = cmd.into();
        let name = cmd.name().to_string();
        if self.commands.contains_key(&name) {
            return Err(Error::DuplicateCommand(name));
        }
        if let Some(k) = cmd.as_keyboard_mut() {
            let mut binding = k.default_for(self.layout).map(KeyBinding::fresh);
            if let Some(specs) = self.overrides.get(&name) {
                binding = layered(&name, binding, specs);
            }
            if let Some(b) = &binding {
                self.index.insert(&name, b);
            }
            k.active_binding = binding;
        }
        self.commands.insert(name.clone(), cmd);
        debug!(command = %name, "command_added");
        self.acquire_for(&name, true);
        Ok(())
    }

    /// Release every grab and forget every command.
    ///
    /// Stored overrides are kept and apply again to commands added later.
    pub fn clear_commands(&mut self) {
        let names: Vec<String> = self.commands.keys().cloned().collect();
        for name in &names {
            self.release_for(name);
        }
        self.commands.clear();
        self.index.clear();
        self.set_command_modifiers_unchecked(&[]);
        debug!(count = names.len(), "commands_cleared");
    }

    // ---- queries ----

    /// Layout whose defaults are in force.
    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Last applied user overrides, including committed rebindings.
    pub fn overrides(&self) -> &OverrideMap {
        &self.overrides
    }

    /// Number of registered commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// True when no command is registered.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Command by name.
    pub fn get_command(&self, name: &str) -> Option<&Command> {
        self.commands.get(name)
    }

    /// Keyboard command by name.
    pub fn get_keyboard_command(&self, name: &str) -> Option<&KeyboardCommand> {
        self.commands.get(name).and_then(Command::as_keyboard)
    }

    /// Braille command by name.
    pub fn get_braille_command(&self, name: &str) -> Option<&BrailleCommand> {
        self.commands.get(name).and_then(Command::as_braille)
    }

    /// All keyboard commands in name order.
    pub fn get_all_keyboard_commands(&self) -> Vec<&KeyboardCommand> {
        self.commands.values().filter_map(Command::as_keyboard).collect()
    }

    /// All braille commands in name order.
    pub fn get_all_braille_commands(&self) -> Vec<&BrailleCommand> {
        self.commands.values().filter_map(Command::as_braille).collect()
    }

    /// Commands whose group label is `label`, in name order.
    pub fn get_commands_by_group_label(&self, label: &str) -> Vec<&Command> {
        self.commands
            .values()
            .filter(|c| c.group_label() == label)
            .collect()
    }

    /// Distinct group labels, sorted.
    pub fn group_labels(&self) -> Vec<&str> {
        let labels: BTreeSet<&str> = self.commands.values().map(|c| c.group_label()).collect();
        labels.into_iter().collect()
    }

    /// Resolve a key event to the command it triggers.
    ///
    /// Candidates come from both indices; a candidate wins when its binding
    /// matches the event and its click count equals the event's. With
    /// `active_only`, inactive commands are skipped. Should two candidates
    /// match, the first in name order wins and the clash is logged.
    pub fn get_command_for_event(&self, event: &KeyEvent, active_only: bool) -> Option<&KeyboardCommand> {
        let mut winner: Option<&KeyboardCommand> = None;
        for name in self.index.candidates(event.keyval, event.keycode) {
            let Some(k) = self.get_keyboard_command(name) else {
                continue;
            };
            if active_only && !k.is_active() {
                continue;
            }
            let Some(b) = k.active_binding() else {
                continue;
            };
            if b.click_count() != event.click_count
                || !b.matches(event.keyval, event.keycode, event.modifiers)
            {
                continue;
            }
            match winner {
                Some(w) => {
                    warn!(winner = w.name(), other = name, chord = %b, "ambiguous_binding");
                    break;
                }
                None => winner = Some(k),
            }
        }
        trace!(
            keysym = %event.keysym,
            clicks = event.click_count,
            command = winner.map(|w| w.name()).unwrap_or("-"),
            "event_resolved"
        );
        winner
    }

    /// True when an active command on this key and modifier state uses more
    /// than one click.
    pub fn has_multi_click_bindings(&self, keyval: Keyval, keycode: Keycode, modifiers: u32) -> bool {
        self.index
            .candidates(keyval, keycode)
            .into_iter()
            .filter_map(|n| self.get_keyboard_command(n))
            .filter(|k| k.is_active())
            .filter_map(KeyboardCommand::active_binding)
            .any(|b| b.click_count() > 1 && b.matches(keyval, keycode, modifiers))
    }

    /// Resolve a braille command code.
    ///
    /// While interception is active only commands that run during
    /// interception are eligible.
    pub fn get_command_for_braille_event(&self, code: i32, intercept_active: bool) -> Option<&BrailleCommand> {
        self.commands
            .values()
            .filter_map(Command::as_braille)
            .filter(|b| b.is_active())
            .filter(|b| !intercept_active || b.runs_during_intercept_mode())
            .find(|b| b.hardware_codes().contains(&code))
    }

    /// Names indexed under `keyval`.
    pub fn commands_for_keyval(&self, keyval: Keyval) -> Vec<&str> {
        self.index
            .for_keyval(keyval)
            .map(|s| s.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Names indexed under `keycode`.
    pub fn commands_for_keycode(&self, keycode: Keycode) -> Vec<&str> {
        self.index
            .for_keycode(keycode)
            .map(|s| s.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    // ---- full diffs ----

    /// Switch layouts. Returns false when `layout` is already in force.
    ///
    /// Every keyboard command is reset to the new layout's default, stored
    /// overrides are layered on top again, and grabs are reconciled.
    pub fn set_keyboard_layout(&mut self, layout: Layout) -> bool {
        if layout == self.layout {
            trace!(?layout, "layout_unchanged");
            return false;
        }
        let held = self.take_grabs();
        self.layout = layout;
        self.reset_all_bindings();
        self.reconcile(held, "layout");
        true
    }

    /// Replace the stored user overrides and apply them.
    ///
    /// Every command first returns to its layout default, so an unbinding from
    /// an earlier map does not linger. An empty list unbinds; a spec whose
    /// identity matches the current binding leaves it in place.
    ///
    /// Applying the same map again makes no backend calls, except that grabs
    /// the backend refused earlier are requested once more.
    pub fn apply_user_overrides(&mut self, persisted: &OverrideMap) {
        for (name, _) in persisted {
            if !self.commands.contains_key(name) {
                debug!(command = %name, "override_for_unknown_command");
            }
        }
        let held = self.take_grabs();
        self.overrides = persisted.clone();
        self.reset_all_bindings();
        self.reconcile(held, "overrides");
    }

    /// Revert one command to its layout default and drop its stored override.
    pub fn reset_to_defaults(&mut self, name: &str) -> Result<()> {
        let k = self.keyboard(name)?;
        let binding = k.default_for(self.layout).map(KeyBinding::fresh);
        self.overrides.remove(name);
        self.rebind_one(name, binding, "reset");
        Ok(())
    }

    /// Unbind one command and record the unbinding in the stored overrides.
    pub fn unbind(&mut self, name: &str) -> Result<()> {
        self.keyboard(name)?;
        self.overrides.unbind(name);
        self.rebind_one(name, None, "unbind");
        Ok(())
    }

    /// Start an interactive rebinding of `name`.
    pub fn begin_rebind(&self, name: &str) -> Result<RebindCapture> {
        self.keyboard(name)?;
        debug!(command = %name, "rebind_started");
        Ok(RebindCapture::new(name))
    }

    /// Commit a captured chord.
    ///
    /// Fails with [`Error::BindingConflict`] when another command already holds
    /// the same identity, or when the chord is a bare command-modifier key;
    /// nothing changes in either case. On success the binding
    /// is installed, indexed, grabbed if active, and recorded in the stored
    /// overrides so it survives layout switches.
    pub fn commit_rebind(&mut self, capture: RebindCapture) -> Result<RebindOutcome> {
        let (name, captured) = capture.into_parts();
        let k = self.keyboard(&name)?;
        let Some(binding) = captured else {
            return Err(Error::NothingCaptured(name));
        };
        let identity = binding.identity();
        if let Some(owner) = self.binding_owner(&identity, &name) {
            warn!(command = %name, owner = %owner, chord = %identity, "rebind_conflict");
            return Err(Error::BindingConflict {
                command: name,
                owner: owner.to_string(),
                chord: identity.to_string(),
            });
        }
        if let Some(modifier) = self.modifier_holding(&binding) {
            warn!(command = %name, modifier, chord = %identity, "rebind_conflict");
            let owner = format!("command modifier {modifier}");
            return Err(Error::BindingConflict {
                command: name,
                owner,
                chord: identity.to_string(),
            });
        }
        let previous = k.active_binding().map(KeyBinding::identity);
        let changed = previous.as_ref() != Some(&identity);
        if changed {
            self.overrides.insert(name.as_str(), vec![binding.to_spec()]);
            self.rebind_one(&name, Some(binding), "rebind");
        }
        let grabbed = self.keyboard(&name)?.is_grabbed();
        debug!(command = %name, chord = %identity, changed, grabbed, "rebind_committed");
        Ok(RebindOutcome {
            command: name,
            previous,
            binding: identity,
            changed,
            grabbed,
        })
    }

    // ---- incremental updates ----

    /// Set the user preference of every non-toggle command in `group`.
    pub fn set_group_enabled(&mut self, group: &str, enabled: bool) {
        let n = self.update_group(group, |c| c.set_enabled(enabled));
        debug!(group, enabled, changed = n, "group_enabled");
    }

    /// Suspend or resume every non-toggle command in `group`.
    ///
    /// Suspension leaves the user preference and the bindings alone, so
    /// resuming restores exactly the pre-suspension state.
    pub fn set_group_suspended(&mut self, group: &str, suspended: bool) {
        let n = self.update_group(group, |c| c.set_suspended(suspended));
        debug!(group, suspended, changed = n, "group_suspended");
    }

    /// Set the user preference of one command, adjusting its grab.
    pub fn set_command_enabled(&mut self, name: &str, enabled: bool) -> Result<()> {
        self.update_one(name, |c| c.set_enabled(enabled))
    }

    /// Suspend or resume one command, adjusting its grab.
    pub fn set_command_suspended(&mut self, name: &str, suspended: bool) -> Result<()> {
        self.update_one(name, |c| c.set_suspended(suspended))
    }

    /// Grab the active binding of `name`.
    ///
    /// No-op for unknown, braille or unbound commands, for commands that
    /// already hold a grab, when another command holds the same identity, and
    /// when a command-modifier key holds the key.
    /// Returns true when the command holds a grab afterwards.
    pub fn add_grabs_for_command(&mut self, name: &str) -> bool {
        self.acquire_for(name, false)
    }

    /// Release the grab held by `name`. Returns true when something was released.
    pub fn remove_grabs_for_command(&mut self, name: &str) -> bool {
        self.release_for(name)
    }

    /// Grab each command-modifier key and release those no longer listed.
    ///
    /// Modifier keys are grabbed bare (no modifiers). A command bound to the
    /// bare key loses its grab to the modifier and gets it back once the key is
    /// no longer listed. An unresolvable name fails the whole call before any
    /// grab changes.
    pub fn set_command_modifiers(&mut self, keysyms: &[&str]) -> Result<()> {
        let mut wanted = Vec::with_capacity(keysyms.len());
        for s in keysyms {
            let sym = Keysym::resolve(s).ok_or_else(|| Error::UnresolvableKeysym((*s).to_string()))?;
            wanted.push(sym.name);
        }
        self.set_command_modifiers_unchecked(&wanted);
        Ok(())
    }

    /// True when the command-modifier key `keysym` holds a grab.
    pub fn is_modifier_grabbed(&self, keysym: &str) -> bool {
        Keysym::resolve(keysym)
            .and_then(|k| self.modifier_grabs.get(&k.name))
            .is_some_and(KeyBinding::has_grabs)
    }

    /// Command-modifier keys currently grabbed.
    pub fn command_modifiers(&self) -> Vec<&str> {
        self.modifier_grabs.keys().map(String::as_str).collect()
    }

    // ---- diagnostics ----

    /// Sorted `(chord, command, handle count)` for every bound keyboard command.
    pub fn bindings_snapshot(&self) -> Vec<(String, String, usize)> {
        let mut out: Vec<(String, String, usize)> = self
            .commands
            .iter()
            .filter_map(|(name, c)| {
                let b = c.as_keyboard()?.active_binding()?;
                Some((b.to_string(), name.clone(), b.grab_handles().len()))
            })
            .collect();
        out.sort();
        out
    }

    /// Names of keyboard commands whose grab state disagrees with `is_active()`.
    ///
    /// A command appears here when it is active but its grab was refused or is
    /// held by a command-modifier key, or when it holds a grab while inactive.
    pub fn check_grab_accounting(&self) -> Vec<String> {
        self.commands
            .values()
            .filter_map(Command::as_keyboard)
            .filter(|k| k.is_active() != k.is_grabbed())
            .map(|k| k.name().to_string())
            .collect()
    }

    /// Names of commands whose index entries disagree with their binding.
    pub fn check_index_consistency(&self) -> Vec<String> {
        let mut bad: BTreeSet<String> = BTreeSet::new();
        let (by_keyval, by_keycode) = self.index.entries();
        for (kv, name) in by_keyval {
            let ok = self
                .get_keyboard_command(name)
                .and_then(KeyboardCommand::active_binding)
                .is_some_and(|b| b.keyval() == Some(kv));
            if !ok {
                bad.insert(name.to_string());
            }
        }
        for (kc, name) in by_keycode {
            let ok = self
                .get_keyboard_command(name)
                .and_then(KeyboardCommand::active_binding)
                .is_some_and(|b| b.keycode() == Some(kc));
            if !ok {
                bad.insert(name.to_string());
            }
        }
        for k in self.get_all_keyboard_commands() {
            let Some(b) = k.active_binding() else {
                continue;
            };
            let in_kv = b
                .keyval()
                .is_none_or(|kv| self.index.for_keyval(kv).is_some_and(|s| s.contains(k.name())));
            let in_kc = b
                .keycode()
                .is_none_or(|kc| self.index.for_keycode(kc).is_some_and(|s| s.contains(k.name())));
            if !(in_kv && in_kc) {
                bad.insert(k.name().to_string());
            }
        }
        bad.into_iter().collect()
    }

    // ---- internals ----

    /// Keyboard command by name, or the reason there is none.
    fn keyboard(&self, name: &str) -> Result<&KeyboardCommand> {
        match self.commands.get(name) {
            Some(Command::Keyboard(k)) => Ok(k),
            Some(Command::Braille(_)) => Err(Error::NotKeyboardCommand(name.to_string())),
            None => Err(Error::UnknownCommand(name.to_string())),
        }
    }

    /// Another keyboard command whose current binding has `identity`.
    fn binding_owner(&self, identity: &IdentityKey, except: &str) -> Option<&str> {
        self.commands
            .iter()
            .filter(|(n, _)| n.as_str() != except)
            .find(|(_, c)| {
                c.as_keyboard()
                    .and_then(KeyboardCommand::active_binding)
                    .is_some_and(|b| b.identity() == *identity)
            })
            .map(|(n, _)| n.as_str())
    }

    /// Another keyboard command that holds a grab for `identity`.
    fn grab_holder(&self, identity: &IdentityKey, except: &str) -> Option<&str> {
        self.commands
            .iter()
            .filter(|(n, _)| n.as_str() != except)
            .find(|(_, c)| {
                c.as_keyboard()
                    .and_then(KeyboardCommand::active_binding)
                    .is_some_and(|b| b.has_grabs() && b.identity() == *identity)
            })
            .map(|(n, _)| n.as_str())
    }

    /// Command-modifier key grabbed for the physical key of `binding`.
    ///
    /// Modifier keys are grabbed without modifiers, so only bare bindings
    /// collide, whatever their click count.
    fn modifier_holding(&self, binding: &KeyBinding) -> Option<&str> {
        if binding.modifiers() != 0 {
            return None;
        }
        let keyval = binding.keyval()?;
        self.modifier_grabs
            .iter()
            .find(|(_, m)| m.keyval() == Some(keyval))
            .map(|(n, _)| n.as_str())
    }

    /// Keyboard commands bound to the bare form of `key`.
    fn bare_bindings_on(&self, key: &KeyBinding) -> Vec<String> {
        let Some(keyval) = key.keyval() else {
            return Vec::new();
        };
        self.commands
            .iter()
            .filter(|(_, c)| {
                c.as_keyboard()
                    .and_then(KeyboardCommand::active_binding)
                    .is_some_and(|b| b.modifiers() == 0 && b.keyval() == Some(keyval))
            })
            .map(|(n, _)| n.clone())
            .collect()
    }

    /// Active binding of `name`, mutably.
    fn live_binding_mut(&mut self, name: &str) -> Option<&mut KeyBinding> {
        self.commands
            .get_mut(name)
            .and_then(Command::as_keyboard_mut)
            .and_then(|k| k.active_binding.as_mut())
    }

    /// Identities that should hold grabs, with their owners.
    ///
    /// When two active commands share an identity the first in name order owns
    /// it and the clash is logged.
    fn wanted_grabs(&self) -> BTreeMap<IdentityKey, String> {
        let mut wanted: BTreeMap<IdentityKey, String> = BTreeMap::new();
        for k in self.get_all_keyboard_commands() {
            if !k.is_active() {
                continue;
            }
            let Some(b) = k.active_binding() else {
                continue;
            };
            match wanted.entry(b.identity()) {
                Entry::Vacant(v) => {
                    v.insert(k.name().to_string());
                }
                Entry::Occupied(o) => {
                    warn!(owner = %o.get(), other = k.name(), chord = %o.key(), "identity_conflict");
                }
            }
        }
        wanted
    }

    /// Lift every live handle out of the command table.
    fn take_grabs(&mut self) -> BTreeMap<IdentityKey, Held> {
        let mut held: BTreeMap<IdentityKey, Held> = BTreeMap::new();
        for (name, cmd) in &mut self.commands {
            let Some(b) = cmd.as_keyboard_mut().and_then(|k| k.active_binding.as_mut()) else {
                continue;
            };
            if !b.has_grabs() {
                continue;
            }
            let snapshot = b.clone();
            b.grab_handles.clear();
            match held.entry(snapshot.identity()) {
                Entry::Vacant(v) => {
                    v.insert(Held {
                        owner: name.clone(),
                        binding: snapshot,
                    });
                }
                Entry::Occupied(o) => {
                    warn!(owner = %o.get().owner, other = %name, chord = %o.key(), "duplicate_grab_released");
                    if let Err(e) = self.backend.release(&snapshot.grab_key(), snapshot.grab_handles()) {
                        warn!(chord = %snapshot, error = %e, "grab_release_failed");
                    }
                }
            }
        }
        held
    }

    /// Reconcile lifted grabs against the bindings now in force.
    fn reconcile(&mut self, mut held: BTreeMap<IdentityKey, Held>, reason: &str) {
        let start = Instant::now();
        let wanted = self.wanted_grabs();
        let old: BTreeSet<IdentityKey> = held.keys().cloned().collect();
        let new: BTreeSet<IdentityKey> = wanted.keys().cloned().collect();
        let plan = diff::plan(&old, &new);

        for key in &plan.transfer {
            let (Some(h), Some(owner)) = (held.remove(key), wanted.get(key)) else {
                continue;
            };
            if let Some(b) = self.live_binding_mut(owner) {
                b.grab_handles = h.binding.grab_handles;
                trace!(chord = %key, from = %h.owner, to = %owner, "grab_transferred");
            }
        }
        for key in &plan.release {
            let Some(h) = held.remove(key) else {
                continue;
            };
            match self.backend.release(&h.binding.grab_key(), h.binding.grab_handles()) {
                Ok(()) => debug!(command = %h.owner, chord = %key, "grab_released"),
                Err(e) => warn!(command = %h.owner, chord = %key, error = %e, "grab_release_failed"),
            }
        }
        let mut failed = 0usize;
        for key in &plan.acquire {
            if let Some(owner) = wanted.get(key)
                && !self.acquire_for(owner, true)
            {
                failed += 1;
            }
        }

        let elapsed = start.elapsed();
        debug!(
            reason,
            transferred = plan.transfer.len(),
            released = plan.release.len(),
            acquired = plan.acquire.len() - failed,
            failed,
            ?elapsed,
            "grabs_reconciled"
        );
        if elapsed > Duration::from_millis(BIND_UPDATE_WARN_MS) {
            warn!("Binding update took {:?}, may cause key drops", elapsed);
        }
    }

    /// Reset every keyboard command to its layout default plus stored override.
    fn reset_all_bindings(&mut self) {
        let layout = self.layout;
        for (name, cmd) in &mut self.commands {
            let Some(k) = cmd.as_keyboard_mut() else {
                continue;
            };
            if let Some(old) = k.active_binding.take() {
                self.index.remove(name, &old);
            }
            let mut binding = k.default_for(layout).map(KeyBinding::fresh);
            if let Some(specs) = self.overrides.get(name) {
                binding = layered(name, binding, specs);
            }
            if let Some(b) = &binding {
                self.index.insert(name, b);
            }
            k.active_binding = binding;
        }
    }

    /// Swap one command's binding and reconcile.
    fn rebind_one(&mut self, name: &str, binding: Option<KeyBinding>, reason: &str) {
        let held = self.take_grabs();
        if let Some(k) = self.commands.get_mut(name).and_then(Command::as_keyboard_mut) {
            if let Some(old) = k.active_binding.take() {
                self.index.remove(name, &old);
            }
            if let Some(b) = &binding {
                self.index.insert(name, b);
            }
            k.active_binding = binding;
        }
        self.reconcile(held, reason);
    }

    /// Acquire a grab for `name`; returns whether it holds one afterwards.
    fn acquire_for(&mut self, name: &str, require_active: bool) -> bool {
        let Some(k) = self.commands.get(name).and_then(Command::as_keyboard) else {
            return false;
        };
        let Some(b) = k.active_binding() else {
            return false;
        };
        if b.has_grabs() {
            return true;
        }
        if require_active && !k.is_active() {
            return false;
        }
        let identity = b.identity();
        if let Some(holder) = self.grab_holder(&identity, name) {
            warn!(command = %name, holder = %holder, chord = %identity, "grab_already_held");
            return false;
        }
        if let Some(modifier) = self.modifier_holding(b) {
            warn!(command = %name, modifier, chord = %identity, "grab_held_by_modifier");
            return false;
        }
        let handles = match self.backend.acquire(&b.grab_key()) {
            Ok(h) => h,
            Err(e) => {
                warn!(command = %name, chord = %identity, error = %e, "grab_refused");
                return false;
            }
        };
        let count = handles.len();
        match self.live_binding_mut(name) {
            Some(b) => b.grab_handles = handles,
            None => return false,
        }
        debug!(command = %name, chord = %identity, handles = count, "grab_acquired");
        count > 0
    }

    /// Release the grab held by `name`.
    fn release_for(&mut self, name: &str) -> bool {
        let Some(b) = self
            .commands
            .get_mut(name)
            .and_then(Command::as_keyboard_mut)
            .and_then(|k| k.active_binding.as_mut())
        else {
            return false;
        };
        if !b.has_grabs() {
            return false;
        }
        let handles = mem::take(&mut b.grab_handles);
        match self.backend.release(&b.grab_key(), &handles) {
            Ok(()) => debug!(command = %name, chord = %b, "grab_released"),
            Err(e) => warn!(command = %name, chord = %b, error = %e, "grab_release_failed"),
        }
        true
    }

    /// Apply a flag change to every non-toggle command in `group`; returns the
    /// number of commands whose active state changed.
    fn update_group(&mut self, group: &str, f: impl Fn(&mut Command)) -> usize {
        let names: Vec<String> = self
            .commands
            .iter()
            .filter(|(_, c)| c.group_label() == group)
            .filter(|(_, c)| !c.as_keyboard().is_some_and(KeyboardCommand::is_group_toggle))
            .map(|(n, _)| n.clone())
            .collect();
        names
            .iter()
            .filter(|n| self.apply_flag(n, &f))
            .count()
    }

    /// Apply a flag change to one command.
    fn update_one(&mut self, name: &str, f: impl Fn(&mut Command)) -> Result<()> {
        if !self.commands.contains_key(name) {
            return Err(Error::UnknownCommand(name.to_string()));
        }
        self.apply_flag(name, &f);
        Ok(())
    }

    /// Flip a flag and acquire or release the grab if `is_active()` changed.
    fn apply_flag(&mut self, name: &str, f: &impl Fn(&mut Command)) -> bool {
        let Some(cmd) = self.commands.get_mut(name) else {
            return false;
        };
        let was = cmd.as_keyboard().is_some_and(KeyboardCommand::is_active);
        f(cmd);
        let now = cmd.as_keyboard().is_some_and(KeyboardCommand::is_active);
        match (was, now) {
            (false, true) => {
                self.acquire_for(name, true);
                true
            }
            (true, false) => {
                self.release_for(name);
                true
            }
            _ => false,
        }
    }

    /// Reconcile modifier grabs against resolved names.
    fn set_command_modifiers_unchecked(&mut self, wanted: &[String]) {
        let stale: Vec<String> = self
            .modifier_grabs
            .keys()
            .filter(|k| !wanted.contains(k))
            .cloned()
            .collect();
        for name in stale {
            let Some(b) = self.modifier_grabs.remove(&name) else {
                continue;
            };
            if b.has_grabs() {
                match self.backend.release(&b.grab_key(), b.grab_handles()) {
                    Ok(()) => debug!(keysym = %name, "modifier_ungrabbed"),
                    Err(e) => warn!(keysym = %name, error = %e, "grab_release_failed"),
                }
            }
            for command in self.bare_bindings_on(&b) {
                if self.acquire_for(&command, true) {
                    debug!(command = %command, keysym = %name, "grab_returned_from_modifier");
                }
            }
        }
        for name in wanted {
            if self.modifier_grabs.contains_key(name) {
                continue;
            }
            let mut b = KeyBinding::with_mask(name.as_str(), 0, NO_MODIFIER_MASK, 1);
            let displaced: Vec<String> = self
                .bare_bindings_on(&b)
                .into_iter()
                .filter(|command| self.release_for(command))
                .collect();
            for command in &displaced {
                warn!(command = %command, keysym = %name, "grab_taken_by_modifier");
            }
            match self.backend.acquire(&b.grab_key()) {
                Ok(handles) => {
                    b.grab_handles = handles;
                    debug!(keysym = %name, "modifier_grabbed");
                    self.modifier_grabs.insert(name.clone(), b);
                }
                Err(e) => {
                    warn!(keysym = %name, error = %e, "grab_refused");
                    for command in &displaced {
                        self.acquire_for(command, true);
                    }
                }
            }
        }
    }
}

/// Layer persisted specs over `current`.
///
/// An empty list unbinds, as does an empty or unresolvable symbol. A spec with
/// the current identity keeps the current instance. When several specs are
/// listed the last one wins.
fn layered(name: &str, current: Option<KeyBinding>, specs: &[BindingSpec]) -> Option<KeyBinding> {
    if specs.is_empty() {
        trace!(command = %name, "override_unbind");
        return None;
    }
    let mut out = current;
    for spec in specs {
        match KeyBinding::from_spec(spec) {
            None => {
                if !spec.is_unbind() {
                    warn!(command = %name, keysym = %spec.keysym, "override_unresolvable_keysym");
                }
                out = None;
            }
            Some(b) => {
                if out.as_ref().is_some_and(|c| c.same_identity(&b)) {
                    continue;
                }
                trace!(command = %name, chord = %b, "override_installed");
                out = Some(b);
            }
        }
    }
    out
}
