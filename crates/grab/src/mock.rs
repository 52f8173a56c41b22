//! Recording backend for tests.
use std::{
    collections::{BTreeMap, HashSet},
    sync::Arc,
};

use parking_lot::Mutex;
use tracing::trace;

use crate::{Error, GrabBackend, GrabHandle, GrabKey, Result};

/// One recorded backend call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GrabCall {
    /// An acquire attempt, successful or not.
    Acquire {
        /// Key symbol name.
        keysym: String,
        /// Required modifier bits.
        modifiers: u32,
    },
    /// A release call with the handles passed in.
    Release {
        /// Key symbol name.
        keysym: String,
        /// Handles returned to the backend.
        handles: Vec<GrabHandle>,
    },
}

/// Shared state behind a [`MockGrabBackend`].
#[derive(Debug, Default)]
struct State {
    /// Every call, in order.
    calls: Vec<GrabCall>,
    /// Live handles and the symbol they were issued for.
    live: BTreeMap<GrabHandle, String>,
    /// Symbols for which acquire fails.
    refused: HashSet<String>,
    /// Last handle issued.
    next_id: u32,
}

/// Backend that records calls and tracks live handles.
///
/// Clones share state, so a test can hand one clone to the registry and keep
/// another for assertions.
#[derive(Clone, Debug)]
pub struct MockGrabBackend {
    /// Shared state.
    state: Arc<Mutex<State>>,
}

impl Default for MockGrabBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockGrabBackend {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                next_id: 1000,
                ..State::default()
            })),
        }
    }

    /// Make every future acquire for `keysym` fail with [`Error::Refused`].
    pub fn refuse(&self, keysym: &str) {
        self.state.lock().refused.insert(keysym.to_string());
    }

    /// Stop refusing `keysym`.
    pub fn allow(&self, keysym: &str) {
        self.state.lock().refused.remove(keysym);
    }

    /// All recorded calls.
    pub fn calls(&self) -> Vec<GrabCall> {
        self.state.lock().calls.clone()
    }

    /// Number of recorded calls.
    pub fn call_count(&self) -> usize {
        self.state.lock().calls.len()
    }

    /// Number of recorded acquire attempts.
    pub fn acquire_count(&self) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| matches!(c, GrabCall::Acquire { .. }))
            .count()
    }

    /// Number of recorded release calls.
    pub fn release_count(&self) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| matches!(c, GrabCall::Release { .. }))
            .count()
    }

    /// Forget recorded calls; live handles are kept.
    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    /// Live handles, in issue order.
    pub fn live_handles(&self) -> Vec<GrabHandle> {
        self.state.lock().live.keys().copied().collect()
    }

    /// Key symbols of all live grabs, sorted, with repeats.
    pub fn live_keysyms(&self) -> Vec<String> {
        let mut v: Vec<String> = self.state.lock().live.values().cloned().collect();
        v.sort();
        v
    }
}

impl GrabBackend for MockGrabBackend {
    fn acquire(&mut self, key: &GrabKey<'_>) -> Result<Vec<GrabHandle>> {
        let mut st = self.state.lock();
        st.calls.push(GrabCall::Acquire {
            keysym: key.keysym.to_string(),
            modifiers: key.modifiers,
        });
        if st.refused.contains(key.keysym) {
            return Err(Error::Refused(key.chord().to_string()));
        }
        if key.keycode.is_none() {
            return Err(Error::UnknownKey(key.keysym.to_string()));
        }
        st.next_id += 1;
        let handle = GrabHandle(st.next_id);
        st.live.insert(handle, key.keysym.to_string());
        trace!(keysym = key.keysym, handle = %handle, "mock_grab_acquired");
        Ok(vec![handle])
    }

    fn release(&mut self, key: &GrabKey<'_>, handles: &[GrabHandle]) -> Result<()> {
        let mut st = self.state.lock();
        st.calls.push(GrabCall::Release {
            keysym: key.keysym.to_string(),
            handles: handles.to_vec(),
        });
        for h in handles {
            if st.live.remove(h).is_none() {
                return Err(Error::InvalidHandle(*h));
            }
        }
        trace!(keysym = key.keysym, count = handles.len(), "mock_grab_released");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(sym: &str, code: Option<u32>) -> GrabKey<'_> {
        GrabKey {
            keysym: sym,
            keyval: None,
            keycode: code,
            modifiers: 0,
            modifier_mask: 0,
            click_count: 1,
        }
    }

    #[test]
    fn acquire_release_tracks_live_handles() {
        let mock = MockGrabBackend::new();
        let mut backend = mock.clone();
        let handles = backend.acquire(&key("Insert", Some(118))).expect("acquire");
        assert_eq!(handles.len(), 1);
        assert_eq!(mock.live_keysyms(), vec!["Insert".to_string()]);

        backend
            .release(&key("Insert", Some(118)), &handles)
            .expect("release");
        assert!(mock.live_handles().is_empty());
        assert_eq!(mock.acquire_count(), 1);
        assert_eq!(mock.release_count(), 1);
    }

    #[test]
    fn refused_and_unknown_keys_fail() {
        let mock = MockGrabBackend::new();
        let mut backend = mock.clone();
        mock.refuse("h");
        assert!(matches!(
            backend.acquire(&key("h", Some(43))),
            Err(Error::Refused(_))
        ));
        assert!(matches!(
            backend.acquire(&key("dead_acute", None)),
            Err(Error::UnknownKey(_))
        ));
        mock.allow("h");
        assert!(backend.acquire(&key("h", Some(43))).is_ok());
        assert_eq!(mock.acquire_count(), 3);
    }

    #[test]
    fn double_release_is_rejected() {
        let mut backend = MockGrabBackend::new();
        let handles = backend.acquire(&key("a", Some(38))).expect("acquire");
        backend.release(&key("a", Some(38)), &handles).expect("release");
        assert_eq!(
            backend.release(&key("a", Some(38)), &handles),
            Err(Error::InvalidHandle(handles[0]))
        );
    }
}
