use std::collections::HashSet;

use tracing::{debug, warn};

use crate::{Error, GrabBackend, GrabHandle, GrabKey, Result};

/// Backend that issues handles and logs every grab change.
///
/// Keys without a hardware code are refused with [`Error::UnknownKey`], the
/// same way a platform backend would fail.
#[derive(Debug)]
pub struct LoggingGrabBackend {
    /// Handles currently outstanding.
    live: HashSet<GrabHandle>,
    /// Last handle issued.
    next_id: u32,
}

impl Default for LoggingGrabBackend {
    fn default() -> Self {
        Self {
            live: HashSet::new(),
            next_id: 1000,
        }
    }
}

impl LoggingGrabBackend {
    /// Number of outstanding grabs.
    pub fn live_count(&self) -> usize {
        self.live.len()
    }
}

impl GrabBackend for LoggingGrabBackend {
    fn acquire(&mut self, key: &GrabKey<'_>) -> Result<Vec<GrabHandle>> {
        let Some(keycode) = key.keycode else {
            warn!(chord = %key.chord(), "grab_unknown_key");
            return Err(Error::UnknownKey(key.keysym.to_string()));
        };
        self.next_id += 1;
        let handle = GrabHandle(self.next_id);
        self.live.insert(handle);
        debug!(chord = %key.chord(), keycode, handle = %handle, "grab");
        Ok(vec![handle])
    }

    fn release(&mut self, key: &GrabKey<'_>, handles: &[GrabHandle]) -> Result<()> {
        for h in handles {
            if !self.live.remove(h) {
                return Err(Error::InvalidHandle(*h));
            }
            debug!(chord = %key.chord(), handle = %h, "ungrab");
        }
        Ok(())
    }
}
