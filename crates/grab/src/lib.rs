//! grab: the capability boundary to the platform key-grab primitive.
//!
//! A grab is an exclusive claim on a physical key combination. Exactly one
//! owner (the command registry) holds a `Box<dyn GrabBackend>`; nothing else
//! mutates grabs. Backends hand out opaque [`GrabHandle`]s on acquire and take
//! them back on release.
//!
//! Backends shipped here:
//! - [`MockGrabBackend`]: records every call and tracks live handles, for tests.
//! - [`LoggingGrabBackend`]: issues handles and logs each call; used by `replay`.
//! - [`NullGrabBackend`]: issues handles and does nothing else.
use std::fmt;

use keysym::{Chord, Keycode, Keyval};

mod error;
pub use error::{Error, Result};

mod mock;
pub use mock::{GrabCall, MockGrabBackend};

mod logging;
pub use logging::LoggingGrabBackend;

/// Opaque identifier for one live grab.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GrabHandle(pub u32);

impl fmt::Display for GrabHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Borrowed view of a binding, as seen by a backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrabKey<'a> {
    /// Key symbol name.
    pub keysym: &'a str,
    /// Resolved symbol value, if known.
    pub keyval: Option<Keyval>,
    /// Hardware code to grab, if the symbol has a physical key.
    pub keycode: Option<Keycode>,
    /// Required modifier bits.
    pub modifiers: u32,
    /// Modifier bits that participate in matching.
    pub modifier_mask: u32,
    /// Click count of the binding (informational; grabs are per physical key).
    pub click_count: u8,
}

impl GrabKey<'_> {
    /// Chord view of this key, for logging.
    pub fn chord(&self) -> Chord {
        Chord::new(self.keysym, self.modifiers)
    }
}

/// Capability to acquire and release physical key grabs.
pub trait GrabBackend: Send {
    /// Acquire grabs for `key`, returning the handles now owned by the caller.
    fn acquire(&mut self, key: &GrabKey<'_>) -> Result<Vec<GrabHandle>>;
    /// Release previously acquired handles for `key`.
    fn release(&mut self, key: &GrabKey<'_>, handles: &[GrabHandle]) -> Result<()>;
}

/// Backend that issues handles without touching any platform state.
#[derive(Debug)]
pub struct NullGrabBackend {
    /// Next handle to issue.
    next_id: u32,
}

impl Default for NullGrabBackend {
    fn default() -> Self {
        Self { next_id: 1000 }
    }
}

impl GrabBackend for NullGrabBackend {
    fn acquire(&mut self, _key: &GrabKey<'_>) -> Result<Vec<GrabHandle>> {
        self.next_id += 1;
        Ok(vec![GrabHandle(self.next_id)])
    }

    fn release(&mut self, _key: &GrabKey<'_>, _handles: &[GrabHandle]) -> Result<()> {
        Ok(())
    }
}
