//! Grab reconciliation planning.
//!
//! Given the identities that held grabs before a change and the identities
//! that should hold grabs after it, split the union into three disjoint sets:
//! identities whose handles move to the new owner without touching the
//! backend, identities to release, and identities to acquire. The registry
//! applies a plan in that order, so no key is released and re-acquired in the
//! same pass.
use std::collections::BTreeSet;

/// A reconciliation plan over identity keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrabPlan<K> {
    /// Held before and wanted after: handles are handed over.
    pub transfer: Vec<K>,
    /// Held before, not wanted after.
    pub release: Vec<K>,
    /// Wanted after, not held before.
    pub acquire: Vec<K>,
}

impl<K> GrabPlan<K> {
    /// Number of backend calls this plan makes.
    pub fn backend_calls(&self) -> usize {
        self.release.len() + self.acquire.len()
    }

    /// True when the plan changes nothing at the backend.
    pub fn is_quiet(&self) -> bool {
        self.backend_calls() == 0
    }
}

/// Compute the plan that takes `old` to `new`.
pub fn plan<K: Ord + Clone>(old: &BTreeSet<K>, new: &BTreeSet<K>) -> GrabPlan<K> {
    GrabPlan {
        transfer: old.intersection(new).cloned().collect(),
        release: old.difference(new).cloned().collect(),
        acquire: new.difference(old).cloned().collect(),
    }
}
