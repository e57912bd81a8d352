//! GC prologue/epilogue hook lists.
//!
//! The host VM fires these at GC boundaries; the agent only keeps the
//! ordered list and checks each entry's type filter. Hooks run on the
//! GC-pausing path and must return promptly.

use vmscope_common::GcType;

use super::EnvironmentData;

/// Host-VM-invoked GC boundary callback.
///
/// A plain fn pointer so removal can match by identity, the same contract
/// the host VM uses for its own hook registration.
pub type GcCallback = fn(&EnvironmentData, GcType);

pub(crate) struct GcHookList {
    hooks: Vec<(GcCallback, GcType)>,
}

impl GcHookList {
    pub(crate) fn new() -> Self {
        Self { hooks: Vec::new() }
    }

    pub(crate) fn add(&mut self, callback: GcCallback, filter: GcType) {
        self.hooks.push((callback, filter));
    }

    /// Unregister by identity; linear scan, removes every matching entry.
    pub(crate) fn remove(&mut self, callback: GcCallback) {
        self.hooks.retain(|&(existing, _)| existing != callback);
    }

    /// Copy of the list for invocation outside the lock, in registration
    /// order.
    pub(crate) fn snapshot(&self) -> Vec<(GcCallback, GcType)> {
        self.hooks.clone()
    }

    pub(crate) fn len(&self) -> usize {
        self.hooks.len()
    }
}
