//! Identity newtypes for execution contexts and their owning threads.

use std::fmt;

/// Identifier of one execution context (one VM instance with its own heap,
/// owned by exactly one thread).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(pub u64);

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "context:{}", self.0)
    }
}

/// Thread identifier in the guest's numeric form.
///
/// There is no uniformly available native wide thread id across platforms,
/// so the guest's number representation is stored as-is.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThreadId(pub f64);

impl ThreadId {
    /// Value before `setup_environment_data` has run.
    pub const UNASSIGNED: ThreadId = ThreadId(-1.0);
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "thread:{}", self.0)
    }
}

/// Which delivery path fired an interrupt drain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptKind {
    /// Delivered at a VM safe point while guest code was executing;
    /// guest execution is paused for the duration of the callback.
    Busy,
    /// Delivered on a reactor loop iteration while the context was idle.
    Idle,
}
