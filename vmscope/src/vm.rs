//! Host-runtime capability surface.
//!
//! The agent never polls the VM. It asks exactly two things of the host:
//! whether guest code is executing right now (to pick an interrupt delivery
//! path), and to run a closure at the next safe point (the busy path).

/// Capabilities the host VM exposes to the agent for one execution context.
///
/// Implementations must be callable from any thread.
pub trait VmHost: Send + Sync {
    /// Whether the owning context is currently executing guest code.
    fn is_executing_guest(&self) -> bool;

    /// Schedule `f` to run on the context's owning thread at the next point
    /// the VM can safely pause guest execution. Guest code stays paused for
    /// the duration of the call.
    fn request_safepoint_interrupt(&self, f: Box<dyn FnOnce() + Send>);
}
