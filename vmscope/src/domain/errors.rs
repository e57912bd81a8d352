//! Structured error types for vmscope
//!
//! Using thiserror for automatic Display implementation and error chaining.
//!
//! Precondition violations (looking up an environment before `create`,
//! creating one twice, setting identity twice) are programming errors, not
//! recoverable conditions — those panic instead of returning a variant here.

use thiserror::Error;

/// Failures signalling a reactor wakeup.
#[derive(Error, Debug)]
pub enum ReactorError {
    /// The wakeup handle is closing or closed; teardown has begun and no
    /// further deliveries will happen on it.
    #[error("wakeup handle is closed")]
    HandleClosed,

    /// The owning reactor loop no longer exists.
    #[error("reactor loop is gone")]
    LoopGone,
}
