//! Cross-thread wakeup handles.
//!
//! A [`WakeupSignal`] is the trigger half of a wakeup registered on a
//! [`ReactorLoop`](super::ReactorLoop). Triggering is safe from any thread
//! and any number of producers; triggers between two loop iterations coalesce
//! into a single handler run. Closing is asynchronous: the owning loop
//! confirms it at a later iteration by running the supplied completion.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

use crossbeam_channel::Sender;

use crate::domain::errors::ReactorError;

pub(crate) type WakeupId = u64;

pub(crate) const STATE_ACTIVE: u8 = 0;
pub(crate) const STATE_CLOSING: u8 = 1;
pub(crate) const STATE_CLOSED: u8 = 2;

/// Lifecycle of a wakeup handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    /// Accepting triggers.
    Active,
    /// Close requested, not yet confirmed by the loop.
    Closing,
    /// Close confirmed; the handler will never run again.
    Closed,
}

/// State shared between a wakeup's trigger handles and its loop slot.
#[derive(Debug)]
pub(crate) struct WakeupShared {
    pub(crate) id: WakeupId,
    /// Set by producers, cleared by the loop right before the handler runs.
    pub(crate) pending: AtomicBool,
    pub(crate) state: AtomicU8,
}

/// Messages producers send to the owning loop.
pub(crate) enum LoopMessage {
    /// Run the wakeup's handler at the next iteration (coalesced).
    Wake(WakeupId),
    /// Unregister the wakeup and confirm with `on_closed` on the loop thread.
    Close {
        id: WakeupId,
        on_closed: Box<dyn FnOnce() + Send>,
    },
}

/// Cross-thread trigger for a handler registered on a reactor loop.
///
/// Clonable; all clones share the same pending flag and lifecycle state.
#[derive(Debug, Clone)]
pub struct WakeupSignal {
    pub(crate) shared: Arc<WakeupShared>,
    pub(crate) tx: Sender<LoopMessage>,
}

impl WakeupSignal {
    /// Request one handler run at the owning loop's next iteration.
    ///
    /// Idempotent between firings: any number of triggers before the handler
    /// runs produce exactly one run. Non-blocking.
    ///
    /// # Errors
    /// [`ReactorError::HandleClosed`] once `close` has been called;
    /// [`ReactorError::LoopGone`] if the owning loop was dropped.
    pub fn trigger(&self) -> Result<(), ReactorError> {
        if self.shared.state.load(Ordering::Acquire) != STATE_ACTIVE {
            return Err(ReactorError::HandleClosed);
        }
        // Only the trigger that flips the pending flag sends a message; the
        // rest coalesce into that one delivery.
        if !self.shared.pending.swap(true, Ordering::AcqRel) {
            self.tx
                .send(LoopMessage::Wake(self.shared.id))
                .map_err(|_| ReactorError::LoopGone)?;
        }
        Ok(())
    }

    /// Begin an asynchronous close.
    ///
    /// The loop unregisters the handler and runs `on_closed` exactly once, on
    /// the owning thread, at a later iteration. Triggers issued after this
    /// call fail with [`ReactorError::HandleClosed`].
    ///
    /// # Errors
    /// [`ReactorError::HandleClosed`] if already closing or closed;
    /// [`ReactorError::LoopGone`] if the owning loop was dropped.
    pub fn close<F>(&self, on_closed: F) -> Result<(), ReactorError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.shared
            .state
            .compare_exchange(STATE_ACTIVE, STATE_CLOSING, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| ReactorError::HandleClosed)?;
        self.tx
            .send(LoopMessage::Close {
                id: self.shared.id,
                on_closed: Box::new(on_closed),
            })
            .map_err(|_| ReactorError::LoopGone)
    }

    /// Current lifecycle state of this handle.
    #[must_use]
    pub fn state(&self) -> HandleState {
        match self.shared.state.load(Ordering::Acquire) {
            STATE_ACTIVE => HandleState::Active,
            STATE_CLOSING => HandleState::Closing,
            _ => HandleState::Closed,
        }
    }
}
