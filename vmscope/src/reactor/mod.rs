//! # Reactor Loop
//!
//! One [`ReactorLoop`] runs per owning thread and dispatches asynchronous
//! signal completions for that thread's execution context. Producers on any
//! thread hold [`WakeupSignal`] handles; the loop owns the handlers.
//!
//! ## Semantics
//!
//! - **Coalescing**: triggers arriving between two iterations collapse into
//!   one handler run for that iteration (the pending flag is cleared right
//!   before the handler runs, so a trigger from inside the handler schedules
//!   the next iteration).
//! - **Asynchronous close**: `WakeupSignal::close` is confirmed by the loop
//!   at a later iteration; the completion callback runs exactly once, on the
//!   loop's thread. This is what makes teardown countdowns reliable.
//! - **Exit hooks**: run once at [`ReactorLoop::shutdown`], before the loop
//!   drains remaining close confirmations.

mod wakeup;

pub use wakeup::{HandleState, WakeupSignal};

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use log::trace;

use wakeup::{LoopMessage, WakeupId, WakeupShared, STATE_ACTIVE, STATE_CLOSED};

type WakeupHandler = Box<dyn FnMut() + Send>;

struct WakeupSlot {
    shared: Arc<WakeupShared>,
    handler: WakeupHandler,
}

/// Per-thread message loop owning registered wakeup handlers.
pub struct ReactorLoop {
    tx: Sender<LoopMessage>,
    rx: Receiver<LoopMessage>,
    slots: HashMap<WakeupId, WakeupSlot>,
    exit_hooks: Vec<Box<dyn FnOnce() + Send>>,
    next_id: WakeupId,
}

impl Default for ReactorLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl ReactorLoop {
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self {
            tx,
            rx,
            slots: HashMap::new(),
            exit_hooks: Vec::new(),
            next_id: 0,
        }
    }

    /// Register a handler and hand back its cross-thread trigger.
    pub fn register_wakeup<F>(&mut self, handler: F) -> WakeupSignal
    where
        F: FnMut() + Send + 'static,
    {
        let id = self.next_id;
        self.next_id += 1;
        let shared = Arc::new(WakeupShared {
            id,
            pending: AtomicBool::new(false),
            state: AtomicU8::new(STATE_ACTIVE),
        });
        self.slots.insert(
            id,
            WakeupSlot {
                shared: Arc::clone(&shared),
                handler: Box::new(handler),
            },
        );
        WakeupSignal {
            shared,
            tx: self.tx.clone(),
        }
    }

    /// Register a hook to run once when this thread shuts its loop down.
    pub fn register_exit_hook<F>(&mut self, hook: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.exit_hooks.push(Box::new(hook));
    }

    /// Process one loop iteration: wait up to `timeout` for the first
    /// message, then handle everything already queued. Returns whether any
    /// message was processed.
    pub fn run_once(&mut self, timeout: Duration) -> bool {
        let first = match self.rx.recv_timeout(timeout) {
            Ok(msg) => msg,
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => return false,
        };
        let mut batch = vec![first];
        while let Ok(msg) = self.rx.try_recv() {
            batch.push(msg);
        }
        trace!("reactor iteration: {} message(s)", batch.len());
        for msg in batch {
            self.dispatch(msg);
        }
        true
    }

    /// Run until every registered wakeup has confirmed its close.
    pub fn run(&mut self) {
        while !self.slots.is_empty() {
            self.run_once(Duration::from_millis(50));
        }
    }

    /// Fire exit hooks once, then drain until all wakeups confirm closed.
    pub fn shutdown(&mut self) {
        for hook in std::mem::take(&mut self.exit_hooks) {
            hook();
        }
        self.run();
    }

    /// Number of wakeups not yet confirmed closed.
    #[must_use]
    pub fn active_wakeups(&self) -> usize {
        self.slots.len()
    }

    fn dispatch(&mut self, msg: LoopMessage) {
        match msg {
            LoopMessage::Wake(id) => {
                // The slot may be gone if a close overtook this wake.
                let Some(slot) = self.slots.get_mut(&id) else {
                    return;
                };
                if slot.shared.pending.swap(false, Ordering::AcqRel) {
                    (slot.handler)();
                }
            }
            LoopMessage::Close { id, on_closed } => {
                if let Some(slot) = self.slots.remove(&id) {
                    slot.shared.state.store(STATE_CLOSED, Ordering::Release);
                }
                on_closed();
            }
        }
    }
}
