//! Pending-interrupt chain.
//!
//! Multiple producer threads append under the mutex; the owning thread
//! detaches the whole batch at delivery time and runs it outside the lock.
//! Batch order is LIFO: the most recently enqueued callback runs first.
//! Callbacks enqueued while a batch is running land in the next batch.

use crate::domain::InterruptKind;

use super::EnvironmentData;

/// A deferred handler guaranteed to run on the context's owning thread.
pub type InterruptCallback = Box<dyn FnOnce(&EnvironmentData, InterruptKind) + Send>;

/// Delivery state of the chain.
///
/// Empty → Pending on the first enqueue since the last drain; Pending →
/// Draining when a delivery path fires; Draining → Empty (or straight back
/// to Pending if callbacks arrived mid-drain).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryState {
    Empty,
    Pending,
    Draining,
}

pub(crate) struct InterruptChain {
    queue: Vec<InterruptCallback>,
    state: DeliveryState,
}

impl InterruptChain {
    pub(crate) fn new() -> Self {
        Self {
            queue: Vec::new(),
            state: DeliveryState::Empty,
        }
    }

    /// Append a callback. Enqueues while Pending or Draining grow the queue
    /// without a state change.
    pub(crate) fn push(&mut self, callback: InterruptCallback) {
        self.queue.push(callback);
        if self.state == DeliveryState::Empty {
            self.state = DeliveryState::Pending;
        }
    }

    /// Detach the whole batch for execution.
    ///
    /// Returns an empty batch without a state change when the chain was
    /// already drained — the redundant second fire of a dual delivery.
    pub(crate) fn take_batch(&mut self) -> Vec<InterruptCallback> {
        if self.queue.is_empty() {
            return Vec::new();
        }
        self.state = DeliveryState::Draining;
        std::mem::take(&mut self.queue)
    }

    /// Mark the detached batch finished. Anything enqueued while draining
    /// stays queued for the next delivery.
    pub(crate) fn finish_drain(&mut self) {
        self.state = if self.queue.is_empty() {
            DeliveryState::Empty
        } else {
            DeliveryState::Pending
        };
    }

    pub(crate) fn state(&self) -> DeliveryState {
        self.state
    }

    pub(crate) fn len(&self) -> usize {
        self.queue.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> InterruptCallback {
        Box::new(|_, _| {})
    }

    #[test]
    fn test_state_machine_enqueue_drain_cycle() {
        let mut chain = InterruptChain::new();
        assert_eq!(chain.state(), DeliveryState::Empty);

        chain.push(noop());
        assert_eq!(chain.state(), DeliveryState::Pending);
        chain.push(noop());
        assert_eq!(chain.state(), DeliveryState::Pending);
        assert_eq!(chain.len(), 2);

        let batch = chain.take_batch();
        assert_eq!(batch.len(), 2);
        assert_eq!(chain.state(), DeliveryState::Draining);
        assert_eq!(chain.len(), 0);

        chain.finish_drain();
        assert_eq!(chain.state(), DeliveryState::Empty);
    }

    #[test]
    fn test_redundant_drain_is_noop() {
        let mut chain = InterruptChain::new();
        chain.push(noop());
        let _ = chain.take_batch();
        chain.finish_drain();

        // Second path fires for the same batch: nothing to do.
        assert!(chain.take_batch().is_empty());
        assert_eq!(chain.state(), DeliveryState::Empty);
    }

    #[test]
    fn test_enqueue_during_drain_lands_in_next_batch() {
        let mut chain = InterruptChain::new();
        chain.push(noop());
        let _ = chain.take_batch();

        chain.push(noop());
        assert_eq!(chain.state(), DeliveryState::Draining);

        chain.finish_drain();
        assert_eq!(chain.state(), DeliveryState::Pending);
        assert_eq!(chain.take_batch().len(), 1);
    }
}
