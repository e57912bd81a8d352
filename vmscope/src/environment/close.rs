//! Teardown countdown.
//!
//! Destruction of a per-context container is gated on every asynchronous
//! wakeup-handle close being confirmed. The countdown is an explicit state
//! machine advanced only by confirmed completions — never guessed, never
//! timed out.

use std::sync::Mutex;

/// Progress of the two-phase close: Active → Closing(n) → Closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseProgress {
    /// Teardown not started, or started with no completions yet.
    Active,
    /// `n` of the handle closes have been confirmed.
    Closing(u32),
    /// All closes confirmed; deletion is authorized.
    Closed,
}

pub(crate) struct CloseCountdown {
    total: u32,
    state: Mutex<CloseProgress>,
}

impl CloseCountdown {
    pub(crate) fn new(total: u32) -> Self {
        Self {
            total,
            state: Mutex::new(CloseProgress::Active),
        }
    }

    /// Record one confirmed handle close.
    ///
    /// Returns true only for the confirmation that reaches the total — the
    /// one that authorizes deletion of the container.
    ///
    /// # Panics
    /// On a confirmation after the countdown already completed; the reactor
    /// guarantees each close completion fires exactly once, so this is
    /// unreachable outside a protocol violation.
    pub(crate) fn confirm(&self) -> bool {
        let mut state = self.state.lock().expect("close countdown lock poisoned");
        let confirmed = match *state {
            CloseProgress::Active => 1,
            CloseProgress::Closing(n) => n + 1,
            CloseProgress::Closed => panic!("close confirmed after countdown completed"),
        };
        if confirmed == self.total {
            *state = CloseProgress::Closed;
            true
        } else {
            *state = CloseProgress::Closing(confirmed);
            false
        }
    }

    pub(crate) fn progress(&self) -> CloseProgress {
        *self.state.lock().expect("close countdown lock poisoned")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deletion_authorized_only_by_second_confirmation() {
        // Two handles closing in either order produce the same confirmation
        // sequence; both interleavings reduce to first-then-second.
        let countdown = CloseCountdown::new(2);
        assert_eq!(countdown.progress(), CloseProgress::Active);

        assert!(!countdown.confirm());
        assert_eq!(countdown.progress(), CloseProgress::Closing(1));

        assert!(countdown.confirm());
        assert_eq!(countdown.progress(), CloseProgress::Closed);
    }

    #[test]
    #[should_panic(expected = "after countdown completed")]
    fn test_confirmation_past_total_panics() {
        let countdown = CloseCountdown::new(1);
        assert!(countdown.confirm());
        countdown.confirm();
    }

    #[test]
    fn test_single_handle_countdown() {
        let countdown = CloseCountdown::new(1);
        assert!(countdown.confirm());
        assert_eq!(countdown.progress(), CloseProgress::Closed);
    }
}
