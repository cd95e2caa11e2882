//! Trailing-edge debouncing
//!
//! Time is passed in by the caller as a monotonic offset, so the debouncer
//! works the same under a real frame clock and in tests.

use std::time::Duration;

/// Collapses a burst of signals into one firing after a quiet period
///
/// Every [`signal`](Debouncer::signal) restarts the window;
/// [`check_timeout`](Debouncer::check_timeout) reports `true` exactly once
/// when the window elapses without a new signal.
#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    deadline: Option<Duration>,
    coalesced: u32,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            deadline: None,
            coalesced: 0,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Record a signal at `now`, restarting the window
    pub fn signal(&mut self, now: Duration) {
        if self.deadline.is_some() {
            self.coalesced += 1;
        }
        self.deadline = Some(now + self.window);
    }

    /// Whether the window has elapsed; clears the pending signal when it has
    pub fn check_timeout(&mut self, now: Duration) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                self.coalesced = 0;
                true
            }
            _ => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Signals absorbed into the pending one
    pub fn coalesced(&self) -> u32 {
        self.coalesced
    }

    pub fn reset(&mut self) {
        self.deadline = None;
        self.coalesced = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[test]
    fn test_burst_fires_once() {
        let mut debouncer = Debouncer::new(ms(250));
        for t in [0, 20, 40, 60, 80] {
            debouncer.signal(ms(t));
        }
        assert_eq!(debouncer.coalesced(), 4);

        let fired = (80..=600)
            .step_by(10)
            .filter(|&t| debouncer.check_timeout(ms(t)))
            .count();
        assert_eq!(fired, 1);
        assert!(!debouncer.is_pending());
    }

    #[test]
    fn test_signal_restarts_window() {
        let mut debouncer = Debouncer::new(ms(250));
        debouncer.signal(ms(0));
        assert!(!debouncer.check_timeout(ms(200)));
        debouncer.signal(ms(200));
        assert!(!debouncer.check_timeout(ms(300)));
        assert!(debouncer.check_timeout(ms(450)));
    }

    #[test]
    fn test_reset_cancels() {
        let mut debouncer = Debouncer::new(ms(100));
        debouncer.signal(ms(0));
        debouncer.reset();
        assert!(!debouncer.check_timeout(ms(500)));
    }
}
