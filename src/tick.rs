//! Fixed-cadence heartbeat, checked cooperatively by the dispatcher.

use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct Ticker {
    interval: Duration,
    next_due: Instant,
}

impl Ticker {
    /// First firing is one `interval` after `start`.
    pub fn new(interval: Duration, start: Instant) -> Self {
        Self {
            interval,
            next_due: start + interval,
        }
    }

    /// Returns true once per elapsed interval. Missed firings are not
    /// merged: each call after a stall reports one of them until caught up.
    pub fn poll(&mut self, now: Instant) -> bool {
        if now < self.next_due {
            return false;
        }
        self.next_due += self.interval;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEC: Duration = Duration::from_secs(1);

    #[test]
    fn test_not_due_before_interval() {
        let t0 = Instant::now();
        let mut ticker = Ticker::new(SEC, t0);
        assert!(!ticker.poll(t0));
        assert!(!ticker.poll(t0 + Duration::from_millis(999)));
        assert!(ticker.poll(t0 + SEC));
    }

    #[test]
    fn test_fires_once_per_interval() {
        let t0 = Instant::now();
        let mut ticker = Ticker::new(SEC, t0);
        assert!(ticker.poll(t0 + SEC));
        assert!(!ticker.poll(t0 + SEC + Duration::from_millis(500)));
        assert!(ticker.poll(t0 + SEC * 2));
    }

    #[test]
    fn test_stall_is_not_coalesced() {
        let t0 = Instant::now();
        let mut ticker = Ticker::new(SEC, t0);
        let late = t0 + SEC * 3;
        assert!(ticker.poll(late));
        assert!(ticker.poll(late));
        assert!(ticker.poll(late));
        assert!(!ticker.poll(late));
    }
}
