//! Close confirmation: the window only goes away once the user insists.

use crate::config::CLOSE_THRESHOLD;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseState {
    /// Close request noted, window stays up. Carries the attempt number.
    Open(u32),
    /// Threshold exceeded; the window must be torn down now.
    Closing(u32),
}

/// Counts close requests for the lifetime of the process. Never reset.
#[derive(Debug, Clone)]
pub struct CloseGuard {
    attempts: u32,
    threshold: u32,
}

impl Default for CloseGuard {
    fn default() -> Self {
        Self::new(CLOSE_THRESHOLD)
    }
}

impl CloseGuard {
    pub fn new(threshold: u32) -> Self {
        Self {
            attempts: 0,
            threshold,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn is_closing(&self) -> bool {
        self.attempts > self.threshold
    }

    /// Records one close request and says what to do about it.
    pub fn request(&mut self) -> CloseState {
        self.attempts = self.attempts.saturating_add(1);
        if self.is_closing() {
            CloseState::Closing(self.attempts)
        } else {
            CloseState::Open(self.attempts)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_three_requests_stay_open() {
        let mut guard = CloseGuard::default();
        for n in 1..=3 {
            assert_eq!(guard.request(), CloseState::Open(n));
        }
        assert!(!guard.is_closing());
    }

    #[test]
    fn test_fourth_request_closes() {
        let mut guard = CloseGuard::default();
        for _ in 0..3 {
            guard.request();
        }
        assert_eq!(guard.request(), CloseState::Closing(4));
        assert!(guard.is_closing());
    }

    #[test]
    fn test_counter_increments_by_one() {
        let mut guard = CloseGuard::new(10);
        let mut last = guard.attempts();
        for _ in 0..5 {
            guard.request();
            assert_eq!(guard.attempts(), last + 1);
            last = guard.attempts();
        }
    }

    #[test]
    fn test_zero_threshold_closes_immediately() {
        let mut guard = CloseGuard::new(0);
        assert_eq!(guard.request(), CloseState::Closing(1));
    }
}
