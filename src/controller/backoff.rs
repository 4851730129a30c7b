//! # Exponential Backoff
//!
//! Per-resource retry delay after failed reconciliations.
//!
//! Sequence with the defaults (5s start, 300s max): 5s, 10s, 20s, 40s, 80s,
//! 160s, 300s, 300s, ... A successful reconcile resets the sequence.
//!
//! ## Usage
//!
//! ```rust
//! use bucket_controller::controller::backoff::ExponentialBackoff;
//!
//! let mut backoff = ExponentialBackoff::new(5, 300);
//! assert_eq!(backoff.next_backoff_seconds(), 5);
//! assert_eq!(backoff.next_backoff_seconds(), 10);
//! assert_eq!(backoff.next_backoff_seconds(), 20);
//! ```

use std::time::Duration;

/// Doubling backoff calculator capped at a maximum
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    /// First delay, restored on reset
    start_secs: u64,
    /// Delay returned by the next call
    current_secs: u64,
    /// Upper bound
    max_secs: u64,
}

impl ExponentialBackoff {
    /// Create a backoff starting at `start_secs` and capped at `max_secs`
    ///
    /// A zero start is raised to one second so the sequence can grow.
    #[must_use]
    pub fn new(start_secs: u64, max_secs: u64) -> Self {
        let start_secs = start_secs.max(1);
        let max_secs = max_secs.max(start_secs);
        Self {
            start_secs,
            current_secs: start_secs,
            max_secs,
        }
    }

    /// Get the next backoff duration in seconds and advance the sequence
    pub fn next_backoff_seconds(&mut self) -> u64 {
        let result = self.current_secs;
        self.current_secs = self.current_secs.saturating_mul(2).min(self.max_secs);
        result
    }

    /// Get the next backoff duration as a `Duration` and advance the sequence
    #[must_use]
    pub fn next_backoff(&mut self) -> Duration {
        Duration::from_secs(self.next_backoff_seconds())
    }

    /// Reset the backoff to the initial state
    pub fn reset(&mut self) {
        self.current_secs = self.start_secs;
    }
}

/// Backoff state for a specific resource
/// Tracks error count and backoff calculator for progressive retries
#[derive(Debug, Clone)]
pub struct BackoffState {
    pub backoff: ExponentialBackoff,
    pub error_count: u32,
}

impl BackoffState {
    pub fn new(start_secs: u64, max_secs: u64) -> Self {
        Self {
            backoff: ExponentialBackoff::new(start_secs, max_secs),
            error_count: 0,
        }
    }

    pub fn increment_error(&mut self) {
        self.error_count = self.error_count.saturating_add(1);
    }

    pub fn reset(&mut self) {
        self.error_count = 0;
        self.backoff.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponential_backoff_sequence() {
        let mut backoff = ExponentialBackoff::new(5, 300);

        assert_eq!(backoff.next_backoff_seconds(), 5);
        assert_eq!(backoff.next_backoff_seconds(), 10);
        assert_eq!(backoff.next_backoff_seconds(), 20);
        assert_eq!(backoff.next_backoff_seconds(), 40);
        assert_eq!(backoff.next_backoff_seconds(), 80);
        assert_eq!(backoff.next_backoff_seconds(), 160);
        assert_eq!(backoff.next_backoff_seconds(), 300);
        assert_eq!(backoff.next_backoff_seconds(), 300);
    }

    #[test]
    fn test_exponential_backoff_reset() {
        let mut backoff = ExponentialBackoff::new(5, 300);
        backoff.next_backoff_seconds();
        backoff.next_backoff_seconds();
        backoff.next_backoff_seconds();

        backoff.reset();

        assert_eq!(backoff.next_backoff(), Duration::from_secs(5));
        assert_eq!(backoff.next_backoff(), Duration::from_secs(10));
    }

    #[test]
    fn test_zero_start_is_raised() {
        let mut backoff = ExponentialBackoff::new(0, 0);
        assert_eq!(backoff.next_backoff_seconds(), 1);
        assert_eq!(backoff.next_backoff_seconds(), 1);
    }

    #[test]
    fn test_backoff_state_per_resource() {
        let mut first = BackoffState::new(5, 300);
        let mut second = BackoffState::new(5, 300);

        first.increment_error();
        assert_eq!(first.backoff.next_backoff_seconds(), 5);
        first.increment_error();
        assert_eq!(first.backoff.next_backoff_seconds(), 10);

        second.increment_error();
        assert_eq!(second.backoff.next_backoff_seconds(), 5);

        first.reset();
        assert_eq!(first.error_count, 0);
        assert_eq!(first.backoff.next_backoff_seconds(), 5);
        assert_eq!(second.backoff.next_backoff_seconds(), 10);
    }
}
