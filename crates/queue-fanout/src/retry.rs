//! # Retry Policy Module
//!
//! Exponential backoff used by [`crate::StandardQueueClient`] around a
//! provider's publish primitive.
//!
//! The defaults give three attempts in total, sleeping `100ms * 2^k` after
//! failed attempt `k` (200ms, then 400ms). There is no jitter.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Total publish attempts, including the first one
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Base of the backoff formula
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_millis(100);

/// Growth factor of the backoff formula
pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;

/// Upper bound for a single backoff sleep
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(10);

/// Retry policy configuration for exponential backoff
///
/// # Examples
///
/// ```rust
/// use queue_fanout::RetryPolicy;
/// use std::time::Duration;
///
/// let policy = RetryPolicy::default();
/// assert_eq!(policy.max_attempts, 3);
/// assert_eq!(policy.calculate_delay(1), Duration::from_millis(200));
/// assert_eq!(policy.calculate_delay(2), Duration::from_millis(400));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total number of attempts (initial attempt included)
    pub max_attempts: u32,

    /// Base delay of the backoff formula
    pub initial_delay: Duration,

    /// Maximum delay between attempts
    pub max_delay: Duration,

    /// Exponential backoff multiplier
    pub backoff_multiplier: f64,

    /// Deadline for a single attempt; `None` waits indefinitely
    pub attempt_timeout: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_delay: DEFAULT_INITIAL_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            attempt_timeout: None,
        }
    }
}

impl RetryPolicy {
    /// Create a new retry policy
    ///
    /// # Arguments
    ///
    /// * `max_attempts` - Total attempts, including the first
    /// * `initial_delay` - Base delay of the backoff formula
    /// * `max_delay` - Maximum delay cap
    /// * `backoff_multiplier` - Exponential growth factor
    pub fn new(
        max_attempts: u32,
        initial_delay: Duration,
        max_delay: Duration,
        backoff_multiplier: f64,
    ) -> Self {
        Self {
            max_attempts,
            initial_delay,
            max_delay,
            backoff_multiplier,
            attempt_timeout: None,
        }
    }

    /// Policy that retries without sleeping between attempts
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO, Duration::ZERO, 1.0)
    }

    /// Bound every attempt by `timeout`
    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = Some(timeout);
        self
    }

    /// Calculate the sleep after failed attempt number `attempt` (1-based)
    ///
    /// Uses exponential backoff formula: delay = initial * multiplier^attempt
    ///
    /// # Examples
    ///
    /// ```rust
    /// use queue_fanout::RetryPolicy;
    /// use std::time::Duration;
    ///
    /// let policy = RetryPolicy::new(5, Duration::from_millis(100), Duration::from_secs(1), 2.0);
    /// assert_eq!(policy.calculate_delay(3), Duration::from_millis(800));
    /// assert_eq!(policy.calculate_delay(4), Duration::from_secs(1));
    /// ```
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let base_delay_secs =
            self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(attempt as i32);

        let capped_delay_secs = base_delay_secs.min(self.max_delay.as_secs_f64());

        Duration::from_secs_f64(capped_delay_secs.max(0.0))
    }

    /// Check whether another attempt is allowed after `attempts_made` attempts
    pub fn should_retry(&self, attempts_made: u32) -> bool {
        attempts_made < self.max_attempts
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
