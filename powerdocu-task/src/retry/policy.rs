//! Retry policy: how many attempts, and how long to wait between them.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Additional attempts made by the pipeline's retryable stages.
pub const DEFAULT_RETRY_COUNT: u32 = 3;

/// Fixed pause between two attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(4);

/// Configuration for retry behavior.
///
/// The delay is constant: every gap between two attempts is the same length,
/// whatever the attempt number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Never zero.
    max_attempts: u32,
    /// Pause between a failed attempt and the next one.
    #[serde(with = "duration_ms")]
    delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_retry_count(DEFAULT_RETRY_COUNT)
    }
}

impl RetryPolicy {
    /// Creates a policy. `max_attempts` of zero is treated as one.
    #[must_use]
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// Creates a policy allowing `retry_count` attempts after the first,
    /// with the default delay.
    #[must_use]
    pub fn from_retry_count(retry_count: u32) -> Self {
        Self::new(retry_count.saturating_add(1), DEFAULT_RETRY_DELAY)
    }

    /// A single attempt, no retries.
    #[must_use]
    pub fn once() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Sets the maximum attempts.
    #[must_use]
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Sets the delay between attempts.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Total attempts, including the first.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Attempts made after the first failure.
    #[must_use]
    pub fn retry_count(&self) -> u32 {
        self.max_attempts().saturating_sub(1)
    }

    /// The pause between attempts.
    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts(), 4);
        assert_eq!(policy.retry_count(), 3);
        assert_eq!(policy.delay(), Duration::from_secs(4));
    }

    #[test]
    fn test_retry_count_zero_is_single_attempt() {
        let policy = RetryPolicy::from_retry_count(0);
        assert_eq!(policy.max_attempts(), 1);
        assert_eq!(policy.retry_count(), 0);
    }

    #[test]
    fn test_zero_attempts_clamped() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts(), 1);
        assert_eq!(RetryPolicy::once().with_max_attempts(0).max_attempts(), 1);
    }

    #[test]
    fn test_builder() {
        let policy = RetryPolicy::once()
            .with_max_attempts(5)
            .with_delay(Duration::from_millis(250));

        assert_eq!(policy.max_attempts(), 5);
        assert_eq!(policy.delay(), Duration::from_millis(250));
    }

    #[test]
    fn test_serialization() {
        let policy = RetryPolicy::new(2, Duration::from_millis(1500));
        let json = serde_json::to_value(policy).unwrap();
        assert_eq!(json, serde_json::json!({"max_attempts": 2, "delay": 1500}));
    }
}
