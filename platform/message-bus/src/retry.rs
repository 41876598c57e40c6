//! Exponential backoff policy for the delivery loop's retry path

use std::time::Duration;

/// How the delivery loop retries a handler that reported a transient failure
///
/// After `max_attempts` the envelope is dead-lettered instead of retried.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of handler attempts per envelope
    pub max_attempts: u32,
    /// Initial backoff duration (doubles on each retry)
    pub initial_backoff: Duration,
    /// Cap on exponential backoff growth
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Backoff to sleep after attempt `attempt` (1-based)
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let mut backoff = self.initial_backoff;
        for _ in 1..attempt {
            backoff = std::cmp::min(backoff * 2, self.max_backoff);
            if backoff == self.max_backoff {
                break;
            }
        }
        backoff
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 10,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_millis(350),
        };

        assert_eq!(policy.backoff_for(1), Duration::from_millis(100));
        assert_eq!(policy.backoff_for(2), Duration::from_millis(200));
        assert_eq!(policy.backoff_for(3), Duration::from_millis(350));
        assert_eq!(policy.backoff_for(4), Duration::from_millis(350));
    }
}
