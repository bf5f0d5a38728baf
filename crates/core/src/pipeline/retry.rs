use std::time::Duration;

/// Exponential backoff between attempts, capped at `max`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BackoffSchedule {
    pub initial: Duration,
    pub multiplier: u32,
    pub max: Duration,
}

impl Default for BackoffSchedule {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(2),
            multiplier: 2,
            max: Duration::from_secs(30),
        }
    }
}

impl BackoffSchedule {
    /// No waiting at all; used by tests and by callers that pace themselves.
    pub fn immediate() -> Self {
        Self {
            initial: Duration::ZERO,
            multiplier: 1,
            max: Duration::ZERO,
        }
    }

    /// Delay before retry number `retry` (1-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let mut delay = self.initial;
        for _ in 1..retry {
            if delay >= self.max {
                break;
            }
            delay = delay.saturating_mul(self.multiplier);
        }
        delay.min(self.max)
    }
}

/// How often a chunk-local failure is retried before giving up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: BackoffSchedule,
}

impl RetryPolicy {
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Wait before attempt `next` (1-based), or `None` once the attempts are spent.
    pub fn delay_before(&self, next: u32) -> Option<Duration> {
        if next <= 1 || next > self.max_attempts() {
            return None;
        }
        Some(self.backoff.delay_for(next - 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(1, 2)]
    #[case(2, 4)]
    #[case(3, 8)]
    #[case(5, 30)]
    #[case(40, 30)]
    fn test_delay_grows_and_caps(#[case] retry: u32, #[case] seconds: u64) {
        let schedule = BackoffSchedule::default();
        assert_eq!(schedule.delay_for(retry), Duration::from_secs(seconds));
    }

    #[test]
    fn test_max_attempts_counts_first_try() {
        let policy = RetryPolicy {
            max_retries: 2,
            backoff: BackoffSchedule::immediate(),
        };
        assert_eq!(policy.max_attempts(), 3);
    }

    #[test]
    fn test_delay_before_stops_after_last_attempt() {
        let policy = RetryPolicy {
            max_retries: 2,
            backoff: BackoffSchedule::default(),
        };
        assert_eq!(policy.delay_before(1), None);
        assert_eq!(policy.delay_before(2), Some(Duration::from_secs(2)));
        assert_eq!(policy.delay_before(3), Some(Duration::from_secs(4)));
        assert_eq!(policy.delay_before(4), None);
    }

    #[test]
    fn test_no_retries_means_single_attempt() {
        let policy = RetryPolicy {
            max_retries: 0,
            backoff: BackoffSchedule::immediate(),
        };
        assert_eq!(policy.max_attempts(), 1);
        assert_eq!(policy.delay_before(2), None);
    }
}
