//! Bounded retry for transient fetch failures.
//!
//! Only [`FetchError`]s that report themselves retryable are repeated.
//! Empty results and validation failures never reach this policy.

use std::time::Duration;

use crate::FetchError;

/// Delay schedule between attempts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    Fixed {
        delay: Duration,
    },
    /// `base * factor^attempt`, capped at `max`, optionally jittered by +/- 50%.
    Exponential {
        base: Duration,
        factor: f64,
        max: Duration,
        jitter: bool,
    },
}

impl Default for Backoff {
    fn default() -> Self {
        Self::Exponential {
            base: Duration::from_millis(250),
            factor: 2.0,
            max: Duration::from_secs(2),
            jitter: true,
        }
    }
}

impl Backoff {
    /// Delay before retry number `attempt` (0-based).
    pub fn delay(self, attempt: u32) -> Duration {
        match self {
            Self::Fixed { delay } => delay,
            Self::Exponential {
                base,
                factor,
                max,
                jitter,
            } => {
                let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
                let seconds = (base.as_secs_f64() * factor.powi(exponent)).min(max.as_secs_f64());
                let capped = Duration::from_secs_f64(seconds);

                if !jitter {
                    return capped;
                }

                let millis = u64::try_from(capped.as_millis()).unwrap_or(u64::MAX);
                let spread = millis / 2;
                let low = millis - spread;
                Duration::from_millis(fastrand::u64(low..=millis.saturating_add(spread)))
            }
        }
    }
}

/// How many times, and how far apart, a failed fetch is repeated.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt. Total attempts = `max_retries + 1`.
    pub max_retries: u32,
    pub backoff: Backoff,
    pub retry_on_timeout: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            backoff: Backoff::default(),
            retry_on_timeout: true,
        }
    }
}

impl RetryPolicy {
    pub fn exponential(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    pub fn fixed(delay: Duration, max_retries: u32) -> Self {
        Self {
            max_retries,
            backoff: Backoff::Fixed { delay },
            ..Self::default()
        }
    }

    /// Single attempt, no retries.
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Whether a failure on attempt `attempt` (0-based) should be repeated.
    pub fn should_retry(&self, error: &FetchError, attempt: u32) -> bool {
        if attempt >= self.max_retries {
            return false;
        }
        match error {
            FetchError::Timeout { .. } => self.retry_on_timeout,
            FetchError::Source(source) => source.retryable(),
        }
    }

    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.backoff.delay(attempt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SourceError;

    #[test]
    fn exponential_backoff_doubles_until_cap() {
        let backoff = Backoff::Exponential {
            base: Duration::from_millis(100),
            factor: 2.0,
            max: Duration::from_millis(500),
            jitter: false,
        };

        assert_eq!(backoff.delay(0), Duration::from_millis(100));
        assert_eq!(backoff.delay(1), Duration::from_millis(200));
        assert_eq!(backoff.delay(2), Duration::from_millis(400));
        assert_eq!(backoff.delay(3), Duration::from_millis(500));
    }

    #[test]
    fn jitter_stays_within_half_of_delay() {
        let backoff = Backoff::Exponential {
            base: Duration::from_millis(200),
            factor: 2.0,
            max: Duration::from_secs(1),
            jitter: true,
        };

        for _ in 0..20 {
            let delay = backoff.delay(1).as_millis();
            assert!((200..=600).contains(&delay), "delay_ms={delay}");
        }
    }

    #[test]
    fn retries_only_retryable_errors_within_budget() {
        let policy = RetryPolicy::fixed(Duration::from_millis(1), 2);
        let transient = FetchError::Source(SourceError::unavailable("connection reset"));
        let permanent = FetchError::Source(SourceError::not_found("unknown ticker"));

        assert!(policy.should_retry(&transient, 0));
        assert!(policy.should_retry(&transient, 1));
        assert!(!policy.should_retry(&transient, 2));
        assert!(!policy.should_retry(&permanent, 0));
    }

    #[test]
    fn timeout_retry_can_be_disabled() {
        let timeout = FetchError::Timeout {
            after: Duration::from_secs(1),
        };
        let mut policy = RetryPolicy::exponential(3);
        assert!(policy.should_retry(&timeout, 0));

        policy.retry_on_timeout = false;
        assert!(!policy.should_retry(&timeout, 0));
    }

    #[test]
    fn no_retry_makes_a_single_attempt() {
        let policy = RetryPolicy::no_retry();
        let transient = FetchError::Source(SourceError::rate_limited("429"));
        assert!(!policy.should_retry(&transient, 0));
    }
}
