//! Retry decorator.
//!
//! # Responsibilities
//! - Re-run a single-attempt function while its failure is retryable
//! - Sleep a linear backoff between attempts
//! - Stop at the policy's attempt limit
//!
//! # Design Decisions
//! - The attempt function owns breaker checks and timeouts; this module only
//!   decides whether and when to call it again
//! - Whether a failure is retryable is decided by the error type itself

use std::fmt;
use std::future::Future;

use crate::resilience::backoff::calculate_backoff;
use crate::resilience::profiles::TimeoutProfile;

/// Errors that know whether another attempt can help.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub jitter_ratio: f64,
}

impl RetryPolicy {
    pub fn for_profile(profile: &TimeoutProfile, jitter_ratio: f64) -> Self {
        Self {
            max_attempts: profile.effective_attempts(),
            base_delay_ms: profile.backoff_ms,
            jitter_ratio,
        }
    }

    /// Single attempt, never retried.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay_ms: 0,
            jitter_ratio: 0.0,
        }
    }
}

/// Final result and the number of times the attempt function ran.
#[derive(Debug)]
pub struct Retried<T, E> {
    pub result: Result<T, E>,
    pub attempts: u32,
}

/// Run `attempt` (called with the 1-based attempt number) under `policy`.
pub async fn retry<T, E, F, Fut>(policy: &RetryPolicy, mut attempt: F) -> Retried<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + fmt::Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempts = 0;

    loop {
        attempts += 1;
        match attempt(attempts).await {
            Ok(value) => {
                return Retried {
                    result: Ok(value),
                    attempts,
                }
            }
            Err(e) if attempts < max_attempts && e.is_retryable() => {
                let delay = calculate_backoff(attempts, policy.base_delay_ms, policy.jitter_ratio);
                tracing::info!(attempt = attempts, delay = ?delay, error = %e, "Retrying after failure");
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                return Retried {
                    result: Err(e),
                    attempts,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::Instant;

    #[derive(Debug)]
    enum TestFailure {
        Transient,
        Permanent,
    }

    impl fmt::Display for TestFailure {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{:?}", self)
        }
    }

    impl Retryable for TestFailure {
        fn is_retryable(&self) -> bool {
            matches!(self, TestFailure::Transient)
        }
    }

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay_ms: 100,
            jitter_ratio: 0.0,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_transient_until_success() {
        let start = Instant::now();
        let retried = retry(&policy(3), |n| async move {
            if n < 3 {
                Err(TestFailure::Transient)
            } else {
                Ok(n)
            }
        })
        .await;

        assert_eq!(retried.result.unwrap(), 3);
        assert_eq!(retried.attempts, 3);
        // 100ms after the first attempt, 200ms after the second
        assert_eq!(start.elapsed(), Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_failure_not_retried() {
        let retried: Retried<(), _> =
            retry(&policy(5), |_| async { Err(TestFailure::Permanent) }).await;

        assert!(matches!(retried.result, Err(TestFailure::Permanent)));
        assert_eq!(retried.attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_at_limit() {
        let retried: Retried<(), _> =
            retry(&policy(2), |_| async { Err(TestFailure::Transient) }).await;

        assert!(matches!(retried.result, Err(TestFailure::Transient)));
        assert_eq!(retried.attempts, 2);
    }

    #[tokio::test]
    async fn test_none_policy_runs_once() {
        let retried: Retried<(), _> =
            retry(&RetryPolicy::none(), |_| async { Err(TestFailure::Transient) }).await;
        assert_eq!(retried.attempts, 1);
    }
}
