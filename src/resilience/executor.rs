//! Query executor.
//!
//! # Data Flow
//! ```text
//! execute(profile, unit_of_work)
//!     → profiles.rs (resolve timeout + retry policy)
//!     → retries.rs (decorates the single attempt below)
//!         → circuit_breaker.rs (permit or CircuitOpen, no timer started)
//!         → timeouts.rs (race unit of work against profile timeout)
//!         → classify outcome, settle permit
//!     → ExecutionOutcome / ExecuteError
//! ```
//!
//! Only `Timeout` and `ConnectionFailure` are reported to the breaker and
//! retried. `QueryFailure` is the caller's problem and surfaces on first
//! occurrence; `CircuitOpen` is never retried.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::observability::metrics;
use crate::resilience::circuit_breaker::{CircuitBreaker, Rejected};
use crate::resilience::error::{
    Classify, ErrorKind, ExecuteError, ExecutionOutcome, FailureClass,
};
use crate::resilience::profiles::ProfileRegistry;
use crate::resilience::retries::{retry, RetryPolicy, Retryable};
use crate::resilience::timeouts::{with_deadline, Deadline};

/// A successful call and how it went.
#[derive(Debug)]
pub struct Executed<T> {
    pub value: T,
    pub outcome: ExecutionOutcome,
}

impl<T> Executed<T> {
    pub fn into_value(self) -> T {
        self.value
    }
}

/// Failure of a single attempt, before retry decisions.
#[derive(Debug)]
enum AttemptFailure<E> {
    Rejected(Rejected),
    TimedOut,
    Connection(E),
    Query(E),
}

impl<E> AttemptFailure<E> {
    fn kind(&self) -> ErrorKind {
        match self {
            AttemptFailure::Rejected(_) => ErrorKind::CircuitOpen,
            AttemptFailure::TimedOut => ErrorKind::Timeout,
            AttemptFailure::Connection(_) => ErrorKind::ConnectionFailure,
            AttemptFailure::Query(_) => ErrorKind::QueryFailure,
        }
    }
}

impl<E> Retryable for AttemptFailure<E> {
    fn is_retryable(&self) -> bool {
        self.kind().is_infra()
    }
}

impl<E: fmt::Display> fmt::Display for AttemptFailure<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptFailure::Rejected(r) => write!(f, "circuit open for '{}'", r.resource),
            AttemptFailure::TimedOut => f.write_str("timed out"),
            AttemptFailure::Connection(e) | AttemptFailure::Query(e) => write!(f, "{}", e),
        }
    }
}

/// Runs units of work against one breaker-protected resource.
#[derive(Debug, Clone)]
pub struct QueryExecutor {
    profiles: Arc<ProfileRegistry>,
    breaker: Arc<CircuitBreaker>,
    jitter_ratio: f64,
}

impl QueryExecutor {
    pub fn new(profiles: Arc<ProfileRegistry>, breaker: Arc<CircuitBreaker>) -> Self {
        Self {
            profiles,
            breaker,
            jitter_ratio: 0.0,
        }
    }

    /// Add up to `ratio` of each backoff delay as random jitter.
    pub fn with_jitter(mut self, ratio: f64) -> Self {
        self.jitter_ratio = ratio.clamp(0.0, 1.0);
        self
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    pub fn profiles(&self) -> &ProfileRegistry {
        &self.profiles
    }

    /// Run `unit_of_work` under the named profile.
    ///
    /// The closure is called once per attempt. When the profile timeout
    /// fires, the in-flight future is dropped and its result discarded.
    pub async fn execute<T, E, F, Fut>(
        &self,
        profile_name: &str,
        unit_of_work: F,
    ) -> Result<Executed<T>, ExecuteError<E>>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Classify + fmt::Display,
    {
        let profile = self.profiles.resolve(profile_name)?;
        let policy = RetryPolicy::for_profile(profile, self.jitter_ratio);
        let timeout = profile.timeout();

        let start = Instant::now();
        let reached = AtomicU32::new(0);
        let unit_of_work = &unit_of_work;
        let reached_ref = &reached;

        let retried = retry(&policy, move |_| self.attempt(timeout, unit_of_work, reached_ref)).await;

        let attempts = reached.load(Ordering::Relaxed);
        let elapsed = start.elapsed();

        match retried.result {
            Ok(value) => {
                let outcome = ExecutionOutcome::success(attempts, elapsed);
                if attempts > 1 {
                    tracing::info!(
                        profile = %profile.name,
                        attempts,
                        elapsed_ms = outcome.elapsed_ms,
                        "Query succeeded after retry"
                    );
                }
                metrics::record_query(&profile.name, "success", attempts, elapsed);
                Ok(Executed { value, outcome })
            }
            Err(failure) => {
                let kind = failure.kind();
                if kind == ErrorKind::QueryFailure {
                    tracing::debug!(profile = %profile.name, error = %failure, "Query failed");
                } else {
                    tracing::warn!(
                        profile = %profile.name,
                        kind = %kind,
                        attempts,
                        elapsed_ms = elapsed.as_millis() as u64,
                        error = %failure,
                        "Query gave up"
                    );
                }
                metrics::record_query(&profile.name, kind.as_str(), attempts, elapsed);
                Err(Self::surface(failure, timeout, attempts, elapsed))
            }
        }
    }

    async fn attempt<T, E, F, Fut>(
        &self,
        timeout: Duration,
        unit_of_work: &F,
        reached: &AtomicU32,
    ) -> Result<T, AttemptFailure<E>>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Classify,
    {
        let permit = self.breaker.try_acquire().map_err(AttemptFailure::Rejected)?;
        reached.fetch_add(1, Ordering::Relaxed);

        match with_deadline(timeout, unit_of_work()).await {
            Deadline::Completed { output: Ok(value), .. } => {
                permit.record_success();
                Ok(value)
            }
            Deadline::Completed { output: Err(e), .. } => match e.failure_class() {
                FailureClass::Connection => {
                    permit.record_failure();
                    Err(AttemptFailure::Connection(e))
                }
                FailureClass::Query => {
                    permit.release();
                    Err(AttemptFailure::Query(e))
                }
            },
            Deadline::TimedOut { .. } => {
                permit.record_failure();
                Err(AttemptFailure::TimedOut)
            }
        }
    }

    fn surface<E>(
        failure: AttemptFailure<E>,
        timeout: Duration,
        attempts: u32,
        elapsed: Duration,
    ) -> ExecuteError<E> {
        match failure {
            AttemptFailure::Rejected(r) => ExecuteError::CircuitOpen {
                resource: r.resource,
                attempts,
                elapsed,
            },
            AttemptFailure::TimedOut => ExecuteError::Timeout {
                timeout,
                attempts,
                elapsed,
            },
            AttemptFailure::Connection(source) => ExecuteError::ConnectionFailure {
                source,
                attempts,
                elapsed,
            },
            AttemptFailure::Query(source) => ExecuteError::QueryFailure {
                source,
                attempts,
                elapsed,
            },
        }
    }
}
