//! Circuit breaker for database protection.
//!
//! # States
//! - Closed: normal operation, calls pass through
//! - Open: database assumed down, calls fail fast
//! - Half-Open: one probe call tests whether it recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: consecutive infra failures >= failure_threshold
//! Open → Half-Open: first call after open_duration (becomes the probe)
//! Half-Open → Closed: probe succeeds
//! Half-Open → Open: probe fails (open timer restarts)
//! ```
//!
//! # Design Decisions
//! - One breaker per resource, owned by the registry and injected
//! - All state behind one mutex; the query itself runs outside it
//! - Fail fast in Open state, without touching the pool
//! - Single probe in Half-Open; later callers are rejected as if Open
//! - A success while Closed fully resets the failure count. There is no
//!   sliding window, so a resource alternating failure and success never
//!   trips. Recovery speed is preferred over sensitivity here.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

use crate::config::BreakerConfig;
use crate::observability::metrics;

/// Circuit state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

/// Breaker thresholds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakerSettings {
    pub failure_threshold: u32,
    pub open_duration: Duration,
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            open_duration: Duration::from_secs(30),
        }
    }
}

impl From<&BreakerConfig> for BreakerSettings {
    fn from(config: &BreakerConfig) -> Self {
        Self {
            failure_threshold: config.failure_threshold.max(1),
            open_duration: Duration::from_millis(config.open_duration_ms),
        }
    }
}

/// Rejection returned while the circuit is open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejected {
    pub resource: String,
    /// Time until a probe may be attempted; zero while a probe is in flight.
    pub retry_after: Duration,
}

#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    consecutive_failures: u32,
    last_transition_at: Instant,
    half_open_probe_in_flight: bool,
    times_opened: u64,
    rejected_calls: u64,
}

/// Point-in-time view of a breaker, for health checks and operators.
#[derive(Debug, Clone, Serialize)]
pub struct BreakerSnapshot {
    pub resource: String,
    pub state: CircuitState,
    pub consecutive_failures: u32,
    pub failure_threshold: u32,
    pub last_transition_ago_ms: u64,
    pub half_open_probe_in_flight: bool,
    pub times_opened: u64,
    pub rejected_calls: u64,
}

/// Per-resource circuit breaker.
#[derive(Debug)]
pub struct CircuitBreaker {
    resource: String,
    settings: BreakerSettings,
    state: Mutex<BreakerState>,
}

impl CircuitBreaker {
    pub fn new(resource: impl Into<String>, settings: BreakerSettings) -> Self {
        Self {
            resource: resource.into(),
            settings,
            state: Mutex::new(BreakerState {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                last_transition_at: Instant::now(),
                half_open_probe_in_flight: false,
                times_opened: 0,
                rejected_calls: 0,
            }),
        }
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn settings(&self) -> &BreakerSettings {
        &self.settings
    }

    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.lock().consecutive_failures
    }

    fn lock(&self) -> MutexGuard<'_, BreakerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Ask permission for one call.
    ///
    /// The returned permit must be settled with the call's infra outcome;
    /// dropping it unsettled only frees the probe slot.
    pub fn try_acquire(&self) -> Result<CallPermit<'_>, Rejected> {
        let mut s = self.lock();
        let current = s.state;
        match current {
            CircuitState::Closed => Ok(CallPermit::new(self, false)),
            CircuitState::Open => {
                let elapsed = s.last_transition_at.elapsed();
                if elapsed >= self.settings.open_duration {
                    s.state = CircuitState::HalfOpen;
                    s.last_transition_at = Instant::now();
                    s.half_open_probe_in_flight = true;
                    drop(s);
                    tracing::info!(resource = %self.resource, "Circuit half-open, probing");
                    metrics::record_breaker_state(&self.resource, CircuitState::HalfOpen);
                    Ok(CallPermit::new(self, true))
                } else {
                    s.rejected_calls += 1;
                    drop(s);
                    Err(self.rejected(self.settings.open_duration - elapsed))
                }
            }
            CircuitState::HalfOpen => {
                if s.half_open_probe_in_flight {
                    s.rejected_calls += 1;
                    drop(s);
                    Err(self.rejected(Duration::ZERO))
                } else {
                    s.half_open_probe_in_flight = true;
                    Ok(CallPermit::new(self, true))
                }
            }
        }
    }

    fn rejected(&self, retry_after: Duration) -> Rejected {
        tracing::debug!(resource = %self.resource, retry_after = ?retry_after, "Call rejected, circuit open");
        metrics::record_breaker_rejection(&self.resource);
        Rejected {
            resource: self.resource.clone(),
            retry_after,
        }
    }

    fn on_success(&self, probe: bool) {
        let mut s = self.lock();
        if probe {
            s.half_open_probe_in_flight = false;
            if s.state == CircuitState::HalfOpen {
                s.state = CircuitState::Closed;
                s.consecutive_failures = 0;
                s.last_transition_at = Instant::now();
                drop(s);
                tracing::info!(resource = %self.resource, "Circuit closed, probe succeeded");
                metrics::record_breaker_state(&self.resource, CircuitState::Closed);
            }
        } else if s.state == CircuitState::Closed {
            s.consecutive_failures = 0;
        }
    }

    fn on_failure(&self, probe: bool) {
        let mut s = self.lock();
        if probe {
            s.half_open_probe_in_flight = false;
            if s.state != CircuitState::HalfOpen {
                return;
            }
            s.consecutive_failures = s.consecutive_failures.saturating_add(1);
        } else {
            // Late reports from calls admitted before a trip do not move the timer.
            if s.state != CircuitState::Closed {
                return;
            }
            s.consecutive_failures = s.consecutive_failures.saturating_add(1);
            if s.consecutive_failures < self.settings.failure_threshold {
                return;
            }
        }

        let was_probe = s.state == CircuitState::HalfOpen;
        s.state = CircuitState::Open;
        s.last_transition_at = Instant::now();
        s.times_opened += 1;
        let failures = s.consecutive_failures;
        drop(s);

        tracing::warn!(
            resource = %self.resource,
            failures,
            open_for = ?self.settings.open_duration,
            probe_failed = was_probe,
            "Circuit opened"
        );
        metrics::record_breaker_state(&self.resource, CircuitState::Open);
    }

    fn release_probe(&self) {
        self.lock().half_open_probe_in_flight = false;
    }

    /// Force the breaker closed and clear its counters.
    pub fn reset(&self) {
        let mut s = self.lock();
        let previous = s.state;
        s.state = CircuitState::Closed;
        s.consecutive_failures = 0;
        s.half_open_probe_in_flight = false;
        s.last_transition_at = Instant::now();
        drop(s);

        tracing::info!(resource = %self.resource, previous = previous.as_str(), "Circuit manually reset");
        metrics::record_breaker_state(&self.resource, CircuitState::Closed);
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let s = self.lock();
        BreakerSnapshot {
            resource: self.resource.clone(),
            state: s.state,
            consecutive_failures: s.consecutive_failures,
            failure_threshold: self.settings.failure_threshold,
            last_transition_ago_ms: s.last_transition_at.elapsed().as_millis() as u64,
            half_open_probe_in_flight: s.half_open_probe_in_flight,
            times_opened: s.times_opened,
            rejected_calls: s.rejected_calls,
        }
    }
}

/// Permission for one call through the breaker.
#[must_use = "settle the permit with the call's outcome"]
#[derive(Debug)]
pub struct CallPermit<'a> {
    breaker: &'a CircuitBreaker,
    probe: bool,
    settled: bool,
}

impl<'a> CallPermit<'a> {
    fn new(breaker: &'a CircuitBreaker, probe: bool) -> Self {
        Self {
            breaker,
            probe,
            settled: false,
        }
    }

    /// True if this call is the Half-Open probe.
    pub fn is_probe(&self) -> bool {
        self.probe
    }

    pub fn record_success(mut self) {
        self.settled = true;
        self.breaker.on_success(self.probe);
    }

    pub fn record_failure(mut self) {
        self.settled = true;
        self.breaker.on_failure(self.probe);
    }

    /// Settle without an infra verdict (e.g. the statement itself failed).
    pub fn release(self) {}
}

impl Drop for CallPermit<'_> {
    fn drop(&mut self) {
        if !self.settled && self.probe {
            self.breaker.release_probe();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;

    fn breaker(threshold: u32, open_ms: u64) -> CircuitBreaker {
        CircuitBreaker::new(
            "primary",
            BreakerSettings {
                failure_threshold: threshold,
                open_duration: Duration::from_millis(open_ms),
            },
        )
    }

    fn fail(b: &CircuitBreaker) {
        b.try_acquire().unwrap().record_failure();
    }

    #[tokio::test(start_paused = true)]
    async fn test_opens_at_threshold() {
        let b = breaker(5, 30_000);
        for _ in 0..4 {
            fail(&b);
        }
        assert_eq!(b.state(), CircuitState::Closed);
        assert_eq!(b.consecutive_failures(), 4);

        fail(&b);
        assert_eq!(b.state(), CircuitState::Open);

        let rejected = b.try_acquire().unwrap_err();
        assert_eq!(rejected.resource, "primary");
        assert_eq!(rejected.retry_after, Duration::from_secs(30));
        assert_eq!(b.snapshot().rejected_calls, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_resets_count() {
        let b = breaker(3, 30_000);
        fail(&b);
        fail(&b);
        b.try_acquire().unwrap().record_success();
        assert_eq!(b.consecutive_failures(), 0);

        fail(&b);
        fail(&b);
        assert_eq!(b.state(), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_success_closes() {
        let b = breaker(1, 1_000);
        fail(&b);

        tokio::time::advance(Duration::from_millis(999)).await;
        assert!(b.try_acquire().is_err());

        tokio::time::advance(Duration::from_millis(1)).await;
        let probe = b.try_acquire().unwrap();
        assert!(probe.is_probe());
        assert_eq!(b.state(), CircuitState::HalfOpen);
        assert!(b.try_acquire().is_err(), "second caller during probe");

        probe.record_success();
        assert_eq!(b.state(), CircuitState::Closed);
        assert_eq!(b.consecutive_failures(), 0);
        assert!(!b.try_acquire().unwrap().is_probe());
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_failure_restarts_timer() {
        let b = breaker(1, 1_000);
        fail(&b);
        tokio::time::advance(Duration::from_millis(1_000)).await;

        b.try_acquire().unwrap().record_failure();
        assert_eq!(b.state(), CircuitState::Open);
        assert_eq!(b.snapshot().times_opened, 2);

        tokio::time::advance(Duration::from_millis(500)).await;
        let rejected = b.try_acquire().unwrap_err();
        assert_eq!(rejected.retry_after, Duration::from_millis(500));

        tokio::time::advance(Duration::from_millis(500)).await;
        assert!(b.try_acquire().unwrap().is_probe());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_probe_frees_slot() {
        let b = breaker(1, 0);
        fail(&b);

        let probe = b.try_acquire().unwrap();
        assert!(probe.is_probe());
        probe.release();

        assert_eq!(b.state(), CircuitState::HalfOpen);
        let again = b.try_acquire().unwrap();
        assert!(again.is_probe());
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_failure_while_open_ignored() {
        let b = breaker(1, 1_000);
        let early = b.try_acquire().unwrap();
        fail(&b);

        tokio::time::advance(Duration::from_millis(600)).await;
        early.record_failure();
        assert_eq!(b.snapshot().times_opened, 1);

        tokio::time::advance(Duration::from_millis(400)).await;
        assert!(b.try_acquire().is_ok(), "timer must not restart on late report");
    }

    #[test]
    fn test_reset() {
        let b = breaker(1, 60_000);
        fail(&b);
        assert_eq!(b.state(), CircuitState::Open);
        b.reset();
        assert_eq!(b.state(), CircuitState::Closed);
        assert!(b.try_acquire().is_ok());
    }

    #[test]
    fn test_single_probe_under_contention() {
        let b = breaker(1, 0);
        fail(&b);

        let threads = 32;
        let acquired = Barrier::new(threads);
        let results: Vec<bool> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..threads)
                .map(|_| {
                    scope.spawn(|| {
                        let permit = b.try_acquire();
                        let ok = permit.is_ok();
                        // Hold the permit until everyone has tried
                        acquired.wait();
                        drop(permit);
                        ok
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(results.iter().filter(|ok| **ok).count(), 1);
    }

    #[test]
    fn test_single_open_transition_under_contention() {
        let b = breaker(5, 60_000);

        let threads = 32;
        let start = Barrier::new(threads);
        std::thread::scope(|scope| {
            for _ in 0..threads {
                scope.spawn(|| {
                    let permit = b.try_acquire().unwrap();
                    start.wait();
                    permit.record_failure();
                });
            }
        });

        let snapshot = b.snapshot();
        assert_eq!(snapshot.state, CircuitState::Open);
        assert_eq!(snapshot.times_opened, 1);
        assert_eq!(snapshot.consecutive_failures, 5);
    }
}
