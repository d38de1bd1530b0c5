//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use db_guard::pool::{PoolCounters, PoolStats};
use db_guard::resilience::{
    BreakerSettings, CircuitBreaker, Classify, FailureClass, ProfileRegistry, QueryExecutor,
};

/// Error type for scripted units of work.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TestError {
    #[error("connection refused")]
    Connection,
    #[error("relation \"members\" does not exist")]
    Query,
}

impl Classify for TestError {
    fn failure_class(&self) -> FailureClass {
        match self {
            TestError::Connection => FailureClass::Connection,
            TestError::Query => FailureClass::Query,
        }
    }
}

/// Executor over built-in profiles and a fresh breaker.
pub fn executor(failure_threshold: u32, open_duration: Duration) -> QueryExecutor {
    let breaker = Arc::new(CircuitBreaker::new(
        "primary_database",
        BreakerSettings {
            failure_threshold,
            open_duration,
        },
    ));
    QueryExecutor::new(Arc::new(ProfileRegistry::builtin()), breaker)
}

/// One scripted call.
#[derive(Debug, Clone, Copy)]
pub enum Step {
    Ok,
    Connection,
    Query,
    /// Sleep, then succeed.
    Slow(Duration),
}

/// Replays `steps` one per call; the last step repeats.
pub struct ScriptedWork {
    steps: Vec<Step>,
    calls: AtomicUsize,
}

impl ScriptedWork {
    pub fn new(steps: Vec<Step>) -> Self {
        assert!(!steps.is_empty());
        Self {
            steps,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn always(step: Step) -> Self {
        Self::new(vec![step])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub async fn run(&self) -> Result<usize, TestError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let step = self.steps[call.min(self.steps.len() - 1)];
        match step {
            Step::Ok => Ok(call),
            Step::Connection => Err(TestError::Connection),
            Step::Query => Err(TestError::Query),
            Step::Slow(d) => {
                tokio::time::sleep(d).await;
                Ok(call)
            }
        }
    }
}

/// Pool counters the test can move.
pub struct FakePool {
    total: AtomicU32,
    idle: AtomicU32,
    waiting: AtomicU32,
    max: u32,
}

impl FakePool {
    pub fn new(max: u32) -> Self {
        Self {
            total: AtomicU32::new(0),
            idle: AtomicU32::new(0),
            waiting: AtomicU32::new(0),
            max,
        }
    }

    pub fn set(&self, total: u32, idle: u32, waiting: u32) {
        self.total.store(total, Ordering::SeqCst);
        self.idle.store(idle, Ordering::SeqCst);
        self.waiting.store(waiting, Ordering::SeqCst);
    }
}

impl PoolStats for FakePool {
    fn counters(&self) -> PoolCounters {
        PoolCounters {
            total_connections: self.total.load(Ordering::SeqCst),
            idle_connections: self.idle.load(Ordering::SeqCst),
            waiting_requests: self.waiting.load(Ordering::SeqCst),
            max_connections: self.max,
            min_connections: 2,
        }
    }
}
