//! Health probes.
//!
//! # Responsibilities
//! - Define the probe contract the aggregator runs
//! - Database probe: `SELECT 1` through the query executor
//! - Breaker probe: report circuit state without touching the database
//! - Closure probe: adapter for auxiliary checks owned elsewhere
//!   (object storage, mail relay)

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use crate::health::status::{HealthCheckRecord, HealthStatus};
use crate::pool::{ManagedPool, PoolBand, PoolSnapshot};
use crate::resilience::circuit_breaker::{CircuitBreaker, CircuitState};
use crate::resilience::profiles::QUICK;
use crate::resilience::QueryExecutor;

/// A named check.
///
/// The aggregator fills in the record's name and response time, and
/// enforces its own timeout around `check`.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    fn name(&self) -> &str;

    async fn check(&self) -> HealthCheckRecord;
}

/// Round trip to the database through the executor (`quick` profile).
pub struct DatabaseProbe {
    executor: QueryExecutor,
    pool: Arc<ManagedPool>,
}

impl DatabaseProbe {
    pub fn new(executor: QueryExecutor, pool: Arc<ManagedPool>) -> Self {
        Self { executor, pool }
    }
}

#[async_trait]
impl HealthProbe for DatabaseProbe {
    fn name(&self) -> &str {
        "database"
    }

    async fn check(&self) -> HealthCheckRecord {
        let pool = &*self.pool;
        match self.executor.execute(QUICK, move || pool.ping()).await {
            Ok(executed) => HealthCheckRecord::healthy(self.name(), "database reachable").with_details(json!({
                "attempts": executed.outcome.attempts,
            })),
            Err(e) => HealthCheckRecord::unhealthy(self.name(), e.to_string()).with_details(json!({
                "kind": e.kind(),
            })),
        }
    }
}

/// Reports a breaker's state: Open is unhealthy, Half-Open a warning.
pub struct BreakerProbe {
    name: String,
    breaker: Arc<CircuitBreaker>,
}

impl BreakerProbe {
    pub fn new(breaker: Arc<CircuitBreaker>) -> Self {
        Self {
            name: format!("circuit_breaker:{}", breaker.resource()),
            breaker,
        }
    }
}

#[async_trait]
impl HealthProbe for BreakerProbe {
    fn name(&self) -> &str {
        &self.name
    }

    async fn check(&self) -> HealthCheckRecord {
        let snapshot = self.breaker.snapshot();
        let (status, message) = match snapshot.state {
            CircuitState::Closed => (HealthStatus::Healthy, "circuit closed"),
            CircuitState::HalfOpen => (HealthStatus::Warning, "circuit half-open, probing recovery"),
            CircuitState::Open => (HealthStatus::Unhealthy, "circuit open, calls rejected"),
        };
        let details = serde_json::to_value(&snapshot).unwrap_or_default();
        HealthCheckRecord::new(&self.name, status, message).with_details(details)
    }
}

/// Closure-backed probe: `Ok(message)` is healthy, `Err(message)` unhealthy.
pub struct FnProbe<F> {
    name: String,
    check: F,
}

impl<F, Fut> FnProbe<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<String, String>> + Send,
{
    pub fn new(name: impl Into<String>, check: F) -> Self {
        Self {
            name: name.into(),
            check,
        }
    }
}

#[async_trait]
impl<F, Fut> HealthProbe for FnProbe<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<String, String>> + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn check(&self) -> HealthCheckRecord {
        match (self.check)().await {
            Ok(message) => HealthCheckRecord::healthy(&self.name, message),
            Err(message) => HealthCheckRecord::unhealthy(&self.name, message),
        }
    }
}

/// Name of the pool record in every status document.
pub const POOL_CHECK: &str = "connection_pool";

/// Health record for a pool snapshot. Critical utilization is unhealthy.
pub fn pool_record(snapshot: &PoolSnapshot) -> HealthCheckRecord {
    let status = match snapshot.band {
        PoolBand::Healthy => HealthStatus::Healthy,
        PoolBand::Warning => HealthStatus::Warning,
        PoolBand::Critical => HealthStatus::Unhealthy,
    };

    let mut message = format!(
        "{}/{} connections active ({:.1}%)",
        snapshot.active_connections, snapshot.max_connections, snapshot.utilization_percent
    );
    if snapshot.is_queuing() {
        message.push_str(&format!(", {} request(s) waiting", snapshot.waiting_requests));
    }

    let details = serde_json::to_value(snapshot).unwrap_or_default();
    HealthCheckRecord::new(POOL_CHECK, status, message).with_details(details)
}
