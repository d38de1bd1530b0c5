//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define resilience metrics (queries, breaker, pool, health)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `db_queries_total` (counter): calls by profile and outcome
//! - `db_query_duration_seconds` (histogram): wall time including retries
//! - `db_query_attempts` (histogram): attempts per call
//! - `db_query_retries_total` (counter): extra attempts
//! - `db_circuit_breaker_state` (gauge): 0=closed, 1=half-open, 2=open
//! - `db_circuit_breaker_rejections_total` (counter)
//! - `db_pool_connections` (gauge): by kind (total, idle, active, waiting, max)
//! - `db_pool_utilization_percent` (gauge)
//! - `db_health_check_status` (gauge): 0=healthy, 1=unknown, 2=warning, 3=unhealthy
//! - `db_health_check_duration_seconds` (histogram)
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed, so tests need no setup
//! - Labels are low-cardinality: profile, resource, check name

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::health::status::HealthStatus;
use crate::pool::snapshot::PoolSnapshot;
use crate::resilience::circuit_breaker::CircuitState;

/// Install the Prometheus recorder and its HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => {
            describe();
            tracing::info!(address = %addr, "Metrics endpoint listening");
        }
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

fn describe() {
    metrics::describe_counter!("db_queries_total", "Query executor calls by profile and outcome");
    metrics::describe_histogram!(
        "db_query_duration_seconds",
        metrics::Unit::Seconds,
        "Wall time of executor calls including retries"
    );
    metrics::describe_histogram!("db_query_attempts", "Attempts per executor call");
    metrics::describe_counter!("db_query_retries_total", "Attempts beyond the first");
    metrics::describe_gauge!("db_circuit_breaker_state", "0=closed, 1=half-open, 2=open");
    metrics::describe_counter!(
        "db_circuit_breaker_rejections_total",
        "Calls rejected without touching the database"
    );
    metrics::describe_gauge!("db_pool_connections", "Pool connections by kind");
    metrics::describe_gauge!("db_pool_utilization_percent", "Active over max connections");
    metrics::describe_gauge!(
        "db_health_check_status",
        "0=healthy, 1=unknown, 2=warning, 3=unhealthy"
    );
    metrics::describe_histogram!(
        "db_health_check_duration_seconds",
        metrics::Unit::Seconds,
        "Health probe response time"
    );
}

pub fn record_query(profile: &str, outcome: &'static str, attempts: u32, elapsed: Duration) {
    let profile = profile.to_string();
    metrics::counter!("db_queries_total", "profile" => profile.clone(), "outcome" => outcome)
        .increment(1);
    metrics::histogram!("db_query_duration_seconds", "profile" => profile.clone())
        .record(elapsed.as_secs_f64());
    metrics::histogram!("db_query_attempts", "profile" => profile.clone()).record(f64::from(attempts));
    if attempts > 1 {
        metrics::counter!("db_query_retries_total", "profile" => profile)
            .increment(u64::from(attempts - 1));
    }
}

pub fn record_breaker_state(resource: &str, state: CircuitState) {
    let value = match state {
        CircuitState::Closed => 0.0,
        CircuitState::HalfOpen => 1.0,
        CircuitState::Open => 2.0,
    };
    metrics::gauge!("db_circuit_breaker_state", "resource" => resource.to_string()).set(value);
}

pub fn record_breaker_rejection(resource: &str) {
    metrics::counter!("db_circuit_breaker_rejections_total", "resource" => resource.to_string())
        .increment(1);
}

pub fn record_pool_snapshot(snapshot: &PoolSnapshot) {
    let kinds = [
        ("total", snapshot.total_connections),
        ("idle", snapshot.idle_connections),
        ("active", snapshot.active_connections),
        ("waiting", snapshot.waiting_requests),
        ("max", snapshot.max_connections),
    ];
    for (kind, value) in kinds {
        metrics::gauge!("db_pool_connections", "kind" => kind).set(f64::from(value));
    }
    metrics::gauge!("db_pool_utilization_percent").set(snapshot.utilization_percent);
}

pub fn record_health_check(check: &str, status: HealthStatus, response_time: Duration) {
    let check = check.to_string();
    metrics::gauge!("db_health_check_status", "check" => check.clone()).set(f64::from(status.severity()));
    metrics::histogram!("db_health_check_duration_seconds", "check" => check)
        .record(response_time.as_secs_f64());
}
