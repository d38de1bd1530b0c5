//! Health check aggregation.
//!
//! # Responsibilities
//! - Run every registered probe concurrently under a per-probe ceiling
//! - Fold probe records and the pool band into one status document
//! - Answer liveness (process only) and readiness (dependencies) questions
//!
//! # Design Decisions
//! - A probe that overruns its ceiling is reported unhealthy, it never
//!   holds up the other probes or the response
//! - Liveness never touches dependencies, so a database outage does not
//!   get the process restarted
//! - Check names are unique: a probe whose name is taken (or reserved for
//!   the pool record) is registered under a numbered suffix

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use serde::Serialize;
use tokio::time::Instant;

use crate::health::probe::{pool_record, HealthProbe, POOL_CHECK};
use crate::health::status::{HealthCheckRecord, StatusResponse};
use crate::observability::metrics;
use crate::pool::PoolHealthMonitor;
use crate::resilience::timeouts::{with_deadline, Deadline};

/// Liveness answer.
#[derive(Debug, Clone, Serialize)]
pub struct Liveness {
    pub status: &'static str,
    pub uptime: u64,
}

/// Readiness answer, with the document it was derived from.
#[derive(Debug, Clone, Serialize)]
pub struct Readiness {
    pub ready: bool,
    pub status: &'static str,
    #[serde(flatten)]
    pub detail: StatusResponse,
}

impl Readiness {
    pub fn from_status(detail: StatusResponse) -> Self {
        let ready = detail.is_ready();
        Self {
            ready,
            status: if ready { "ready" } else { "not ready" },
            detail,
        }
    }
}

struct Registered {
    name: String,
    probe: Arc<dyn HealthProbe>,
}

pub struct HealthAggregator {
    probes: Vec<Registered>,
    pool_monitor: Option<Arc<PoolHealthMonitor>>,
    started_at: Instant,
}

impl HealthAggregator {
    pub fn new(probes: Vec<Arc<dyn HealthProbe>>, pool_monitor: Option<Arc<PoolHealthMonitor>>) -> Self {
        let mut taken: HashSet<String> = HashSet::from([POOL_CHECK.to_string()]);
        let probes = probes
            .into_iter()
            .map(|probe| {
                let name = unique_name(probe.name(), &mut taken);
                if name != probe.name() {
                    tracing::warn!(probe = probe.name(), registered_as = %name, "Duplicate health check name");
                }
                Registered { name, probe }
            })
            .collect();

        Self {
            probes,
            pool_monitor,
            started_at: Instant::now(),
        }
    }

    /// Names the probes report under, in registration order.
    pub fn check_names(&self) -> impl Iterator<Item = &str> {
        self.probes.iter().map(|r| r.name.as_str())
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Run every probe, each bounded by `per_probe_timeout`.
    pub async fn run_all(&self, per_probe_timeout: Duration) -> StatusResponse {
        let checks = self
            .probes
            .iter()
            .map(|r| run_probe(&r.name, r.probe.as_ref(), per_probe_timeout));
        let mut records = join_all(checks).await;

        if let Some(monitor) = &self.pool_monitor {
            records.push(pool_record(&monitor.snapshot()));
        }

        for record in &records {
            metrics::record_health_check(
                &record.name,
                record.status,
                Duration::from_millis(record.response_time_ms),
            );
        }

        StatusResponse::from_records(records, self.uptime())
    }

    pub fn liveness(&self) -> Liveness {
        Liveness {
            status: "alive",
            uptime: self.uptime().as_secs(),
        }
    }

    pub async fn readiness(&self, per_probe_timeout: Duration) -> Readiness {
        Readiness::from_status(self.run_all(per_probe_timeout).await)
    }
}

fn unique_name(name: &str, taken: &mut HashSet<String>) -> String {
    let mut candidate = name.to_string();
    let mut n = 2;
    while taken.contains(&candidate) {
        candidate = format!("{}_{}", name, n);
        n += 1;
    }
    taken.insert(candidate.clone());
    candidate
}

async fn run_probe(name: &str, probe: &dyn HealthProbe, limit: Duration) -> HealthCheckRecord {
    match with_deadline(limit, probe.check()).await {
        Deadline::Completed { output, elapsed } => {
            let mut record = output.with_response_time(elapsed);
            record.name = name.to_string();
            record
        }
        Deadline::TimedOut { elapsed } => {
            tracing::warn!(probe = name, limit_ms = limit.as_millis() as u64, "Health probe timed out");
            HealthCheckRecord::unhealthy(name, format!("no response within {}ms", limit.as_millis()))
                .with_response_time(elapsed)
        }
    }
}
