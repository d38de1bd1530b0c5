//! Background health checking.
//!
//! # Responsibilities
//! - Periodically run the aggregator's probes
//! - Cache the latest status document for cheap reads
//! - Log overall status transitions

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use tokio::sync::broadcast;
use tokio::time;

use crate::health::aggregator::HealthAggregator;
use crate::health::status::{HealthStatus, StatusResponse};

pub struct HealthMonitor {
    aggregator: Arc<HealthAggregator>,
    interval: Duration,
    probe_timeout: Duration,
    latest: ArcSwapOption<StatusResponse>,
}

impl HealthMonitor {
    pub fn new(aggregator: Arc<HealthAggregator>, interval: Duration, probe_timeout: Duration) -> Self {
        Self {
            aggregator,
            interval,
            probe_timeout,
            latest: ArcSwapOption::empty(),
        }
    }

    /// Most recent background result, `None` before the first round.
    pub fn latest(&self) -> Option<Arc<StatusResponse>> {
        self.latest.load_full()
    }

    pub async fn run(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            interval = ?self.interval,
            probes = self.aggregator.check_names().count(),
            "Health monitor starting"
        );

        let mut ticker = time::interval(self.interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.check_all().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Health monitor received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Run one round and publish it.
    pub async fn check_all(&self) -> Arc<StatusResponse> {
        let status = Arc::new(self.aggregator.run_all(self.probe_timeout).await);
        let previous = self.latest.swap(Some(Arc::clone(&status)));

        let before = previous.map(|p| p.overall_status);
        if before != Some(status.overall_status) {
            let failing: Vec<&str> = status
                .checks
                .values()
                .filter(|r| r.status != HealthStatus::Healthy)
                .map(|r| r.name.as_str())
                .collect();
            match status.overall_status {
                HealthStatus::Healthy => tracing::info!(
                    previous = before.map(HealthStatus::as_str),
                    "Overall health is healthy"
                ),
                current => tracing::warn!(
                    previous = before.map(HealthStatus::as_str),
                    current = current.as_str(),
                    failing = ?failing,
                    "Overall health changed"
                ),
            }
        }

        status
    }
}
