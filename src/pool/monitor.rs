//! Pool health monitoring.
//!
//! # Responsibilities
//! - Read the pool's raw counters on demand (`snapshot`)
//! - Periodically sample, export gauges and log band changes or queuing
//!
//! # Design Decisions
//! - Read-only: never touches pool internals, safe at any frequency
//! - Sampling loop is independent of caller traffic

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time;

use crate::observability::metrics;
use crate::pool::snapshot::{PoolBand, PoolCounters, PoolSnapshot};

/// Source of raw pool counters.
pub trait PoolStats: Send + Sync {
    fn counters(&self) -> PoolCounters;
}

/// Classifies pool utilization for monitoring and health checks.
pub struct PoolHealthMonitor {
    stats: Arc<dyn PoolStats>,
    last_band: AtomicU8,
}

impl PoolHealthMonitor {
    pub fn new(stats: Arc<dyn PoolStats>) -> Self {
        Self {
            stats,
            last_band: AtomicU8::new(PoolBand::Healthy as u8),
        }
    }

    pub fn snapshot(&self) -> PoolSnapshot {
        PoolSnapshot::from_counters(self.stats.counters())
    }

    /// Sample every `interval` until shutdown.
    pub async fn run(self: Arc<Self>, interval: Duration, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(interval = ?interval, "Pool monitor starting");

        let mut ticker = time::interval(interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.sample();
                }
                _ = shutdown.recv() => {
                    tracing::info!("Pool monitor received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Take one sample, record it and log anything noteworthy.
    pub fn sample(&self) -> PoolSnapshot {
        let snapshot = self.snapshot();
        metrics::record_pool_snapshot(&snapshot);

        let previous = self.last_band.swap(snapshot.band as u8, Ordering::Relaxed);
        if previous != snapshot.band as u8 {
            match snapshot.band {
                PoolBand::Healthy => tracing::info!(
                    utilization = snapshot.utilization_percent,
                    active = snapshot.active_connections,
                    max = snapshot.max_connections,
                    "Pool utilization back to healthy"
                ),
                band => tracing::warn!(
                    band = band.as_str(),
                    utilization = snapshot.utilization_percent,
                    active = snapshot.active_connections,
                    max = snapshot.max_connections,
                    "Pool utilization band changed"
                ),
            }
        }

        if snapshot.is_queuing() {
            tracing::warn!(
                waiting = snapshot.waiting_requests,
                band = snapshot.band.as_str(),
                "Requests queued waiting for a pool connection"
            );
        }

        snapshot
    }
}
