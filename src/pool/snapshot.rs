//! Pool utilization snapshot and classification.

use serde::Serialize;

/// Utilization above this percentage is Warning.
pub const WARNING_PERCENT: u64 = 70;
/// Utilization above this percentage is Critical.
pub const CRITICAL_PERCENT: u64 = 90;

/// Raw counters read from the underlying pool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolCounters {
    pub total_connections: u32,
    pub idle_connections: u32,
    pub waiting_requests: u32,
    pub max_connections: u32,
    pub min_connections: u32,
}

/// Utilization band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolBand {
    Healthy,
    Warning,
    Critical,
}

impl PoolBand {
    /// Band for `active` out of `max`; thresholds compare exactly, without floats.
    pub fn classify(active: u32, max: u32) -> Self {
        let active = u64::from(active) * 100;
        let max = u64::from(max);
        if active > max * CRITICAL_PERCENT {
            PoolBand::Critical
        } else if active > max * WARNING_PERCENT {
            PoolBand::Warning
        } else {
            PoolBand::Healthy
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PoolBand::Healthy => "healthy",
            PoolBand::Warning => "warning",
            PoolBand::Critical => "critical",
        }
    }
}

/// Point-in-time read of the pool. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoolSnapshot {
    pub total_connections: u32,
    pub idle_connections: u32,
    pub waiting_requests: u32,
    pub active_connections: u32,
    pub max_connections: u32,
    pub min_connections: u32,
    pub utilization_percent: f64,
    pub band: PoolBand,
}

impl PoolSnapshot {
    pub fn from_counters(c: PoolCounters) -> Self {
        let active = c.total_connections.saturating_sub(c.idle_connections);
        let utilization_percent = if c.max_connections == 0 {
            0.0
        } else {
            f64::from(active) * 100.0 / f64::from(c.max_connections)
        };

        Self {
            total_connections: c.total_connections,
            idle_connections: c.idle_connections,
            waiting_requests: c.waiting_requests,
            active_connections: active,
            max_connections: c.max_connections,
            min_connections: c.min_connections,
            utilization_percent,
            band: PoolBand::classify(active, c.max_connections),
        }
    }

    /// Any queued acquirer signals saturation risk, whatever the band.
    pub fn is_queuing(&self) -> bool {
        self.waiting_requests > 0
    }
}
