//! Health check records and the aggregated status document.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of one check, or of the whole process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Warning,
    Unhealthy,
    Unknown,
}

impl HealthStatus {
    /// Ordering used to pick the worst status.
    ///
    /// Unknown sits between Healthy and Warning: it cannot confirm health,
    /// but is not evidence of a problem either.
    pub fn severity(self) -> u8 {
        match self {
            HealthStatus::Healthy => 0,
            HealthStatus::Unknown => 1,
            HealthStatus::Warning => 2,
            HealthStatus::Unhealthy => 3,
        }
    }

    pub fn worst(self, other: Self) -> Self {
        if other.severity() > self.severity() {
            other
        } else {
            self
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Warning => "warning",
            HealthStatus::Unhealthy => "unhealthy",
            HealthStatus::Unknown => "unknown",
        }
    }
}

/// Result of one probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheckRecord {
    pub name: String,
    pub status: HealthStatus,
    pub message: String,
    pub response_time_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl HealthCheckRecord {
    pub fn new(name: impl Into<String>, status: HealthStatus, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status,
            message: message.into(),
            response_time_ms: 0,
            details: None,
        }
    }

    pub fn healthy(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(name, HealthStatus::Healthy, message)
    }

    pub fn unhealthy(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(name, HealthStatus::Unhealthy, message)
    }

    pub fn with_response_time(mut self, elapsed: Duration) -> Self {
        self.response_time_ms = elapsed.as_millis() as u64;
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// Aggregated health document served by the readiness and status endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub timestamp: DateTime<Utc>,
    /// Process uptime in seconds.
    pub uptime: u64,
    pub overall_status: HealthStatus,
    pub checks: BTreeMap<String, HealthCheckRecord>,
}

impl StatusResponse {
    /// Fold records into one document; the overall status is the worst one.
    ///
    /// Every record counts toward the overall status. When two records share
    /// a name, `checks` keeps the worse of the two.
    pub fn from_records(records: impl IntoIterator<Item = HealthCheckRecord>, uptime: Duration) -> Self {
        let mut overall_status = HealthStatus::Healthy;
        let mut checks: BTreeMap<String, HealthCheckRecord> = BTreeMap::new();
        for record in records {
            overall_status = overall_status.worst(record.status);
            let kept_is_worse = checks
                .get(&record.name)
                .is_some_and(|kept| kept.status.severity() >= record.status.severity());
            if !kept_is_worse {
                checks.insert(record.name.clone(), record);
            }
        }

        Self {
            timestamp: Utc::now(),
            uptime: uptime.as_secs(),
            overall_status,
            checks,
        }
    }

    /// Dependent traffic can be served unless something is unhealthy.
    pub fn is_ready(&self) -> bool {
        self.overall_status != HealthStatus::Unhealthy
    }
}
