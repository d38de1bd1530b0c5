//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the guard.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GuardConfig {
    /// HTTP listener for health and admin endpoints.
    pub server: ServerConfig,

    /// Connection pool settings.
    pub database: DatabaseConfig,

    /// Circuit breaker thresholds.
    pub breaker: BreakerConfig,

    /// Extra or overridden timeout profiles.
    pub profiles: Vec<ProfileConfig>,

    /// Health check settings.
    pub health: HealthConfig,

    /// Pool sampling loop.
    pub pool_monitor: PoolMonitorConfig,

    /// Retry tuning shared by all profiles.
    pub retry: RetryConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Admin endpoints.
    pub admin: AdminConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Upper bound for any HTTP request, in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Database pool configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL.
    pub url: String,

    /// Upper bound on pooled connections.
    pub max_connections: u32,

    /// Connections kept open even when idle.
    pub min_connections: u32,

    /// How long an acquire may wait for a connection.
    pub connection_timeout_ms: u64,

    /// Idle connections above the minimum are closed after this.
    pub idle_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgres://postgres@localhost:5432/association".to_string(),
            max_connections: 20,
            min_connections: 2,
            connection_timeout_ms: 3_000,
            idle_timeout_ms: 60_000,
        }
    }
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BreakerConfig {
    /// Consecutive infra failures before the circuit opens.
    pub failure_threshold: u32,

    /// How long the circuit stays open before a probe is allowed.
    pub open_duration_ms: u64,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            open_duration_ms: 30_000,
        }
    }
}

/// A timeout profile entry. Replaces a built-in profile of the same name.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProfileConfig {
    pub name: String,

    pub timeout_ms: u64,

    #[serde(default)]
    pub retry_enabled: bool,

    /// Total attempts including the first one.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

fn default_max_attempts() -> u32 {
    1
}

fn default_backoff_ms() -> u64 {
    100
}

/// Health check configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Run readiness checks periodically in the background.
    pub enabled: bool,

    /// Background check interval in seconds.
    pub interval_secs: u64,

    /// Per-probe ceiling for the readiness endpoint.
    pub readiness_timeout_ms: u64,

    /// Per-probe ceiling for the diagnostic status endpoint.
    pub diagnostic_timeout_ms: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 15,
            readiness_timeout_ms: 3_000,
            diagnostic_timeout_ms: 5_000,
        }
    }
}

/// Pool sampling configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PoolMonitorConfig {
    pub enabled: bool,

    /// Sampling interval in seconds.
    pub interval_secs: u64,
}

impl Default for PoolMonitorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 30,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Random extra delay as a fraction of each backoff (0.0 - 1.0).
    pub jitter_ratio: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { jitter_ratio: 0.0 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// "pretty" or "json".
    pub log_format: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Default admin key; refused by validation when the admin routes are enabled.
pub const PLACEHOLDER_API_KEY: &str = "CHANGE_ME_IN_PRODUCTION";

/// Admin endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Mount the /admin routes.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: PLACEHOLDER_API_KEY.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config: GuardConfig = toml::from_str("").unwrap();
        assert_eq!(config.database.max_connections, 20);
        assert_eq!(config.database.min_connections, 2);
        assert_eq!(config.database.connection_timeout_ms, 3_000);
        assert_eq!(config.database.idle_timeout_ms, 60_000);
        assert_eq!(config.breaker.failure_threshold, 5);
        assert_eq!(config.breaker.open_duration_ms, 30_000);
        assert_eq!(config.health.readiness_timeout_ms, 3_000);
        assert_eq!(config.health.diagnostic_timeout_ms, 5_000);
        assert!(config.profiles.is_empty());
    }

    #[test]
    fn test_partial_sections() {
        let config: GuardConfig = toml::from_str(
            r#"
            [database]
            url = "postgres://app@db:5432/assoc"
            max_connections = 40

            [[profiles]]
            name = "reporting"
            timeout_ms = 30000
            retry_enabled = true
            max_attempts = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.database.max_connections, 40);
        assert_eq!(config.database.min_connections, 2);
        assert_eq!(config.profiles[0].name, "reporting");
        assert_eq!(config.profiles[0].backoff_ms, 100);
    }
}
