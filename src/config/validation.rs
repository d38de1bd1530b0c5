//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, min <= max)
//! - Check addresses and the database URL parse
//! - Order the health ceilings below the HTTP request timeout
//! - Refuse a blank or placeholder admin key when the admin routes are on
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GuardConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::{GuardConfig, PLACEHOLDER_API_KEY};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("database.min_connections ({min}) exceeds database.max_connections ({max})")]
    MinAboveMax { min: u32, max: u32 },

    #[error("{field} '{value}' is not a socket address")]
    BadAddress { field: &'static str, value: String },

    #[error("database.url is invalid: {0}")]
    BadDatabaseUrl(String),

    #[error("profile '{name}': {reason}")]
    BadProfile { name: String, reason: &'static str },

    #[error("retry.jitter_ratio {0} is outside 0.0..=1.0")]
    BadJitter(f64),

    #[error("health.readiness_timeout_ms exceeds health.diagnostic_timeout_ms")]
    ReadinessAboveDiagnostic,

    #[error("server.request_timeout_secs ({request_ms}ms) must exceed health.diagnostic_timeout_ms ({diagnostic_ms}ms)")]
    RequestTimeoutBelowDiagnostic { request_ms: u64, diagnostic_ms: u64 },

    #[error("admin.api_key must be set to a non-placeholder value when admin is enabled")]
    WeakAdminKey,

    #[error("observability.log_format '{0}' is not 'pretty' or 'json'")]
    BadLogFormat(String),

    #[error("environment variable {name} has invalid value '{value}'")]
    BadEnv { name: &'static str, value: String },
}

/// Check every rule and report every failure.
pub fn validate_config(config: &GuardConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let nonzero = [
        ("database.max_connections", u64::from(config.database.max_connections)),
        ("database.connection_timeout_ms", config.database.connection_timeout_ms),
        ("database.idle_timeout_ms", config.database.idle_timeout_ms),
        ("breaker.failure_threshold", u64::from(config.breaker.failure_threshold)),
        ("breaker.open_duration_ms", config.breaker.open_duration_ms),
        ("health.readiness_timeout_ms", config.health.readiness_timeout_ms),
        ("health.diagnostic_timeout_ms", config.health.diagnostic_timeout_ms),
        ("server.request_timeout_secs", config.server.request_timeout_secs),
    ];
    for (field, value) in nonzero {
        if value == 0 {
            errors.push(ValidationError::Zero { field });
        }
    }
    if config.health.enabled && config.health.interval_secs == 0 {
        errors.push(ValidationError::Zero { field: "health.interval_secs" });
    }
    if config.pool_monitor.enabled && config.pool_monitor.interval_secs == 0 {
        errors.push(ValidationError::Zero { field: "pool_monitor.interval_secs" });
    }

    if config.database.min_connections > config.database.max_connections {
        errors.push(ValidationError::MinAboveMax {
            min: config.database.min_connections,
            max: config.database.max_connections,
        });
    }

    match Url::parse(&config.database.url) {
        Ok(url) if matches!(url.scheme(), "postgres" | "postgresql") => {}
        Ok(url) => errors.push(ValidationError::BadDatabaseUrl(format!(
            "unsupported scheme '{}'",
            url.scheme()
        ))),
        Err(e) => errors.push(ValidationError::BadDatabaseUrl(e.to_string())),
    }

    check_address(&mut errors, "server.bind_address", &config.server.bind_address);
    if config.observability.metrics_enabled {
        check_address(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    let mut seen = HashSet::new();
    for profile in &config.profiles {
        if !seen.insert(profile.name.as_str()) {
            errors.push(ValidationError::BadProfile {
                name: profile.name.clone(),
                reason: "defined more than once",
            });
        }
        if profile.name.trim().is_empty() {
            errors.push(ValidationError::BadProfile {
                name: profile.name.clone(),
                reason: "name is empty",
            });
        }
        if profile.timeout_ms == 0 {
            errors.push(ValidationError::BadProfile {
                name: profile.name.clone(),
                reason: "timeout_ms must be greater than zero",
            });
        }
        if profile.max_attempts == 0 {
            errors.push(ValidationError::BadProfile {
                name: profile.name.clone(),
                reason: "max_attempts must be at least 1",
            });
        }
    }

    if !(0.0..=1.0).contains(&config.retry.jitter_ratio) {
        errors.push(ValidationError::BadJitter(config.retry.jitter_ratio));
    }

    if config.health.readiness_timeout_ms > config.health.diagnostic_timeout_ms {
        errors.push(ValidationError::ReadinessAboveDiagnostic);
    }

    let request_ms = config.server.request_timeout_secs.saturating_mul(1_000);
    if request_ms <= config.health.diagnostic_timeout_ms {
        errors.push(ValidationError::RequestTimeoutBelowDiagnostic {
            request_ms,
            diagnostic_ms: config.health.diagnostic_timeout_ms,
        });
    }

    if config.admin.enabled {
        let key = config.admin.api_key.trim();
        if key.is_empty() || key == PLACEHOLDER_API_KEY {
            errors.push(ValidationError::WeakAdminKey);
        }
    }

    if !matches!(config.observability.log_format.as_str(), "pretty" | "json") {
        errors.push(ValidationError::BadLogFormat(config.observability.log_format.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BadAddress {
            field,
            value: value.to_string(),
        });
    }
}
