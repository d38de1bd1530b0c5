//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;
use std::str::FromStr;

use thiserror::Error;

use crate::config::schema::GuardConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<GuardConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: GuardConfig = toml::from_str(&content)?;
    finish(config, |name| std::env::var(name).ok())
}

/// Defaults plus environment overrides, for running without a file.
pub fn load_from_env() -> Result<GuardConfig, ConfigError> {
    finish(GuardConfig::default(), |name| std::env::var(name).ok())
}

fn finish<F>(mut config: GuardConfig, lookup: F) -> Result<GuardConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut errors = apply_env_overrides(&mut config, lookup);
    if let Err(mut semantic) = validate_config(&config) {
        errors.append(&mut semantic);
    }

    if errors.is_empty() {
        Ok(config)
    } else {
        Err(ConfigError::Validation(errors))
    }
}

/// Apply `DATABASE_URL`, `DB_POOL_MAX` and friends on top of `config`.
///
/// Returns one error per variable that is set but does not parse.
pub fn apply_env_overrides<F>(config: &mut GuardConfig, lookup: F) -> Vec<ValidationError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut errors = Vec::new();

    if let Some(url) = lookup("DATABASE_URL") {
        config.database.url = url;
    }
    if let Some(addr) = lookup("DB_GUARD_BIND_ADDRESS") {
        config.server.bind_address = addr;
    }

    override_num(&lookup, &mut errors, "DB_POOL_MAX", &mut config.database.max_connections);
    override_num(&lookup, &mut errors, "DB_POOL_MIN", &mut config.database.min_connections);
    override_num(
        &lookup,
        &mut errors,
        "DB_CONNECTION_TIMEOUT_MS",
        &mut config.database.connection_timeout_ms,
    );
    override_num(&lookup, &mut errors, "DB_IDLE_TIMEOUT_MS", &mut config.database.idle_timeout_ms);
    override_num(
        &lookup,
        &mut errors,
        "DB_BREAKER_FAILURE_THRESHOLD",
        &mut config.breaker.failure_threshold,
    );
    override_num(
        &lookup,
        &mut errors,
        "DB_BREAKER_OPEN_DURATION_MS",
        &mut config.breaker.open_duration_ms,
    );

    errors
}

fn override_num<F, T>(lookup: &F, errors: &mut Vec<ValidationError>, name: &'static str, target: &mut T)
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    if let Some(raw) = lookup(name) {
        match raw.trim().parse() {
            Ok(value) => *target = value,
            Err(_) => errors.push(ValidationError::BadEnv { name, value: raw }),
        }
    }
}
