//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize, apply DATABASE_URL / DB_* overrides)
//!     → validation.rs (semantic checks)
//!     → GuardConfig (validated, immutable)
//!     → handed to lifecycle::startup, which builds every subsystem
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; timeout profiles and breakers live
//!   for the whole process, so there is no hot reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_from_env, ConfigError};
pub use schema::{
    AdminConfig, BreakerConfig, DatabaseConfig, GuardConfig, HealthConfig, ObservabilityConfig,
    PoolMonitorConfig, ProfileConfig, RetryConfig, ServerConfig,
};
pub use validation::ValidationError;
