//! Database resilience layer.
//!
//! Wraps every query to a shared PostgreSQL pool with per-profile timeouts,
//! bounded retries and a circuit breaker, classifies pool utilization, and
//! aggregates health probes for liveness and readiness endpoints.

pub mod admin;
pub mod config;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod pool;
pub mod resilience;

pub use config::schema::GuardConfig;
pub use http::HttpServer;
pub use lifecycle::{Services, Shutdown};
pub use resilience::{ExecuteError, QueryExecutor};
