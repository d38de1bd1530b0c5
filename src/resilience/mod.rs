//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Query from business code:
//!     → executor.rs (sole entry point, picks profile)
//!     → circuit_breaker.rs (fail fast while the database is down)
//!     → timeouts.rs (every attempt has a deadline)
//!     → On infra failure: retries.rs + backoff.rs (bounded, linear)
//!     → Outcome reported back to circuit_breaker.rs
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every attempt has a deadline
//! - Only infra failures (timeout, connection) are retried or trip breakers
//! - Breakers are per resource, created once and injected, never global
//! - Retry is a decorator around a single attempt, not repeated per caller

pub mod backoff;
pub mod circuit_breaker;
pub mod error;
pub mod executor;
pub mod profiles;
pub mod registry;
pub mod retries;
pub mod timeouts;

pub use circuit_breaker::{BreakerSettings, BreakerSnapshot, CircuitBreaker, CircuitState};
pub use error::{Classify, ErrorKind, ExecuteError, ExecutionOutcome, FailureClass, UnknownProfile};
pub use executor::{Executed, QueryExecutor};
pub use profiles::{ProfileRegistry, TimeoutProfile};
pub use registry::{BreakerRegistry, PRIMARY_DATABASE};
