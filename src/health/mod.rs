//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Probes (probe.rs):
//!     database (SELECT 1 via executor), circuit breaker, auxiliary closures
//!
//! Aggregation (aggregator.rs):
//!     Run probes concurrently, each under a ceiling
//!     → add connection pool band
//!     → overall = worst status (status.rs)
//!
//! Background (active.rs):
//!     Periodic timer → aggregate → cache latest document
//! ```
//!
//! # Design Decisions
//! - Liveness is process-only; readiness and status run probes
//! - A slow dependency is reported unhealthy rather than stalling callers
//! - Overall status is derived, never stored independently of the checks

pub mod active;
pub mod aggregator;
pub mod probe;
pub mod status;

pub use active::HealthMonitor;
pub use aggregator::{HealthAggregator, Liveness, Readiness};
pub use probe::{BreakerProbe, DatabaseProbe, FnProbe, HealthProbe};
pub use status::{HealthCheckRecord, HealthStatus, StatusResponse};
