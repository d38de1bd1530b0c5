//! Connection pool subsystem.
//!
//! # Data Flow
//! ```text
//! sqlx PgPool
//!     → managed.rs (adds waiting-request counter, implements PoolStats)
//!     → monitor.rs (snapshot on demand, periodic sampling loop)
//!     → snapshot.rs (utilization + Healthy/Warning/Critical band)
//!     → consumers: health checks, metrics, admin endpoint
//! ```
//!
//! # Design Decisions
//! - Bands are fixed: above 70% is Warning, above 90% is Critical
//! - Queued acquirers are reported even while Healthy
//! - classify.rs decides which sqlx errors count against the breaker

pub mod classify;
pub mod managed;
pub mod monitor;
pub mod snapshot;

pub use managed::ManagedPool;
pub use monitor::{PoolHealthMonitor, PoolStats};
pub use snapshot::{PoolBand, PoolCounters, PoolSnapshot};
