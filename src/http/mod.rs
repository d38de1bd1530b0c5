//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → request.rs (assign or keep x-request-id)
//!     → server.rs (trace, timeout, route)
//!         /health/live    → aggregator liveness
//!         /health/ready   → probes under the readiness ceiling
//!         /health/status  → probes under the diagnostic ceiling
//!         /admin/*        → admin router (bearer token)
//!     → response carries x-request-id
//! ```

pub mod request;
pub mod server;

pub use request::{MakeRequestUuid, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
