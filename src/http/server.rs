//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the health endpoints
//! - Mount the admin router when enabled
//! - Wire up middleware (tracing, timeout, request ID)
//! - Serve until the shutdown broadcast fires

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::admin;
use crate::config::GuardConfig;
use crate::health::{HealthAggregator, HealthMonitor, Liveness, Readiness, StatusResponse};
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::pool::PoolHealthMonitor;
use crate::resilience::BreakerRegistry;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<HealthAggregator>,
    /// Background monitor, absent when periodic checks are disabled.
    pub health_monitor: Option<Arc<HealthMonitor>>,
    pub breakers: Arc<BreakerRegistry>,
    pub pool_monitor: Arc<PoolHealthMonitor>,
    pub config: Arc<GuardConfig>,
}

/// HTTP server for health and admin endpoints.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(state: AppState) -> Self {
        Self {
            router: Self::build_router(state),
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(state: AppState) -> Router {
        let request_timeout = Duration::from_secs(state.config.server.request_timeout_secs);

        let mut router = Router::new()
            .route("/health/live", get(live_handler))
            .route("/health/ready", get(ready_handler))
            .route("/health/status", get(status_handler));

        if state.config.admin.enabled {
            router = router.merge(admin::setup_admin_router(state.clone()));
        }

        router
            .with_state(state)
            .layer(TimeoutLayer::new(request_timeout))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer())
    }

    /// Run the server on `listener` until `shutdown` fires.
    pub async fn run(self, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

fn health_code(ready: bool) -> StatusCode {
    if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

async fn live_handler(State(state): State<AppState>) -> Json<Liveness> {
    Json(state.aggregator.liveness())
}

async fn ready_handler(State(state): State<AppState>) -> (StatusCode, Json<Readiness>) {
    let ceiling = Duration::from_millis(state.config.health.readiness_timeout_ms);
    let readiness = state.aggregator.readiness(ceiling).await;
    if !readiness.ready {
        tracing::debug!(overall = readiness.detail.overall_status.as_str(), "Readiness check failed");
    }
    (health_code(readiness.ready), Json(readiness))
}

async fn status_handler(State(state): State<AppState>) -> (StatusCode, Json<StatusResponse>) {
    let ceiling = Duration::from_millis(state.config.health.diagnostic_timeout_ms);
    let status = state.aggregator.run_all(ceiling).await;
    (health_code(status.is_ready()), Json(status))
}
