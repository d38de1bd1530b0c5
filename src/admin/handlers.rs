use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::http::server::AppState;
use crate::pool::PoolSnapshot;
use crate::resilience::BreakerSnapshot;

pub async fn get_breakers(State(state): State<AppState>) -> Json<Vec<BreakerSnapshot>> {
    Json(state.breakers.snapshots())
}

/// Force a breaker back to Closed.
pub async fn reset_breaker(State(state): State<AppState>, Path(resource): Path<String>) -> Response {
    match state.breakers.get(&resource) {
        Some(breaker) => {
            breaker.reset();
            tracing::warn!(resource = %resource, "Circuit breaker reset by operator");
            Json(breaker.snapshot()).into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("no circuit breaker for '{}'", resource) })),
        )
            .into_response(),
    }
}

pub async fn get_pool(State(state): State<AppState>) -> Json<PoolSnapshot> {
    Json(state.pool_monitor.snapshot())
}

/// Latest background health result, without running any probe.
pub async fn get_cached_health(State(state): State<AppState>) -> Response {
    match state.health_monitor.as_ref().and_then(|m| m.latest()) {
        Some(latest) => Json(latest.as_ref().clone()).into_response(),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": "no background health result available" })),
        )
            .into_response(),
    }
}
