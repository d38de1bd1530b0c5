//! Operator endpoints, mounted under `/admin` when enabled.

pub mod auth;
pub mod handlers;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::http::server::AppState;

pub fn setup_admin_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/admin/breakers", get(get_breakers))
        .route("/admin/breakers/{resource}/reset", post(reset_breaker))
        .route("/admin/pool", get(get_pool))
        .route("/admin/health", get(get_cached_health))
        .route_layer(middleware::from_fn_with_state(state, admin_auth_middleware))
}
