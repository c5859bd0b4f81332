//! Main application router.

use crate::handlers::{cache, health};
use axum::{
    routing::{get, post},
    Router,
};
use rdep_axum::AppState;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Creates the application router.
pub fn create_router(state: AppState) -> Router {
    let router = Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .route("/cache/:key", get(cache::get_entry).put(cache::put_entry))
        .route("/counters/:key", post(cache::increment))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    info!("Router created");
    router
}
