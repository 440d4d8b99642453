//! HTTP surface of the bridge.
//!
//! Endpoints:
//! - `POST /api/tasks` persists a pinned change request
//! - `POST /api/tasks/:taskId/submit` starts a provider session
//! - `POST /api/tasks/:taskId/cancel` requests cancellation
//! - `GET /api/tasks/:taskId/events` streams progress over SSE
//! - `GET /overlay.js` serves the overlay bundle (or fallback script)
//! - `GET /health` is the health check

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

use crate::state::AppState;

mod handlers;
pub mod responses;

/// Screenshot payloads arrive inline as data URLs.
const MAX_BODY_BYTES: usize = 25 * 1024 * 1024;

/// Create the HTTP router.
pub fn create_router(state: Arc<AppState>) -> Router {
    // CORS layer for the injected overlay, which calls from the app origin
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/tasks", post(handlers::create_task))
        .route("/api/tasks/:task_id/submit", post(handlers::submit_task))
        .route("/api/tasks/:task_id/cancel", post(handlers::cancel_task))
        .route("/api/tasks/:task_id/events", get(handlers::task_events))
        .route("/overlay.js", get(handlers::overlay_script))
        .route("/health", get(handlers::health_check))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors)
        .with_state(state)
}
