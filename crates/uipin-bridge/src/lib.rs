//! UIPin Bridge
//!
//! The local control plane: an HTTP/SSE server that persists pinned UI
//! change requests, hands them to provider adapters via the task runner,
//! and streams progress back to the overlay.

pub mod error;
pub mod event_bus;
pub mod http;
pub mod runner;
pub mod state;

pub use error::BridgeError;
pub use event_bus::{EventBus, Subscription};
pub use runner::{RunTaskInput, TaskRunner};
pub use state::AppState;

use std::sync::Arc;
use uipin_store::LogContext;

/// Bind the bridge on localhost and serve until the task is cancelled.
pub async fn serve(state: Arc<AppState>, port: u16) -> Result<(), BridgeError> {
    let logger = state.logger.clone();
    let router = http::create_router(state);
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;

    logger.info(
        &format!("Bridge listening on http://localhost:{}", port),
        LogContext::event("bridge.started"),
    );
    axum::serve(listener, router).await?;
    Ok(())
}
