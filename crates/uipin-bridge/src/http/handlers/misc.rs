//! Health and overlay script handlers.

use std::sync::Arc;

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use uipin_store::LogContext;

use crate::state::AppState;

const OVERLAY_CONTENT_TYPE: &str = "application/javascript; charset=utf-8";

const FALLBACK_OVERLAY_SCRIPT: &str = r#"
(function(){
  if (window.__UIPIN_OVERLAY_FALLBACK__) return;
  window.__UIPIN_OVERLAY_FALLBACK__ = true;
  console.warn('[uipin] overlay bundle is missing. Build the overlay app first.');
})();
"#;

pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({ "ok": true }))
}

/// Serve the overlay bundle, falling back to a stub script that only warns
/// in the browser console when the bundle is missing.
pub async fn overlay_script(State(state): State<Arc<AppState>>) -> Response {
    if let Some(path) = &state.overlay_script_path {
        match tokio::fs::read_to_string(path).await {
            Ok(script) => {
                return ([(header::CONTENT_TYPE, OVERLAY_CONTENT_TYPE)], script).into_response();
            }
            Err(_) => {
                state.logger.warn(
                    "Overlay bundle not found, serving fallback overlay script",
                    LogContext::event("overlay.fallback").meta(serde_json::json!({
                        "overlayScriptPath": path.display().to_string(),
                    })),
                );
            }
        }
    }

    (
        [(header::CONTENT_TYPE, OVERLAY_CONTENT_TYPE)],
        FALLBACK_OVERLAY_SCRIPT,
    )
        .into_response()
}
