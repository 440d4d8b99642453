//! UIPin Reverse Proxy
//!
//! Sits in front of the developer's app, forwarding every request to the
//! target port. HTML responses are buffered and rewritten to carry the
//! overlay bootstrap block; everything else streams through untouched,
//! and WebSocket upgrades are bridged to the target so hot-reload keeps
//! working.

pub mod inject;

mod error;
mod ws;

pub use error::ProxyError;

use axum::{
    body::Body,
    extract::{Request, State, WebSocketUpgrade},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use inject::{inject_overlay_script, OVERLAY_MARKER};
use std::sync::Arc;
use uipin_core::ProviderName;
use uipin_store::{JsonlLogger, LogContext};

/// Connection-scoped headers that must not be forwarded.
const HOP_BY_HOP_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailers",
    "transfer-encoding",
    "upgrade",
];

#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub target_port: u16,
    pub proxy_port: u16,
    pub bridge_port: u16,
    pub provider: ProviderName,
    pub model: String,
}

pub struct ProxyState {
    client: reqwest::Client,
    config: ProxyConfig,
    logger: JsonlLogger,
    target_origin: String,
}

impl ProxyState {
    pub fn new(config: ProxyConfig, logger: JsonlLogger) -> Self {
        Self {
            client: reqwest::Client::new(),
            target_origin: format!("http://127.0.0.1:{}", config.target_port),
            config,
            logger,
        }
    }
}

/// Create the proxy router: a single fallback handler takes every route.
pub fn create_router(state: Arc<ProxyState>) -> Router {
    Router::new().fallback(proxy_handler).with_state(state)
}

/// Bind the proxy on localhost and serve until the task is cancelled.
pub async fn serve(state: Arc<ProxyState>) -> Result<(), ProxyError> {
    let logger = state.logger.clone();
    let port = state.config.proxy_port;
    let target = state.target_origin.clone();
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;
    logger.info(
        &format!("Proxy listening on http://localhost:{}", port),
        LogContext::event("proxy.started").meta(serde_json::json!({ "target": target })),
    );
    axum::serve(listener, router).await?;
    Ok(())
}

async fn proxy_handler(
    State(state): State<Arc<ProxyState>>,
    ws: Option<WebSocketUpgrade>,
    req: Request,
) -> Response {
    let path_and_query = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());

    if let Some(ws) = ws {
        let target_url = format!(
            "ws://127.0.0.1:{}{}",
            state.config.target_port, path_and_query
        );
        let logger = state.logger.clone();
        return ws
            .on_upgrade(move |socket| ws::bridge(socket, target_url, logger))
            .into_response();
    }

    forward(state, req, &path_and_query).await
}

async fn forward(state: Arc<ProxyState>, req: Request, path_and_query: &str) -> Response {
    let url = format!("{}{}", state.target_origin, path_and_query);
    let method = req.method().clone();

    let mut headers = filter_hop_headers(req.headers());
    headers.remove(header::HOST);
    // The rewriter needs plaintext HTML.
    headers.insert(header::ACCEPT_ENCODING, HeaderValue::from_static("identity"));

    let body = match axum::body::to_bytes(req.into_body(), usize::MAX).await {
        Ok(body) => body,
        Err(err) => {
            return (
                StatusCode::BAD_REQUEST,
                axum::Json(serde_json::json!({ "error": err.to_string() })),
            )
                .into_response()
        }
    };

    let upstream = state
        .client
        .request(method, &url)
        .headers(headers)
        .body(body)
        .send()
        .await;

    let upstream = match upstream {
        Ok(upstream) => upstream,
        Err(err) => return target_unavailable(&state, path_and_query, err),
    };

    let status = StatusCode::from_u16(upstream.status().as_u16())
        .unwrap_or(StatusCode::BAD_GATEWAY);
    let mut response_headers = filter_hop_headers(upstream.headers());

    let is_html = response_headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("text/html"));

    if !is_html {
        let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
        *response.status_mut() = status;
        *response.headers_mut() = response_headers;
        return response;
    }

    let bytes = match upstream.bytes().await {
        Ok(bytes) => bytes,
        Err(err) => return target_unavailable(&state, path_and_query, err),
    };

    // The rewritten document replaces the upstream framing headers.
    response_headers.remove(header::CONTENT_LENGTH);

    let body = match std::str::from_utf8(&bytes) {
        Ok(html) if !html.contains(OVERLAY_MARKER) => Body::from(inject_overlay_script(
            html,
            state.config.bridge_port,
            state.config.provider,
            &state.config.model,
        )),
        Ok(_) => Body::from(bytes),
        Err(err) => {
            // Fail open: an unrewritable document is forwarded untouched.
            state.logger.warn(
                "Failed to inject overlay; forwarding original HTML",
                LogContext::event("proxy.inject.failed").meta(serde_json::json!({
                    "url": path_and_query,
                    "error": err.to_string(),
                })),
            );
            Body::from(bytes)
        }
    };

    let mut response = Response::new(body);
    *response.status_mut() = status;
    *response.headers_mut() = response_headers;
    response
}

fn target_unavailable(
    state: &ProxyState,
    path_and_query: &str,
    err: impl std::fmt::Display,
) -> Response {
    state.logger.error(
        &format!("Proxy error: {}", err),
        LogContext::event("proxy.error")
            .meta(serde_json::json!({ "url": path_and_query })),
    );
    (
        StatusCode::BAD_GATEWAY,
        axum::Json(serde_json::json!({
            "error": "Proxy target unavailable",
            "target": state.target_origin,
        })),
    )
        .into_response()
}

fn filter_hop_headers(headers: &HeaderMap) -> HeaderMap {
    let mut filtered = HeaderMap::new();
    for (name, value) in headers {
        if !HOP_BY_HOP_HEADERS.contains(&name.as_str()) {
            filtered.append(name.clone(), value.clone());
        }
    }
    filtered
}
