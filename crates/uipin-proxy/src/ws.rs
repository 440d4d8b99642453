//! WebSocket passthrough.
//!
//! Dev servers use a WebSocket for hot reload; the proxy bridges each
//! upgraded connection to the same path on the target and pumps frames
//! in both directions until either side closes.

use axum::extract::ws::{self, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::{self, protocol::frame::coding::CloseCode};
use uipin_store::{JsonlLogger, LogContext};

pub(crate) async fn bridge(client: WebSocket, target_url: String, logger: JsonlLogger) {
    let upstream = match tokio_tungstenite::connect_async(&target_url).await {
        Ok((upstream, _response)) => upstream,
        Err(err) => {
            logger.warn(
                &format!("WebSocket target unavailable: {}", err),
                LogContext::event("proxy.ws.connect_failed")
                    .meta(serde_json::json!({ "target": target_url })),
            );
            return;
        }
    };

    let (mut client_tx, mut client_rx) = client.split();
    let (mut upstream_tx, mut upstream_rx) = upstream.split();

    let client_to_upstream = async {
        while let Some(Ok(message)) = client_rx.next().await {
            if upstream_tx.send(to_tungstenite(message)).await.is_err() {
                break;
            }
        }
    };

    let upstream_to_client = async {
        while let Some(Ok(message)) = upstream_rx.next().await {
            let Some(message) = to_axum(message) else {
                continue;
            };
            if client_tx.send(message).await.is_err() {
                break;
            }
        }
    };

    // Either direction ending tears down the whole bridge.
    tokio::select! {
        _ = client_to_upstream => {}
        _ = upstream_to_client => {}
    }
}

fn to_tungstenite(message: ws::Message) -> tungstenite::Message {
    match message {
        ws::Message::Text(text) => tungstenite::Message::Text(text),
        ws::Message::Binary(data) => tungstenite::Message::Binary(data),
        ws::Message::Ping(data) => tungstenite::Message::Ping(data),
        ws::Message::Pong(data) => tungstenite::Message::Pong(data),
        ws::Message::Close(frame) => tungstenite::Message::Close(frame.map(|frame| {
            tungstenite::protocol::CloseFrame {
                code: CloseCode::from(frame.code),
                reason: frame.reason,
            }
        })),
    }
}

fn to_axum(message: tungstenite::Message) -> Option<ws::Message> {
    match message {
        tungstenite::Message::Text(text) => Some(ws::Message::Text(text)),
        tungstenite::Message::Binary(data) => Some(ws::Message::Binary(data)),
        tungstenite::Message::Ping(data) => Some(ws::Message::Ping(data)),
        tungstenite::Message::Pong(data) => Some(ws::Message::Pong(data)),
        tungstenite::Message::Close(frame) => {
            Some(ws::Message::Close(frame.map(|frame| ws::CloseFrame {
                code: u16::from(frame.code),
                reason: frame.reason,
            })))
        }
        // Raw frames never surface from a read loop.
        tungstenite::Message::Frame(_) => None,
    }
}
