//! End-to-end contract tests for the bridge HTTP API, run against the
//! router in-process with fixture-mode providers.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use futures_util::StreamExt;
use http_body_util::BodyExt;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use uipin_bridge::{http::create_router, AppState, EventBus, TaskRunner};
use uipin_core::{BusEvent, ProviderName, SessionId, TaskId, TaskStatus, TerminalStatus};
use uipin_providers::claude::ClaudeAdapter;
use uipin_providers::codex::CodexAdapter;
use uipin_providers::stub::CursorAdapter;
use uipin_providers::{ProviderAdapter, ProviderRegistry};
use uipin_store::{ArtifactStore, JsonlLogger};

/// Codex and claude in fixture mode, cursor as the disabled scaffold.
fn fixture_registry() -> ProviderRegistry {
    let mut adapters: HashMap<ProviderName, Arc<dyn ProviderAdapter>> = HashMap::new();
    adapters.insert(ProviderName::Codex, Arc::new(CodexAdapter::new(true)));
    adapters.insert(ProviderName::Claude, Arc::new(ClaudeAdapter::new(true)));
    adapters.insert(ProviderName::Cursor, Arc::new(CursorAdapter));
    ProviderRegistry::new(adapters, [ProviderName::Codex, ProviderName::Claude])
}

async fn test_app(dir: &std::path::Path) -> (Router, Arc<AppState>) {
    let store = Arc::new(ArtifactStore::new(dir));
    store.ensure_structure().await.expect("ensure structure");
    let logger = JsonlLogger::new(store.logs_dir(), "bridge", false);
    let bus = EventBus::new();
    let runner = Arc::new(TaskRunner::new(
        dir,
        store.clone(),
        logger.clone(),
        bus.clone(),
        Arc::new(fixture_registry()),
    ));
    let state = Arc::new(AppState {
        store,
        logger,
        bus,
        runner,
        overlay_script_path: None,
    });
    (create_router(state.clone()), state)
}

fn create_task_payload(session_id: &str) -> serde_json::Value {
    serde_json::json!({
        "sessionId": session_id,
        "url": "http://localhost:3000/settings",
        "viewport": { "width": 1280, "height": 720 },
        "pin": { "x": 40.0, "y": 120.0, "body": "Make the save button green" },
        "uiChangePacket": {
            "id": "pkt-1",
            "timestamp": "2026-08-27T12:00:00Z",
            "url": "http://localhost:3000/settings",
            "viewport": { "width": 1280, "height": 720 },
            "element": {
                "tag": "button",
                "role": "button",
                "text": "Save",
                "attributes": { "data-testid": "save-button" },
                "boundingBox": { "x": 10.0, "y": 100.0, "width": 80.0, "height": 32.0 }
            },
            "nearbyText": ["Save", "Cancel"],
            "domSnippet": "<button data-testid=\"save-button\">Save</button>",
            "computedStyleSummary": { "color": "rgb(0, 0, 0)" },
            "screenshotPath": "ignored.png",
            "userRequest": "ignored"
        },
        "screenshotPath": ".uipin/screenshots/pre.png"
    })
}

async fn post_json(router: &Router, uri: &str, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
    let response = router
        .clone()
        .oneshot(
            Request::post(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .expect("request"),
        )
        .await
        .expect("response");

    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    let value = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, value)
}

#[tokio::test]
async fn test_create_submit_and_complete_fixture_run() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (router, state) = test_app(dir.path()).await;

    let (status, created) =
        post_json(&router, "/api/tasks", create_task_payload("s-create")).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["status"], "created");
    let task_id = created["taskId"].as_str().expect("taskId").to_string();
    assert_eq!(
        created["taskPath"],
        format!(".uipin/tasks/{}.json", task_id)
    );
    assert_eq!(
        created["eventsUrl"],
        format!("/api/tasks/{}/events?sessionId=s-create", task_id)
    );

    // Subscribe before submitting so no event is missed.
    let run_session = SessionId::new("s-run");
    let mut subscription = state
        .bus
        .subscribe(&TaskId::new(task_id.clone()), &run_session);

    let (status, submitted) = post_json(
        &router,
        &format!("/api/tasks/{}/submit", task_id),
        serde_json::json!({
            "sessionId": "s-run",
            "provider": "codex",
            "model": "gpt-5.3-codex-spark"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(submitted["status"], "queued");
    assert_eq!(submitted["taskId"], task_id);

    let mut progress_messages = Vec::new();
    let terminal = loop {
        let event = tokio::time::timeout(Duration::from_secs(5), subscription.recv())
            .await
            .expect("event before timeout")
            .expect("bus open");
        match event {
            BusEvent::Progress {
                message, percent, ..
            } => progress_messages.push((message, percent)),
            BusEvent::Terminal {
                status,
                summary,
                changed_files,
                ..
            } => break (status, summary, changed_files),
            BusEvent::Heartbeat { .. } => {}
        }
    };

    assert_eq!(
        progress_messages,
        vec![
            ("Task queued".to_string(), None),
            ("Scanning repository".to_string(), Some(25.0)),
            ("Applying UI changes".to_string(), Some(80.0)),
        ]
    );
    assert_eq!(terminal.0, TerminalStatus::Completed);
    assert_eq!(terminal.1, "Applied UI request");
    assert_eq!(terminal.2, vec!["src/components/save-button.tsx"]);

    // Durable records agree with the stream.
    let task = state
        .store
        .get_task(&TaskId::new(task_id))
        .await
        .expect("get")
        .expect("present");
    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(task.summary.as_deref(), Some("Applied UI request"));
    assert_eq!(task.changed_files, vec!["src/components/save-button.tsx"]);
    assert_eq!(task.provider, Some(ProviderName::Codex));

    let session = state
        .store
        .get_session(&run_session)
        .await
        .expect("get")
        .expect("present");
    assert_eq!(session.status, TaskStatus::Completed);
    assert!(session.ended_at.is_some());
    // queued + 2 progress + terminal, timestamps never decreasing.
    assert_eq!(session.events.len(), 4);
    assert!(session
        .events
        .windows(2)
        .all(|pair| pair[0].timestamp <= pair[1].timestamp));
}

#[tokio::test]
async fn test_create_task_rejects_blank_comment() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (router, _state) = test_app(dir.path()).await;

    let mut payload = create_task_payload("s1");
    payload["pin"]["body"] = serde_json::json!("   ");
    let (status, body) = post_json(&router, "/api/tasks", payload).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid request");
}

#[tokio::test]
async fn test_create_task_decodes_screenshot_data_url() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (router, _state) = test_app(dir.path()).await;

    let mut payload = create_task_payload("s1");
    // 1x1 transparent PNG
    payload["screenshotDataUrl"] = serde_json::json!(
        "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg=="
    );
    let (status, created) = post_json(&router, "/api/tasks", payload).await;
    assert_eq!(status, StatusCode::CREATED);

    let task_id = created["taskId"].as_str().expect("taskId");
    assert!(dir
        .path()
        .join(format!(".uipin/screenshots/{}.png", task_id))
        .is_file());
}

#[tokio::test]
async fn test_submit_unknown_task_is_404() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (router, _state) = test_app(dir.path()).await;

    let (status, body) = post_json(
        &router,
        "/api/tasks/nope/submit",
        serde_json::json!({
            "sessionId": "s1",
            "provider": "codex",
            "model": "m"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Task not found");
}

#[tokio::test]
async fn test_submit_rejects_blank_follow_up_body() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (router, _state) = test_app(dir.path()).await;

    let (status, created) =
        post_json(&router, "/api/tasks", create_task_payload("s1")).await;
    assert_eq!(status, StatusCode::CREATED);
    let task_id = created["taskId"].as_str().expect("taskId");

    let (status, _body) = post_json(
        &router,
        &format!("/api/tasks/{}/submit", task_id),
        serde_json::json!({
            "sessionId": "s1",
            "provider": "codex",
            "model": "m",
            "followUpBody": "  "
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_submit_follow_up_body_replaces_request_text() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (router, state) = test_app(dir.path()).await;

    let (status, created) =
        post_json(&router, "/api/tasks", create_task_payload("s1")).await;
    assert_eq!(status, StatusCode::CREATED);
    let task_id = created["taskId"].as_str().expect("taskId").to_string();

    let (status, _body) = post_json(
        &router,
        &format!("/api/tasks/{}/submit", task_id),
        serde_json::json!({
            "sessionId": "s2",
            "provider": "codex",
            "model": "gpt-5.3-codex-spark",
            "followUpBody": "  Actually make it red  "
        }),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    // The retry prompt is built from the stored record, so both request
    // fields must carry the follow-up text.
    let task = state
        .store
        .get_task(&TaskId::new(task_id))
        .await
        .expect("get")
        .expect("present");
    assert_eq!(task.comment.body, "Actually make it red");
    assert_eq!(task.ui_change_packet.user_request, "Actually make it red");
}

#[tokio::test]
async fn test_client_task_id_is_sanitized() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (router, _state) = test_app(dir.path()).await;

    let mut payload = create_task_payload("s1");
    payload["clientTaskId"] = serde_json::json!("my task/../id!");
    let (status, created) = post_json(&router, "/api/tasks", payload).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["taskId"], "my-task----id-");
}

#[tokio::test]
async fn test_cancel_without_running_session_is_accepted() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (router, _state) = test_app(dir.path()).await;

    let (status, body) = post_json(
        &router,
        "/api/tasks/t1/cancel",
        serde_json::json!({ "sessionId": "s1" }),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["status"], "cancelled");
}

#[tokio::test]
async fn test_cancel_requires_session_id() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (router, _state) = test_app(dir.path()).await;

    let (status, _body) =
        post_json(&router, "/api/tasks/t1/cancel", serde_json::json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_health() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (router, _state) = test_app(dir.path()).await;

    let response = router
        .oneshot(Request::get("/health").body(Body::empty()).expect("request"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    let body: serde_json::Value = serde_json::from_slice(&bytes).expect("json");
    assert_eq!(body["ok"], true);
}

#[tokio::test]
async fn test_overlay_fallback_script() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (router, _state) = test_app(dir.path()).await;

    let response = router
        .oneshot(
            Request::get("/overlay.js")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok()),
        Some("application/javascript; charset=utf-8")
    );
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    let script = String::from_utf8(bytes.to_vec()).expect("utf8");
    assert!(script.contains("__UIPIN_OVERLAY_FALLBACK__"));
}

#[tokio::test]
async fn test_event_stream_opens_with_heartbeat() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (router, _state) = test_app(dir.path()).await;

    let response = router
        .clone()
        .oneshot(
            Request::get("/api/tasks/t1/events?sessionId=s1")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("text/event-stream")));

    let mut body = response.into_body().into_data_stream();
    let first = tokio::time::timeout(Duration::from_secs(2), body.next())
        .await
        .expect("first frame in time")
        .expect("stream open")
        .expect("frame");
    let frame = String::from_utf8(first.to_vec()).expect("utf8");
    assert!(frame.contains("event: heartbeat"));
    assert!(frame.contains("\"type\":\"heartbeat\""));
}

#[tokio::test]
async fn test_event_stream_requires_session_id() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (router, _state) = test_app(dir.path()).await;

    let response = router
        .oneshot(
            Request::get("/api/tasks/t1/events")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
