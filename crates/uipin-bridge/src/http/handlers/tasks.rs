//! Task creation, submission and cancellation handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use uipin_core::{Pin, SessionId, TaskComment, TaskId, TaskRecord, TaskStatus};
use uipin_store::{ArtifactStore, LogContext, StoreError};

use crate::http::responses::{
    events_url, CancelTaskRequest, CancelTaskResponse, CreateTaskRequest, CreateTaskResponse,
    ErrorBody, SubmitTaskRequest, SubmitTaskResponse,
};
use crate::runner::RunTaskInput;
use crate::state::AppState;

const GENERATE_ATTEMPTS: usize = 10;

fn internal_error(err: impl std::fmt::Display) -> Response {
    tracing::error!(error = %err, "Bridge request failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody::new("Internal error")),
    )
        .into_response()
}

fn invalid_request(details: String) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorBody::with_details("Invalid request", details)),
    )
        .into_response()
}

/// Pick a free task id: the sanitized client suggestion when it does not
/// collide, otherwise freshly generated ids with a bounded retry.
async fn resolve_available_task_id(
    store: &ArtifactStore,
    client_task_id: Option<&str>,
) -> Result<TaskId, StoreError> {
    if let Some(requested) = client_task_id {
        let candidate = TaskId::sanitize(requested);
        if !candidate.as_str().is_empty() && store.get_task(&candidate).await?.is_none() {
            return Ok(candidate);
        }
    }

    for _ in 0..GENERATE_ATTEMPTS {
        let candidate = TaskId::generate();
        if store.get_task(&candidate).await?.is_none() {
            return Ok(candidate);
        }
    }
    Err(StoreError::TaskIdExhausted)
}

pub async fn create_task(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateTaskRequest>,
) -> Response {
    if let Err(details) = payload.validate() {
        return invalid_request(details);
    }

    let task_id =
        match resolve_available_task_id(&state.store, payload.client_task_id.as_deref()).await {
            Ok(task_id) => task_id,
            Err(err) => return internal_error(err),
        };

    let screenshot_path = if let Some(data_url) = &payload.screenshot_data_url {
        match state.store.write_screenshot(&task_id, data_url).await {
            Ok(path) => path,
            Err(StoreError::InvalidScreenshot(details)) => return invalid_request(details),
            Err(err) => return internal_error(err),
        }
    } else {
        payload.screenshot_path.clone()
    };

    let created_at = Utc::now();
    let session_id = SessionId::new(payload.session_id.clone());

    let mut packet = payload.ui_change_packet;
    packet.screenshot_path = screenshot_path.clone();
    packet.user_request = payload.pin.body.clone();

    let task = TaskRecord {
        task_id: task_id.clone(),
        created_at,
        updated_at: created_at,
        status: TaskStatus::Created,
        url: payload.url,
        viewport: payload.viewport,
        pin: Pin {
            x: payload.pin.x,
            y: payload.pin.y,
        },
        comment: TaskComment {
            body: payload.pin.body,
        },
        ui_change_packet: packet,
        screenshot_path: screenshot_path.clone(),
        provider: None,
        model: None,
        latest_session_id: Some(session_id.clone()),
        sessions: vec![session_id.clone()],
        summary: None,
        changed_files: vec![],
        error_code: None,
        error_message: None,
    };

    if let Err(err) = state.store.create_task(&task).await {
        return internal_error(err);
    }

    state.logger.info(
        "Task created",
        LogContext::event("task.created")
            .task(&task_id)
            .session(&session_id)
            .meta(serde_json::json!({ "screenshotPath": screenshot_path })),
    );

    (
        StatusCode::CREATED,
        Json(CreateTaskResponse {
            task_id: task_id.to_string(),
            session_id: session_id.to_string(),
            status: TaskStatus::Created,
            task_path: format!(".uipin/tasks/{}.json", task_id),
            events_url: events_url(task_id.as_str(), session_id.as_str()),
        }),
    )
        .into_response()
}

pub async fn submit_task(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<String>,
    Json(payload): Json<SubmitTaskRequest>,
) -> Response {
    let task_id = TaskId::new(task_id);

    match state.store.get_task(&task_id).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(ErrorBody::new("Task not found")),
            )
                .into_response()
        }
        Err(err) => return internal_error(err),
    }

    if let Err(details) = payload.validate() {
        return invalid_request(details);
    }

    // A follow-up resubmission replaces the request text, so the retry
    // prompt carries the new instructions instead of the original ones.
    if let Some(body) = payload.follow_up_body.as_deref() {
        let body = body.trim().to_string();
        let updated = state
            .store
            .update_task(&task_id, |mut current| {
                current.comment.body = body.clone();
                current.ui_change_packet.user_request = body.clone();
                current.updated_at = Utc::now();
                current
            })
            .await;
        if let Err(err) = updated {
            return internal_error(err);
        }
    }

    let session_id = SessionId::new(payload.session_id.clone());
    let run_input = RunTaskInput {
        task_id: task_id.clone(),
        session_id: session_id.clone(),
        provider: payload.provider,
        model: payload.model,
        dry_run: payload.dry_run,
        debug: payload.debug,
    };

    // Fire and forget: execution outcomes surface through the event stream
    // and the persisted records, never through this response.
    let runner = state.runner.clone();
    let logger = state.logger.clone();
    {
        let task_id = task_id.clone();
        let session_id = session_id.clone();
        tokio::spawn(async move {
            if let Err(err) = runner.run_task(run_input).await {
                logger.error(
                    "Provider task execution failed",
                    LogContext::event("task.run.error")
                        .task(&task_id)
                        .session(&session_id)
                        .meta(serde_json::json!({ "error": err.to_string() })),
                );
            }
        });
    }

    (
        StatusCode::ACCEPTED,
        Json(SubmitTaskResponse {
            task_id: task_id.to_string(),
            session_id: session_id.to_string(),
            status: TaskStatus::Queued,
            accepted_at: Utc::now(),
            events_url: events_url(task_id.as_str(), session_id.as_str()),
        }),
    )
        .into_response()
}

pub async fn cancel_task(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<String>,
    Json(payload): Json<CancelTaskRequest>,
) -> Response {
    if task_id.is_empty() || payload.session_id.is_empty() {
        return invalid_request("taskId and sessionId are required".to_string());
    }

    let task_id = TaskId::new(task_id);
    let session_id = SessionId::new(payload.session_id);
    state.runner.cancel_task(&task_id, &session_id).await;

    (
        StatusCode::ACCEPTED,
        Json(CancelTaskResponse {
            task_id: task_id.to_string(),
            session_id: session_id.to_string(),
            status: TaskStatus::Cancelled,
        }),
    )
        .into_response()
}
