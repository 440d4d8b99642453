//! The task runner: drives one session from `queued` to a terminal state.
//!
//! All session mutations for a run flow through a single loop that drains
//! the adapter's progress channel, so events for a session are persisted
//! and published strictly in order. Event timestamps are forced monotonic:
//! an event stamped at or before its predecessor is shifted forward by one
//! millisecond.

use crate::error::BridgeError;
use crate::event_bus::EventBus;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use uipin_core::provider::error_codes;
use uipin_core::{
    topic_key, BusEvent, ProviderName, SessionEvent, SessionId, SessionRecord, TaskId, TaskRecord,
    TaskStatus,
};
use uipin_providers::{
    ProviderAdapter, ProviderProgress, ProviderResult, ProviderRegistry, ProviderTaskInput,
};
use uipin_store::{ArtifactStore, JsonlLogger, LogContext};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10 * 60);
const DRY_RUN_TIMEOUT: Duration = Duration::from_secs(2 * 60);

/// Parameters of one submission.
#[derive(Debug, Clone)]
pub struct RunTaskInput {
    pub task_id: TaskId,
    pub session_id: SessionId,
    pub provider: ProviderName,
    pub model: String,
    pub dry_run: bool,
    pub debug: bool,
}

pub struct TaskRunner {
    cwd: PathBuf,
    store: Arc<ArtifactStore>,
    logger: JsonlLogger,
    bus: EventBus,
    registry: Arc<ProviderRegistry>,
    default_timeout: Duration,
    dry_run_timeout: Duration,
    in_flight: Mutex<HashMap<String, Arc<dyn ProviderAdapter>>>,
}

impl TaskRunner {
    pub fn new(
        cwd: impl Into<PathBuf>,
        store: Arc<ArtifactStore>,
        logger: JsonlLogger,
        bus: EventBus,
        registry: Arc<ProviderRegistry>,
    ) -> Self {
        Self {
            cwd: cwd.into(),
            store,
            logger,
            bus,
            registry,
            default_timeout: DEFAULT_TIMEOUT,
            dry_run_timeout: DRY_RUN_TIMEOUT,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Override the provider time budgets.
    pub fn with_timeouts(mut self, default_timeout: Duration, dry_run_timeout: Duration) -> Self {
        self.default_timeout = default_timeout;
        self.dry_run_timeout = dry_run_timeout;
        self
    }

    /// Forward a cancel request to the adapter running this session. A
    /// no-op when nothing is in flight for the pair.
    pub async fn cancel_task(&self, task_id: &TaskId, session_id: &SessionId) {
        let key = topic_key(task_id, session_id);
        let adapter = self.in_flight.lock().await.get(&key).cloned();
        let Some(adapter) = adapter else {
            return;
        };

        adapter.cancel_task(task_id, session_id).await;
        self.logger.info(
            "Cancel request forwarded to provider",
            LogContext::event("task.cancel")
                .task(task_id)
                .session(session_id),
        );
    }

    /// Execute one session to its terminal state.
    pub async fn run_task(&self, input: RunTaskInput) -> Result<ProviderResult, BridgeError> {
        let RunTaskInput {
            task_id,
            session_id,
            provider,
            model,
            dry_run,
            debug,
        } = input;

        let task = self
            .store
            .get_task(&task_id)
            .await?
            .ok_or_else(|| BridgeError::TaskNotFound(task_id.to_string()))?;

        let queued_at = Utc::now();
        let mut last_ms = queued_at.timestamp_millis();

        self.store
            .update_task(&task_id, |mut current| {
                current.status = TaskStatus::Queued;
                current.provider = Some(provider);
                current.model = Some(model.clone());
                current.attach_session(session_id.clone());
                current.updated_at = queued_at;
                current
            })
            .await?;

        self.store
            .create_session(&SessionRecord::queued(
                session_id.clone(),
                task_id.clone(),
                provider,
                model.clone(),
                dry_run,
                queued_at,
            ))
            .await?;

        let adapter = match self.resolve_adapter(provider) {
            Ok(adapter) => adapter,
            Err(result) => {
                self.persist_terminal_state(
                    &task_id, &session_id, &result, provider, &model, dry_run, &mut last_ms,
                )
                .await?;
                return Ok(result);
            }
        };

        self.bus.publish(
            &task_id,
            &session_id,
            &BusEvent::Progress {
                task_id: task_id.clone(),
                session_id: session_id.clone(),
                status: TaskStatus::Queued,
                message: "Task queued".to_string(),
                percent: None,
                timestamp: queued_at,
            },
        );

        let key = topic_key(&task_id, &session_id);
        self.in_flight.lock().await.insert(key.clone(), adapter.clone());

        let timeout = if dry_run {
            self.dry_run_timeout
        } else {
            self.default_timeout
        };

        let (progress_tx, mut progress_rx) = mpsc::unbounded_channel();
        let provider_input = ProviderTaskInput {
            task_id: task_id.clone(),
            session_id: session_id.clone(),
            packet: task.ui_change_packet.clone(),
            prompt: build_prompt(&task),
            model: model.clone(),
            dry_run,
            debug,
            cwd: self.cwd.clone(),
            timeout_ms: timeout.as_millis() as u64,
        };

        let mut adapter_task = tokio::spawn({
            let adapter = adapter.clone();
            async move { adapter.submit_task(provider_input, progress_tx).await }
        });

        let deadline = tokio::time::sleep(timeout);
        tokio::pin!(deadline);

        let result = loop {
            tokio::select! {
                Some(event) = progress_rx.recv() => {
                    if let Err(err) = self
                        .handle_progress(&task_id, &session_id, event, &mut last_ms)
                        .await
                    {
                        tracing::warn!(error = %err, "Failed to persist progress event");
                    }
                }
                joined = &mut adapter_task => {
                    break match joined {
                        Ok(result) => result,
                        Err(err) => ProviderResult::error(
                            "Provider execution failed",
                            vec![],
                            error_codes::PROCESS_FAILED,
                            err.to_string(),
                        ),
                    };
                }
                _ = &mut deadline => {
                    adapter_task.abort();
                    let timeout_ms = timeout.as_millis();
                    break ProviderResult::timed_out(
                        format!("Task timed out after {}ms", timeout_ms),
                        format!("Provider timed out after {}ms", timeout_ms),
                    );
                }
            }
        };

        // The adapter can settle while progress is still buffered in the
        // channel. Close the channel so nothing sent past this point lands,
        // then drain what was already buffered: those events preceded the
        // terminal outcome and must be persisted before it.
        progress_rx.close();
        while let Ok(event) = progress_rx.try_recv() {
            if let Err(err) = self
                .handle_progress(&task_id, &session_id, event, &mut last_ms)
                .await
            {
                tracing::warn!(error = %err, "Failed to persist progress event");
            }
        }

        self.persist_terminal_state(
            &task_id, &session_id, &result, provider, &model, dry_run, &mut last_ms,
        )
        .await?;
        self.in_flight.lock().await.remove(&key);
        Ok(result)
    }

    fn resolve_adapter(
        &self,
        provider: ProviderName,
    ) -> Result<Arc<dyn ProviderAdapter>, ProviderResult> {
        let Some(adapter) = self.registry.get(provider) else {
            return Err(ProviderResult::error(
                format!("Provider {} is not available in this runtime", provider),
                vec![],
                error_codes::PROVIDER_UNAVAILABLE,
                format!("Provider {} was not registered", provider),
            ));
        };
        if !self.registry.is_enabled(provider) {
            return Err(ProviderResult::error(
                format!("Provider {} is not enabled", provider),
                vec![],
                error_codes::PROVIDER_NOT_ENABLED,
                format!("The {} adapter is registered but not enabled", provider),
            ));
        }
        Ok(adapter)
    }

    async fn handle_progress(
        &self,
        task_id: &TaskId,
        session_id: &SessionId,
        event: ProviderProgress,
        last_ms: &mut i64,
    ) -> Result<(), BridgeError> {
        let timestamp = force_monotonic(event.timestamp, last_ms);

        let session = self
            .store
            .update_session(session_id, |mut session| {
                if session.status.is_terminal() {
                    return session;
                }
                session.status = event.status;
                session.updated_at = timestamp;
                session.events.push(SessionEvent {
                    status: event.status,
                    message: event.message.clone(),
                    percent: event.percent,
                    timestamp,
                });
                session
            })
            .await?;
        if session.status.is_terminal() {
            return Ok(());
        }

        if matches!(event.status, TaskStatus::Running | TaskStatus::Queued) {
            self.store
                .update_task(task_id, |mut current| {
                    if current.status.is_terminal() {
                        return current;
                    }
                    current.status = event.status;
                    current.updated_at = timestamp;
                    current
                })
                .await?;
        }

        self.bus.publish(
            task_id,
            session_id,
            &BusEvent::Progress {
                task_id: task_id.clone(),
                session_id: session_id.clone(),
                status: event.status,
                message: event.message.clone(),
                percent: event.percent,
                timestamp,
            },
        );

        self.logger.debug(
            &event.message,
            LogContext::event("task.progress")
                .task(task_id)
                .session(session_id)
                .meta(serde_json::json!({
                    "status": event.status.to_string(),
                    "percent": event.percent,
                })),
        );
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    async fn persist_terminal_state(
        &self,
        task_id: &TaskId,
        session_id: &SessionId,
        result: &ProviderResult,
        provider: ProviderName,
        model: &str,
        dry_run: bool,
        last_ms: &mut i64,
    ) -> Result<(), BridgeError> {
        let finished_at = force_monotonic(Utc::now(), last_ms);
        let status = result.status.as_task_status();

        self.store
            .update_session(session_id, |mut session| {
                session.provider = provider;
                session.model = model.to_string();
                session.dry_run = dry_run;
                session.status = status;
                session.summary = Some(result.summary.clone());
                session.changed_files = result.changed_files.clone();
                session.error_code = result.error_code.clone();
                session.error_message = result.error_message.clone();
                session.ended_at = Some(finished_at);
                session.updated_at = finished_at;
                session.events.push(SessionEvent {
                    status,
                    message: result.summary.clone(),
                    percent: None,
                    timestamp: finished_at,
                });
                session
            })
            .await?;

        self.store
            .update_task(task_id, |mut current| {
                current.status = status;
                current.updated_at = finished_at;
                current.provider = Some(provider);
                current.model = Some(model.to_string());
                current.summary = Some(result.summary.clone());
                current.changed_files = result.changed_files.clone();
                current.error_code = result.error_code.clone();
                current.error_message = result.error_message.clone();
                current
            })
            .await?;

        self.bus.publish(
            task_id,
            session_id,
            &BusEvent::Terminal {
                task_id: task_id.clone(),
                session_id: session_id.clone(),
                status: result.status,
                summary: result.summary.clone(),
                changed_files: result.changed_files.clone(),
                error_code: result.error_code.clone(),
                error_message: result.error_message.clone(),
                timestamp: finished_at,
            },
        );

        self.logger.info(
            &result.summary,
            LogContext::event("task.terminal")
                .task(task_id)
                .session(session_id)
                .meta(serde_json::json!({
                    "status": status.to_string(),
                    "changedFiles": result.changed_files,
                    "errorCode": result.error_code,
                })),
        );
        Ok(())
    }
}

/// Shift a timestamp forward so it strictly follows `last_ms`, updating the
/// cursor.
fn force_monotonic(timestamp: DateTime<Utc>, last_ms: &mut i64) -> DateTime<Utc> {
    let ms = timestamp.timestamp_millis();
    let next = if ms > *last_ms { ms } else { *last_ms + 1 };
    *last_ms = next;
    DateTime::<Utc>::from_timestamp_millis(next).unwrap_or(timestamp)
}

/// Assemble the provider prompt from the task's captured context.
fn build_prompt(task: &TaskRecord) -> String {
    let packet = &task.ui_change_packet;
    let bounding_box = serde_json::to_string(&packet.element.bounding_box).unwrap_or_default();
    let styles = serde_json::to_string(&packet.computed_style_summary).unwrap_or_default();

    [
        "You are implementing a UI change request from UIPin.".to_string(),
        "Scope guardrails (must follow):".to_string(),
        "- Implement only the requested UI change.".to_string(),
        "- Do not edit, reformat, or reorganize unrelated files.".to_string(),
        "- Never revert, overwrite, or clean up unrelated repo changes (other agents may be editing in parallel).".to_string(),
        "- If unrelated files are modified or dirty, leave them untouched.".to_string(),
        "- If you cannot complete the request without touching unrelated areas, stop and report the exact blocker.".to_string(),
        format!("User request: {}", task.comment.body),
        format!("Page URL: {}", task.url),
        format!(
            "Element: <{}> text=\"{}\"",
            packet.element.tag,
            packet.element.text.as_deref().unwrap_or_default()
        ),
        format!("Bounding box: {}", bounding_box),
        format!("Nearby text: {}", packet.nearby_text.join(" | ")),
        format!("DOM snippet: {}", packet.dom_snippet),
        format!("Computed style summary: {}", styles),
        format!("Screenshot path: {}", task.screenshot_path),
        "Apply the change in local files and summarize changed files.".to_string(),
    ]
    .join("\n")
}
