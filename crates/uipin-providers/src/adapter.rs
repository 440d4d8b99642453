//! The provider adapter contract.
//!
//! An adapter wraps one coding-agent CLI. It receives a fully built prompt
//! plus the captured UI change packet, streams progress through a channel
//! while the agent runs, and always resolves to a terminal result; process
//! failures surface as `error` results with a stable error code rather than
//! as `Err` values.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use tokio::sync::mpsc;
use uipin_core::provider::error_codes;
use uipin_core::{ProviderName, SessionId, TaskId, TaskStatus, TerminalStatus, UiChangePacket};

/// Everything an adapter needs to execute one session.
#[derive(Debug, Clone)]
pub struct ProviderTaskInput {
    pub task_id: TaskId,
    pub session_id: SessionId,
    /// The captured element and page context for this task.
    pub packet: UiChangePacket,
    /// The complete prompt handed to the agent CLI.
    pub prompt: String,
    pub model: String,
    pub dry_run: bool,
    pub debug: bool,
    /// Project directory the agent runs in.
    pub cwd: PathBuf,
    pub timeout_ms: u64,
}

/// An intermediate progress update emitted while the agent runs.
#[derive(Debug, Clone)]
pub struct ProviderProgress {
    pub status: TaskStatus,
    pub message: String,
    pub percent: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl ProviderProgress {
    pub fn running(message: impl Into<String>, percent: Option<f64>) -> Self {
        Self {
            status: TaskStatus::Running,
            message: message.into(),
            percent,
            timestamp: Utc::now(),
        }
    }
}

/// The terminal outcome of one session.
#[derive(Debug, Clone)]
pub struct ProviderResult {
    pub status: TerminalStatus,
    pub summary: String,
    pub changed_files: Vec<String>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
}

impl ProviderResult {
    pub fn completed(summary: impl Into<String>, changed_files: Vec<String>) -> Self {
        Self {
            status: TerminalStatus::Completed,
            summary: summary.into(),
            changed_files,
            error_code: None,
            error_message: None,
        }
    }

    pub fn error(
        summary: impl Into<String>,
        changed_files: Vec<String>,
        error_code: &str,
        error_message: impl Into<String>,
    ) -> Self {
        Self {
            status: TerminalStatus::Error,
            summary: summary.into(),
            changed_files,
            error_code: Some(error_code.to_string()),
            error_message: Some(error_message.into()),
        }
    }

    pub fn cancelled(
        summary: impl Into<String>,
        changed_files: Vec<String>,
        error_message: impl Into<String>,
    ) -> Self {
        Self {
            status: TerminalStatus::Cancelled,
            summary: summary.into(),
            changed_files,
            error_code: Some(error_codes::PROCESS_FAILED.to_string()),
            error_message: Some(error_message.into()),
        }
    }

    pub fn timed_out(summary: impl Into<String>, error_message: impl Into<String>) -> Self {
        Self {
            status: TerminalStatus::Timeout,
            summary: summary.into(),
            changed_files: vec![],
            error_code: Some(error_codes::PROVIDER_TIMEOUT.to_string()),
            error_message: Some(error_message.into()),
        }
    }
}

/// One coding-agent integration.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn name(&self) -> ProviderName;

    /// Execute a session to completion. Progress updates go through the
    /// channel; the returned result is always terminal.
    async fn submit_task(
        &self,
        input: ProviderTaskInput,
        progress: mpsc::UnboundedSender<ProviderProgress>,
    ) -> ProviderResult;

    /// Request cancellation of an in-flight session. A no-op when the
    /// session is not running.
    async fn cancel_task(&self, task_id: &TaskId, session_id: &SessionId);
}
