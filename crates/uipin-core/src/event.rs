//! Events published on the bridge's event bus and delivered over SSE.

use crate::ids::{SessionId, TaskId};
use crate::status::{TaskStatus, TerminalStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A message on the event bus, keyed by `(taskId, sessionId)`.
///
/// The `type` tag doubles as the SSE event name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BusEvent {
    /// A provider progress notification.
    #[serde(rename_all = "camelCase")]
    Progress {
        task_id: TaskId,
        session_id: SessionId,
        status: TaskStatus,
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        percent: Option<f64>,
        timestamp: DateTime<Utc>,
    },
    /// The final outcome of a session.
    #[serde(rename_all = "camelCase")]
    Terminal {
        task_id: TaskId,
        session_id: SessionId,
        status: TerminalStatus,
        summary: String,
        changed_files: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error_code: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error_message: Option<String>,
        timestamp: DateTime<Utc>,
    },
    /// Keep-alive for idle SSE connections.
    Heartbeat { timestamp: DateTime<Utc> },
}

impl BusEvent {
    /// A heartbeat stamped now.
    pub fn heartbeat() -> Self {
        Self::Heartbeat {
            timestamp: Utc::now(),
        }
    }

    /// The SSE event name for this message.
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::Progress { .. } => "progress",
            Self::Terminal { .. } => "terminal",
            Self::Heartbeat { .. } => "heartbeat",
        }
    }
}
