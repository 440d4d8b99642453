//! Session records: one execution attempt of a Task.

use crate::ids::{SessionId, TaskId};
use crate::provider::ProviderName;
use crate::status::TaskStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One entry in a session's append-only event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionEvent {
    pub status: TaskStatus,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percent: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

/// One attempt to execute a Task via one provider+model combination.
///
/// `events` is append-only with non-decreasing timestamps; once `status` is
/// terminal no further event is appended and the status never changes again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub session_id: SessionId,
    pub task_id: TaskId,
    pub provider: ProviderName,
    pub model: String,
    pub status: TaskStatus,
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    pub events: Vec<SessionEvent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default)]
    pub changed_files: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl SessionRecord {
    /// Create a fresh session in the `queued` state with its initial event.
    pub fn queued(
        session_id: SessionId,
        task_id: TaskId,
        provider: ProviderName,
        model: impl Into<String>,
        dry_run: bool,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            session_id,
            task_id,
            provider,
            model: model.into(),
            status: TaskStatus::Queued,
            dry_run,
            started_at: now,
            updated_at: now,
            ended_at: None,
            events: vec![SessionEvent {
                status: TaskStatus::Queued,
                message: "Task queued".to_string(),
                percent: None,
                timestamp: now,
            }],
            summary: None,
            changed_files: vec![],
            error_code: None,
            error_message: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queued_session_has_initial_event() {
        let session = SessionRecord::queued(
            SessionId::new("s1"),
            TaskId::new("t1"),
            ProviderName::Codex,
            "gpt-5.3-codex-spark",
            false,
            Utc::now(),
        );
        assert_eq!(session.status, TaskStatus::Queued);
        assert_eq!(session.events.len(), 1);
        assert_eq!(session.events[0].message, "Task queued");
        assert_eq!(session.events[0].timestamp, session.started_at);
    }

    #[test]
    fn test_wire_format() {
        let session = SessionRecord::queued(
            SessionId::new("s1"),
            TaskId::new("t1"),
            ProviderName::Claude,
            "sonnet",
            true,
            Utc::now(),
        );
        let json = serde_json::to_value(&session).expect("serialize");
        assert_eq!(json["sessionId"], "s1");
        assert_eq!(json["dryRun"], true);
        assert_eq!(json["status"], "queued");
        assert!(json.get("endedAt").is_none());
    }
}
