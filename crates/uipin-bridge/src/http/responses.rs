//! Request and response bodies for the bridge API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uipin_core::{ProviderName, TaskStatus, UiChangePacket, Viewport};

/// Pin placement plus the user's request text, as sent by the overlay.
#[derive(Debug, Clone, Deserialize)]
pub struct PinRequest {
    pub x: f64,
    pub y: f64,
    pub body: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    pub session_id: String,
    pub url: String,
    pub viewport: Viewport,
    pub pin: PinRequest,
    pub ui_change_packet: UiChangePacket,
    pub screenshot_path: String,
    #[serde(default)]
    pub screenshot_data_url: Option<String>,
    #[serde(default)]
    pub client_task_id: Option<String>,
}

impl CreateTaskRequest {
    pub fn validate(&self) -> Result<(), String> {
        if self.session_id.is_empty() {
            return Err("sessionId must not be empty".to_string());
        }
        if self.url.is_empty() {
            return Err("url must not be empty".to_string());
        }
        if self.pin.body.trim().is_empty() {
            return Err("pin.body must not be empty".to_string());
        }
        if self.screenshot_path.is_empty() {
            return Err("screenshotPath must not be empty".to_string());
        }
        if let Some(data_url) = &self.screenshot_data_url {
            if !data_url.starts_with("data:image/") {
                return Err("screenshotDataUrl must be an image data URL".to_string());
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskResponse {
    pub task_id: String,
    pub session_id: String,
    pub status: TaskStatus,
    pub task_path: String,
    pub events_url: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitTaskRequest {
    pub session_id: String,
    pub provider: ProviderName,
    pub model: String,
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default)]
    pub debug: bool,
    #[serde(default)]
    pub follow_up_body: Option<String>,
}

impl SubmitTaskRequest {
    pub fn validate(&self) -> Result<(), String> {
        if self.session_id.is_empty() {
            return Err("sessionId must not be empty".to_string());
        }
        if self.model.is_empty() {
            return Err("model must not be empty".to_string());
        }
        if let Some(body) = &self.follow_up_body {
            if body.trim().is_empty() {
                return Err("followUpBody must not be blank".to_string());
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitTaskResponse {
    pub task_id: String,
    pub session_id: String,
    pub status: TaskStatus,
    pub accepted_at: DateTime<Utc>,
    pub events_url: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelTaskRequest {
    #[serde(default)]
    pub session_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelTaskResponse {
    pub task_id: String,
    pub session_id: String,
    pub status: TaskStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: Some(details.into()),
        }
    }
}

/// The events URL for a task+session pair, as returned to clients.
pub fn events_url(task_id: &str, session_id: &str) -> String {
    format!("/api/tasks/{}/events?sessionId={}", task_id, session_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submit_rejects_blank_follow_up() {
        let request = SubmitTaskRequest {
            session_id: "s1".into(),
            provider: ProviderName::Codex,
            model: "m".into(),
            dry_run: false,
            debug: false,
            follow_up_body: Some("   ".into()),
        };
        assert!(request.validate().is_err());

        let request = SubmitTaskRequest {
            follow_up_body: Some("also fix the hover state".into()),
            ..request
        };
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_events_url_shape() {
        assert_eq!(
            events_url("t1", "s1"),
            "/api/tasks/t1/events?sessionId=s1"
        );
    }
}
