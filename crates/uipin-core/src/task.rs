//! Task records and the UI change packet.

use crate::ids::{SessionId, TaskId};
use crate::provider::ProviderName;
use crate::status::TaskStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Browser viewport dimensions at pin time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// Page-space bounding box of the targeted element.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Where the user placed the pin on the page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pin {
    pub x: f64,
    pub y: f64,
}

/// The user's natural-language change request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskComment {
    pub body: String,
}

/// Snapshot of the DOM element the pin targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementDescriptor {
    pub tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Attribute map; values may be null in the wire format.
    pub attributes: HashMap<String, Option<String>>,
    pub bounding_box: BoundingBox,
}

impl ElementDescriptor {
    /// Attribute value lookup that flattens the double Option.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).and_then(|v| v.as_deref())
    }
}

/// Structured description of the targeted element and page context that the
/// overlay captures when a pin is placed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiChangePacket {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub url: String,
    pub viewport: Viewport,
    pub element: ElementDescriptor,
    pub nearby_text: Vec<String>,
    pub dom_snippet: String,
    pub computed_style_summary: HashMap<String, String>,
    pub screenshot_path: String,
    pub user_request: String,
}

/// One user-initiated UI change request, persisted independent of any
/// execution attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    pub task_id: TaskId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub status: TaskStatus,
    pub url: String,
    pub viewport: Viewport,
    pub pin: Pin,
    pub comment: TaskComment,
    pub ui_change_packet: UiChangePacket,
    pub screenshot_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<ProviderName>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_session_id: Option<SessionId>,
    /// Every session id ever attached to this task. Grows, never shrinks.
    pub sessions: Vec<SessionId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default)]
    pub changed_files: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl TaskRecord {
    /// Record a session id, keeping the set duplicate-free while preserving
    /// insertion order.
    pub fn attach_session(&mut self, session_id: SessionId) {
        if !self.sessions.contains(&session_id) {
            self.sessions.push(session_id.clone());
        }
        self.latest_session_id = Some(session_id);
    }
}
