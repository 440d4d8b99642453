//! Newtype wrappers for identifiers to ensure type safety.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a Task.
///
/// Task ids are filesystem-safe: they name the task's JSON record and its
/// screenshot file directly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(String);

impl TaskId {
    /// Create a new TaskId from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a new date-prefixed TaskId, e.g. `2026-08-27-a1b2c3`.
    pub fn generate() -> Self {
        let date = Utc::now().format("%Y-%m-%d");
        let bytes: [u8; 3] = rand::random();
        Self(format!(
            "{}-{:02x}{:02x}{:02x}",
            date, bytes[0], bytes[1], bytes[2]
        ))
    }

    /// Sanitize a client-suggested id into a filesystem-safe candidate.
    ///
    /// Any character outside `[A-Za-z0-9-_]` becomes `-`; the result is
    /// truncated to 64 characters.
    pub fn sanitize(candidate: &str) -> Self {
        let cleaned: String = candidate
            .chars()
            .take(64)
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '-'
                }
            })
            .collect();
        Self(cleaned)
    }

    /// Get the inner string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume and return the inner string.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for TaskId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Unique identifier for a Session (one execution attempt of a Task).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    /// Create a new SessionId from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a new random SessionId.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Get the inner string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume and return the inner string.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Topic key for the event bus: `taskId:sessionId`.
pub fn topic_key(task_id: &TaskId, session_id: &SessionId) -> String {
    format!("{}:{}", task_id, session_id)
}
