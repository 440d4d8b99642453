//! Lifecycle statuses for Tasks and Sessions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a Task or Session.
///
/// Tasks start at `Created`; sessions enter at `Queued`. The terminal
/// statuses are `Completed`, `Error`, `Cancelled` and `Timeout` - once a
/// record reaches one of them its status never changes again.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Task persisted, no submission yet.
    #[default]
    Created,
    /// Submission accepted, provider not yet producing output.
    Queued,
    /// Provider process is producing output.
    Running,
    /// Provider finished successfully.
    Completed,
    /// Provider failed or was unavailable.
    Error,
    /// Execution was cancelled on request.
    Cancelled,
    /// Execution exceeded its timeout budget.
    Timeout,
}

impl TaskStatus {
    /// Returns true if the status is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Error | Self::Cancelled | Self::Timeout
        )
    }

    /// Returns true if the status is still active (not terminal).
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Created => "created",
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Error => "error",
            Self::Cancelled => "cancelled",
            Self::Timeout => "timeout",
        };
        write!(f, "{}", s)
    }
}

/// Terminal outcome of one provider execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TerminalStatus {
    Completed,
    Error,
    Cancelled,
    Timeout,
}

impl TerminalStatus {
    /// Widen into the shared lifecycle status enum.
    pub fn as_task_status(&self) -> TaskStatus {
        match self {
            Self::Completed => TaskStatus::Completed,
            Self::Error => TaskStatus::Error,
            Self::Cancelled => TaskStatus::Cancelled,
            Self::Timeout => TaskStatus::Timeout,
        }
    }
}

impl fmt::Display for TerminalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_task_status().fmt(f)
    }
}
