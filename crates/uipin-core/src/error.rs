//! Core domain errors.

use thiserror::Error;

/// Core domain errors for UIPin.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Task not found.
    #[error("Task not found: {0}")]
    TaskNotFound(String),

    /// Session not found.
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// Provider name not part of the closed set.
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    /// Invalid input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
