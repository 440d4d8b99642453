//! Store errors.

use thiserror::Error;

/// Errors from the artifact store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Invalid screenshot payload: {0}")]
    InvalidScreenshot(String),

    #[error("Failed to allocate a unique task id")]
    TaskIdExhausted,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
