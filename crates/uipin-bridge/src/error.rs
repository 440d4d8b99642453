//! Bridge errors.

use thiserror::Error;
use uipin_store::StoreError;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
