//! UIPin Core Domain Types
//!
//! This crate contains pure domain types with no dependencies on:
//! - Network/HTTP
//! - Filesystem
//! - Runtime specifics
//!
//! All types here represent the core business domain of UIPin: tasks,
//! sessions, their lifecycle statuses, and the events that flow between
//! the bridge server and its subscribers.

pub mod config;
pub mod error;
pub mod event;
pub mod ids;
pub mod provider;
pub mod session;
pub mod status;
pub mod task;

// Re-export commonly used types
pub use config::UipinConfig;
pub use error::CoreError;
pub use event::BusEvent;
pub use ids::{topic_key, SessionId, TaskId};
pub use provider::{error_codes, ProviderName};
pub use session::{SessionEvent, SessionRecord};
pub use status::{TaskStatus, TerminalStatus};
pub use task::{BoundingBox, ElementDescriptor, Pin, TaskComment, TaskRecord, UiChangePacket, Viewport};
