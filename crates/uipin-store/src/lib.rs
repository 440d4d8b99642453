//! UIPin Artifact Store
//!
//! Owns the project-local `.uipin/` directory: task and session records,
//! screenshots, runtime logs, and the config file. All record writes go
//! through an atomic temp-file-plus-rename protocol so a reader never
//! observes a partially written file, even under a crash mid-write.

pub mod config;
pub mod fs;
pub mod log;
pub mod store;

mod error;

pub use config::{ensure_config_file, resolve_config, ConfigOverrides};
pub use error::StoreError;
pub use log::{JsonlLogger, LogContext, LogLevel, RuntimeLogEvent};
pub use store::{ArtifactStore, PruneOptions, PruneResult};
