//! Shared bridge server state.

use crate::event_bus::EventBus;
use crate::runner::TaskRunner;
use std::path::PathBuf;
use std::sync::Arc;
use uipin_store::{ArtifactStore, JsonlLogger};

pub struct AppState {
    pub store: Arc<ArtifactStore>,
    pub logger: JsonlLogger,
    pub bus: EventBus,
    pub runner: Arc<TaskRunner>,
    /// Location of the built overlay bundle served at `/overlay.js`; a
    /// fallback script is served when unset or unreadable.
    pub overlay_script_path: Option<PathBuf>,
}
