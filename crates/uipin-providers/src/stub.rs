//! Cursor adapter scaffold.
//!
//! Registered so the provider name round-trips through config and records,
//! but not enabled: every submission resolves to an error result.

use crate::adapter::{ProviderAdapter, ProviderProgress, ProviderResult, ProviderTaskInput};
use async_trait::async_trait;
use tokio::sync::mpsc;
use uipin_core::provider::error_codes;
use uipin_core::{ProviderName, SessionId, TaskId};

#[derive(Default)]
pub struct CursorAdapter;

#[async_trait]
impl ProviderAdapter for CursorAdapter {
    fn name(&self) -> ProviderName {
        ProviderName::Cursor
    }

    async fn submit_task(
        &self,
        _input: ProviderTaskInput,
        _progress: mpsc::UnboundedSender<ProviderProgress>,
    ) -> ProviderResult {
        ProviderResult::error(
            "Cursor provider is not enabled",
            vec![],
            error_codes::PROVIDER_NOT_ENABLED,
            "The cursor adapter is scaffolded but not enabled",
        )
    }

    async fn cancel_task(&self, _task_id: &TaskId, _session_id: &SessionId) {}
}
