//! Codex CLI adapter.

use crate::adapter::{ProviderAdapter, ProviderProgress, ProviderResult, ProviderTaskInput};
use crate::fixture;
use crate::output::{extract_changed_files, extract_summary};
use crate::process::{command_preview, split_args, CliCommand, ProcessSupervisor, RunOutcome};
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::mpsc;
use uipin_core::provider::error_codes;
use uipin_core::{topic_key, ProviderName, SessionId, TaskId};

pub struct CodexAdapter {
    supervisor: ProcessSupervisor,
    fixture: bool,
}

impl CodexAdapter {
    pub fn new(fixture: bool) -> Self {
        Self {
            supervisor: ProcessSupervisor::new(),
            fixture,
        }
    }

    fn build_command(&self, input: &ProviderTaskInput) -> CliCommand {
        let program =
            std::env::var("UIPIN_CODEX_BIN").unwrap_or_else(|_| "codex".to_string());
        let mut args = split_args(
            &std::env::var("UIPIN_CODEX_ARGS").unwrap_or_else(|_| "exec".to_string()),
        );
        args.push("--model".to_string());
        args.push(input.model.clone());
        if input.dry_run {
            args.push("--dry-run".to_string());
        }
        args.push(input.prompt.clone());
        CliCommand { program, args }
    }
}

#[async_trait]
impl ProviderAdapter for CodexAdapter {
    fn name(&self) -> ProviderName {
        ProviderName::Codex
    }

    async fn submit_task(
        &self,
        input: ProviderTaskInput,
        progress: mpsc::UnboundedSender<ProviderProgress>,
    ) -> ProviderResult {
        if self.fixture {
            return fixture::run_fixture(&input, &progress).await;
        }

        let command = self.build_command(&input);
        let _ = progress.send(ProviderProgress::running(
            format!("Running Codex command: {}", command_preview(&command)),
            Some(5.0),
        ));

        let key = topic_key(&input.task_id, &input.session_id);
        let outcome = self
            .supervisor
            .run(
                &key,
                command,
                &input.cwd,
                Duration::from_millis(input.timeout_ms),
                "Codex",
                &progress,
            )
            .await;

        match outcome {
            RunOutcome::TimedOut { stderr } => ProviderResult::timed_out(
                format!("Codex timed out after {}ms", input.timeout_ms),
                if stderr.is_empty() {
                    "Timed out".to_string()
                } else {
                    stderr
                },
            ),
            RunOutcome::SpawnFailed { message } => ProviderResult::error(
                "Failed to start Codex process",
                vec![],
                error_codes::PROCESS_FAILED,
                message,
            ),
            RunOutcome::Exited {
                stdout,
                stderr,
                code,
                interrupted,
            } => {
                let changed_files = extract_changed_files(&stdout);
                let summary = extract_summary(&stdout);

                if code == Some(0) {
                    ProviderResult::completed(
                        summary.unwrap_or_else(|| "Codex execution completed".to_string()),
                        changed_files,
                    )
                } else if interrupted {
                    ProviderResult::cancelled(
                        "Codex execution cancelled",
                        changed_files,
                        if stderr.is_empty() {
                            "Cancelled".to_string()
                        } else {
                            stderr
                        },
                    )
                } else {
                    ProviderResult::error(
                        "Codex execution failed",
                        changed_files,
                        error_codes::PROCESS_FAILED,
                        if stderr.is_empty() {
                            format!("Process exited with code {}", describe_code(code))
                        } else {
                            stderr
                        },
                    )
                }
            }
        }
    }

    async fn cancel_task(&self, task_id: &TaskId, session_id: &SessionId) {
        self.supervisor.cancel(&topic_key(task_id, session_id)).await;
    }
}

pub(crate) fn describe_code(code: Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "unknown".to_string(),
    }
}
