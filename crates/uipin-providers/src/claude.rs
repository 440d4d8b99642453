//! Claude CLI adapter.
//!
//! Differs from Codex in two ways: dry runs swap the permission mode to
//! `plan` instead of passing a dedicated flag, and stdout is a JSON
//! envelope that can flag an error even when the process exits zero.

use crate::adapter::{ProviderAdapter, ProviderProgress, ProviderResult, ProviderTaskInput};
use crate::codex::describe_code;
use crate::fixture;
use crate::output::{extract_changed_files, extract_summary, parse_structured_output};
use crate::process::{command_preview, split_args, CliCommand, ProcessSupervisor, RunOutcome};
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::mpsc;
use uipin_core::provider::error_codes;
use uipin_core::{topic_key, ProviderName, SessionId, TaskId};

const DEFAULT_ARGS: &str = "-p --output-format json --permission-mode acceptEdits";

pub struct ClaudeAdapter {
    supervisor: ProcessSupervisor,
    fixture: bool,
}

impl ClaudeAdapter {
    pub fn new(fixture: bool) -> Self {
        Self {
            supervisor: ProcessSupervisor::new(),
            fixture,
        }
    }

    fn build_command(&self, input: &ProviderTaskInput) -> CliCommand {
        let program =
            std::env::var("UIPIN_CLAUDE_BIN").unwrap_or_else(|_| "claude".to_string());
        let base = split_args(
            &std::env::var("UIPIN_CLAUDE_ARGS").unwrap_or_else(|_| DEFAULT_ARGS.to_string()),
        );
        let mut args = if input.dry_run {
            let mut stripped = strip_permission_mode_args(base);
            stripped.push("--permission-mode".to_string());
            stripped.push("plan".to_string());
            stripped
        } else {
            base
        };
        args.push("--model".to_string());
        args.push(input.model.clone());
        args.push(input.prompt.clone());
        CliCommand { program, args }
    }
}

/// Drop any `--permission-mode <value>` or `--permission-mode=<value>`
/// from a base argument list.
fn strip_permission_mode_args(args: Vec<String>) -> Vec<String> {
    let mut next = Vec::with_capacity(args.len());
    let mut skip_value = false;
    for arg in args {
        if skip_value {
            skip_value = false;
            continue;
        }
        if arg == "--permission-mode" {
            skip_value = true;
            continue;
        }
        if arg.starts_with("--permission-mode=") {
            continue;
        }
        next.push(arg);
    }
    next
}

#[async_trait]
impl ProviderAdapter for ClaudeAdapter {
    fn name(&self) -> ProviderName {
        ProviderName::Claude
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
            format!("Running Claude command: {}", command_preview(&command)),
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
                "Claude",
                &progress,
            )
            .await;

        match outcome {
            RunOutcome::TimedOut { stderr } => ProviderResult::timed_out(
                format!("Claude timed out after {}ms", input.timeout_ms),
                if stderr.is_empty() {
                    "Timed out".to_string()
                } else {
                    stderr
                },
            ),
            RunOutcome::SpawnFailed { message } => ProviderResult::error(
                "Failed to start Claude process",
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
                let parsed = parse_structured_output(&stdout);
                let changed_files = extract_changed_files(&parsed.text);
                let summary = extract_summary(&parsed.text);

                if code == Some(0) && !parsed.is_error {
                    ProviderResult::completed(
                        summary.unwrap_or_else(|| "Claude execution completed".to_string()),
                        changed_files,
                    )
                } else if code == Some(0) && parsed.is_error {
                    let message = if !parsed.text.is_empty() {
                        parsed.text
                    } else if !stderr.is_empty() {
                        stderr
                    } else {
                        "Claude returned is_error=true".to_string()
                    };
                    ProviderResult::error(
                        summary.unwrap_or_else(|| "Claude execution failed".to_string()),
                        changed_files,
                        error_codes::PROCESS_FAILED,
                        message,
                    )
                } else if interrupted {
                    ProviderResult::cancelled(
                        "Claude execution cancelled",
                        changed_files,
                        if stderr.is_empty() {
                            "Cancelled".to_string()
                        } else {
                            stderr
                        },
                    )
                } else {
                    ProviderResult::error(
                        summary.unwrap_or_else(|| "Claude execution failed".to_string()),
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
