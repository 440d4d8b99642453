//! Supervised execution of agent CLI processes.
//!
//! Tracks one process per `task:session` key so cancellation can find it.
//! Cancellation sends SIGINT, waits 500ms for a graceful exit, and
//! escalates to SIGTERM if the process is still in flight. The run itself
//! enforces the caller's timeout with SIGTERM.

use crate::adapter::ProviderProgress;
use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::sync::{mpsc, Mutex};

const SIGINT: i32 = 2;
const SIGTERM: i32 = 15;

const CANCEL_GRACE: Duration = Duration::from_millis(500);

/// A fully resolved CLI invocation.
#[derive(Debug, Clone)]
pub struct CliCommand {
    pub program: String,
    pub args: Vec<String>,
}

/// Render a command for log messages with the trailing prompt argument
/// replaced by a placeholder.
pub fn command_preview(command: &CliCommand) -> String {
    let mut shown: Vec<&str> = command.args.iter().map(String::as_str).collect();
    if let Some(last) = shown.last_mut() {
        *last = "<prompt>";
    }
    format!("{} {}", command.program, shown.join(" "))
}

/// Split a whitespace-delimited argument string from the environment.
pub fn split_args(raw: &str) -> Vec<String> {
    raw.split_whitespace().map(str::to_string).collect()
}

/// How a supervised run ended.
#[derive(Debug)]
pub enum RunOutcome {
    Exited {
        stdout: String,
        stderr: String,
        code: Option<i32>,
        /// Terminated by SIGINT or SIGTERM rather than exiting on its own.
        interrupted: bool,
    },
    TimedOut {
        stderr: String,
    },
    SpawnFailed {
        message: String,
    },
}

/// Runs agent CLIs and keeps a pid registry for cancellation.
#[derive(Default)]
pub struct ProcessSupervisor {
    in_flight: Mutex<HashMap<String, u32>>,
}

impl ProcessSupervisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn the command and wait for it, streaming stdout chunks as
    /// running progress. `label` names the provider in fallback messages.
    pub async fn run(
        &self,
        key: &str,
        command: CliCommand,
        cwd: &Path,
        timeout: Duration,
        label: &str,
        progress: &mpsc::UnboundedSender<ProviderProgress>,
    ) -> RunOutcome {
        let mut child = match Command::new(&command.program)
            .args(&command.args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
        {
            Ok(child) => child,
            Err(err) => {
                return RunOutcome::SpawnFailed {
                    message: err.to_string(),
                }
            }
        };

        let pid = child.id();
        if let Some(pid) = pid {
            self.in_flight.lock().await.insert(key.to_string(), pid);
            tracing::debug!(key, pid, program = %command.program, "Spawned agent process");
        }

        let stdout_task = {
            let pipe = child.stdout.take();
            let progress = progress.clone();
            let label = label.to_string();
            tokio::spawn(async move {
                let mut collected = String::new();
                let Some(mut pipe) = pipe else {
                    return collected;
                };
                let mut buf = [0u8; 8192];
                loop {
                    match pipe.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => {
                            let text = String::from_utf8_lossy(&buf[..n]).into_owned();
                            collected.push_str(&text);
                            let trimmed = text.trim();
                            let message = if trimmed.is_empty() {
                                format!("{} is working", label)
                            } else {
                                trimmed.to_string()
                            };
                            let _ = progress.send(ProviderProgress::running(message, None));
                        }
                    }
                }
                collected
            })
        };

        let stderr_task = {
            let pipe = child.stderr.take();
            tokio::spawn(async move {
                let mut collected = String::new();
                if let Some(mut pipe) = pipe {
                    let _ = pipe.read_to_string(&mut collected).await;
                }
                collected
            })
        };

        let status = tokio::select! {
            status = child.wait() => status,
            _ = tokio::time::sleep(timeout) => {
                if let Some(pid) = pid {
                    send_signal(pid, SIGTERM);
                }
                if cfg!(not(unix)) {
                    let _ = child.start_kill();
                }
                let _ = child.wait().await;
                self.in_flight.lock().await.remove(key);
                stdout_task.abort();
                let stderr = stderr_task.await.unwrap_or_default();
                return RunOutcome::TimedOut { stderr };
            }
        };

        self.in_flight.lock().await.remove(key);
        let stdout = stdout_task.await.unwrap_or_default();
        let stderr = stderr_task.await.unwrap_or_default();

        match status {
            Ok(status) => RunOutcome::Exited {
                stdout,
                stderr,
                code: status.code(),
                interrupted: was_interrupted(&status),
            },
            Err(err) => RunOutcome::SpawnFailed {
                message: err.to_string(),
            },
        }
    }

    /// SIGINT the process for `key`, escalating to SIGTERM after a grace
    /// period if it has not exited. Returns whether a process was found.
    pub async fn cancel(&self, key: &str) -> bool {
        let pid = self.in_flight.lock().await.get(key).copied();
        let Some(pid) = pid else {
            return false;
        };

        send_signal(pid, SIGINT);
        tokio::time::sleep(CANCEL_GRACE).await;
        if self.in_flight.lock().await.contains_key(key) {
            send_signal(pid, SIGTERM);
        }
        true
    }
}

#[cfg(unix)]
fn send_signal(pid: u32, signal: i32) {
    unsafe {
        libc::kill(pid as libc::pid_t, signal);
    }
}

#[cfg(not(unix))]
fn send_signal(_pid: u32, _signal: i32) {}

#[cfg(unix)]
fn was_interrupted(status: &std::process::ExitStatus) -> bool {
    use std::os::unix::process::ExitStatusExt;
    matches!(status.signal(), Some(sig) if sig == SIGINT || sig == SIGTERM)
}

#[cfg(not(unix))]
fn was_interrupted(_status: &std::process::ExitStatus) -> bool {
    false
}
