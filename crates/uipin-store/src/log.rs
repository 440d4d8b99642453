//! Structured runtime logging to date-keyed JSONL files.
//!
//! Every line is one JSON object. Metadata is redacted before it touches
//! disk: home-directory paths become `~`, bearer tokens and `token=` query
//! values are masked, and credential-named keys are replaced wholesale.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uipin_core::{SessionId, TaskId};

const DEFAULT_MAX_FILE_SIZE: u64 = 2 * 1024 * 1024;

const CREDENTIAL_KEYS: &[&str] = &["token", "authorization", "auth", "apikey"];

/// Log severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// One persisted log line.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeLogEvent {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub component: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<TaskId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
    pub event: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub meta: serde_json::Value,
}

/// Structured context attached to a log call.
#[derive(Debug, Clone, Default)]
pub struct LogContext {
    pub component: Option<String>,
    pub task_id: Option<TaskId>,
    pub session_id: Option<SessionId>,
    pub event: Option<String>,
    pub meta: Option<serde_json::Value>,
}

impl LogContext {
    pub fn event(event: &str) -> Self {
        Self {
            event: Some(event.to_string()),
            ..Self::default()
        }
    }

    pub fn task(mut self, task_id: &TaskId) -> Self {
        self.task_id = Some(task_id.clone());
        self
    }

    pub fn session(mut self, session_id: &SessionId) -> Self {
        self.session_id = Some(session_id.clone());
        self
    }

    pub fn meta(mut self, meta: serde_json::Value) -> Self {
        self.meta = Some(meta);
        self
    }
}

struct LoggerInner {
    logs_dir: PathBuf,
    component: String,
    debug_enabled: bool,
    max_file_size: u64,
}

/// Appends redacted JSONL log events to date-keyed files, rolling to a
/// `-N` suffixed file once the current one exceeds the size threshold.
#[derive(Clone)]
pub struct JsonlLogger {
    inner: Arc<LoggerInner>,
}

impl JsonlLogger {
    pub fn new(logs_dir: impl Into<PathBuf>, component: &str, debug_enabled: bool) -> Self {
        Self {
            inner: Arc::new(LoggerInner {
                logs_dir: logs_dir.into(),
                component: component.to_string(),
                debug_enabled,
                max_file_size: DEFAULT_MAX_FILE_SIZE,
            }),
        }
    }

    #[cfg(test)]
    fn with_max_file_size(mut self, bytes: u64) -> Self {
        let inner = Arc::get_mut(&mut self.inner).expect("unshared logger");
        inner.max_file_size = bytes;
        self
    }

    pub fn debug(&self, message: &str, context: LogContext) {
        self.emit(LogLevel::Debug, message, context);
    }

    pub fn info(&self, message: &str, context: LogContext) {
        self.emit(LogLevel::Info, message, context);
    }

    pub fn warn(&self, message: &str, context: LogContext) {
        self.emit(LogLevel::Warn, message, context);
    }

    pub fn error(&self, message: &str, context: LogContext) {
        self.emit(LogLevel::Error, message, context);
    }

    fn emit(&self, level: LogLevel, message: &str, context: LogContext) {
        if level == LogLevel::Debug && !self.inner.debug_enabled {
            return;
        }

        let component = context
            .component
            .unwrap_or_else(|| self.inner.component.clone());
        let event = RuntimeLogEvent {
            timestamp: Utc::now(),
            level,
            component: component.clone(),
            task_id: context.task_id,
            session_id: context.session_id,
            event: context.event.unwrap_or_else(|| "log".to_string()),
            message: message.to_string(),
            meta: redact_value(context.meta.unwrap_or(serde_json::Value::Null)),
        };

        match level {
            LogLevel::Debug => tracing::debug!(component = %component, "{}", message),
            LogLevel::Info => tracing::info!(component = %component, "{}", message),
            LogLevel::Warn => tracing::warn!(component = %component, "{}", message),
            LogLevel::Error => tracing::error!(component = %component, "{}", message),
        }

        if let Err(err) = self.append(&event) {
            tracing::warn!(error = %err, "Failed to append runtime log event");
        }
    }

    fn append(&self, event: &RuntimeLogEvent) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.inner.logs_dir)?;
        let path = resolve_log_path(
            &self.inner.logs_dir,
            event.timestamp,
            self.inner.max_file_size,
        );
        let line = serde_json::to_string(event).map_err(std::io::Error::other)?;
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        writeln!(file, "{}", line)
    }
}

/// Pick the active log file for a date: `<date>.jsonl`, then `<date>-1.jsonl`
/// and so on once the size threshold is crossed.
fn resolve_log_path(logs_dir: &Path, timestamp: DateTime<Utc>, max_file_size: u64) -> PathBuf {
    let date_key = timestamp.format("%Y-%m-%d").to_string();
    let mut index = 0u32;
    loop {
        let name = if index == 0 {
            format!("{}.jsonl", date_key)
        } else {
            format!("{}-{}.jsonl", date_key, index)
        };
        let candidate = logs_dir.join(name);
        match std::fs::metadata(&candidate) {
            Err(_) => return candidate,
            Ok(meta) if meta.len() < max_file_size => return candidate,
            Ok(_) => index += 1,
        }
    }
}

/// Recursively redact credential-shaped values.
pub fn redact_value(value: serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::String(s) => serde_json::Value::String(redact_string(&s)),
        serde_json::Value::Array(items) => {
            serde_json::Value::Array(items.into_iter().map(redact_value).collect())
        }
        serde_json::Value::Object(map) => {
            let redacted = map
                .into_iter()
                .map(|(key, field)| {
                    if CREDENTIAL_KEYS.contains(&key.to_ascii_lowercase().as_str()) {
                        (key, serde_json::Value::String("[REDACTED]".to_string()))
                    } else {
                        (key, redact_value(field))
                    }
                })
                .collect();
            serde_json::Value::Object(redacted)
        }
        other => other,
    }
}

fn redact_string(input: &str) -> String {
    let mut output = input.to_string();

    if let Some(home) = std::env::var_os("HOME") {
        let home = home.to_string_lossy().into_owned();
        if !home.is_empty() && home != "/" {
            output = output.replace(&home, "~");
        }
    }

    output = mask_after_token(&output, "Bearer ", |c: char| {
        c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')
    });
    output = mask_after_token(&output, "token=", |c: char| !c.is_whitespace() && c != '&');
    output
}

/// Replace the run of `keep` characters following each occurrence of
/// `prefix` with `[REDACTED]`.
fn mask_after_token(input: &str, prefix: &str, keep: impl Fn(char) -> bool) -> String {
    let mut output = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(pos) = rest.find(prefix) {
        let after = pos + prefix.len();
        output.push_str(&rest[..after]);
        let tail = &rest[after..];
        let masked_len = tail.chars().take_while(|c| keep(*c)).map(char::len_utf8).sum::<usize>();
        if masked_len > 0 {
            output.push_str("[REDACTED]");
        }
        rest = &tail[masked_len..];
    }
    output.push_str(rest);
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_redacts_credential_keys() {
        let redacted = redact_value(json!({
            "token": "secret-value",
            "Authorization": "Bearer abc",
            "apiKey": "k-123",
            "nested": {"auth": "x", "safe": "ok"}
        }));
        assert_eq!(redacted["token"], "[REDACTED]");
        assert_eq!(redacted["Authorization"], "[REDACTED]");
        assert_eq!(redacted["apiKey"], "[REDACTED]");
        assert_eq!(redacted["nested"]["auth"], "[REDACTED]");
        assert_eq!(redacted["nested"]["safe"], "ok");
    }

    #[test]
    fn test_redacts_bearer_and_token_strings() {
        let redacted = redact_value(json!("header Bearer abc.def-123 tail"));
        assert_eq!(redacted, json!("header Bearer [REDACTED] tail"));

        let redacted = redact_value(json!("url?token=sekrit&x=1"));
        assert_eq!(redacted, json!("url?token=[REDACTED]&x=1"));
    }

    #[test]
    fn test_redacts_home_dir() {
        let home = std::env::var("HOME").unwrap_or_default();
        if home.is_empty() || home == "/" {
            return;
        }
        let redacted = redact_value(json!(format!("{}/project/file.rs", home)));
        assert_eq!(redacted, json!("~/project/file.rs"));
    }

    #[test]
    fn test_log_path_rolls_on_size() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ts = Utc::now();
        let date_key = ts.format("%Y-%m-%d").to_string();

        let first = resolve_log_path(dir.path(), ts, 10);
        assert!(first.ends_with(format!("{}.jsonl", date_key)));

        std::fs::write(&first, "0123456789ABC").expect("fill file");
        let second = resolve_log_path(dir.path(), ts, 10);
        assert!(second.ends_with(format!("{}-1.jsonl", date_key)));
    }

    #[test]
    fn test_logger_writes_jsonl() {
        let dir = tempfile::tempdir().expect("tempdir");
        let logger = JsonlLogger::new(dir.path(), "bridge", false).with_max_file_size(1024);

        logger.info(
            "Task created",
            LogContext::event("task.created")
                .task(&TaskId::new("t1"))
                .meta(json!({"apiKey": "nope"})),
        );

        let files: Vec<_> = std::fs::read_dir(dir.path())
            .expect("read_dir")
            .filter_map(|e| e.ok())
            .collect();
        assert_eq!(files.len(), 1);

        let content = std::fs::read_to_string(files[0].path()).expect("read");
        let line: serde_json::Value =
            serde_json::from_str(content.lines().next().expect("line")).expect("parse");
        assert_eq!(line["component"], "bridge");
        assert_eq!(line["event"], "task.created");
        assert_eq!(line["taskId"], "t1");
        assert_eq!(line["meta"]["apiKey"], "[REDACTED]");
    }

    #[test]
    fn test_debug_suppressed_without_flag() {
        let dir = tempfile::tempdir().expect("tempdir");
        let logger = JsonlLogger::new(dir.path(), "bridge", false);
        logger.debug("hidden", LogContext::default());
        assert_eq!(std::fs::read_dir(dir.path()).expect("read_dir").count(), 0);
    }
}
