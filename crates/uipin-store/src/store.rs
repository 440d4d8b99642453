//! The `.uipin/` artifact store.

use crate::error::StoreError;
use crate::fs::{ensure_dir, list_json_files, read_json_if_exists, write_json_atomic};
use base64::Engine;
use chrono::Utc;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::warn;
use uipin_core::{SessionId, SessionRecord, TaskId, TaskRecord, UipinConfig};

const ROOT_DIR_NAME: &str = ".uipin";

/// Retention knobs for [`ArtifactStore::prune`].
#[derive(Debug, Clone, Copy)]
pub struct PruneOptions {
    /// Log files whose mtime is older than this are deleted.
    pub logs_older_than_days: i64,
    /// Orphaned sessions (task gone) older than this are deleted.
    pub orphan_session_age_hours: i64,
}

impl Default for PruneOptions {
    fn default() -> Self {
        Self {
            logs_older_than_days: 14,
            orphan_session_age_hours: 24,
        }
    }
}

/// Counts of what a prune pass removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PruneResult {
    pub removed_logs: usize,
    pub removed_sessions: usize,
}

/// Durable layout and atomic read/write/update operations for tasks,
/// sessions, screenshots, logs, and config under a project-local `.uipin/`
/// directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    cwd: PathBuf,
    root_dir: PathBuf,
    tasks_dir: PathBuf,
    sessions_dir: PathBuf,
    screenshots_dir: PathBuf,
    logs_dir: PathBuf,
    config_path: PathBuf,
}

impl ArtifactStore {
    /// Create a store rooted at `<cwd>/.uipin`.
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        let cwd = cwd.into();
        let root_dir = cwd.join(ROOT_DIR_NAME);
        Self {
            tasks_dir: root_dir.join("tasks"),
            sessions_dir: root_dir.join("sessions"),
            screenshots_dir: root_dir.join("screenshots"),
            logs_dir: root_dir.join("runtime").join("logs"),
            config_path: root_dir.join("config.json"),
            root_dir,
            cwd,
        }
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    pub fn logs_dir(&self) -> &Path {
        &self.logs_dir
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn task_path(&self, task_id: &TaskId) -> PathBuf {
        self.tasks_dir.join(format!("{}.json", task_id))
    }

    pub fn session_path(&self, session_id: &SessionId) -> PathBuf {
        self.sessions_dir.join(format!("{}.json", session_id))
    }

    /// A path relative to the project cwd, suitable for records and logs.
    pub fn relative_path(&self, absolute: &Path) -> String {
        absolute
            .strip_prefix(&self.cwd)
            .unwrap_or(absolute)
            .to_string_lossy()
            .into_owned()
    }

    /// Create the directory structure and a default config file. Idempotent.
    pub async fn ensure_structure(&self) -> Result<(), StoreError> {
        ensure_dir(&self.tasks_dir).await?;
        ensure_dir(&self.sessions_dir).await?;
        ensure_dir(&self.screenshots_dir).await?;
        ensure_dir(&self.logs_dir).await?;

        let existing: Option<UipinConfig> = read_json_if_exists(&self.config_path)
            .await
            .unwrap_or_default();
        if existing.is_none() {
            write_json_atomic(&self.config_path, &UipinConfig::default()).await?;
        }
        Ok(())
    }

    /// Make sure `.gitignore` excludes the store directory.
    pub async fn ensure_gitignore_entry(&self) -> Result<(), StoreError> {
        let gitignore = self.cwd.join(".gitignore");
        let entry = format!("{}/", ROOT_DIR_NAME);

        match fs::read_to_string(&gitignore).await {
            Ok(content) => {
                if !content.contains(&entry) {
                    let mut updated = content;
                    if !updated.ends_with('\n') {
                        updated.push('\n');
                    }
                    updated.push_str(&entry);
                    updated.push('\n');
                    fs::write(&gitignore, updated).await?;
                }
                Ok(())
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                fs::write(&gitignore, format!("{}\n", entry)).await?;
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    pub async fn read_config(&self) -> Result<UipinConfig, StoreError> {
        let config: Option<UipinConfig> = read_json_if_exists(&self.config_path).await?;
        Ok(config.unwrap_or_default())
    }

    pub async fn write_config(&self, config: &UipinConfig) -> Result<(), StoreError> {
        write_json_atomic(&self.config_path, config).await
    }

    pub async fn create_task(&self, task: &TaskRecord) -> Result<(), StoreError> {
        write_json_atomic(&self.task_path(&task.task_id), task).await
    }

    pub async fn get_task(&self, task_id: &TaskId) -> Result<Option<TaskRecord>, StoreError> {
        read_json_if_exists(&self.task_path(task_id)).await
    }

    /// Read-modify-write on a task record. Errors if the task is absent.
    pub async fn update_task<F>(&self, task_id: &TaskId, update: F) -> Result<TaskRecord, StoreError>
    where
        F: FnOnce(TaskRecord) -> TaskRecord,
    {
        let current = self
            .get_task(task_id)
            .await?
            .ok_or_else(|| StoreError::TaskNotFound(task_id.to_string()))?;
        let updated = update(current);
        write_json_atomic(&self.task_path(task_id), &updated).await?;
        Ok(updated)
    }

    /// List all task records, skipping unreadable or invalid files.
    pub async fn list_tasks(&self) -> Result<Vec<TaskRecord>, StoreError> {
        let mut tasks = Vec::new();
        for path in list_json_files(&self.tasks_dir).await? {
            match read_json_if_exists::<TaskRecord>(&path).await {
                Ok(Some(task)) => tasks.push(task),
                Ok(None) => {}
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "Skipping unreadable task record");
                }
            }
        }
        Ok(tasks)
    }

    pub async fn create_session(&self, session: &SessionRecord) -> Result<(), StoreError> {
        write_json_atomic(&self.session_path(&session.session_id), session).await
    }

    pub async fn get_session(
        &self,
        session_id: &SessionId,
    ) -> Result<Option<SessionRecord>, StoreError> {
        read_json_if_exists(&self.session_path(session_id)).await
    }

    /// Read-modify-write on a session record. Errors if the session is absent.
    pub async fn update_session<F>(
        &self,
        session_id: &SessionId,
        update: F,
    ) -> Result<SessionRecord, StoreError>
    where
        F: FnOnce(SessionRecord) -> SessionRecord,
    {
        let current = self
            .get_session(session_id)
            .await?
            .ok_or_else(|| StoreError::SessionNotFound(session_id.to_string()))?;
        let updated = update(current);
        write_json_atomic(&self.session_path(session_id), &updated).await?;
        Ok(updated)
    }

    /// List all session records, skipping unreadable or invalid files.
    pub async fn list_sessions(&self) -> Result<Vec<SessionRecord>, StoreError> {
        let mut sessions = Vec::new();
        for path in list_json_files(&self.sessions_dir).await? {
            match read_json_if_exists::<SessionRecord>(&path).await {
                Ok(Some(session)) => sessions.push(session),
                Ok(None) => {}
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "Skipping unreadable session record");
                }
            }
        }
        Ok(sessions)
    }

    /// Decode a base64 `data:image/...` payload into
    /// `screenshots/<taskId>.png` and return the cwd-relative path.
    pub async fn write_screenshot(
        &self,
        task_id: &TaskId,
        data_url: &str,
    ) -> Result<String, StoreError> {
        let bytes = decode_image_data_url(data_url)
            .ok_or_else(|| StoreError::InvalidScreenshot("not an image data URL".to_string()))?;

        ensure_dir(&self.screenshots_dir).await?;
        let path = self.screenshots_dir.join(format!("{}.png", task_id));
        fs::write(&path, bytes).await?;
        Ok(self.relative_path(&path))
    }

    /// Delete stale log files and orphaned session records.
    ///
    /// Tasks are never pruned; only sessions whose task no longer exists and
    /// whose `updatedAt` is past the retention window are removed.
    pub async fn prune(&self, options: PruneOptions) -> Result<PruneResult, StoreError> {
        let mut result = PruneResult::default();
        let log_cutoff = std::time::SystemTime::now()
            - std::time::Duration::from_secs(options.logs_older_than_days.max(0) as u64 * 86_400);

        if let Ok(mut entries) = fs::read_dir(&self.logs_dir).await {
            while let Ok(Some(entry)) = entries.next_entry().await {
                let Ok(metadata) = entry.metadata().await else {
                    continue;
                };
                let Ok(modified) = metadata.modified() else {
                    continue;
                };
                if modified < log_cutoff && fs::remove_file(entry.path()).await.is_ok() {
                    result.removed_logs += 1;
                }
            }
        }

        let task_ids: std::collections::HashSet<TaskId> = self
            .list_tasks()
            .await?
            .into_iter()
            .map(|task| task.task_id)
            .collect();
        let session_cutoff =
            Utc::now() - chrono::Duration::hours(options.orphan_session_age_hours);

        for session in self.list_sessions().await? {
            let orphaned = !task_ids.contains(&session.task_id);
            if orphaned && session.updated_at < session_cutoff {
                fs::remove_file(self.session_path(&session.session_id)).await?;
                result.removed_sessions += 1;
            }
        }

        Ok(result)
    }
}

/// Extract the raw bytes from a `data:image/(png|jpeg|jpg);base64,` URL.
fn decode_image_data_url(data_url: &str) -> Option<Vec<u8>> {
    let rest = data_url.strip_prefix("data:image/")?;
    let (subtype, payload) = rest.split_once(";base64,")?;
    if !matches!(subtype, "png" | "jpeg" | "jpg") {
        return None;
    }
    base64::engine::general_purpose::STANDARD.decode(payload).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::collections::HashMap;
    use uipin_core::{
        BoundingBox, ElementDescriptor, Pin, TaskComment, TaskStatus, UiChangePacket, Viewport,
    };

    fn sample_task(task_id: &str) -> TaskRecord {
        let now = Utc::now();
        TaskRecord {
            task_id: TaskId::new(task_id),
            created_at: now,
            updated_at: now,
            status: TaskStatus::Created,
            url: "http://localhost:3000/".into(),
            viewport: Viewport {
                width: 1280,
                height: 720,
            },
            pin: Pin { x: 1.0, y: 2.0 },
            comment: TaskComment {
                body: "Make the button green".into(),
            },
            ui_change_packet: UiChangePacket {
                id: "pkt".into(),
                timestamp: now,
                url: "http://localhost:3000/".into(),
                viewport: Viewport {
                    width: 1280,
                    height: 720,
                },
                element: ElementDescriptor {
                    tag: "button".into(),
                    role: None,
                    text: None,
                    attributes: HashMap::new(),
                    bounding_box: BoundingBox {
                        x: 0.0,
                        y: 0.0,
                        width: 10.0,
                        height: 10.0,
                    },
                },
                nearby_text: vec![],
                dom_snippet: "<button/>".into(),
                computed_style_summary: HashMap::new(),
                screenshot_path: "shot.png".into(),
                user_request: "Make the button green".into(),
            },
            screenshot_path: "shot.png".into(),
            provider: None,
            model: None,
            latest_session_id: None,
            sessions: vec![],
            summary: None,
            changed_files: vec![],
            error_code: None,
            error_message: None,
        }
    }

    fn sample_session(session_id: &str, task_id: &str) -> SessionRecord {
        SessionRecord::queued(
            SessionId::new(session_id),
            TaskId::new(task_id),
            uipin_core::ProviderName::Codex,
            "gpt-5.3-codex-spark",
            false,
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_ensure_structure_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ArtifactStore::new(dir.path());
        store.ensure_structure().await.expect("ensure");
        store.ensure_structure().await.expect("ensure again");

        assert!(dir.path().join(".uipin/tasks").is_dir());
        assert!(dir.path().join(".uipin/runtime/logs").is_dir());
        let config = store.read_config().await.expect("config");
        assert_eq!(config, UipinConfig::default());
    }

    #[tokio::test]
    async fn test_task_round_trip_and_update() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ArtifactStore::new(dir.path());
        store.ensure_structure().await.expect("ensure");

        let task = sample_task("t1");
        store.create_task(&task).await.expect("create");

        let loaded = store
            .get_task(&TaskId::new("t1"))
            .await
            .expect("get")
            .expect("present");
        assert_eq!(loaded.status, TaskStatus::Created);

        let updated = store
            .update_task(&TaskId::new("t1"), |mut t| {
                t.status = TaskStatus::Queued;
                t
            })
            .await
            .expect("update");
        assert_eq!(updated.status, TaskStatus::Queued);

        let reloaded = store
            .get_task(&TaskId::new("t1"))
            .await
            .expect("get")
            .expect("present");
        assert_eq!(reloaded.status, TaskStatus::Queued);
    }

    #[tokio::test]
    async fn test_update_missing_task_errors() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ArtifactStore::new(dir.path());
        store.ensure_structure().await.expect("ensure");

        let result = store.update_task(&TaskId::new("ghost"), |t| t).await;
        assert!(matches!(result, Err(StoreError::TaskNotFound(_))));
    }

    #[tokio::test]
    async fn test_list_skips_invalid_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ArtifactStore::new(dir.path());
        store.ensure_structure().await.expect("ensure");

        store.create_task(&sample_task("good")).await.expect("create");
        std::fs::write(dir.path().join(".uipin/tasks/bad.json"), "{not json")
            .expect("write junk");

        let tasks = store.list_tasks().await.expect("list");
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].task_id.as_str(), "good");
    }

    #[tokio::test]
    async fn test_write_screenshot() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ArtifactStore::new(dir.path());
        store.ensure_structure().await.expect("ensure");

        // 1x1 transparent PNG
        let data_url = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";
        let relative = store
            .write_screenshot(&TaskId::new("t1"), data_url)
            .await
            .expect("write");
        assert!(relative.ends_with("t1.png"));
        assert!(dir.path().join(".uipin/screenshots/t1.png").is_file());
    }

    #[tokio::test]
    async fn test_write_screenshot_rejects_non_image() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ArtifactStore::new(dir.path());
        store.ensure_structure().await.expect("ensure");

        let result = store
            .write_screenshot(&TaskId::new("t1"), "data:text/plain;base64,aGk=")
            .await;
        assert!(matches!(result, Err(StoreError::InvalidScreenshot(_))));
    }

    #[tokio::test]
    async fn test_prune_removes_only_old_orphans() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ArtifactStore::new(dir.path());
        store.ensure_structure().await.expect("ensure");

        store.create_task(&sample_task("kept-task")).await.expect("create");

        // Attached session: never pruned.
        store
            .create_session(&sample_session("attached", "kept-task"))
            .await
            .expect("create");

        // Fresh orphan: too young to prune.
        store
            .create_session(&sample_session("young-orphan", "gone-task"))
            .await
            .expect("create");

        // Stale orphan: prunable.
        let mut stale = sample_session("stale-orphan", "gone-task");
        stale.updated_at = Utc::now() - Duration::hours(48);
        store.create_session(&stale).await.expect("create");

        let result = store.prune(PruneOptions::default()).await.expect("prune");
        assert_eq!(result.removed_sessions, 1);

        let remaining = store.list_sessions().await.expect("list");
        let ids: Vec<_> = remaining
            .iter()
            .map(|s| s.session_id.as_str().to_string())
            .collect();
        assert!(ids.contains(&"attached".to_string()));
        assert!(ids.contains(&"young-orphan".to_string()));
        assert!(!ids.contains(&"stale-orphan".to_string()));
    }

    #[test]
    fn test_decode_image_data_url_variants() {
        assert!(decode_image_data_url("data:image/png;base64,aGk=").is_some());
        assert!(decode_image_data_url("data:image/jpeg;base64,aGk=").is_some());
        assert!(decode_image_data_url("data:image/gif;base64,aGk=").is_none());
        assert!(decode_image_data_url("data:image/png;base64,!!!").is_none());
        assert!(decode_image_data_url("plain text").is_none());
    }
}
