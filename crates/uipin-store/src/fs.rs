//! Filesystem helpers: atomic JSON writes and tolerant reads.

use crate::error::StoreError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

/// Create a directory (and parents) if it does not already exist.
pub async fn ensure_dir(path: &Path) -> Result<(), StoreError> {
    fs::create_dir_all(path).await?;
    Ok(())
}

/// Write a value as pretty-printed JSON atomically.
///
/// The payload is written to a uniquely named `.tmp` sibling first and then
/// renamed over the destination, so concurrent readers see either the old
/// or the new content, never a torn write.
pub async fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let dir = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    ensure_dir(&dir).await?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "record.json".to_string());
    let tmp_path = dir.join(format!(
        "{}.{}.{}.{}.tmp",
        file_name,
        std::process::id(),
        chrono::Utc::now().timestamp_millis(),
        Uuid::new_v4()
    ));

    let mut body = serde_json::to_string_pretty(value)?;
    body.push('\n');

    fs::write(&tmp_path, body).await?;
    fs::rename(&tmp_path, path).await?;
    Ok(())
}

/// Read and parse a JSON file; a missing file yields `None`.
pub async fn read_json_if_exists<T: DeserializeOwned>(
    path: &Path,
) -> Result<Option<T>, StoreError> {
    match fs::read_to_string(path).await {
        Ok(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}

/// List `.json` files in a directory; a missing directory yields an empty
/// list.
pub async fn list_json_files(dir: &Path) -> Result<Vec<PathBuf>, StoreError> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(err.into()),
    };

    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "json")
            && entry.file_type().await.map(|t| t.is_file()).unwrap_or(false)
        {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
