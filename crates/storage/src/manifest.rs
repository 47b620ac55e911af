use crate::error::StorageError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// One line of `manifest.jsonl`: the files produced by a single invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub id: Uuid,
    pub timestamp: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub webhook_log: Option<String>,
    pub modified_file: String,
    pub metadata_file: String,
}

/// Appends one entry. Callers serialize appends through the store's lock.
pub(crate) async fn append(path: &Path, entry: &ManifestEntry) -> Result<(), StorageError> {
    let mut line = serde_json::to_string(entry)?;
    line.push('\n');

    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .map_err(|e| StorageError::io(path, e))?;
    file.write_all(line.as_bytes())
        .await
        .map_err(|e| StorageError::io(path, e))?;
    file.flush().await.map_err(|e| StorageError::io(path, e))?;
    Ok(())
}

/// Reads every entry. A missing manifest is empty; malformed lines are skipped.
pub(crate) async fn read_all(path: &Path) -> Result<Vec<ManifestEntry>, StorageError> {
    let contents = match tokio::fs::read_to_string(path).await {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(StorageError::io(path, e)),
    };

    let entries = contents
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| match serde_json::from_str::<ManifestEntry>(line) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!(error = %e, "Skipping malformed manifest line.");
                None
            }
        })
        .collect();
    Ok(entries)
}
