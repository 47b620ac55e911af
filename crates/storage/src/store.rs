use crate::error::StorageError;
use crate::manifest::{self, ManifestEntry};
use crate::naming::{self, CURRENT_STRATEGY, LATEST_WEBHOOK, MANIFEST};
use chrono::{DateTime, Local};
use configuration::StorageSettings;
use core_types::{HistoryEntry, ModificationRecord, RecordKey, WebhookEvent};
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Written to `current.pine` the first time the live strategy is requested.
pub const DEFAULT_STRATEGY: &str = r#"//@version=4
strategy("Simple RSI Strategy", overlay=true)
rsiLength = input(14, title="RSI length")
rsiOverbought = input(70, title="RSI overbought level")
rsiOversold = input(30, title="RSI oversold level")
rsiValue = rsi(close, rsiLength)
if (crossover(rsiValue, rsiOversold))
    strategy.entry("RSI_Long", strategy.long)
if (crossunder(rsiValue, rsiOverbought))
    strategy.entry("RSI_Short", strategy.short)
"#;

/// The `FileStore` owns the two storage directories and encapsulates every read
/// and write against them.
#[derive(Debug, Clone)]
pub struct FileStore {
    log_dir: PathBuf,
    strategy_dir: PathBuf,
    manifest_lock: Arc<Mutex<()>>,
}

/// Paths produced by [`FileStore::record_modification`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedModification {
    pub modified_file: PathBuf,
    pub metadata_file: PathBuf,
}

/// The newest webhook log, by modification time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LatestWebhook {
    pub file: String,
    /// Local time, `%Y-%m-%d %H:%M:%S`.
    pub timestamp: String,
}

/// File counts reported by the status endpoint and the `status` command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageStatus {
    pub log_dir: String,
    pub strategy_dir: String,
    pub webhook_count: usize,
    pub strategy_count: usize,
    pub modification_count: usize,
    pub manifest_entries: usize,
    pub latest_webhook: Option<LatestWebhook>,
}

impl FileStore {
    pub fn new(log_dir: impl Into<PathBuf>, strategy_dir: impl Into<PathBuf>) -> Self {
        Self {
            log_dir: log_dir.into(),
            strategy_dir: strategy_dir.into(),
            manifest_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn from_settings(settings: &StorageSettings) -> Self {
        Self::new(&settings.log_dir, &settings.strategy_dir)
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    pub fn strategy_dir(&self) -> &Path {
        &self.strategy_dir
    }

    /// Creates both directories if they do not exist.
    pub async fn ensure_dirs(&self) -> Result<(), StorageError> {
        for dir in [&self.log_dir, &self.strategy_dir] {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| StorageError::io(dir, e))?;
        }
        Ok(())
    }

    /// Persists an inbound event verbatim as `webhook_<stem>.json` and refreshes
    /// `latest.json`. Returns the path of the per-event log.
    pub async fn log_webhook(
        &self,
        key: &RecordKey,
        event: &WebhookEvent,
    ) -> Result<PathBuf, StorageError> {
        self.ensure_dirs().await?;
        let contents = serde_json::to_string_pretty(event.as_value())?;

        let log_file = self.log_dir.join(naming::webhook_file_name(key));
        write_new(&log_file, contents.as_bytes()).await?;

        let latest = self.log_dir.join(LATEST_WEBHOOK);
        tokio::fs::write(&latest, contents.as_bytes())
            .await
            .map_err(|e| StorageError::io(&latest, e))?;

        tracing::info!(file = %log_file.display(), "Webhook event logged.");
        Ok(log_file)
    }

    /// Reads `current.pine`, seeding it with [`DEFAULT_STRATEGY`] when absent.
    pub async fn load_current_strategy(&self) -> Result<String, StorageError> {
        let path = self.strategy_dir.join(CURRENT_STRATEGY);
        match tokio::fs::read_to_string(&path).await {
            Ok(code) => Ok(code),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                self.ensure_dirs().await?;
                tokio::fs::write(&path, DEFAULT_STRATEGY)
                    .await
                    .map_err(|e| StorageError::io(&path, e))?;
                tracing::info!(file = %path.display(), "Seeded the current strategy file.");
                Ok(DEFAULT_STRATEGY.to_string())
            }
            Err(e) => Err(StorageError::io(&path, e)),
        }
    }

    /// Writes `modified_<stem>.pine` and `metadata_<stem>.json`, then appends the
    /// pair to the manifest. Neither file is ever overwritten.
    pub async fn record_modification(
        &self,
        key: &RecordKey,
        modified_code: &str,
        mut record: ModificationRecord,
    ) -> Result<SavedModification, StorageError> {
        self.ensure_dirs().await?;

        let modified_file = self.strategy_dir.join(naming::modified_file_name(key));
        let metadata_file = self.strategy_dir.join(naming::metadata_file_name(key));

        write_new(&modified_file, modified_code.as_bytes()).await?;

        record.modified_file = Some(modified_file.display().to_string());
        let written = match serde_json::to_string_pretty(&record) {
            Ok(metadata) => write_new(&metadata_file, metadata.as_bytes()).await,
            Err(e) => Err(e.into()),
        };
        if let Err(e) = written {
            // A code file without metadata would never show up in history.
            if let Err(remove_err) = tokio::fs::remove_file(&modified_file).await {
                tracing::warn!(
                    file = %modified_file.display(),
                    error = %remove_err,
                    "Could not remove the code file of a failed record."
                );
            }
            return Err(e);
        }

        let entry = ManifestEntry {
            id: key.id,
            timestamp: key.timestamp.clone(),
            created_at: key.created_at,
            webhook_log: record.webhook_log.clone(),
            modified_file: modified_file.display().to_string(),
            metadata_file: metadata_file.display().to_string(),
        };
        {
            let _guard = self.manifest_lock.lock().await;
            manifest::append(&self.strategy_dir.join(MANIFEST), &entry).await?;
        }

        tracing::info!(
            id = %key.id,
            modified = %modified_file.display(),
            metadata = %metadata_file.display(),
            "Strategy modification recorded."
        );
        Ok(SavedModification {
            modified_file,
            metadata_file,
        })
    }

    pub async fn read_manifest(&self) -> Result<Vec<ManifestEntry>, StorageError> {
        manifest::read_all(&self.strategy_dir.join(MANIFEST)).await
    }

    /// Every metadata record, newest first by its UTC creation time, with file
    /// modification time as the tie-breaker. Unreadable files are skipped.
    pub async fn history(&self) -> Result<Vec<HistoryEntry>, StorageError> {
        let files = list_files(&self.strategy_dir, naming::is_metadata).await?;

        let mut entries = Vec::with_capacity(files.len());
        for (path, modified) in files {
            let parsed = tokio::fs::read(&path)
                .await
                .map_err(|e| e.to_string())
                .and_then(|bytes| {
                    serde_json::from_slice::<HistoryEntry>(&bytes).map_err(|e| e.to_string())
                });
            match parsed {
                Ok(entry) => entries.push((entry, modified)),
                Err(e) => {
                    tracing::warn!(file = %path.display(), error = %e, "Skipping unreadable metadata file.");
                }
            }
        }

        // Undated records sort last.
        entries.sort_by_cached_key(|(entry, modified)| {
            std::cmp::Reverse((entry.recorded_at(), *modified))
        });
        Ok(entries.into_iter().map(|(entry, _)| entry).collect())
    }

    pub async fn status(&self) -> Result<StorageStatus, StorageError> {
        let webhooks = list_files(&self.log_dir, naming::is_webhook_log).await?;
        let strategies = list_files(&self.strategy_dir, naming::is_strategy).await?;
        let metadata = list_files(&self.strategy_dir, naming::is_metadata).await?;
        let manifest_entries = self.read_manifest().await?.len();

        let latest_webhook = webhooks
            .iter()
            .max_by_key(|(_, modified)| *modified)
            .map(|(path, modified)| LatestWebhook {
                file: path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                timestamp: DateTime::<Local>::from(*modified)
                    .format("%Y-%m-%d %H:%M:%S")
                    .to_string(),
            });

        Ok(StorageStatus {
            log_dir: self.log_dir.display().to_string(),
            strategy_dir: self.strategy_dir.display().to_string(),
            webhook_count: webhooks.len(),
            strategy_count: strategies.len(),
            modification_count: metadata.len(),
            manifest_entries,
            latest_webhook,
        })
    }

    /// Returns the text of a file in the strategy directory.
    pub async fn read_strategy_file(&self, name: &str) -> Result<String, StorageError> {
        let path = resolve(&self.strategy_dir, name).await?;
        tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| read_error(name, &path, e))
    }

    /// Returns the parsed JSON of a file in the log directory.
    pub async fn read_webhook_file(&self, name: &str) -> Result<JsonValue, StorageError> {
        let path = resolve(&self.log_dir, name).await?;
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| read_error(name, &path, e))?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Validates `name` and checks that it names an existing regular file in `dir`.
async fn resolve(dir: &Path, name: &str) -> Result<PathBuf, StorageError> {
    let name = naming::validate_filename(name)?;
    let path = dir.join(name);

    let metadata = tokio::fs::metadata(&path)
        .await
        .map_err(|e| read_error(name, &path, e))?;
    if metadata.is_dir() {
        return Err(StorageError::IsDirectory(name.to_string()));
    }
    Ok(path)
}

fn read_error(name: &str, path: &Path, e: std::io::Error) -> StorageError {
    match e.kind() {
        std::io::ErrorKind::NotFound => StorageError::NotFound(name.to_string()),
        std::io::ErrorKind::PermissionDenied => StorageError::PermissionDenied(name.to_string()),
        _ => StorageError::io(path, e),
    }
}

/// Creates `path` exclusively and writes `contents`.
async fn write_new(path: &Path, contents: &[u8]) -> Result<(), StorageError> {
    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
        .map_err(|e| StorageError::io(path, e))?;
    file.write_all(contents)
        .await
        .map_err(|e| StorageError::io(path, e))?;
    file.flush().await.map_err(|e| StorageError::io(path, e))?;
    Ok(())
}

/// Regular files in `dir` whose names satisfy `keep`, with their modification
/// times. A missing directory has no files.
async fn list_files(
    dir: &Path,
    keep: fn(&str) -> bool,
) -> Result<Vec<(PathBuf, SystemTime)>, StorageError> {
    let mut read_dir = match tokio::fs::read_dir(dir).await {
        Ok(read_dir) => read_dir,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(StorageError::io(dir, e)),
    };

    let mut files = Vec::new();
    while let Some(entry) = read_dir
        .next_entry()
        .await
        .map_err(|e| StorageError::io(dir, e))?
    {
        let name = entry.file_name();
        if !keep(&name.to_string_lossy()) {
            continue;
        }
        let metadata = match entry.metadata().await {
            Ok(metadata) if metadata.is_file() => metadata,
            _ => continue,
        };
        let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        files.push((entry.path(), modified));
    }
    Ok(files)
}
