use crate::error::StorageError;
use core_types::RecordKey;

pub const WEBHOOK_PREFIX: &str = "webhook_";
pub const MODIFIED_PREFIX: &str = "modified_";
pub const METADATA_PREFIX: &str = "metadata_";
pub const JSON_SUFFIX: &str = ".json";
pub const PINE_SUFFIX: &str = ".pine";

pub const CURRENT_STRATEGY: &str = "current.pine";
pub const LATEST_WEBHOOK: &str = "latest.json";
pub const MANIFEST: &str = "manifest.jsonl";

pub fn webhook_file_name(key: &RecordKey) -> String {
    format!("{WEBHOOK_PREFIX}{}{JSON_SUFFIX}", key.stem())
}

pub fn modified_file_name(key: &RecordKey) -> String {
    format!("{MODIFIED_PREFIX}{}{PINE_SUFFIX}", key.stem())
}

pub fn metadata_file_name(key: &RecordKey) -> String {
    format!("{METADATA_PREFIX}{}{JSON_SUFFIX}", key.stem())
}

pub fn is_webhook_log(name: &str) -> bool {
    name.starts_with(WEBHOOK_PREFIX) && name.ends_with(JSON_SUFFIX)
}

pub fn is_metadata(name: &str) -> bool {
    name.starts_with(METADATA_PREFIX) && name.ends_with(JSON_SUFFIX)
}

pub fn is_strategy(name: &str) -> bool {
    name.ends_with(PINE_SUFFIX)
}

/// Accepts only a bare file name inside one of the storage directories.
///
/// Rejects empty names, parent-directory components, path separators of either
/// platform and NUL bytes. This runs before any filesystem access.
pub fn validate_filename(name: &str) -> Result<&str, StorageError> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains("../")
        || name.contains("..\\")
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0');

    if invalid {
        return Err(StorageError::InvalidFilename(name.to_string()));
    }
    Ok(name)
}
