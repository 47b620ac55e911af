use crate::event::WebhookEvent;
use crate::strategy::{strategy_name, MODIFIED_STRATEGY_FALLBACK, ORIGINAL_STRATEGY_FALLBACK};
use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

const DEFAULT_SUMMARY: &str = "Strategy code was optimised.";

/// The identity of one webhook invocation.
///
/// Every file produced by an invocation shares the same [`RecordKey::stem`], which
/// combines the wall-clock timestamp with a prefix of a random id. Two invocations
/// within the same second therefore never share a file name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordKey {
    pub id: Uuid,
    /// Local wall-clock time formatted as `YYYYMMDD_HHMMSS`.
    pub timestamp: String,
    pub created_at: DateTime<Utc>,
}

impl RecordKey {
    pub fn generate() -> Self {
        Self::at(Uuid::new_v4(), Utc::now())
    }

    pub fn at(id: Uuid, created_at: DateTime<Utc>) -> Self {
        let timestamp = created_at
            .with_timezone(&Local)
            .format("%Y%m%d_%H%M%S")
            .to_string();
        Self {
            id,
            timestamp,
            created_at,
        }
    }

    /// The shared file-name stem: `<timestamp>_<first 8 hex digits of id>`.
    pub fn stem(&self) -> String {
        let simple = self.id.simple().to_string();
        format!("{}_{}", self.timestamp, &simple[..8])
    }
}

/// A structured description of a failed completion call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionFailure {
    pub kind: String,
    pub message: String,
}

/// The metadata written next to every rewritten strategy file.
///
/// Records are immutable once written. Fields added after the first on-disk format
/// carry serde defaults so that older metadata files still load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModificationRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    pub original_strategy: String,
    pub modified_strategy: String,
    #[serde(default)]
    pub performance_before: Value,
    #[serde(default)]
    pub recent_trades: Vec<Value>,
    #[serde(default)]
    pub trading_problem: String,
    #[serde(default)]
    pub modification_summary: String,
    #[serde(default)]
    pub explanation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_log: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_error: Option<CompletionFailure>,
}

impl ModificationRecord {
    /// Builds the record for one rewrite. File paths are filled in by the store.
    pub fn new(
        key: &RecordKey,
        original_code: &str,
        modified_code: &str,
        event: &WebhookEvent,
        explanation: &str,
    ) -> Self {
        Self {
            id: Some(key.id),
            timestamp: key.timestamp.clone(),
            created_at: Some(key.created_at),
            original_strategy: strategy_name(original_code)
                .unwrap_or(ORIGINAL_STRATEGY_FALLBACK)
                .to_string(),
            modified_strategy: strategy_name(modified_code)
                .unwrap_or(MODIFIED_STRATEGY_FALLBACK)
                .to_string(),
            performance_before: event.performance(),
            recent_trades: event.recent_trades(),
            trading_problem: event.text_or("trading_problem", ""),
            modification_summary: event.text_or("suggested_improvements", DEFAULT_SUMMARY),
            explanation: explanation.to_string(),
            webhook_log: None,
            modified_file: None,
            completion_error: None,
        }
    }

    pub fn with_completion_error(mut self, failure: Option<CompletionFailure>) -> Self {
        self.completion_error = failure;
        self
    }
}

/// The subset of a [`ModificationRecord`] served by the history listing.
///
/// Every field is defaulted so a partially written or legacy metadata file still
/// produces an entry.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub original_strategy: String,
    #[serde(default)]
    pub modified_strategy: String,
    #[serde(default = "empty_object")]
    pub performance_before: Value,
    #[serde(default)]
    pub modification_summary: String,
}

impl HistoryEntry {
    /// When the record was written, in UTC.
    ///
    /// Uses `created_at` when present. Older records only carry the local
    /// `YYYYMMDD_HHMMSS` string, which is read in the local zone, taking the
    /// earlier instant when the wall-clock time is ambiguous.
    pub fn recorded_at(&self) -> Option<DateTime<Utc>> {
        self.created_at.or_else(|| {
            NaiveDateTime::parse_from_str(&self.timestamp, "%Y%m%d_%H%M%S")
                .ok()
                .and_then(|naive| Local.from_local_datetime(&naive).earliest())
                .map(|local| local.with_timezone(&Utc))
        })
    }
}

fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}
