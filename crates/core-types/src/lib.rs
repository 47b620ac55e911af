pub mod enums;
pub mod error;
pub mod event;
pub mod record;
pub mod strategy;

// Re-export the core types to provide a clean public API.
pub use enums::CompletionStatus;
pub use error::CoreError;
pub use event::{WebhookEvent, UNKNOWN};
pub use record::{CompletionFailure, HistoryEntry, ModificationRecord, RecordKey};
pub use strategy::{strategy_name, ORIGINAL_STRATEGY_FALLBACK, MODIFIED_STRATEGY_FALLBACK};
