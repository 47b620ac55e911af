//! # Pinesmith Storage Crate
//!
//! This crate is the system's only persistence layer: two flat directories on
//! durable storage, with no database behind them.
//!
//! ## Layout
//!
//! - Log directory: `webhook_<stem>.json` (one per inbound event, verbatim) and
//!   `latest.json` (a copy of the newest event).
//! - Strategy directory: `current.pine` (the live strategy), `modified_<stem>.pine`,
//!   `metadata_<stem>.json` and the append-only `manifest.jsonl`.
//!
//! All files produced by one invocation share the stem of its `RecordKey`, and the
//! manifest correlates them explicitly.
//!
//! ## Public API
//!
//! - `FileStore`: the main struct, holding both directories and providing all the
//!   read and write operations.
//! - `StorageError`: the specific error types that can be returned from this crate.

// Declare the modules that constitute this crate.
pub mod error;
pub mod manifest;
pub mod naming;
pub mod store;

// Re-export the key components to create a clean, public-facing API.
pub use error::StorageError;
pub use manifest::ManifestEntry;
pub use naming::validate_filename;
pub use store::{FileStore, LatestWebhook, SavedModification, StorageStatus, DEFAULT_STRATEGY};
