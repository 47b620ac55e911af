//! # Strategy rewrite pipeline
//!
//! Turns a strategy text plus a webhook event into a rewritten strategy:
//!
//! - `prompt`: renders the prompt template from the strategy and the event.
//! - `extract`: separates the model's prose from its last fenced code block.
//! - `pipeline`: the `Modifier`, which drives a `CompletionProvider` end to end and
//!   applies the degraded-mode policy when the provider is missing or fails.
//! - `sample`: the fixed strategy and event used by the self-test endpoint.

pub mod error;
pub mod extract;
pub mod pipeline;
pub mod prompt;
pub mod sample;

pub use error::ModifierError;
pub use extract::{extract_code_block, Extraction, NO_BLOCK_NOTE};
pub use pipeline::{Modifier, Rewrite, MISSING_CREDENTIAL_NOTE};
pub use prompt::{PromptTemplate, DEFAULT_TEMPLATE};
