use completion_client::error::CompletionError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModifierError {
    #[error("Failed to read or seed the prompt template at {path}: {source}")]
    Template {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to set up the completion provider: {0}")]
    Provider(#[from] CompletionError),
}
