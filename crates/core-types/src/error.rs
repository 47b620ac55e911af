use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Failed to encode or decode JSON: {0}")]
    Json(#[from] serde_json::Error),
}
