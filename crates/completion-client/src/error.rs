use thiserror::Error;

#[derive(Error, Debug)]
pub enum CompletionError {
    #[error("No completion provider credential is configured")]
    MissingCredential,

    #[error("The completion request could not be sent: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("The completion provider returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Failed to deserialize the completion response: {0}")]
    Deserialization(String),

    #[error("The completion response contained no text")]
    EmptyResponse,
}

impl CompletionError {
    /// A short, stable name for the failure, suitable for persisted records.
    pub fn kind(&self) -> &'static str {
        match self {
            CompletionError::MissingCredential => "missing_credential",
            CompletionError::Transport(_) => "transport",
            CompletionError::HttpStatus { .. } => "http_status",
            CompletionError::Deserialization(_) => "deserialization",
            CompletionError::EmptyResponse => "empty_response",
        }
    }
}
