use serde::{Deserialize, Serialize};

/// How the completion step of a rewrite ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionStatus {
    /// The provider answered and a rewrite was extracted from its response.
    Completed,
    /// No provider credential is configured; the original code was annotated.
    Unconfigured,
    /// The provider call failed; the original code was kept unchanged.
    Failed,
}

impl CompletionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompletionStatus::Completed => "completed",
            CompletionStatus::Unconfigured => "unconfigured",
            CompletionStatus::Failed => "failed",
        }
    }
}
