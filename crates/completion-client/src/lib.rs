use crate::error::CompletionError;
use async_trait::async_trait;
use configuration::{CompletionSettings, ProviderKind};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

mod canned;
pub mod error;
mod openai;

// --- Public API ---
pub use canned::CannedProvider;
pub use openai::OpenAiClient;

/// One prompt to complete, with optional per-call decoding overrides.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: Option<String>,
    pub prompt: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            system: None,
            prompt: prompt.into(),
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }
}

/// Token accounting reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Free-form text returned by a provider.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub text: String,
    pub model: String,
    pub usage: Option<Usage>,
}

/// The abstract interface to a text-generation service.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// A short name for logs and status reports.
    fn name(&self) -> &str;

    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, CompletionError>;
}

/// Builds the provider described by `settings`.
///
/// Returns `Ok(None)` for the remote provider when no credential is configured;
/// callers treat that as degraded mode rather than an error.
pub fn build_provider(
    settings: &CompletionSettings,
) -> Result<Option<Arc<dyn CompletionProvider>>, CompletionError> {
    match settings.provider {
        ProviderKind::Canned => {
            tracing::info!("Using the canned completion provider.");
            Ok(Some(Arc::new(CannedProvider::new(&settings.model))))
        }
        ProviderKind::OpenAi => match OpenAiClient::new(settings)? {
            Some(client) => {
                tracing::info!(model = %settings.model, "Using the OpenAI-compatible completion provider.");
                Ok(Some(Arc::new(client)))
            }
            None => {
                tracing::warn!("No completion credential configured; rewrites will be annotated only.");
                Ok(None)
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(provider: ProviderKind, api_key: Option<&str>) -> CompletionSettings {
        CompletionSettings {
            provider,
            api_key: api_key.map(str::to_string),
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4".to_string(),
            temperature: 0.4,
            max_tokens: 2000,
            timeout_secs: 60,
            system_prompt: String::new(),
        }
    }

    #[test]
    fn remote_provider_needs_a_credential() {
        assert!(build_provider(&settings(ProviderKind::OpenAi, None)).unwrap().is_none());

        let provider = build_provider(&settings(ProviderKind::OpenAi, Some("sk"))).unwrap();
        assert_eq!(provider.map(|p| p.name().to_string()).as_deref(), Some("openai"));
    }

    #[test]
    fn canned_provider_works_without_a_credential() {
        let provider = build_provider(&settings(ProviderKind::Canned, None)).unwrap();
        assert_eq!(provider.map(|p| p.name().to_string()).as_deref(), Some("canned"));
    }

    #[test]
    fn error_kinds_are_stable() {
        assert_eq!(CompletionError::MissingCredential.kind(), "missing_credential");
        let status = CompletionError::HttpStatus { status: 500, body: String::new() };
        assert_eq!(status.kind(), "http_status");
    }
}
