use crate::error::ModifierError;
use crate::extract::extract_code_block;
use crate::prompt::PromptTemplate;
use completion_client::error::CompletionError;
use completion_client::{build_provider, CompletionProvider, CompletionRequest, Usage};
use configuration::Settings;
use core_types::{CompletionFailure, CompletionStatus, WebhookEvent};
use std::sync::Arc;

/// Appended to the original code when no completion credential is configured.
pub const MISSING_CREDENTIAL_NOTE: &str =
    "// Completion provider credential is not configured; strategy left unmodified.";

/// The outcome of one rewrite attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct Rewrite {
    pub modified_code: String,
    pub explanation: String,
    pub status: CompletionStatus,
    pub failure: Option<CompletionFailure>,
    pub usage: Option<Usage>,
}

impl Rewrite {
    /// Degraded result for a missing credential: the original code plus a fixed note.
    pub fn unconfigured(original_code: &str) -> Self {
        Self {
            modified_code: format!("{original_code}\n\n{MISSING_CREDENTIAL_NOTE}"),
            explanation: String::new(),
            status: CompletionStatus::Unconfigured,
            failure: Some(CompletionFailure {
                kind: CompletionError::MissingCredential.kind().to_string(),
                message: CompletionError::MissingCredential.to_string(),
            }),
            usage: None,
        }
    }

    /// Degraded result for a failed call: the original code, untouched, with the
    /// failure carried alongside instead of inside the code.
    pub fn unchanged(original_code: &str, err: &CompletionError) -> Self {
        Self {
            modified_code: original_code.to_string(),
            explanation: String::new(),
            status: CompletionStatus::Failed,
            failure: Some(CompletionFailure {
                kind: err.kind().to_string(),
                message: err.to_string(),
            }),
            usage: None,
        }
    }
}

/// Drives one strategy rewrite: prompt, completion, extraction.
#[derive(Clone)]
pub struct Modifier {
    provider: Option<Arc<dyn CompletionProvider>>,
    template: PromptTemplate,
    system_prompt: Option<String>,
}

impl Modifier {
    pub fn new(provider: Option<Arc<dyn CompletionProvider>>, template: PromptTemplate) -> Self {
        Self {
            provider,
            template,
            system_prompt: None,
        }
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    /// Builds the provider and loads the prompt template described by `settings`.
    pub async fn from_settings(settings: &Settings) -> Result<Self, ModifierError> {
        let template = match &settings.storage.prompt_template {
            Some(path) => PromptTemplate::load_or_create(path).await?,
            None => PromptTemplate::default(),
        };
        let provider = build_provider(&settings.completion)?;

        Ok(Self::new(provider, template).with_system_prompt(settings.completion.system_prompt.clone()))
    }

    /// The active provider's name, or `None` in degraded mode.
    pub fn provider_name(&self) -> Option<&str> {
        self.provider.as_deref().map(|p| p.name())
    }

    pub fn render_prompt(&self, original_code: &str, event: &WebhookEvent) -> String {
        self.template.render(original_code, event)
    }

    /// Asks the provider for a rewrite of `original_code`.
    ///
    /// Without a provider this returns [`CompletionError::MissingCredential`] at once,
    /// without rendering a prompt or touching the network.
    pub async fn rewrite(
        &self,
        original_code: &str,
        event: &WebhookEvent,
    ) -> Result<Rewrite, CompletionError> {
        let provider = self
            .provider
            .as_ref()
            .ok_or(CompletionError::MissingCredential)?;

        let mut request = CompletionRequest::new(self.render_prompt(original_code, event));
        request.system = self.system_prompt.clone();

        let completion = provider.complete(&request).await?;
        let extraction = extract_code_block(&completion.text);
        if !extraction.found_block {
            tracing::warn!(provider = provider.name(), "Completion contained no fenced code block.");
        }

        Ok(Rewrite {
            modified_code: extraction.modified_code,
            explanation: extraction.explanation,
            status: CompletionStatus::Completed,
            failure: None,
            usage: completion.usage,
        })
    }

    /// [`Modifier::rewrite`] with the degraded-mode policy applied: a missing
    /// credential annotates the original code, any other failure keeps it unchanged.
    pub async fn rewrite_or_degrade(&self, original_code: &str, event: &WebhookEvent) -> Rewrite {
        match self.rewrite(original_code, event).await {
            Ok(rewrite) => rewrite,
            Err(CompletionError::MissingCredential) => {
                tracing::info!("No completion provider configured; annotating the original strategy.");
                Rewrite::unconfigured(original_code)
            }
            Err(e) => {
                tracing::error!(error = ?e, kind = e.kind(), "Completion request failed.");
                Rewrite::unchanged(original_code, &e)
            }
        }
    }
}
