use crate::error::ConfigError;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// File looked up in the working directory when no explicit path is given.
pub const DEFAULT_CONFIG_FILE: &str = "pinesmith";
/// Prefix for environment overrides, e.g. `PINESMITH__SERVER__PORT=9000`.
pub const ENV_PREFIX: &str = "PINESMITH";

const DEFAULT_SYSTEM_PROMPT: &str = "You are an assistant with expert knowledge of Pine Script \
and systematic trading strategies. You improve strategy code while keeping its core logic intact.";

/// The root configuration structure for the entire application.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub storage: StorageSettings,
    pub completion: CompletionSettings,
    pub logging: LoggingSettings,
}

/// Where the HTTP server listens and how much it accepts.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Upper bound for an inbound webhook body.
    pub body_limit_bytes: usize,
}

impl ServerSettings {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| ConfigError::ValidationError(format!("invalid listen address: {e}")))
    }
}

/// The two flat storage directories and the optional external prompt template.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    /// Holds `webhook_<stem>.json` event logs.
    pub log_dir: PathBuf,
    /// Holds `current.pine`, rewritten strategies, metadata records and the manifest.
    pub strategy_dir: PathBuf,
    #[serde(default)]
    pub prompt_template: Option<PathBuf>,
}

/// Which completion backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum ProviderKind {
    /// An OpenAI-compatible chat-completion endpoint. Requires a credential.
    #[serde(rename = "openai")]
    #[cfg_attr(feature = "clap", value(name = "openai"))]
    OpenAi,
    /// A fixed offline response, for demos and local development.
    #[serde(rename = "canned")]
    #[cfg_attr(feature = "clap", value(name = "canned"))]
    Canned,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Canned => "canned",
        }
    }
}

/// Parameters for the completion provider.
#[derive(Clone, Deserialize)]
pub struct CompletionSettings {
    pub provider: ProviderKind,
    #[serde(default)]
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    pub system_prompt: String,
}

impl CompletionSettings {
    /// The provider credential, if one is configured and non-blank.
    pub fn credential(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }
}

// Hand-written so the credential never ends up in a log line.
impl fmt::Debug for CompletionSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionSettings")
            .field("provider", &self.provider)
            .field("api_key", &self.credential().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    /// Default filter directive; `RUST_LOG` takes precedence when set.
    pub level: String,
    /// When set, logs are also written to a daily rolling file in this directory.
    #[serde(default)]
    pub directory: Option<PathBuf>,
    pub file_prefix: String,
}

/// Loads the application configuration from the process environment.
///
/// Sources, lowest priority first: built-in defaults, the TOML file (`path`, or an
/// optional `pinesmith.toml` in the working directory), `PINESMITH__*` variables,
/// and finally `OPENAI_API_KEY`, `LOG_DIR` and `STRATEGY_DIR`.
pub fn load_settings(path: Option<&Path>) -> Result<Settings, ConfigError> {
    let env: HashMap<String, String> = std::env::vars().collect();
    load_settings_from(path, &env)
}

/// Same as [`load_settings`] but reads variables from `env` instead of the process.
pub fn load_settings_from(
    path: Option<&Path>,
    env: &HashMap<String, String>,
) -> Result<Settings, ConfigError> {
    let storage_base = std::env::temp_dir().join("storage");

    let builder = config::Config::builder()
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 8000_i64)?
        .set_default("server.body_limit_bytes", 1024_i64 * 1024)?
        .set_default(
            "storage.log_dir",
            storage_base.join("webhooks").to_string_lossy().into_owned(),
        )?
        .set_default(
            "storage.strategy_dir",
            storage_base.join("strategies").to_string_lossy().into_owned(),
        )?
        .set_default("completion.provider", "openai")?
        .set_default("completion.base_url", "https://api.openai.com/v1")?
        .set_default("completion.model", "gpt-4")?
        .set_default("completion.temperature", 0.4_f64)?
        .set_default("completion.max_tokens", 2000_i64)?
        .set_default("completion.timeout_secs", 60_i64)?
        .set_default("completion.system_prompt", DEFAULT_SYSTEM_PROMPT)?
        .set_default("logging.level", "info,tower_http=debug")?
        .set_default("logging.file_prefix", "pinesmith.log")?;

    let builder = match path {
        Some(path) => builder.add_source(config::File::from(path).required(true)),
        None => builder.add_source(config::File::with_name(DEFAULT_CONFIG_FILE).required(false)),
    };

    let settings = builder
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true)
                .source(Some(env.clone())),
        )
        .set_override_option("completion.api_key", env.get("OPENAI_API_KEY").cloned())?
        .set_override_option("storage.log_dir", env.get("LOG_DIR").cloned())?
        .set_override_option("storage.strategy_dir", env.get("STRATEGY_DIR").cloned())?
        .build()?
        .try_deserialize::<Settings>()?;

    settings.validate()?;
    Ok(settings)
}

impl Settings {
    fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.completion.temperature) {
            return Err(ConfigError::ValidationError(format!(
                "completion.temperature must be within [0, 2], got {}",
                self.completion.temperature
            )));
        }
        if self.completion.max_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "completion.max_tokens must be positive".to_string(),
            ));
        }
        if self.server.body_limit_bytes == 0 {
            return Err(ConfigError::ValidationError(
                "server.body_limit_bytes must be positive".to_string(),
            ));
        }
        self.server.socket_addr()?;
        Ok(())
    }
}
