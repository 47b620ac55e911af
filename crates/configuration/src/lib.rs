// Declare the modules that make up this crate.
pub mod error;
pub mod logging;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use error::ConfigError;
pub use logging::init_tracing;
pub use settings::{
    load_settings, load_settings_from, CompletionSettings, LoggingSettings, ProviderKind,
    ServerSettings, Settings, StorageSettings,
};
