use anyhow::Context;
use clap::{Parser, Subcommand};
use comfy_table::{presets::UTF8_FULL, Table};
use configuration::{ProviderKind, Settings};
use core_types::WebhookEvent;
use modifier::Modifier;
use std::path::PathBuf;
use storage::FileStore;

/// The main entry point for the Pinesmith strategy rewrite service.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; the environment and config file still apply.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let mut settings = configuration::load_settings(cli.config.as_deref())?;
    if let Commands::Serve(args) = &cli.command {
        args.apply(&mut settings);
    }

    // Held until the process exits so the file writer is flushed.
    let _guard = configuration::init_tracing(&settings.logging)?;
    tracing::debug!(?settings, "Settings loaded.");

    match cli.command {
        Commands::Serve(_) => web_server::run_server(settings).await,
        Commands::History => handle_history(&settings).await,
        Commands::Status => handle_status(&settings).await,
        Commands::Analyze(args) => handle_analyze(args, &settings).await,
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Rewrites Pine Script strategies from trading webhooks with a completion model.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a TOML configuration file. Defaults to `pinesmith.toml` if present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the webhook HTTP server.
    Serve(ServeArgs),
    /// Print the recorded strategy modifications, newest first.
    History,
    /// Print storage counts and the completion provider status.
    Status,
    /// Run the rewrite pipeline once on a strategy file. Nothing is persisted.
    Analyze(AnalyzeArgs),
}

#[derive(Parser)]
struct ServeArgs {
    /// Address to bind, overriding `server.host`.
    #[arg(long)]
    host: Option<String>,

    /// Port to bind, overriding `server.port`.
    #[arg(long)]
    port: Option<u16>,

    /// Completion backend, overriding `completion.provider`.
    #[arg(long, value_enum)]
    provider: Option<ProviderKind>,
}

impl ServeArgs {
    fn apply(&self, settings: &mut Settings) {
        if let Some(host) = &self.host {
            settings.server.host = host.clone();
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if let Some(provider) = self.provider {
            settings.completion.provider = provider;
        }
    }
}

#[derive(Parser)]
struct AnalyzeArgs {
    /// The Pine Script file to rewrite.
    #[arg(long)]
    strategy: PathBuf,

    /// A JSON file holding the webhook event. An empty event is used when omitted.
    #[arg(long)]
    event: Option<PathBuf>,

    /// Completion backend, overriding `completion.provider`.
    #[arg(long, value_enum)]
    provider: Option<ProviderKind>,
}

// ==============================================================================
// Command Logic
// ==============================================================================

async fn handle_history(settings: &Settings) -> anyhow::Result<()> {
    let store = FileStore::from_settings(&settings.storage);
    let history = store.history().await?;

    if history.is_empty() {
        println!("No modifications recorded in {}.", store.strategy_dir().display());
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        "Timestamp",
        "Original",
        "Modified",
        "Performance before",
        "Summary",
    ]);
    for entry in &history {
        table.add_row(vec![
            entry.timestamp.clone(),
            entry.original_strategy.clone(),
            entry.modified_strategy.clone(),
            entry.performance_before.to_string(),
            entry.modification_summary.clone(),
        ]);
    }
    println!("{table}");
    Ok(())
}

async fn handle_status(settings: &Settings) -> anyhow::Result<()> {
    let store = FileStore::from_settings(&settings.storage);
    let status = store.status().await?;
    let credential = settings.completion.credential().is_some();

    let mut report = serde_json::to_value(&status)?;
    if let Some(fields) = report.as_object_mut() {
        fields.insert("credential_configured".into(), credential.into());
        fields.insert(
            "completion_provider".into(),
            settings.completion.provider.as_str().into(),
        );
    }
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn handle_analyze(args: AnalyzeArgs, settings: &Settings) -> anyhow::Result<()> {
    let mut settings = settings.clone();
    if let Some(provider) = args.provider {
        settings.completion.provider = provider;
    }

    let original_code = tokio::fs::read_to_string(&args.strategy)
        .await
        .with_context(|| format!("reading strategy file {}", args.strategy.display()))?;
    let event = match &args.event {
        Some(path) => {
            let bytes = tokio::fs::read(path)
                .await
                .with_context(|| format!("reading event file {}", path.display()))?;
            WebhookEvent::from_slice(&bytes)?
        }
        None => WebhookEvent::default(),
    };

    let modifier = Modifier::from_settings(&settings).await?;
    let rewrite = modifier.rewrite_or_degrade(&original_code, &event).await;

    println!("Completion: {}", rewrite.status.as_str());
    if let Some(failure) = &rewrite.failure {
        println!("Completion error ({}): {}", failure.kind, failure.message);
    }
    if !rewrite.explanation.is_empty() {
        println!("\n{}", rewrite.explanation);
    }
    println!("\n{}", rewrite.modified_code);
    Ok(())
}
