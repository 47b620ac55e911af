use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use configuration::Settings;
use modifier::Modifier;
use std::sync::Arc;
use storage::FileStore;
use tower_http::{
    cors::{AllowHeaders, AllowOrigin, Any, CorsLayer, ExposeHeaders},
    trace::TraceLayer,
};

pub mod error;
pub mod handlers;

/// The shared application state that all handlers can access.
#[derive(Clone)]
pub struct AppState {
    pub store: FileStore,
    pub modifier: Modifier,
    /// Whether a completion credential was present at startup.
    pub credential_configured: bool,
}

impl AppState {
    pub fn new(store: FileStore, modifier: Modifier, credential_configured: bool) -> Self {
        Self {
            store,
            modifier,
            credential_configured,
        }
    }
}

/// Builds the application router over `state`.
pub fn router(state: Arc<AppState>, body_limit_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::any())
        .allow_methods(Any)
        .allow_headers(AllowHeaders::any())
        .expose_headers(ExposeHeaders::any());

    Router::new()
        .route("/", get(handlers::root))
        .route("/api/health", get(|| async { "OK" }))
        .route("/webhook", post(handlers::receive_webhook))
        .route("/webhook/", post(handlers::receive_webhook))
        .route("/webhook/test", get(handlers::test_analyze))
        .route("/webhook/history", get(handlers::get_history))
        .route("/webhook/status", get(handlers::get_status))
        .route("/webhook/strategy/:filename", get(handlers::get_strategy_file))
        .route("/webhook/webhook/:filename", get(handlers::get_webhook_file))
        .fallback(handlers::fallback)
        .with_state(state)
        .layer(cors)
        // This middleware will automatically log information about every incoming request.
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(body_limit_bytes))
}

/// The main function to configure and run the web server.
pub async fn run_server(settings: Settings) -> anyhow::Result<()> {
    // Tracing is initialized by the caller.
    let addr = settings.server.socket_addr()?;

    let store = FileStore::from_settings(&settings.storage);
    store.ensure_dirs().await?;
    let modifier = Modifier::from_settings(&settings).await?;
    let credential_configured = settings.completion.credential().is_some();

    tracing::info!(
        log_dir = %store.log_dir().display(),
        strategy_dir = %store.strategy_dir().display(),
        provider = modifier.provider_name().unwrap_or("none"),
        credential_configured,
        "Storage and completion provider ready."
    );

    let app_state = Arc::new(AppState::new(store, modifier, credential_configured));
    let app = router(app_state, settings.server.body_limit_bytes);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Web server started and listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
