use crate::{error::AppError, AppState};
use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, Path, State},
    http::Uri,
    Json,
};
use chrono::Local;
use core_types::{CompletionFailure, CompletionStatus, ModificationRecord, RecordKey, WebhookEvent};
use modifier::sample::{sample_event, SAMPLE_STRATEGY};
use serde::Serialize;
use serde_json::{json, Value as JsonValue};
use std::sync::Arc;
use storage::StorageStatus;
use uuid::Uuid;

const SERVICE_NAME: &str = "pinesmith";

fn now() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Response of the webhook endpoint.
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub status: &'static str,
    pub message: String,
    pub id: Uuid,
    pub log_file: String,
    pub modified_strategy: String,
    pub metadata_file: String,
    pub explanation: String,
    pub completion: CompletionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_error: Option<CompletionFailure>,
}

/// Response of the self-test endpoint.
#[derive(Debug, Serialize)]
pub struct TestResponse {
    pub status: &'static str,
    pub original_code: String,
    pub modified_code: String,
    pub explanation: String,
    pub webhook_data: JsonValue,
    pub completion: CompletionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_error: Option<CompletionFailure>,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    #[serde(flatten)]
    pub storage: StorageStatus,
    pub credential_configured: bool,
    pub api_key_status: &'static str,
    pub completion_provider: String,
    pub server_time: String,
}

/// # GET /
pub async fn root() -> Json<JsonValue> {
    Json(json!({
        "status": "operational",
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "message": "Strategy rewrite service is running.",
        "endpoints": {
            "webhook": "POST /webhook/ - receive a trading webhook",
            "test": "GET /webhook/test - run the pipeline on the sample strategy",
            "history": "GET /webhook/history - list recorded modifications",
            "status": "GET /webhook/status - storage and provider status",
            "strategy": "GET /webhook/strategy/:filename - read a strategy file",
            "webhook_log": "GET /webhook/webhook/:filename - read a webhook log"
        },
        "timestamp": now(),
    }))
}

/// # POST /webhook/
/// Logs the event, rewrites the current strategy and records the result.
pub async fn receive_webhook(
    State(state): State<Arc<AppState>>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<WebhookResponse>, AppError> {
    let event = WebhookEvent::from_slice(&body?)?;
    let key = RecordKey::generate();
    tracing::info!(id = %key.id, "Webhook received.");

    let log_file = state.store.log_webhook(&key, &event).await?;
    let original_code = state.store.load_current_strategy().await?;

    let rewrite = state
        .modifier
        .rewrite_or_degrade(&original_code, &event)
        .await;

    let mut record = ModificationRecord::new(
        &key,
        &original_code,
        &rewrite.modified_code,
        &event,
        &rewrite.explanation,
    )
    .with_completion_error(rewrite.failure.clone());
    record.webhook_log = Some(log_file.display().to_string());

    let saved = state
        .store
        .record_modification(&key, &rewrite.modified_code, record)
        .await?;

    let (status, message) = match rewrite.status {
        CompletionStatus::Completed => ("success", "Strategy modified and recorded."),
        CompletionStatus::Unconfigured => (
            "success",
            "No completion credential is configured; the strategy was recorded with an annotation.",
        ),
        CompletionStatus::Failed => (
            "error",
            "The completion provider failed; the original strategy was recorded unchanged.",
        ),
    };

    Ok(Json(WebhookResponse {
        status,
        message: message.to_string(),
        id: key.id,
        log_file: log_file.display().to_string(),
        modified_strategy: saved.modified_file.display().to_string(),
        metadata_file: saved.metadata_file.display().to_string(),
        explanation: rewrite.explanation,
        completion: rewrite.status,
        completion_error: rewrite.failure,
    }))
}

/// # GET /webhook/test
/// Runs the pipeline on the built-in sample. Nothing is persisted.
pub async fn test_analyze(State(state): State<Arc<AppState>>) -> Json<TestResponse> {
    let event = sample_event();
    let rewrite = state
        .modifier
        .rewrite_or_degrade(SAMPLE_STRATEGY, &event)
        .await;

    let status = match rewrite.status {
        CompletionStatus::Failed => "error",
        _ => "success",
    };

    Json(TestResponse {
        status,
        original_code: SAMPLE_STRATEGY.to_string(),
        modified_code: rewrite.modified_code,
        explanation: rewrite.explanation,
        webhook_data: event.into_value(),
        completion: rewrite.status,
        completion_error: rewrite.failure,
    })
}

/// # GET /webhook/history
pub async fn get_history(State(state): State<Arc<AppState>>) -> Result<Json<JsonValue>, AppError> {
    let history = state.store.history().await?;
    Ok(Json(json!({ "status": "success", "history": history })))
}

/// # GET /webhook/status
pub async fn get_status(
    State(state): State<Arc<AppState>>,
) -> Result<Json<StatusResponse>, AppError> {
    let storage = state.store.status().await?;
    let api_key_status = if state.credential_configured {
        "available"
    } else {
        "not configured"
    };

    Ok(Json(StatusResponse {
        status: "operational",
        storage,
        credential_configured: state.credential_configured,
        api_key_status,
        completion_provider: state.modifier.provider_name().unwrap_or("none").to_string(),
        server_time: now(),
    }))
}

/// # GET /webhook/strategy/:filename
pub async fn get_strategy_file(
    Path(filename): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<JsonValue>, AppError> {
    let code = state.store.read_strategy_file(&filename).await?;
    Ok(Json(json!({ "status": "success", "filename": filename, "code": code })))
}

/// # GET /webhook/webhook/:filename
pub async fn get_webhook_file(
    Path(filename): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<JsonValue>, AppError> {
    let data = state.store.read_webhook_file(&filename).await?;
    Ok(Json(json!({ "status": "success", "filename": filename, "data": data })))
}

/// Any path without a route, including multi-segment file names.
pub async fn fallback(uri: Uri) -> AppError {
    AppError::RouteNotFound(uri.path().to_string())
}
