use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use async_trait::async_trait;
use completion_client::error::CompletionError;
use completion_client::{CannedProvider, Completion, CompletionProvider, CompletionRequest};
use modifier::{Modifier, PromptTemplate, MISSING_CREDENTIAL_NOTE};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use storage::{FileStore, DEFAULT_STRATEGY};
use tempfile::TempDir;
use tower::ServiceExt;
use web_server::{router, AppState};

const BODY_LIMIT: usize = 1024 * 1024;

struct TestApp {
    _dir: TempDir,
    store: FileStore,
    router: Router,
}

fn app(modifier: Modifier, credential_configured: bool) -> TestApp {
    app_with_limit(modifier, credential_configured, BODY_LIMIT)
}

fn app_with_limit(modifier: Modifier, credential_configured: bool, body_limit: usize) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::new(dir.path().join("webhooks"), dir.path().join("strategies"));
    let state = Arc::new(AppState::new(store.clone(), modifier, credential_configured));
    TestApp {
        _dir: dir,
        store,
        router: router(state, body_limit),
    }
}

fn degraded_app() -> TestApp {
    app(Modifier::new(None, PromptTemplate::default()), false)
}

fn canned_app() -> TestApp {
    let provider = Arc::new(CannedProvider::new("canned"));
    app(Modifier::new(Some(provider), PromptTemplate::default()), true)
}

/// Answers every request with an upstream HTTP error.
struct Unavailable;

#[async_trait]
impl CompletionProvider for Unavailable {
    fn name(&self) -> &str {
        "unavailable"
    }

    async fn complete(&self, _request: &CompletionRequest) -> Result<Completion, CompletionError> {
        Err(CompletionError::HttpStatus {
            status: 503,
            body: "upstream unavailable".to_string(),
        })
    }
}

fn failing_app() -> TestApp {
    app(Modifier::new(Some(Arc::new(Unavailable)), PromptTemplate::default()), true)
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or_else(|_| {
        Value::String(String::from_utf8_lossy(&bytes).into_owned())
    });
    (status, body)
}

async fn get(router: &Router, uri: &str) -> (StatusCode, Value) {
    send(router, Request::get(uri).body(Body::empty()).unwrap()).await
}

async fn post_json(router: &Router, uri: &str, body: &str) -> (StatusCode, Value) {
    let request = Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(router, request).await
}

fn file_names(dir: &Path, prefix: &str) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .map(|entry| entry.file_name().to_string_lossy().into_owned())
                .filter(|name| name.starts_with(prefix))
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

#[tokio::test]
async fn health_and_root() {
    let app = degraded_app();

    let (status, body) = get(&app.router, "/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("OK".to_string()));

    let (status, body) = get(&app.router, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "operational");
    assert!(body["endpoints"]["webhook"].is_string());
}

#[tokio::test]
async fn webhook_without_credential_records_an_annotated_copy() {
    let app = degraded_app();

    let (status, body) = post_json(
        &app.router,
        "/webhook/",
        r#"{"trading_problem": "too many losses", "performance": {"win_rate": 0.4}}"#,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["completion"], "unconfigured");
    assert_eq!(body["completion_error"]["kind"], "missing_credential");

    let strategy_dir = app.store.strategy_dir();
    let modified = file_names(strategy_dir, "modified_");
    let metadata = file_names(strategy_dir, "metadata_");
    assert_eq!(modified.len(), 1);
    assert_eq!(metadata.len(), 1);
    let stem = modified[0]
        .trim_start_matches("modified_")
        .trim_end_matches(".pine");
    assert_eq!(metadata[0], format!("metadata_{stem}.json"));
    assert_eq!(file_names(app.store.log_dir(), "webhook_"), [format!("webhook_{stem}.json")]);

    let code = std::fs::read_to_string(strategy_dir.join(&modified[0])).unwrap();
    assert_eq!(code, format!("{DEFAULT_STRATEGY}\n\n{MISSING_CREDENTIAL_NOTE}"));

    let record: Value =
        serde_json::from_str(&std::fs::read_to_string(strategy_dir.join(&metadata[0])).unwrap())
            .unwrap();
    assert_eq!(record["trading_problem"], "too many losses");
    assert_eq!(record["performance_before"], json!({ "win_rate": 0.4 }));
    assert_eq!(app.store.read_manifest().await.unwrap().len(), 1);
}

#[tokio::test]
async fn webhook_with_provider_records_the_rewrite() {
    let app = canned_app();

    let (status, body) = post_json(&app.router, "/webhook", r#"{"action": "buy"}"#).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["completion"], "completed");
    assert!(body.get("completion_error").is_none());
    assert!(!body["explanation"].as_str().unwrap().is_empty());

    let modified_path = body["modified_strategy"].as_str().unwrap();
    let code = std::fs::read_to_string(modified_path).unwrap();
    assert!(code.contains("strategy(\"Simple RSI Strategy\""));
    assert!(!code.contains("```"));
}

#[tokio::test]
async fn malformed_body_is_rejected_before_anything_is_written() {
    let app = degraded_app();

    let (status, body) = post_json(&app.router, "/webhook/", "{ not json").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");
    assert!(file_names(app.store.log_dir(), "webhook_").is_empty());
    assert!(file_names(app.store.strategy_dir(), "metadata_").is_empty());
}

#[tokio::test]
async fn traversal_is_rejected_on_both_file_endpoints() {
    let app = degraded_app();

    for uri in [
        "/webhook/strategy/..%2F..%2Fetc%2Fpasswd",
        "/webhook/webhook/..%2F..%2Fetc%2Fpasswd",
        "/webhook/strategy/..%5C..%5Cwindows%5Cwin.ini",
    ] {
        let (status, body) = get(&app.router, uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body["status"], "error");
    }

    let (status, body) = get(&app.router, "/webhook/strategy/../../etc/passwd").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], "error");
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn oversized_body_gets_a_json_error() {
    let app = app_with_limit(Modifier::new(None, PromptTemplate::default()), false, 16);
    let payload = format!(r#"{{"note": "{}"}}"#, "x".repeat(100));

    let (status, body) = post_json(&app.router, "/webhook/", &payload).await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["status"], "error");
    assert!(body["message"].is_string());
    assert!(file_names(app.store.log_dir(), "webhook_").is_empty());
}

#[tokio::test]
async fn provider_failure_records_the_original_strategy() {
    let app = failing_app();

    let (status, body) = post_json(&app.router, "/webhook/", r#"{"trading_problem": "drawdown"}"#).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "error");
    assert_eq!(body["completion"], "failed");
    assert_eq!(body["completion_error"]["kind"], "http_status");
    assert!(body["completion_error"]["message"].as_str().unwrap().contains("503"));

    let strategy_dir = app.store.strategy_dir();
    assert_eq!(file_names(app.store.log_dir(), "webhook_").len(), 1);
    let current = std::fs::read_to_string(strategy_dir.join("current.pine")).unwrap();
    let modified = std::fs::read_to_string(body["modified_strategy"].as_str().unwrap()).unwrap();
    assert_eq!(modified, current);

    let record: Value = serde_json::from_str(
        &std::fs::read_to_string(body["metadata_file"].as_str().unwrap()).unwrap(),
    )
    .unwrap();
    assert_eq!(record["completion_error"]["kind"], "http_status");
    assert_eq!(app.store.read_manifest().await.unwrap().len(), 1);
}

#[tokio::test]
async fn file_endpoints_serve_stored_files() {
    let app = degraded_app();
    post_json(&app.router, "/webhook/", r#"{"symbol": "BTCUSDT"}"#).await;

    let (status, body) = get(&app.router, "/webhook/strategy/current.pine").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], DEFAULT_STRATEGY);

    let (status, body) = get(&app.router, "/webhook/webhook/latest.json").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!({ "symbol": "BTCUSDT" }));

    let (status, _) = get(&app.router, "/webhook/strategy/missing.pine").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn history_is_newest_first() {
    let app = degraded_app();
    let dir = app.store.strategy_dir();
    std::fs::create_dir_all(dir).unwrap();
    for (timestamp, summary) in [
        ("20240301_090000", "morning"),
        ("20240301_170000", "evening"),
        ("20240301_120000", "noon"),
    ] {
        let record = json!({
            "timestamp": timestamp,
            "original_strategy": "Simple RSI Strategy",
            "modified_strategy": "Simple RSI Strategy",
            "performance_before": {},
            "modification_summary": summary,
        });
        std::fs::write(dir.join(format!("metadata_{timestamp}.json")), record.to_string()).unwrap();
    }

    let (status, body) = get(&app.router, "/webhook/history").await;

    assert_eq!(status, StatusCode::OK);
    let summaries: Vec<&str> = body["history"]
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["modification_summary"].as_str().unwrap())
        .collect();
    assert_eq!(summaries, ["evening", "noon", "morning"]);
}

#[tokio::test]
async fn status_reports_counts_and_credential() {
    let app = degraded_app();
    post_json(&app.router, "/webhook/", "{}").await;

    let (status, body) = get(&app.router, "/webhook/status").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "operational");
    assert_eq!(body["webhook_count"], 1);
    assert_eq!(body["strategy_count"], 2);
    assert_eq!(body["modification_count"], 1);
    assert_eq!(body["manifest_entries"], 1);
    assert_eq!(body["credential_configured"], false);
    assert_eq!(body["api_key_status"], "not configured");
    assert_eq!(body["completion_provider"], "none");
    assert!(body["latest_webhook"]["file"].as_str().unwrap().starts_with("webhook_"));
}

#[tokio::test]
async fn self_test_persists_nothing() {
    let app = canned_app();

    let (status, body) = get(&app.router, "/webhook/test").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert!(body["original_code"].as_str().unwrap().contains("rsiOversold = input(33"));
    assert!(body["modified_code"].as_str().unwrap().contains("rsiOversold = input(30"));
    assert!(body["webhook_data"]["trading_problem"].is_string());
    assert!(!app.store.strategy_dir().exists());
    assert!(!app.store.log_dir().exists());
}
