use axum::{
    extract::rejection::BytesRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use storage::StorageError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Request body is not valid JSON: {0}")]
    MalformedBody(#[from] core_types::CoreError),
    #[error("Request body could not be read: {0}")]
    Body(#[from] BytesRejection),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("No route for {0}")]
    RouteNotFound(String),
}

/// Converts our custom `AppError` into an HTTP response.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::MalformedBody(err) => {
                tracing::warn!(error = %err, "Rejected a malformed webhook body.");
                (StatusCode::BAD_REQUEST, err.to_string())
            }
            AppError::Body(rejection) => {
                tracing::warn!(status = %rejection.status(), error = %rejection.body_text(), "Rejected a webhook body.");
                (rejection.status(), rejection.body_text())
            }
            AppError::RouteNotFound(path) => (StatusCode::NOT_FOUND, format!("No route for {path}")),
            AppError::Storage(err) => {
                let status = match &err {
                    StorageError::InvalidFilename(_) | StorageError::IsDirectory(_) => {
                        StatusCode::BAD_REQUEST
                    }
                    StorageError::NotFound(_) => StatusCode::NOT_FOUND,
                    StorageError::PermissionDenied(_) => StatusCode::FORBIDDEN,
                    StorageError::AlreadyExists(_)
                    | StorageError::Io { .. }
                    | StorageError::JsonError(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                if status.is_server_error() {
                    tracing::error!(error = ?err, "Storage error.");
                } else {
                    tracing::warn!(error = %err, "Rejected a file request.");
                }
                (status, err.to_string())
            }
        };

        let body = Json(json!({ "status": "error", "message": error_message }));
        (status, body).into_response()
    }
}
