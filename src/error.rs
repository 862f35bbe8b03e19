//! Request failure types and their HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    /// Malformed request data: bad CSV header, unknown plain filter field.
    #[error("validation: {0}")]
    Validation(String),
    /// Requested document (or deletion target set) does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// Unknown collection, or a relationship filter naming a non-reference field.
    #[error("schema: {0}")]
    Schema(String),
    /// Remote CSV source could not be fetched. The detail is logged, never sent
    /// to the client.
    #[error("external fetch: {0}")]
    Fetch(String),
    /// Per-row import failures, capped for display. Keys are display indices.
    #[error("import completed with row errors")]
    ImportFailed { errors: serde_json::Value },
    /// Storage backend failure.
    #[error("storage: {0}")]
    Store(String),
    #[error("forbidden")]
    Forbidden,
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            // 404 carries no body; the detail stays in the log.
            AppError::NotFound(what) => {
                tracing::debug!(what = %what, "entity not found");
                StatusCode::NOT_FOUND.into_response()
            }
            AppError::ImportFailed { errors } => (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "errors": errors })),
            )
                .into_response(),
            AppError::Fetch(detail) => {
                tracing::error!(detail = %detail, "remote csv fetch failed");
                let body = ErrorBody {
                    error: ErrorDetail {
                        code: "external_fetch_error".into(),
                        message: "Could not read CSV file".into(),
                    },
                };
                (StatusCode::BAD_REQUEST, Json(body)).into_response()
            }
            other => {
                let (status, code) = match &other {
                    AppError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
                    AppError::Schema(_) => (StatusCode::INTERNAL_SERVER_ERROR, "schema_error"),
                    AppError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "storage_error"),
                    AppError::Forbidden => (StatusCode::FORBIDDEN, "forbidden"),
                    _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
                };
                if status.is_server_error() {
                    tracing::error!(error = %other, "request failed");
                }
                let body = ErrorBody {
                    error: ErrorDetail {
                        code: code.to_string(),
                        message: other.to_string(),
                    },
                };
                (status, Json(body)).into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_has_no_body() {
        let resp = AppError::NotFound("users/abc".into()).into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_fetch_error_is_generic() {
        // Transport detail must not reach the client.
        let resp = AppError::Fetch("connection refused to 10.0.0.3:9000".into()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
