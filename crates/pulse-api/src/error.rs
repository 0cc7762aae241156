//! API error types.

use std::sync::OnceLock;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

static PRODUCTION_MODE: OnceLock<bool> = OnceLock::new();

/// Record once, at startup, whether error responses must hide internal
/// detail. Later calls are no-ops.
pub fn set_production_mode(enabled: bool) {
    let _ = PRODUCTION_MODE.set(enabled);
}

fn production_mode() -> bool {
    PRODUCTION_MODE.get().copied().unwrap_or(false)
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthenticated(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Storage error: {0}")]
    Storage(#[from] pulse_storage::StorageError),

    #[error("Database error: {0}")]
    Db(#[from] pulse_db::DbError),

    #[error("Queue error: {0}")]
    Queue(#[from] pulse_queue::QueueError),
}

impl ApiError {
    pub fn unauthenticated(msg: impl Into<String>) -> Self {
        Self::Unauthenticated(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::BadRequest(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Internal(_) | ApiError::Storage(_) | ApiError::Db(_) | ApiError::Queue(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Don't expose internal error details in production
        let detail = match &self {
            ApiError::Internal(_) | ApiError::Storage(_) | ApiError::Db(_) | ApiError::Queue(_) => {
                if production_mode() {
                    "An internal error occurred".to_string()
                } else {
                    self.to_string()
                }
            }
            _ => self.to_string(),
        };

        let body = ErrorResponse { detail };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn response_detail(err: ApiError) -> String {
        let response = err.into_response();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    // OnceLock is set-once per process, so both sides of the production
    // switch live in one test.
    #[tokio::test]
    async fn production_mode_hides_internal_detail() {
        set_production_mode(true);

        let internal = response_detail(ApiError::internal("pool exhausted at 10.0.0.5")).await;
        assert!(!internal.contains("10.0.0.5"));
        assert!(internal.contains("An internal error occurred"));

        // Client-facing errors keep their detail either way.
        let conflict = response_detail(ApiError::conflict("email taken")).await;
        assert!(conflict.contains("email taken"));
    }

    #[test]
    fn status_codes_match_error_classes() {
        assert_eq!(
            ApiError::unauthenticated("no token").status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::forbidden("viewers cannot upload").status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::conflict("email taken").status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::UnsupportedMediaType("text/plain".into()).status_code(),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
        assert_eq!(
            ApiError::PayloadTooLarge("too big".into()).status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
    }
}
