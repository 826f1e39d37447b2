use std::sync::OnceLock;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::storage::StorageError;

static EXPOSE_INTERNAL_DETAILS: OnceLock<bool> = OnceLock::new();

/// Allow 500 responses to carry the underlying error text. Only set in
/// development; the first call wins.
pub fn expose_internal_details(enabled: bool) {
    let _ = EXPOSE_INTERNAL_DETAILS.set(enabled);
}

fn internal_message(detail: String) -> String {
    if EXPOSE_INTERNAL_DETAILS.get().copied().unwrap_or(false) {
        detail
    } else {
        "Internal server error".into()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Access denied, no token provided")]
    Unauthorized,

    #[error("{0}")]
    Forbidden(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    /// Duplicate signup. Reported as 400 to keep the browser client contract.
    #[error("{0}")]
    AlreadyExists(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Too many requests, please slow down")]
    RateLimited,

    #[error("{0}")]
    ServiceUnavailable(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(msg) => AppError::NotFound(msg),
            StorageError::Conflict(msg) => AppError::Conflict(msg),
            StorageError::Database(e) => AppError::Database(e),
            StorageError::Corrupt(msg) => {
                AppError::Internal(anyhow::anyhow!("corrupt stored data: {msg}"))
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            AppError::InvalidCredentials => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::AlreadyExists(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::RateLimited => (StatusCode::TOO_MANY_REQUESTS, self.to_string()),
            AppError::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
            AppError::Database(e) => {
                tracing::error!(error = %e, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, internal_message(e.to_string()))
            }
            AppError::Internal(e) => {
                tracing::error!(error = %e, "Internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, internal_message(format!("{e:#}")))
            }
        };

        // Browser code reads `error` on the app pages and `message` on the
        // access request form.
        let body = json!({
            "success": false,
            "error": message,
            "message": message,
        });

        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_taxonomy() {
        let cases = [
            (AppError::Unauthorized, StatusCode::UNAUTHORIZED),
            (AppError::Forbidden("bad".into()), StatusCode::FORBIDDEN),
            (AppError::InvalidCredentials, StatusCode::BAD_REQUEST),
            (AppError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (AppError::AlreadyExists("x".into()), StatusCode::BAD_REQUEST),
            (AppError::Conflict("x".into()), StatusCode::CONFLICT),
            (AppError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (
                AppError::ServiceUnavailable("x".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                AppError::Internal(anyhow::anyhow!("boom")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }

    #[tokio::test]
    async fn internal_detail_hidden_by_default() {
        use http_body_util::BodyExt;

        let response = AppError::Internal(anyhow::anyhow!("pool exhausted")).into_response();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "Internal server error");
        assert_eq!(body["message"], "Internal server error");
    }

    #[test]
    fn storage_errors_map_to_app_errors() {
        let err: AppError = StorageError::Conflict("phone taken".into()).into();
        assert!(matches!(err, AppError::Conflict(ref m) if m == "phone taken"));

        let err: AppError = StorageError::NotFound("User not found".into()).into();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
