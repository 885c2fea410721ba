use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use crate::auth::repo::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("User already exists")]
    UserExists,
    #[error("User not found")]
    UserNotFound,
    #[error("Invalid password")]
    InvalidPassword,
    #[error("Invalid token")]
    InvalidToken,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict => AppError::UserExists,
            StoreError::Database(e) => AppError::Internal(e),
        }
    }
}

/// Unreadable bodies are not part of the client-facing taxonomy; the cause is
/// only logged.
impl From<JsonRejection> for AppError {
    fn from(e: JsonRejection) -> Self {
        AppError::Internal(anyhow::anyhow!("rejected request body: {}", e.body_text()))
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::UserExists => StatusCode::BAD_REQUEST,
            AppError::UserNotFound => StatusCode::NOT_FOUND,
            AppError::InvalidPassword | AppError::InvalidToken => StatusCode::UNAUTHORIZED,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            AppError::Internal(e) => {
                error!(error = ?e, "internal error");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn render(err: AppError) -> (StatusCode, serde_json::Value) {
        let res = err.into_response();
        let status = res.status();
        let body = to_bytes(res.into_body(), usize::MAX).await.expect("body");
        (status, serde_json::from_slice(&body).expect("json"))
    }

    #[tokio::test]
    async fn client_errors_keep_their_message() {
        let cases = [
            (AppError::UserExists, StatusCode::BAD_REQUEST, "User already exists"),
            (AppError::UserNotFound, StatusCode::NOT_FOUND, "User not found"),
            (AppError::InvalidPassword, StatusCode::UNAUTHORIZED, "Invalid password"),
            (AppError::InvalidToken, StatusCode::UNAUTHORIZED, "Invalid token"),
        ];
        for (err, status, message) in cases {
            let (got_status, body) = render(err).await;
            assert_eq!(got_status, status);
            assert_eq!(body["error"], message);
        }
    }

    #[tokio::test]
    async fn internal_error_hides_details() {
        let (status, body) = render(anyhow::anyhow!("connection refused on 10.0.0.5").into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Internal server error");
    }

    #[test]
    fn store_conflict_maps_to_user_exists() {
        assert!(matches!(AppError::from(StoreError::Conflict), AppError::UserExists));
        let db = StoreError::Database(anyhow::anyhow!("down"));
        assert!(matches!(AppError::from(db), AppError::Internal(_)));
    }
}
