use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

/// Top-level application error. All variants carry a human-readable message
/// for display/logging; the [`IntoResponse`] impl below is the single place
/// that maps internal failures to response statuses.
#[allow(dead_code)]
#[derive(Debug, Error)]
pub enum AppError {
    // ── Database errors ──────────────────────────────────────────────────────
    #[error("Database connection failed: {0}")]
    DatabaseConnectionFailed(#[source] sqlx::Error),

    #[error("Database query failed: {message}")]
    DatabaseQueryFailed {
        message: String,
        #[source]
        source: sqlx::Error,
    },

    // ── Conversation errors ──────────────────────────────────────────────────
    #[error("Conversation '{id}' not found")]
    ConversationNotFound { id: String },

    // ── Validation errors ────────────────────────────────────────────────────
    #[error("Field '{field_name}' cannot be empty")]
    EmptyField { field_name: String },

    #[error("Field '{field_name}' exceeds max length of {max_length} (actual: {actual_length})")]
    FieldTooLong { field_name: String, max_length: usize, actual_length: usize },

    #[error("Invalid message role: '{role}'")]
    InvalidRole { role: String },

    // ── LLM provider errors ──────────────────────────────────────────────────
    #[error("Completion request failed: {message}")]
    CompletionFailed { message: String },

    // ── System errors ────────────────────────────────────────────────────────
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn db_query(message: impl Into<String>, source: sqlx::Error) -> Self {
        AppError::DatabaseQueryFailed { message: message.into(), source }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::ConversationNotFound { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            AppError::EmptyField { .. }
                | AppError::FieldTooLong { .. }
                | AppError::InvalidRole { .. }
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = if self.is_validation() {
            StatusCode::BAD_REQUEST
        } else if self.is_not_found() {
            StatusCode::NOT_FOUND
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };

        (status, Json(serde_json::json!({ "detail": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_classification() {
        let err = AppError::ConversationNotFound { id: "abc".into() };
        assert!(err.is_not_found());
        assert!(!err.is_validation());
    }

    #[test]
    fn validation_classification() {
        let err = AppError::EmptyField { field_name: "message".into() };
        assert!(err.is_validation());

        let err = AppError::InvalidRole { role: "robot".into() };
        assert!(err.is_validation());
        assert!(!err.is_not_found());
    }

    #[test]
    fn completion_failure_is_server_side() {
        let err = AppError::CompletionFailed { message: "boom".into() };
        assert!(!err.is_validation());
        assert!(!err.is_not_found());
    }
}
