// ABOUTME: Centralized error handling with a fixed code taxonomy and a JSON error envelope
// ABOUTME: Classifies storage failures and never puts internal details in the default body

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::{DbErr, SqlErr};
use serde::Serialize;
use serde_json::json;
use std::fmt;

/// Machine-stable error code carried by every error envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NotFound,
    Forbidden,
    Unauthorized,
    ValidationFailed,
    Conflict,
    InternalError,
}

impl ErrorCode {
    pub fn status(self) -> StatusCode {
        match self {
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::ValidationFailed => StatusCode::BAD_REQUEST,
            ErrorCode::Conflict => StatusCode::CONFLICT,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// One failing input field, reported alongside every other failing field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub path: String,
    pub message: String,
    pub code: &'static str,
}

impl FieldError {
    pub fn new(path: impl Into<String>, message: impl Into<String>, code: &'static str) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            code,
        }
    }
}

#[derive(Debug)]
pub enum AppError {
    Database(DbErr),
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    Validation(Vec<FieldError>),
    Conflict(String),
    Internal(String),
}

impl AppError {
    pub fn field(path: &str, message: impl Into<String>, code: &'static str) -> Self {
        AppError::Validation(vec![FieldError::new(path, message, code)])
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Database(err) if is_unique_violation(err) => ErrorCode::Conflict,
            AppError::Database(_) => ErrorCode::InternalError,
            AppError::Unauthorized(_) => ErrorCode::Unauthorized,
            AppError::Forbidden(_) => ErrorCode::Forbidden,
            AppError::NotFound(_) => ErrorCode::NotFound,
            AppError::Validation(_) => ErrorCode::ValidationFailed,
            AppError::Conflict(_) => ErrorCode::Conflict,
            AppError::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// The message shown to clients. Storage and internal failures get a
    /// generic text; their detail only travels in [`ErrorDetail`].
    pub fn public_message(&self) -> String {
        match self {
            AppError::Database(err) if is_unique_violation(err) => {
                "Resource already exists".to_string()
            }
            AppError::Database(_) => "Database operation failed".to_string(),
            AppError::Unauthorized(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg) => msg.clone(),
            AppError::Validation(fields) => match fields.len() {
                1 => "Request validation failed for 1 field".to_string(),
                n => format!("Request validation failed for {} fields", n),
            },
            AppError::Internal(_) => "Internal server error".to_string(),
        }
    }
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Database(err) => write!(f, "Database error: {}", err),
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            AppError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::Validation(fields) => {
                write!(f, "Validation failed:")?;
                for field in fields {
                    write!(f, " {} ({}: {});", field.path, field.code, field.message)?;
                }
                Ok(())
            }
            AppError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

/// Internal description of an error response, attached as a response
/// extension. Only the diagnostics middleware ever surfaces it.
#[derive(Debug, Clone)]
pub struct ErrorDetail(pub String);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.code();
        match code {
            ErrorCode::InternalError => tracing::error!("{}", self),
            ErrorCode::Unauthorized | ErrorCode::Forbidden | ErrorCode::ValidationFailed => {
                tracing::warn!("{}", self)
            }
            ErrorCode::NotFound | ErrorCode::Conflict => tracing::info!("{}", self),
        }

        let mut error = json!({
            "code": code,
            "message": self.public_message(),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });
        if let AppError::Validation(fields) = &self {
            error["details"] = json!(fields);
        }

        let body = Json(json!({
            "success": false,
            "error": error,
        }));

        let mut response = (code.status(), body).into_response();
        response.extensions_mut().insert(ErrorDetail(self.to_string()));
        response
    }
}

// Conversion implementations
impl From<DbErr> for AppError {
    fn from(err: DbErr) -> Self {
        AppError::Database(err)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::field("body", rejection.body_text(), "invalid_body")
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::field("path", rejection.body_text(), "invalid_path")
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::field("query", rejection.body_text(), "invalid_query")
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_map_to_distinct_statuses() {
        assert_eq!(ErrorCode::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(ErrorCode::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ErrorCode::ValidationFailed.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::Conflict.status(), StatusCode::CONFLICT);
        assert_eq!(
            ErrorCode::InternalError.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn internal_errors_hide_their_detail() {
        let err = AppError::Internal("pool exhausted at 0xdeadbeef".to_string());
        assert_eq!(err.code(), ErrorCode::InternalError);
        assert_eq!(err.public_message(), "Internal server error");
        assert!(err.to_string().contains("0xdeadbeef"));

        let err = AppError::Database(DbErr::Custom("disk I/O error".to_string()));
        assert_eq!(err.code(), ErrorCode::InternalError);
        assert!(!err.public_message().contains("disk"));
    }

    #[test]
    fn validation_message_counts_fields() {
        let err = AppError::Validation(vec![
            FieldError::new("title", "is required", "required"),
            FieldError::new("content", "must be a string", "invalid_type"),
        ]);
        assert_eq!(err.code(), ErrorCode::ValidationFailed);
        assert_eq!(err.public_message(), "Request validation failed for 2 fields");
    }

    #[test]
    fn code_serializes_screaming_snake() {
        let value = serde_json::to_value(ErrorCode::ValidationFailed).unwrap();
        assert_eq!(value, "VALIDATION_FAILED");
    }
}
