pub mod codes;
pub mod handlers;
pub mod responses;

pub use codes::ErrorCode;

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;
use validator::ValidationErrors;

/// Body of every error response.
///
/// ```json
/// {
///   "success": false,
///   "code": 1004,
///   "error": "NOT_FOUND",
///   "message": "Product PROD-1001 not found"
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Always `false`
    pub success: bool,
    /// Integer error code for logging and monitoring
    pub code: i32,
    /// Machine-readable error identifier
    pub error: String,
    /// Human-readable error message
    pub message: String,
    /// Structured details such as per-field validation errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            success: false,
            code: code.code(),
            error: code.as_str().to_string(),
            message: message.into(),
            details: None,
        }
    }
}

/// Route-boundary error; every variant renders as an [`ErrorResponse`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppError {
    #[error("JSON extraction error: {0}")]
    JsonExtractorRejection(#[from] JsonRejection),

    #[error("Validation error: {0}")]
    ValidationError(#[from] ValidationErrors),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal Server Error: {0}")]
    InternalServerError(String),

    #[error("Service Unavailable: {0}")]
    ServiceUnavailable(String),
}

impl AppError {
    fn parts(self) -> (StatusCode, ErrorCode, String, Option<serde_json::Value>) {
        match self {
            // Syntax, type and content-type failures are all the client's fault.
            AppError::JsonExtractorRejection(e) => (
                StatusCode::BAD_REQUEST,
                ErrorCode::InvalidJson,
                e.body_text(),
                None,
            ),
            AppError::ValidationError(e) => {
                let details = serde_json::to_value(&e).ok();
                (
                    StatusCode::BAD_REQUEST,
                    ErrorCode::ValidationError,
                    validation_summary(&e),
                    details,
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, ErrorCode::BadRequest, msg, None),
            AppError::Unauthorized(msg) => {
                (StatusCode::UNAUTHORIZED, ErrorCode::Unauthorized, msg, None)
            }
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, ErrorCode::Forbidden, msg, None),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, ErrorCode::NotFound, msg, None),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, ErrorCode::Conflict, msg, None),
            AppError::Database(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorCode::DatabaseError,
                msg,
                None,
            ),
            AppError::InternalServerError(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorCode::InternalError,
                msg,
                None,
            ),
            AppError::ServiceUnavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorCode::ServiceUnavailable,
                msg,
                None,
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = self.parts();

        if status.is_server_error() {
            tracing::error!(error_code = code.code(), status = status.as_u16(), "{}", message);
        } else if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            tracing::warn!(error_code = code.code(), status = status.as_u16(), "{}", message);
        } else {
            tracing::info!(error_code = code.code(), status = status.as_u16(), "{}", message);
        }

        // Internal details stay in the logs.
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            code.default_message().to_string()
        } else {
            message
        };

        let body = ErrorResponse {
            details,
            ..ErrorResponse::new(code, message)
        };

        (status, Json(body)).into_response()
    }
}

/// `"name: length; price: range"` style summary of failing fields, sorted for
/// stable output.
fn validation_summary(errors: &ValidationErrors) -> String {
    let mut fields: Vec<String> = errors
        .field_errors()
        .iter()
        .map(|(field, errs)| {
            let reasons: Vec<String> = errs
                .iter()
                .map(|e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string())
                })
                .collect();
            format!("{}: {}", field, reasons.join(", "))
        })
        .collect();
    fields.sort();

    if fields.is_empty() {
        ErrorCode::ValidationError.default_message().to_string()
    } else {
        format!("Validation failed: {}", fields.join("; "))
    }
}

/// Build an error response outside of the `AppError` flow.
pub fn error_response(status: StatusCode, message: impl Into<String>, code: ErrorCode) -> Response {
    (status, Json(ErrorResponse::new(code, message))).into_response()
}
