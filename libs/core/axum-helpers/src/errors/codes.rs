//! Type-safe error codes for API responses.
//!
//! Each code has a string form for clients (`"VALIDATION_ERROR"`), an integer
//! for logs and dashboards (`1001`) and a default message.
//!
//! ```rust
//! use axum_helpers::errors::ErrorCode;
//!
//! let code = ErrorCode::ValidationError;
//! assert_eq!(code.as_str(), "VALIDATION_ERROR");
//! assert_eq!(code.code(), 1001);
//! assert_eq!(code.default_message(), "Request validation failed");
//! ```

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Client errors (1000-1999)
    /// Request validation failed
    ValidationError,

    /// Request parameter is malformed
    BadRequest,

    /// Request body is not valid JSON for the target type
    InvalidJson,

    NotFound,

    /// Credentials are missing, malformed or expired
    Unauthorized,

    Forbidden,

    /// Request conflicts with current resource state
    Conflict,

    MethodNotAllowed,

    // Server errors
    InternalError,

    ServiceUnavailable,

    // Database errors (2000-2999)
    /// The document store rejected or failed an operation
    DatabaseError,

    /// The document store could not be reached
    DatabaseUnavailable,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ValidationError => "VALIDATION_ERROR",
            Self::BadRequest => "BAD_REQUEST",
            Self::InvalidJson => "INVALID_JSON",
            Self::NotFound => "NOT_FOUND",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden => "FORBIDDEN",
            Self::Conflict => "CONFLICT",
            Self::MethodNotAllowed => "METHOD_NOT_ALLOWED",
            Self::InternalError => "INTERNAL_ERROR",
            Self::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            Self::DatabaseError => "DATABASE_ERROR",
            Self::DatabaseUnavailable => "DATABASE_UNAVAILABLE",
        }
    }

    /// Integer code used in structured logs.
    ///
    /// - 1000-1999: client and generic server errors
    /// - 2000-2999: document store errors
    pub fn code(&self) -> i32 {
        match self {
            Self::ValidationError => 1001,
            Self::BadRequest => 1002,
            Self::InvalidJson => 1003,
            Self::NotFound => 1004,
            Self::InternalError => 1005,
            Self::Unauthorized => 1006,
            Self::Forbidden => 1007,
            Self::Conflict => 1008,
            Self::MethodNotAllowed => 1009,
            Self::ServiceUnavailable => 1011,
            Self::DatabaseError => 2003,
            Self::DatabaseUnavailable => 2013,
        }
    }

    pub fn default_message(&self) -> &'static str {
        match self {
            Self::ValidationError => "Request validation failed",
            Self::BadRequest => "Bad request",
            Self::InvalidJson => "Invalid JSON body",
            Self::NotFound => "Resource not found",
            Self::Unauthorized => "Authentication required",
            Self::Forbidden => "Access forbidden",
            Self::Conflict => "Resource conflicts with current state",
            Self::MethodNotAllowed => "The HTTP method is not allowed for this resource",
            Self::InternalError => "An internal server error occurred",
            Self::ServiceUnavailable => "Service is temporarily unavailable",
            Self::DatabaseError => "A database error occurred",
            Self::DatabaseUnavailable => "The database is temporarily unavailable",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
