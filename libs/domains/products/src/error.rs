use axum::response::{IntoResponse, Response};
use axum_helpers::AppError;
use database::mongodb::{is_duplicate_key, is_transient};
use thiserror::Error;
use validator::ValidationErrors;

#[derive(Debug, Error)]
pub enum ProductError {
    #[error("Product {0} not found")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Invalid input: {0}")]
    InvalidFields(#[from] ValidationErrors),

    /// The unique index on `productId` rejected the write
    #[error("Product id already taken: {0}")]
    DuplicateProductId(String),

    /// The store could not be reached; safe to retry
    #[error("Database unavailable: {0}")]
    Unavailable(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type ProductResult<T> = Result<T, ProductError>;

impl ProductError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ProductError::Unavailable(_))
    }
}

/// Convert ProductError to AppError for standardized error responses
impl From<ProductError> for AppError {
    fn from(err: ProductError) -> Self {
        match err {
            ProductError::NotFound(id) => AppError::NotFound(format!("Product {} not found", id)),
            ProductError::Validation(msg) => AppError::BadRequest(msg),
            ProductError::InvalidFields(errors) => AppError::ValidationError(errors),
            ProductError::DuplicateProductId(msg) => AppError::Conflict(msg),
            ProductError::Unavailable(msg) | ProductError::Database(msg) => AppError::Database(msg),
            ProductError::Internal(msg) => AppError::InternalServerError(msg),
        }
    }
}

impl IntoResponse for ProductError {
    fn into_response(self) -> Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}

impl From<mongodb::error::Error> for ProductError {
    fn from(err: mongodb::error::Error) -> Self {
        if is_duplicate_key(&err) {
            ProductError::DuplicateProductId(err.to_string())
        } else if is_transient(&err) {
            ProductError::Unavailable(err.to_string())
        } else {
            ProductError::Database(err.to_string())
        }
    }
}

impl From<mongodb::bson::ser::Error> for ProductError {
    fn from(err: mongodb::bson::ser::Error) -> Self {
        ProductError::Internal(format!("BSON serialization failed: {}", err))
    }
}
