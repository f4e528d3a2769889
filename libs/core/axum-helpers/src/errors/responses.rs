//! Reusable OpenAPI response types for consistent API documentation.

use super::ErrorResponse;
#[allow(unused_imports)]
use serde_json::json;
use utoipa::ToResponse;

#[derive(ToResponse)]
#[response(
    description = "Internal Server Error",
    content_type = "application/json",
    example = json!({
        "success": false,
        "code": 1005,
        "error": "INTERNAL_ERROR",
        "message": "An internal server error occurred"
    })
)]
pub struct InternalServerErrorResponse(pub ErrorResponse);

#[derive(ToResponse)]
#[response(
    description = "Bad Request - malformed body, unknown field or failed validation",
    content_type = "application/json",
    example = json!({
        "success": false,
        "code": 1001,
        "error": "VALIDATION_ERROR",
        "message": "Validation failed: price: range",
        "details": {
            "price": [{
                "code": "range",
                "message": null,
                "params": {"min": 0.0, "value": -5.0}
            }]
        }
    })
)]
pub struct BadRequestValidationResponse(pub ErrorResponse);

#[derive(ToResponse)]
#[response(
    description = "Resource not found",
    content_type = "application/json",
    example = json!({
        "success": false,
        "code": 1004,
        "error": "NOT_FOUND",
        "message": "Product PROD-1001 not found"
    })
)]
pub struct NotFoundResponse(pub ErrorResponse);

#[derive(ToResponse)]
#[response(
    description = "Unauthorized - missing, invalid or expired bearer token",
    content_type = "application/json",
    example = json!({
        "success": false,
        "code": 1006,
        "error": "UNAUTHORIZED",
        "message": "No token provided"
    })
)]
pub struct UnauthorizedResponse(pub ErrorResponse);

#[derive(ToResponse)]
#[response(
    description = "Forbidden - token scope does not cover this operation",
    content_type = "application/json",
    example = json!({
        "success": false,
        "code": 1007,
        "error": "FORBIDDEN",
        "message": "Token is not authorized for write:products"
    })
)]
pub struct ForbiddenResponse(pub ErrorResponse);

#[derive(ToResponse)]
#[response(
    description = "Conflict - no unique product id could be assigned",
    content_type = "application/json",
    example = json!({
        "success": false,
        "code": 1008,
        "error": "CONFLICT",
        "message": "Could not assign a unique product id"
    })
)]
pub struct ConflictResponse(pub ErrorResponse);
