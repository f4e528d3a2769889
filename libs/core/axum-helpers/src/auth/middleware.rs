use super::jwt::{AuthError, JwtClaims, JwtVerifier};
use crate::errors::AppError;
use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};

/// Credential from `Authorization: Bearer <token>`; the scheme is case-insensitive.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Signing(msg) => AppError::InternalServerError(msg),
            other => AppError::Unauthorized(other.to_string()),
        }
    }
}

/// Rejects the request with 401 unless it carries a valid bearer token.
///
/// On success the decoded [`JwtClaims`](super::JwtClaims) are inserted into the
/// request extensions for handlers to read with `Extension<JwtClaims>`.
pub async fn jwt_auth_middleware(
    State(verifier): State<JwtVerifier>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers()).ok_or(AuthError::MissingCredential)?;

    let claims = verifier.verify_token(token).inspect_err(|e| {
        tracing::debug!("JWT verification failed: {}", e);
    })?;

    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

/// Like [`jwt_auth_middleware`] but lets anonymous requests through.
///
/// A missing or invalid token leaves the extensions empty; handlers read the
/// caller with `Option<Extension<JwtClaims>>`.
pub async fn optional_jwt_auth_middleware(
    State(verifier): State<JwtVerifier>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(token) = bearer_token(request.headers()) {
        match verifier.verify_token(token) {
            Ok(claims) => {
                request.extensions_mut().insert(claims);
            }
            Err(e) => tracing::debug!("Ignoring invalid optional token: {}", e),
        }
    }

    next.run(request).await
}

/// Rejects scoped tokens that do not carry `permission` with 403.
///
/// Must run inside [`jwt_auth_middleware`], which supplies the claims.
/// Unscoped identity tokens always pass.
pub async fn require_permission(
    State(permission): State<&'static str>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let claims = request
        .extensions()
        .get::<JwtClaims>()
        .ok_or(AuthError::MissingCredential)?;

    if !claims.allows(permission) {
        tracing::debug!(sub = %claims.sub, permission, "Token scope does not cover request");
        return Err(AppError::Forbidden(format!(
            "Token is not authorized for {permission}"
        )));
    }

    Ok(next.run(request).await)
}
