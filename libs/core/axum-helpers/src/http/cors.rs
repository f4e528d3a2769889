use axum::http::{HeaderValue, Method, header};
use std::io;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};

/// CORS layer for the given origins; an empty list allows any origin.
///
/// Credentials are not allowed because the API authenticates with bearer
/// headers rather than cookies.
pub fn create_cors_layer(allowed_origins: &[String]) -> io::Result<CorsLayer> {
    let base = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
        .max_age(Duration::from_secs(3600));

    if allowed_origins.is_empty() {
        tracing::warn!("CORS_ALLOWED_ORIGIN not set, allowing any origin");
        return Ok(base.allow_origin(AllowOrigin::any()));
    }

    let origins = allowed_origins
        .iter()
        .map(|origin| origin.parse::<HeaderValue>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("Invalid CORS_ALLOWED_ORIGIN value: {e}"),
            )
        })?;

    tracing::info!("CORS configured with allowed origins: {}", allowed_origins.join(","));
    Ok(base.allow_origin(AllowOrigin::list(origins)))
}
