use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use chrono::{SecondsFormat, Utc};
use core_config::AppInfo;
use futures::future::join_all;
use serde::Serialize;
use serde_json::{Map, Value, json};
use std::future::Future;
use std::pin::Pin;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    /// RFC 3339 time the check was answered
    pub timestamp: String,
    pub service: String,
    pub version: String,
}

/// A boxed future for health checks with a string error
pub type HealthCheckFuture<'a> = Pin<Box<dyn Future<Output = Result<(), String>> + Send + 'a>>;

/// Run named checks concurrently.
///
/// Returns 200 with `{"status": "ready", "<name>": "connected", ...}` when all
/// pass, otherwise 503 with the failing checks marked `"disconnected"`.
///
/// ```ignore
/// let checks: Vec<(&str, HealthCheckFuture)> = vec![(
///     "database",
///     Box::pin(async { ping(&client).await.map_err(|e| e.to_string()) }),
/// )];
/// run_health_checks(checks).await
/// ```
pub async fn run_health_checks(checks: Vec<(&str, HealthCheckFuture<'_>)>) -> (StatusCode, Json<Value>) {
    let (names, futures): (Vec<_>, Vec<_>) = checks.into_iter().unzip();
    let results = join_all(futures).await;

    let mut body = Map::new();
    let mut all_healthy = true;

    for (name, result) in names.into_iter().zip(results) {
        let state = match result {
            Ok(()) => "connected",
            Err(e) => {
                tracing::error!("Readiness check failed: {} error: {}", name, e);
                all_healthy = false;
                "disconnected"
            }
        };
        body.insert(name.to_string(), json!(state));
    }

    body.insert(
        "status".to_string(),
        json!(if all_healthy { "ready" } else { "not ready" }),
    );

    let status = if all_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(Value::Object(body)))
}

/// Liveness check; 200 whenever the process is serving.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses((status = 200, description = "Service is alive", body = HealthResponse))
)]
pub async fn health_handler(State(app): State<AppInfo>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        service: app.name.to_string(),
        version: app.version.to_string(),
    })
}

/// Router serving `GET /health` for the given binary.
pub fn health_router(app_info: AppInfo) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .with_state(app_info)
}
