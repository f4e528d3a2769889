//! Readiness check

use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use axum_helpers::{HealthCheckFuture, run_health_checks};
use database::mongodb::check_health_detailed;
use mongodb::Client;
use serde_json::Value;

use crate::state::AppState;

/// Readiness check; pings the document store.
#[utoipa::path(
    get,
    path = "/ready",
    tag = "health",
    responses(
        (status = 200, description = "Store reachable"),
        (status = 503, description = "Store unreachable")
    )
)]
pub async fn ready(State(client): State<Client>) -> (StatusCode, Json<Value>) {
    let checks: Vec<(&str, HealthCheckFuture)> = vec![(
        "database",
        Box::pin(async {
            let status = check_health_detailed(&client).await;
            if status.healthy {
                Ok(())
            } else {
                Err(status.message.unwrap_or_else(|| "ping failed".to_string()))
            }
        }),
    )];
    run_health_checks(checks).await
}

pub fn router(state: &AppState) -> Router {
    Router::new()
        .route("/ready", get(ready))
        .with_state(state.mongo_client.clone())
}
