use mongodb::Client;
use mongodb::bson::doc;
use std::time::Instant;

/// Result of a readiness check against MongoDB
#[derive(Debug, Clone)]
pub struct HealthStatus {
    pub healthy: bool,
    /// Driver error text when unhealthy
    pub message: Option<String>,
    pub response_time_ms: u64,
}

/// Whether the deployment answers a `ping`.
pub async fn check_health(client: &Client) -> bool {
    check_health_detailed(client).await.healthy
}

/// Ping the deployment and report latency and any error text.
pub async fn check_health_detailed(client: &Client) -> HealthStatus {
    let start = Instant::now();
    let outcome = client
        .database("admin")
        .run_command(doc! { "ping": 1 })
        .await;
    let response_time_ms = start.elapsed().as_millis() as u64;

    match outcome {
        Ok(_) => HealthStatus {
            healthy: true,
            message: None,
            response_time_ms,
        },
        Err(e) => HealthStatus {
            healthy: false,
            message: Some(e.to_string()),
            response_time_ms,
        },
    }
}
