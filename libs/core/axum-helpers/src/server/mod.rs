//! Server infrastructure: router assembly with OpenAPI and cross-cutting
//! layers, liveness/readiness helpers and graceful shutdown.
//!
//! ```ignore
//! use axum_helpers::server::{create_production_app, create_router, health_router};
//! use core_config::app_info;
//!
//! let router = create_router::<ApiDoc>(api_routes, &server_config)?
//!     .merge(health_router(app_info!()));
//!
//! create_production_app(router, &server_config, async move { drop(client) }).await?;
//! ```

pub mod app;
pub mod health;
pub mod shutdown;

pub use app::{create_production_app, create_router};
pub use health::{HealthCheckFuture, HealthResponse, health_router, run_health_checks};
pub use shutdown::{ShutdownCoordinator, shutdown_signal};
