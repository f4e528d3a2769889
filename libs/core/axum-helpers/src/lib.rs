//! # Axum Helpers
//!
//! Shared HTTP plumbing for the catalog services.
//!
//! ## Modules
//!
//! - **[`auth`]**: HS256 bearer-token verification, attenuated token minting, auth middleware
//! - **[`server`]**: Router assembly, health checks, graceful shutdown
//! - **[`http`]**: Security headers and CORS
//! - **[`errors`]**: `{success: false, ...}` error envelope with stable error codes
//! - **[`extractors`]**: JSON extractors that always reject with 400
//!
//! ## Quick Start
//!
//! ```ignore
//! use axum_helpers::server::{create_production_app, create_router, health_router};
//! use core_config::{app_info, server::ServerConfig};
//!
//! let config = ServerConfig::default();
//! let router = create_router::<ApiDoc>(api_routes, &config)?
//!     .merge(health_router(app_info!()));
//! create_production_app(router, &config, async {}).await?;
//! ```

pub mod auth;
pub mod errors;
pub mod extractors;
pub mod http;
pub mod server;

pub use auth::{
    AuthError, JwtClaims, JwtConfig, JwtVerifier, jwt_auth_middleware,
    optional_jwt_auth_middleware, require_permission,
};

pub use server::{
    HealthCheckFuture, HealthResponse, ShutdownCoordinator, create_production_app,
    create_router, health_router, run_health_checks, shutdown_signal,
};

pub use http::{create_cors_layer, security_headers};

pub use errors::{AppError, ErrorCode, ErrorResponse};

pub use extractors::{JsonBody, ValidatedJson};
