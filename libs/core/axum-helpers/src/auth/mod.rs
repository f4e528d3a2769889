//! Bearer-token authentication.
//!
//! Tokens are HS256 JWTs minted by an external identity service and verified
//! here with the shared secret. A verified token can be exchanged for a
//! narrower, shorter-lived one with [`JwtVerifier::attenuate`].
//!
//! ```ignore
//! use axum_helpers::auth::{JwtConfig, JwtVerifier, jwt_auth_middleware};
//! use core_config::FromEnv;
//!
//! let verifier = JwtVerifier::new(&JwtConfig::from_env()?);
//! let protected = Router::new()
//!     .route("/products", post(create))
//!     .route_layer(axum::middleware::from_fn_with_state(verifier, jwt_auth_middleware));
//! ```

pub mod config;
pub mod jwt;
pub mod middleware;

pub use config::JwtConfig;
pub use jwt::{AuthError, JwtClaims, JwtVerifier};
pub use middleware::{jwt_auth_middleware, optional_jwt_auth_middleware, require_permission};
