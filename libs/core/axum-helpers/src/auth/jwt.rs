use super::config::JwtConfig;
use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Claims carried by every bearer token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject (user ID)
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Scopes granted to the bearer; empty for unscoped identity tokens
    #[serde(default)]
    pub permissions: Vec<String>,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
}

impl JwtClaims {
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }

    /// Whether the token was narrowed to an explicit set of scopes.
    pub fn is_scoped(&self) -> bool {
        !self.permissions.is_empty()
    }

    /// Unscoped identity tokens allow everything; scoped tokens only what they list.
    pub fn allows(&self, permission: &str) -> bool {
        !self.is_scoped() || self.has_permission(permission)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("No token provided")]
    MissingCredential,

    #[error("Token has expired")]
    Expired,

    #[error("Invalid token")]
    InvalidCredential,

    #[error("Failed to sign token: {0}")]
    Signing(String),
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::ExpiredSignature => AuthError::Expired,
            _ => AuthError::InvalidCredential,
        }
    }
}

#[derive(Clone)]
struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

/// Verifies and mints HS256 tokens with a shared secret.
///
/// Cheap to clone; the keys are shared.
#[derive(Clone)]
pub struct JwtVerifier {
    keys: Arc<Keys>,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(config: &JwtConfig) -> Self {
        let secret = config.secret.as_bytes();
        tracing::info!("JWT verifier initialized (HS256)");
        Self {
            keys: Arc::new(Keys {
                encoding: EncodingKey::from_secret(secret),
                decoding: DecodingKey::from_secret(secret),
            }),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    /// Mint a token for `sub` that expires `ttl_seconds` from now.
    pub fn create_token(
        &self,
        sub: &str,
        email: Option<&str>,
        role: Option<&str>,
        permissions: &[&str],
        ttl_seconds: i64,
    ) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = JwtClaims {
            sub: sub.to_string(),
            email: email.map(str::to_string),
            role: role.map(str::to_string),
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
            exp: (now + Duration::seconds(ttl_seconds)).timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };
        self.sign(&claims)
    }

    /// Check the signature and expiry and decode the claims.
    pub fn verify_token(&self, token: &str) -> Result<JwtClaims, AuthError> {
        let data = decode::<JwtClaims>(token, &self.keys.decoding, &self.validation)?;
        Ok(data.claims)
    }

    /// Issue a new token for the same identity, restricted to `permissions`
    /// and valid for `ttl_seconds`. The caller's own scopes are not carried over.
    pub fn attenuate(
        &self,
        claims: &JwtClaims,
        permissions: &[&str],
        ttl_seconds: i64,
    ) -> Result<String, AuthError> {
        self.create_token(
            &claims.sub,
            claims.email.as_deref(),
            claims.role.as_deref(),
            permissions,
            ttl_seconds,
        )
    }

    fn sign(&self, claims: &JwtClaims) -> Result<String, AuthError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.keys.encoding)
            .map_err(|e| AuthError::Signing(e.to_string()))
    }
}
