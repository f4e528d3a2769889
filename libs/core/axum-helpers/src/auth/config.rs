use core_config::{ConfigError, FromEnv, env_required};

/// Shortest accepted HS256 secret.
pub const MIN_SECRET_LEN: usize = 32;

/// JWT verification settings.
///
/// Loaded from `JWT_SECRET` (required, at least 32 characters).
#[derive(Clone, Debug)]
pub struct JwtConfig {
    pub secret: String,
}

impl JwtConfig {
    pub fn new(secret: impl Into<String>) -> Result<Self, ConfigError> {
        let secret = secret.into();
        if secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::ParseError {
                key: "JWT_SECRET".to_string(),
                details: format!(
                    "must be at least {MIN_SECRET_LEN} characters (got {}). Generate one with: openssl rand -base64 32",
                    secret.len()
                ),
            });
        }
        Ok(Self { secret })
    }
}

impl FromEnv for JwtConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Self::new(env_required("JWT_SECRET")?)
    }
}
