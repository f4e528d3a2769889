use crate::{env_or_default, env_parse, ConfigError, FromEnv};
use std::net::Ipv4Addr;
use std::time::Duration;

/// Server configuration for HTTP APIs
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Upper bound on the time a single request may occupy a worker
    pub request_timeout_secs: u64,
    /// Budget for connection cleanup once a shutdown signal arrives
    pub shutdown_timeout_secs: u64,
    /// Allowed CORS origins; empty means any origin
    pub cors_allowed_origins: Vec<String>,
}

impl ServerConfig {
    pub fn new(host: String, port: u16) -> Self {
        Self {
            host,
            port,
            ..Self::default()
        }
    }

    /// Get the server address as "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

impl FromEnv for ServerConfig {
    /// Reads from environment variables with sensible defaults:
    /// - HOST: defaults to 0.0.0.0
    /// - PORT: defaults to 8080
    /// - REQUEST_TIMEOUT_SECS: defaults to 30
    /// - SHUTDOWN_TIMEOUT_SECS: defaults to 30
    /// - CORS_ALLOWED_ORIGIN: comma-separated list, unset allows any origin
    fn from_env() -> Result<Self, ConfigError> {
        let host = env_or_default("HOST", &Ipv4Addr::UNSPECIFIED.to_string());
        let port = env_parse("PORT", 8080)?;
        let request_timeout_secs = env_parse("REQUEST_TIMEOUT_SECS", 30)?;
        let shutdown_timeout_secs = env_parse("SHUTDOWN_TIMEOUT_SECS", 30)?;

        if request_timeout_secs == 0 {
            return Err(ConfigError::ParseError {
                key: "REQUEST_TIMEOUT_SECS".to_string(),
                details: "must be greater than zero".to_string(),
            });
        }

        let cors_allowed_origins = env_or_default("CORS_ALLOWED_ORIGIN", "")
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect();

        Ok(Self {
            host,
            port,
            request_timeout_secs,
            shutdown_timeout_secs,
            cors_allowed_origins,
        })
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: Ipv4Addr::UNSPECIFIED.to_string(),
            port: 8080,
            request_timeout_secs: 30,
            shutdown_timeout_secs: 30,
            cors_allowed_origins: Vec::new(),
        }
    }
}
