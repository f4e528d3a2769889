#[cfg(feature = "config")]
use core_config::{ConfigError, FromEnv, env_parse};

const DEFAULT_MAX_POOL_SIZE: u32 = 100;
const DEFAULT_MIN_POOL_SIZE: u32 = 5;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_SERVER_SELECTION_TIMEOUT_SECS: u64 = 30;

/// MongoDB connection settings
///
/// Build it by hand for tests, or load it with [`FromEnv`] (`config` feature).
///
/// ```ignore
/// let config = MongoConfig::with_database("mongodb://localhost:27017", "catalog")
///     .with_app_name("catalog_api");
/// ```
#[derive(Clone, Debug)]
pub struct MongoConfig {
    /// Connection string, `mongodb://[user:pass@]host[:port][/db][?options]`
    pub url: String,

    pub database: String,

    /// Reported to the server in its connection logs
    pub app_name: Option<String>,

    pub max_pool_size: u32,
    pub min_pool_size: u32,
    pub connect_timeout_secs: u64,

    /// How long an operation waits for a suitable server before failing
    pub server_selection_timeout_secs: u64,
}

impl MongoConfig {
    pub fn with_database(url: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            database: database.into(),
            ..Self::default()
        }
    }

    pub fn with_pool_size(mut self, max_pool_size: u32, min_pool_size: u32) -> Self {
        self.max_pool_size = max_pool_size;
        self.min_pool_size = min_pool_size;
        self
    }

    pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = Some(app_name.into());
        self
    }

    pub fn with_server_selection_timeout(mut self, secs: u64) -> Self {
        self.server_selection_timeout_secs = secs;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn database(&self) -> &str {
        &self.database
    }
}

impl Default for MongoConfig {
    fn default() -> Self {
        Self {
            url: "mongodb://localhost:27017".to_string(),
            database: "catalog".to_string(),
            app_name: None,
            max_pool_size: DEFAULT_MAX_POOL_SIZE,
            min_pool_size: DEFAULT_MIN_POOL_SIZE,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            server_selection_timeout_secs: DEFAULT_SERVER_SELECTION_TIMEOUT_SECS,
        }
    }
}

/// Environment variables:
/// - `MONGODB_URL` or `MONGO_URL` (required)
/// - `MONGODB_DATABASE` or `MONGO_DATABASE` (required)
/// - `MONGODB_APP_NAME` (optional)
/// - `MONGODB_MAX_POOL_SIZE` (default 100), `MONGODB_MIN_POOL_SIZE` (default 5)
/// - `MONGODB_CONNECT_TIMEOUT_SECS` (default 10)
/// - `MONGODB_SERVER_SELECTION_TIMEOUT_SECS` (default 30)
#[cfg(feature = "config")]
impl FromEnv for MongoConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let url = std::env::var("MONGODB_URL")
            .or_else(|_| std::env::var("MONGO_URL"))
            .map_err(|_| ConfigError::MissingEnvVar("MONGODB_URL or MONGO_URL".to_string()))?;

        let database = std::env::var("MONGODB_DATABASE")
            .or_else(|_| std::env::var("MONGO_DATABASE"))
            .map_err(|_| {
                ConfigError::MissingEnvVar("MONGODB_DATABASE or MONGO_DATABASE".to_string())
            })?;

        let max_pool_size = env_parse("MONGODB_MAX_POOL_SIZE", DEFAULT_MAX_POOL_SIZE)?;
        let min_pool_size = env_parse("MONGODB_MIN_POOL_SIZE", DEFAULT_MIN_POOL_SIZE)?;
        if min_pool_size > max_pool_size {
            return Err(ConfigError::ParseError {
                key: "MONGODB_MIN_POOL_SIZE".to_string(),
                details: format!("must not exceed MONGODB_MAX_POOL_SIZE ({max_pool_size})"),
            });
        }

        Ok(Self {
            url,
            database,
            app_name: std::env::var("MONGODB_APP_NAME").ok(),
            max_pool_size,
            min_pool_size,
            connect_timeout_secs: env_parse(
                "MONGODB_CONNECT_TIMEOUT_SECS",
                DEFAULT_CONNECT_TIMEOUT_SECS,
            )?,
            server_selection_timeout_secs: env_parse(
                "MONGODB_SERVER_SELECTION_TIMEOUT_SECS",
                DEFAULT_SERVER_SELECTION_TIMEOUT_SECS,
            )?,
        })
    }
}
