//! Configuration for the Catalog API

use axum_helpers::JwtConfig;
use core_config::{AppInfo, FromEnv, app_info, env_or_default, server::ServerConfig};
use database::mongodb::MongoConfig;

pub use core_config::Environment;

/// Default prefix for human-readable product ids (`PROD-1001`)
pub const DEFAULT_PRODUCT_ID_PREFIX: &str = "PROD";

/// Application configuration
#[derive(Clone, Debug)]
pub struct Config {
    pub app: AppInfo,
    pub environment: Environment,
    pub server: ServerConfig,
    pub mongodb: MongoConfig,
    pub jwt: JwtConfig,
    pub product_id_prefix: String,
}

impl Config {
    pub fn from_env() -> eyre::Result<Self> {
        let environment = Environment::from_env();
        let server = ServerConfig::from_env()?;
        let mongodb = MongoConfig::from_env()?;
        let jwt = JwtConfig::from_env()?;

        let product_id_prefix = env_or_default("PRODUCT_ID_PREFIX", DEFAULT_PRODUCT_ID_PREFIX);
        if product_id_prefix.trim().is_empty() {
            eyre::bail!("PRODUCT_ID_PREFIX must not be blank");
        }

        Ok(Self {
            app: app_info!(),
            environment,
            server,
            mongodb,
            jwt,
            product_id_prefix,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "catalog-config-test-secret-of-32-chars";

    fn required() -> Vec<(&'static str, Option<&'static str>)> {
        vec![
            ("MONGODB_URL", Some("mongodb://localhost:27017")),
            ("MONGODB_DATABASE", Some("catalog")),
            ("JWT_SECRET", Some(SECRET)),
        ]
    }

    #[test]
    fn test_defaults() {
        let mut vars = required();
        vars.extend([("PRODUCT_ID_PREFIX", None), ("PORT", None), ("APP_ENV", None)]);

        temp_env::with_vars(vars, || {
            let config = Config::from_env().unwrap();
            assert_eq!(config.product_id_prefix, "PROD");
            assert_eq!(config.server.port, 8080);
            assert_eq!(config.mongodb.database(), "catalog");
            assert_eq!(config.jwt.secret, SECRET);
            assert_eq!(config.app.name, "catalog_api");
            assert!(config.environment.is_development());
        });
    }

    #[test]
    fn test_custom_prefix() {
        let mut vars = required();
        vars.push(("PRODUCT_ID_PREFIX", Some("SKU")));

        temp_env::with_vars(vars, || {
            assert_eq!(Config::from_env().unwrap().product_id_prefix, "SKU");
        });
    }

    #[test]
    fn test_blank_prefix_is_rejected() {
        let mut vars = required();
        vars.push(("PRODUCT_ID_PREFIX", Some("  ")));

        temp_env::with_vars(vars, || {
            assert!(Config::from_env().is_err());
        });
    }

    #[test]
    fn test_missing_jwt_secret() {
        let mut vars = required();
        vars.retain(|(key, _)| *key != "JWT_SECRET");
        vars.push(("JWT_SECRET", None));

        temp_env::with_vars(vars, || {
            let err = Config::from_env().unwrap_err();
            assert!(err.to_string().contains("JWT_SECRET"));
        });
    }

    #[test]
    fn test_missing_database_url() {
        let mut vars = required();
        vars.retain(|(key, _)| *key != "MONGODB_URL");
        vars.extend([("MONGODB_URL", None), ("MONGO_URL", None)]);

        temp_env::with_vars(vars, || {
            assert!(Config::from_env().is_err());
        });
    }
}
