//! MongoDB connection management and error classification

mod config;
mod connector;
mod errors;
mod health;

pub use config::MongoConfig;
pub use connector::{client_options, connect_from_config, connect_from_config_with_retry};
pub use errors::{MongoError, is_duplicate_key, is_transient};
pub use health::{HealthStatus, check_health, check_health_detailed};

pub use mongodb::{Client, Collection, Database};
