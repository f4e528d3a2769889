//! Document-store plumbing shared by the catalog services.
//!
//! # Features
//!
//! - `mongodb` (default) - MongoDB connection, configuration and health checks
//! - `config` - `core_config::FromEnv` support for [`mongodb::MongoConfig`]
//!
//! # Example
//!
//! ```ignore
//! use database::mongodb::{MongoConfig, connect_from_config_with_retry};
//! use database::common::RetryConfig;
//!
//! let config = MongoConfig::with_database("mongodb://localhost:27017", "catalog");
//! let client = connect_from_config_with_retry(&config, Some(RetryConfig::new())).await?;
//! let products = client.database(config.database()).collection::<Document>("products");
//! ```

pub mod common;

#[cfg(feature = "mongodb")]
pub mod mongodb;

pub use common::{RetryConfig, retry, retry_if, retry_with_backoff};
