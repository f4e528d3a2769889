use mongodb::bson::doc;
use mongodb::{Client, options::ClientOptions};
use std::time::Duration;
use tracing::{info, instrument};

use super::{MongoConfig, MongoError};
use crate::common::{RetryConfig, retry, retry_with_backoff};

/// Parse the connection string and apply the configured pool settings.
pub async fn client_options(config: &MongoConfig) -> Result<ClientOptions, MongoError> {
    let mut options = ClientOptions::parse(&config.url).await?;

    options.max_pool_size = Some(config.max_pool_size);
    options.min_pool_size = Some(config.min_pool_size);
    options.connect_timeout = Some(Duration::from_secs(config.connect_timeout_secs));
    options.server_selection_timeout =
        Some(Duration::from_secs(config.server_selection_timeout_secs));

    if let Some(ref app_name) = config.app_name {
        options.app_name = Some(app_name.clone());
    }

    Ok(options)
}

/// Build a client and verify the deployment answers a `ping`.
///
/// The driver connects lazily, so without the ping an unreachable server would
/// only surface on the first request.
#[instrument(skip(config), fields(database = %config.database))]
pub async fn connect_from_config(config: &MongoConfig) -> Result<Client, MongoError> {
    info!("Connecting to MongoDB");

    let client = Client::with_options(client_options(config).await?)?;

    client
        .database("admin")
        .run_command(doc! { "ping": 1 })
        .await
        .map_err(|e| MongoError::ConnectionFailed(e.to_string()))?;

    info!("Successfully connected to MongoDB");
    Ok(client)
}

/// [`connect_from_config`] with exponential backoff, for startup against a
/// store that may still be booting. `None` uses the default [`RetryConfig`].
pub async fn connect_from_config_with_retry(
    config: &MongoConfig,
    retry_config: Option<RetryConfig>,
) -> Result<Client, MongoError> {
    match retry_config {
        Some(policy) => retry_with_backoff(|| connect_from_config(config), policy).await,
        None => retry(|| connect_from_config(config)).await,
    }
}
