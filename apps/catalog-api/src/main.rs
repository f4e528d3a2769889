//! Catalog API - product catalog REST server

use axum_helpers::server::{create_production_app, create_router, health_router};
use core_config::tracing::{init_tracing, install_color_eyre};
use tracing::info;

mod api;
mod config;
mod openapi;
mod state;

use config::Config;
use state::AppState;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    install_color_eyre();

    let config = Config::from_env()?;
    init_tracing(&config.environment);

    info!(
        "Connecting to MongoDB database: {}",
        config.mongodb.database()
    );

    // Store unreachable after the connect retries is fatal
    let mongo_client =
        database::mongodb::connect_from_config_with_retry(&config.mongodb, None).await?;

    let db = mongo_client.database(config.mongodb.database());

    info!(
        "Successfully connected to MongoDB database: {}",
        config.mongodb.database()
    );

    let state = AppState {
        config: config.clone(),
        mongo_client,
        db,
    };

    api::init_indexes(&state).await?;

    let api_routes = api::routes(&state);
    let router = create_router::<openapi::ApiDoc>(api_routes, &state.config.server)?;
    let app = router.merge(health_router(state.config.app));

    info!(
        "Starting Catalog API on {} (product ids: {}-N)",
        state.config.server.address(),
        state.config.product_id_prefix
    );

    let server_config = state.config.server.clone();
    create_production_app(app, &server_config, async move {
        info!("Shutting down: closing MongoDB connections");
        state.mongo_client.shutdown().await;
        info!("MongoDB connection closed");
    })
    .await?;

    info!("Catalog API shutdown complete");
    Ok(())
}
