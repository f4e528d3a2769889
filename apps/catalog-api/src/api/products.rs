//! Product catalog routes

use axum::Router;
use axum_helpers::JwtVerifier;
use domain_products::{MongoProductRepository, ProductService, handlers};

use crate::state::AppState;

/// Create products router
pub fn router(state: &AppState) -> Router {
    let repository = MongoProductRepository::new(&state.db);
    let service = ProductService::new(repository).with_id_prefix(&state.config.product_id_prefix);
    let verifier = JwtVerifier::new(&state.config.jwt);
    handlers::router(service, verifier)
}

/// Initialize products indexes
pub async fn init_indexes(state: &AppState) -> eyre::Result<()> {
    let repository = MongoProductRepository::new(&state.db);
    repository.init_indexes().await?;
    Ok(())
}
