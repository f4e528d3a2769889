//! Products Domain
//!
//! Product catalog backed by MongoDB: CRUD, filtered and paginated listings,
//! full-text search, ratings and read-only token exchange.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  Handlers   │  ← HTTP endpoints, auth policy, response envelopes
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │   Service   │  ← Id allocation, id resolution, read retries
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │ Repository  │  ← Data access (trait + MongoDB implementation)
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │   Models    │  ← Entities, DTOs, query parsing
//! └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use axum_helpers::{JwtConfig, JwtVerifier};
//! use domain_products::{handlers, MongoProductRepository, ProductService};
//! use mongodb::Client;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Client::with_uri_str("mongodb://localhost:27017").await?;
//! let db = client.database("catalog");
//!
//! let repository = MongoProductRepository::new(&db);
//! repository.init_indexes().await?;
//! let service = ProductService::new(repository).with_id_prefix("PROD");
//!
//! let verifier = JwtVerifier::new(&JwtConfig::new("a-secret-of-at-least-32-characters!!")?);
//! let router = handlers::router(service, verifier);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod handlers;
pub mod id;
pub mod models;
pub mod mongodb;
pub mod query;
pub mod repository;
pub mod service;

// Re-export commonly used types
pub use error::{ProductError, ProductResult};
pub use handlers::{
    ApiDoc, PRODUCT_READ_SCOPE, PRODUCT_TOKEN_TTL_SECS, PRODUCT_WRITE_SCOPE, ProductsState,
};
pub use id::ProductLookup;
pub use models::{CreateProduct, Product, RateProduct, Ratings, Specification, UpdateProduct};
pub use mongodb::MongoProductRepository;
pub use query::ProductQuery;
pub use repository::ProductRepository;
pub use service::{ProductPage, ProductService};
