use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::ProductResult;
use crate::id::ProductLookup;
use crate::models::{Product, UpdateProduct};
use crate::query::ProductQuery;

/// Repository trait for Product persistence
///
/// Lookups take a resolved [`ProductLookup`] so that implementations never
/// have to guess whether a path segment is an internal or business id.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// One page of products matching `query`, plus the total match count
    async fn list(&self, query: &ProductQuery) -> ProductResult<(Vec<Product>, u64)>;

    async fn find(&self, lookup: &ProductLookup) -> ProductResult<Option<Product>>;

    /// Highest numeric suffix among ids shaped `<prefix>-<digits>`
    async fn max_product_number(&self, prefix: &str) -> ProductResult<Option<u64>>;

    /// Insert a new product.
    ///
    /// Fails with `DuplicateProductId` when the business id is taken.
    async fn insert(&self, product: &Product) -> ProductResult<()>;

    /// Apply a partial update in one atomic write, returning the updated
    /// product.
    ///
    /// `updatedAt` becomes `updated_at` or, if that is not later than the
    /// stored value, one millisecond past it.
    async fn update(
        &self,
        lookup: &ProductLookup,
        update: &UpdateProduct,
        updated_at: DateTime<Utc>,
    ) -> ProductResult<Option<Product>>;

    /// Returns whether a product was deleted
    async fn delete(&self, lookup: &ProductLookup) -> ProductResult<bool>;

    /// Fold one rating into the stored aggregate in a single atomic write,
    /// the way [`Ratings::with_rating`](crate::models::Ratings::with_rating) does, and stamp `updatedAt` as
    /// [`update`](Self::update) does. Returns the rated product.
    async fn apply_rating(
        &self,
        lookup: &ProductLookup,
        stars: u8,
        updated_at: DateTime<Utc>,
    ) -> ProductResult<Option<Product>>;
}
