//! Product Service - Business logic layer

use database::RetryConfig;
use database::retry_if;
use std::sync::Arc;
use tracing::instrument;
use validator::Validate;

use crate::error::{ProductError, ProductResult};
use crate::id::{DEFAULT_PREFIX, ProductLookup, new_internal_id, next_product_id};
use crate::models::{CreateProduct, Product, RateProduct, UpdateProduct, timestamp};
use crate::query::ProductQuery;
use crate::repository::ProductRepository;

/// Attempts at claiming a fresh product id before giving up
pub const MAX_ID_ATTEMPTS: u32 = 5;

/// One page of a listing
#[derive(Debug, Clone)]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub total: u64,
    pub page: u64,
    pub total_pages: u64,
}

/// Product service providing business logic operations
///
/// Reads are retried with backoff when the store is briefly unreachable.
/// Writes are not retried blindly. Id allocation has its own bounded retry
/// around the unique index; updates and ratings are single atomic writes.
pub struct ProductService<R: ProductRepository> {
    repository: Arc<R>,
    id_prefix: Arc<str>,
    read_retry: RetryConfig,
}

impl<R: ProductRepository> ProductService<R> {
    pub fn new(repository: R) -> Self {
        Self {
            repository: Arc::new(repository),
            id_prefix: Arc::from(DEFAULT_PREFIX),
            read_retry: RetryConfig::new().with_max_retries(2),
        }
    }

    /// Prefix for generated product ids, e.g. `PROD`
    pub fn with_id_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.id_prefix = Arc::from(prefix.into());
        self
    }

    pub fn with_read_retry(mut self, config: RetryConfig) -> Self {
        self.read_retry = config;
        self
    }

    pub fn id_prefix(&self) -> &str {
        &self.id_prefix
    }

    /// List a page of products with the total match count
    #[instrument(skip(self))]
    pub async fn list_products(&self, query: ProductQuery) -> ProductResult<ProductPage> {
        let (products, total) = retry_if(
            || self.repository.list(&query),
            self.read_retry.clone(),
            ProductError::is_transient,
        )
        .await?;

        Ok(ProductPage {
            products,
            total,
            page: query.page,
            total_pages: query.total_pages(total),
        })
    }

    /// Featured products and new arrivals: a bare list, no paging metadata
    #[instrument(skip(self))]
    pub async fn list_showcase(&self, query: ProductQuery) -> ProductResult<Vec<Product>> {
        Ok(self.list_products(query).await?.products)
    }

    /// Find by business id, then by internal id when `id` is an ObjectId.
    async fn resolve(&self, id: &str) -> ProductResult<Option<Product>> {
        for lookup in ProductLookup::candidates(id) {
            if let Some(product) = self.repository.find(&lookup).await? {
                return Ok(Some(product));
            }
        }
        Ok(None)
    }

    async fn resolve_existing(&self, id: &str) -> ProductResult<Product> {
        self.resolve(id)
            .await?
            .ok_or_else(|| ProductError::NotFound(id.to_string()))
    }

    /// Get a product by business or internal id
    #[instrument(skip(self))]
    pub async fn get_product(&self, id: &str) -> ProductResult<Product> {
        retry_if(
            || self.resolve(id),
            self.read_retry.clone(),
            ProductError::is_transient,
        )
        .await?
        .ok_or_else(|| ProductError::NotFound(id.to_string()))
    }

    /// Create a product under the next free business id.
    ///
    /// The unique index decides races between concurrent creators; a loser
    /// recomputes the id and tries again.
    #[instrument(skip(self, draft), fields(product_name = %draft.name))]
    pub async fn create_product(&self, draft: CreateProduct) -> ProductResult<Product> {
        draft.validate()?;

        for attempt in 1..=MAX_ID_ATTEMPTS {
            let current_max = self.repository.max_product_number(&self.id_prefix).await?;
            let product_id = next_product_id(&self.id_prefix, current_max);
            let product = Product::from_draft(
                new_internal_id(),
                product_id,
                draft.clone(),
                timestamp::now(),
            );

            match self.repository.insert(&product).await {
                Ok(()) => return Ok(product),
                Err(ProductError::DuplicateProductId(_)) => {
                    tracing::debug!(
                        attempt,
                        product_id = %product.product_id,
                        "Product id already claimed, retrying"
                    );
                }
                Err(e) => return Err(e),
            }
        }

        tracing::warn!("Could not allocate a product id after {} attempts", MAX_ID_ATTEMPTS);
        Err(ProductError::DuplicateProductId(format!(
            "could not allocate a unique product id after {} attempts",
            MAX_ID_ATTEMPTS
        )))
    }

    /// Apply a partial update; `updatedAt` always moves forward.
    #[instrument(skip(self, update))]
    pub async fn update_product(&self, id: &str, update: UpdateProduct) -> ProductResult<Product> {
        update.validate()?;

        let existing = self.resolve_existing(id).await?;
        let lookup = ProductLookup::ByInternalId(existing.id);

        self.repository
            .update(&lookup, &update, timestamp::now())
            .await?
            .ok_or_else(|| ProductError::NotFound(id.to_string()))
    }

    #[instrument(skip(self))]
    pub async fn delete_product(&self, id: &str) -> ProductResult<()> {
        let existing = self.resolve_existing(id).await?;
        let lookup = ProductLookup::ByInternalId(existing.id);
        if self.repository.delete(&lookup).await? {
            Ok(())
        } else {
            Err(ProductError::NotFound(id.to_string()))
        }
    }

    /// Fold a rating into the product's aggregate.
    ///
    /// The store applies the new mean in one atomic write, so concurrent
    /// ratings are never lost. The review text is not stored.
    #[instrument(skip(self, rating))]
    pub async fn rate_product(&self, id: &str, rating: RateProduct) -> ProductResult<Product> {
        let stars = rating.stars()?;

        let existing = self.resolve_existing(id).await?;
        let lookup = ProductLookup::ByInternalId(existing.id);

        let product = self
            .repository
            .apply_rating(&lookup, stars, timestamp::now())
            .await?
            .ok_or_else(|| ProductError::NotFound(id.to_string()))?;

        tracing::info!(
            product_id = %product.product_id,
            stars,
            has_review = rating.review.is_some(),
            average = product.ratings.average,
            "Product rated"
        );
        Ok(product)
    }
}

impl<R: ProductRepository> Clone for ProductService<R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            id_prefix: Arc::clone(&self.id_prefix),
            read_retry: self.read_retry.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Ratings;
    use crate::query::{LimitParams, ListParams};
    use crate::repository::MockProductRepository;
    use mockall::predicate::eq;

    fn draft() -> CreateProduct {
        serde_json::from_value(serde_json::json!({
            "name": "Desk Lamp",
            "description": "Warm light",
            "price": 39.5,
            "category": "lighting",
            "mainImage": "lamp.jpg"
        }))
        .unwrap()
    }

    fn stored(product_id: &str) -> Product {
        Product::from_draft(
            new_internal_id(),
            product_id.to_string(),
            draft(),
            timestamp::now(),
        )
    }

    fn fast_retry() -> RetryConfig {
        RetryConfig::new()
            .with_max_retries(2)
            .with_initial_delay(1)
            .without_jitter()
    }

    #[tokio::test]
    async fn test_get_missing_product_is_not_found() {
        let mut mock_repo = MockProductRepository::new();
        mock_repo
            .expect_find()
            .with(eq(ProductLookup::ByBusinessId("PROD-9".into())))
            .returning(|_| Ok(None));

        let service = ProductService::new(mock_repo);
        let err = service.get_product("PROD-9").await.unwrap_err();
        assert!(matches!(err, ProductError::NotFound(id) if id == "PROD-9"));
    }

    #[tokio::test]
    async fn test_create_assigns_next_id() {
        let mut mock_repo = MockProductRepository::new();
        mock_repo
            .expect_max_product_number()
            .with(eq("PROD"))
            .returning(|_| Ok(Some(1041)));
        mock_repo
            .expect_insert()
            .withf(|p: &Product| p.product_id == "PROD-1042" && p.ratings == Ratings::default())
            .times(1)
            .returning(|_| Ok(()));

        let service = ProductService::new(mock_repo);
        let product = service.create_product(draft()).await.unwrap();
        assert_eq!(product.product_id, "PROD-1042");
        assert_eq!(product.id.len(), 24);
    }

    #[tokio::test]
    async fn test_create_uses_configured_prefix_and_base() {
        let mut mock_repo = MockProductRepository::new();
        mock_repo
            .expect_max_product_number()
            .with(eq("SKU"))
            .returning(|_| Ok(None));
        mock_repo.expect_insert().returning(|_| Ok(()));

        let service = ProductService::new(mock_repo).with_id_prefix("SKU");
        let product = service.create_product(draft()).await.unwrap();
        assert_eq!(product.product_id, "SKU-1001");
    }

    #[tokio::test]
    async fn test_create_retries_after_losing_id_race() {
        let mut mock_repo = MockProductRepository::new();
        let mut max_calls = 0;
        mock_repo
            .expect_max_product_number()
            .times(2)
            .returning(move |_| {
                max_calls += 1;
                Ok(Some(1000 + max_calls))
            });
        let mut insert_calls = 0;
        mock_repo.expect_insert().times(2).returning(move |p| {
            insert_calls += 1;
            if insert_calls == 1 {
                Err(ProductError::DuplicateProductId(p.product_id.clone()))
            } else {
                Ok(())
            }
        });

        let service = ProductService::new(mock_repo);
        let product = service.create_product(draft()).await.unwrap();
        assert_eq!(product.product_id, "PROD-1003");
    }

    #[tokio::test]
    async fn test_create_gives_up_after_bounded_attempts() {
        let mut mock_repo = MockProductRepository::new();
        mock_repo
            .expect_max_product_number()
            .times(MAX_ID_ATTEMPTS as usize)
            .returning(|_| Ok(Some(1001)));
        mock_repo
            .expect_insert()
            .times(MAX_ID_ATTEMPTS as usize)
            .returning(|p| Err(ProductError::DuplicateProductId(p.product_id.clone())));

        let service = ProductService::new(mock_repo);
        let err = service.create_product(draft()).await.unwrap_err();
        assert!(matches!(err, ProductError::DuplicateProductId(_)));
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_draft_without_touching_store() {
        let mock_repo = MockProductRepository::new();
        let service = ProductService::new(mock_repo);

        let mut invalid = draft();
        invalid.price = -5.0;
        let err = service.create_product(invalid).await.unwrap_err();
        assert!(matches!(err, ProductError::InvalidFields(_)));
    }

    #[tokio::test]
    async fn test_list_retries_transient_failures() {
        let mut mock_repo = MockProductRepository::new();
        let mut calls = 0;
        mock_repo.expect_list().times(2).returning(move |_| {
            calls += 1;
            if calls == 1 {
                Err(ProductError::Unavailable("server selection timeout".into()))
            } else {
                Ok((vec![stored("PROD-1001")], 21))
            }
        });

        let service = ProductService::new(mock_repo).with_read_retry(fast_retry());
        let query = ProductQuery::catalog(&ListParams {
            limit: Some("10".into()),
            ..Default::default()
        });
        let page = service.list_products(query).await.unwrap();
        assert_eq!(page.total, 21);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.page, 1);
        assert_eq!(page.products.len(), 1);
    }

    #[tokio::test]
    async fn test_list_does_not_retry_permanent_failures() {
        let mut mock_repo = MockProductRepository::new();
        mock_repo
            .expect_list()
            .times(1)
            .returning(|_| Err(ProductError::Database("bad query".into())));

        let service = ProductService::new(mock_repo).with_read_retry(fast_retry());
        let result = service
            .list_showcase(ProductQuery::featured(&LimitParams::default()))
            .await;
        assert!(matches!(result, Err(ProductError::Database(_))));
    }

    #[tokio::test]
    async fn test_update_advances_updated_at() {
        let existing = stored("PROD-1001");
        let previous = existing.updated_at;

        let mut mock_repo = MockProductRepository::new();
        let found = existing.clone();
        mock_repo
            .expect_find()
            .returning(move |_| Ok(Some(found.clone())));
        mock_repo
            .expect_update()
            .withf(move |_, _, updated_at| *updated_at >= previous)
            .returning(move |_, update, updated_at| {
                let mut product = existing.clone();
                product.apply_update(update.clone(), updated_at);
                Ok(Some(product))
            });

        let service = ProductService::new(mock_repo);
        let update = UpdateProduct {
            price: Some(12.0),
            ..Default::default()
        };
        let product = service.update_product("PROD-1001", update).await.unwrap();
        assert_eq!(product.price, 12.0);
        assert!(product.updated_at > product.created_at);
    }

    #[tokio::test]
    async fn test_update_missing_product_is_not_found() {
        let mut mock_repo = MockProductRepository::new();
        mock_repo.expect_find().returning(|_| Ok(None));
        mock_repo.expect_update().never();

        let service = ProductService::new(mock_repo);
        let err = service
            .update_product("PROD-404", UpdateProduct::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ProductError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_get_falls_back_to_internal_id() {
        let product = stored("PROD-1001");
        let internal = product.id.clone();

        let mut mock_repo = MockProductRepository::new();
        mock_repo
            .expect_find()
            .with(eq(ProductLookup::ByBusinessId(internal.clone())))
            .times(1)
            .returning(|_| Ok(None));
        let found = product.clone();
        mock_repo
            .expect_find()
            .with(eq(ProductLookup::ByInternalId(internal.clone())))
            .times(1)
            .returning(move |_| Ok(Some(found.clone())));

        let service = ProductService::new(mock_repo);
        assert_eq!(service.get_product(&internal).await.unwrap(), product);
    }

    #[tokio::test]
    async fn test_delete_targets_resolved_internal_id() {
        let product = stored("PROD-1001");
        let internal = product.id.clone();

        let mut mock_repo = MockProductRepository::new();
        mock_repo
            .expect_find()
            .returning(move |_| Ok(Some(product.clone())));
        mock_repo
            .expect_delete()
            .with(eq(ProductLookup::ByInternalId(internal)))
            .times(1)
            .returning(|_| Ok(true));

        let service = ProductService::new(mock_repo);
        service.delete_product("PROD-1001").await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_missing_product_is_not_found() {
        let mut mock_repo = MockProductRepository::new();
        mock_repo.expect_find().returning(|_| Ok(None));
        mock_repo.expect_delete().never();

        let service = ProductService::new(mock_repo);
        assert!(matches!(
            service.delete_product("PROD-1").await,
            Err(ProductError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_rate_is_one_atomic_write_on_resolved_id() {
        let existing = stored("PROD-1001");
        let internal = existing.id.clone();

        let mut mock_repo = MockProductRepository::new();
        let found = existing.clone();
        mock_repo
            .expect_find()
            .times(1)
            .returning(move |_| Ok(Some(found.clone())));
        mock_repo
            .expect_apply_rating()
            .withf(move |lookup, stars, _| {
                *lookup == ProductLookup::ByInternalId(internal.clone()) && *stars == 1
            })
            .times(1)
            .returning(move |_, stars, updated_at| {
                let mut product = existing.clone();
                product.ratings = Ratings { average: 4.0, count: 2 }.with_rating(stars);
                product.updated_at = updated_at;
                Ok(Some(product))
            });

        let service = ProductService::new(mock_repo);
        let product = service
            .rate_product(
                "PROD-1001",
                RateProduct {
                    rating: 1.0,
                    review: Some("meh".into()),
                },
            )
            .await
            .unwrap();
        assert_eq!(product.ratings, Ratings { average: 3.0, count: 3 });
    }

    #[tokio::test]
    async fn test_rate_product_deleted_mid_request_is_not_found() {
        let mut mock_repo = MockProductRepository::new();
        mock_repo
            .expect_find()
            .returning(|_| Ok(Some(stored("PROD-1001"))));
        mock_repo
            .expect_apply_rating()
            .times(1)
            .returning(|_, _, _| Ok(None));

        let service = ProductService::new(mock_repo);
        let err = service
            .rate_product("PROD-1001", RateProduct { rating: 5.0, review: None })
            .await
            .unwrap_err();
        assert!(matches!(err, ProductError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_rate_rejects_bad_rating_before_reading() {
        let mut mock_repo = MockProductRepository::new();
        mock_repo.expect_find().never();

        let service = ProductService::new(mock_repo);
        let err = service
            .rate_product("PROD-1001", RateProduct { rating: 7.0, review: None })
            .await
            .unwrap_err();
        assert!(matches!(err, ProductError::Validation(_)));
    }
}
