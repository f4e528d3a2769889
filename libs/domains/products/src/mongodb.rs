//! MongoDB implementation of ProductRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::TryStreamExt;
use mongodb::{
    Collection, Database, IndexModel,
    bson::{Bson, Document, doc, to_document},
    options::{
        Collation, CountOptions, FindOneAndUpdateOptions, FindOptions, IndexOptions,
        ReturnDocument,
    },
};
use tracing::instrument;

use crate::error::ProductResult;
use crate::id::ProductLookup;
use crate::models::{Product, UpdateProduct, timestamp};
use crate::query::{ProductQuery, SortField};
use crate::repository::ProductRepository;

/// MongoDB implementation of the ProductRepository
pub struct MongoProductRepository {
    collection: Collection<Product>,
}

impl MongoProductRepository {
    pub fn new(db: &Database) -> Self {
        Self::with_collection(db, "products")
    }

    /// Create a new MongoProductRepository with a custom collection name
    pub fn with_collection(db: &Database, collection_name: &str) -> Self {
        let collection = db.collection::<Product>(collection_name);
        Self { collection }
    }

    /// Create the indexes the listing queries rely on.
    ///
    /// The unique `productId` index is what makes concurrent creates safe;
    /// the text index backs `$text` search.
    pub async fn init_indexes(&self) -> ProductResult<()> {
        let indexes = vec![
            IndexModel::builder()
                .keys(doc! { "productId": 1 })
                .options(
                    IndexOptions::builder()
                        .unique(true)
                        .name("idx_product_id_unique".to_string())
                        .build(),
                )
                .build(),
            IndexModel::builder()
                .keys(doc! { "category": 1, "createdAt": -1 })
                .options(
                    IndexOptions::builder()
                        .name("idx_category_created".to_string())
                        .build(),
                )
                .build(),
            IndexModel::builder()
                .keys(doc! { "price": 1 })
                .options(IndexOptions::builder().name("idx_price".to_string()).build())
                .build(),
            IndexModel::builder()
                .keys(doc! { "ratings.average": -1, "ratings.count": -1 })
                .options(IndexOptions::builder().name("idx_ratings".to_string()).build())
                .build(),
            IndexModel::builder()
                .keys(doc! { "createdAt": -1 })
                .options(IndexOptions::builder().name("idx_created".to_string()).build())
                .build(),
            IndexModel::builder()
                .keys(doc! { "name": "text", "description": "text", "tags": "text" })
                .options(
                    IndexOptions::builder()
                        .name("idx_text_search".to_string())
                        .build(),
                )
                .build(),
        ];

        self.collection.create_indexes(indexes).await?;
        tracing::info!("Product indexes created successfully");
        Ok(())
    }

    /// Get the underlying collection for advanced operations
    pub fn collection(&self) -> &Collection<Product> {
        &self.collection
    }

    fn build_filter(query: &ProductQuery) -> Document {
        let mut filter = doc! {};

        if let Some(ref category) = query.category {
            filter.insert("category", category);
        }

        if let Some(range) = query.price_range {
            let mut price = doc! {};
            if let Some(min) = range.min {
                price.insert("$gte", min);
            }
            if let Some(max) = range.max {
                price.insert("$lte", max);
            }
            filter.insert("price", price);
        }

        if query.only_in_stock {
            filter.insert("inStock", true);
        }

        if let Some(ref term) = query.text_search {
            filter.insert("$text", doc! { "$search": term });
        }

        filter
    }

    /// Sort document for the effective sort, with `_id` as a tiebreaker so
    /// pages never overlap.
    fn build_sort(query: &ProductQuery) -> Document {
        let sort = query.effective_sort();
        let order = sort.direction.as_i32();

        let mut doc = match sort.field {
            SortField::Relevance => doc! { "score": { "$meta": "textScore" } },
            SortField::Rating => doc! { "ratings.average": order, "ratings.count": order },
            field => {
                let mut doc = Document::new();
                doc.insert(field_path(field), order);
                doc
            }
        };
        doc.insert("_id", order);
        doc
    }

    fn lookup_filter(lookup: &ProductLookup) -> Document {
        match lookup {
            ProductLookup::ByInternalId(id) => doc! { "_id": id },
            ProductLookup::ByBusinessId(product_id) => doc! { "productId": product_id },
        }
    }

    /// Business ids sort by their numeric suffix, so `PROD-10000` follows
    /// `PROD-9999`. `$text` queries only run under the simple collation.
    fn collation(query: &ProductQuery) -> Option<Collation> {
        let numeric = query.effective_sort().field == SortField::ProductId
            && query.text_search.is_none();
        numeric.then(|| {
            Collation::builder()
                .locale("en".to_string())
                .numeric_ordering(true)
                .build()
        })
    }

    /// Update pipeline for a patch. Values go through `$literal` so strings
    /// starting with `$` are stored as written; explicit nulls are unset.
    fn update_pipeline(
        update: &UpdateProduct,
        updated_at: DateTime<Utc>,
    ) -> ProductResult<Vec<Document>> {
        let mut set = Document::new();
        let mut unset = Vec::new();
        for (field, value) in to_document(update)? {
            if value == Bson::Null {
                unset.push(Bson::String(field));
            } else {
                set.insert(field, doc! { "$literal": value });
            }
        }
        set.insert("updatedAt", advanced_updated_at(updated_at));

        let mut pipeline = vec![doc! { "$set": set }];
        if !unset.is_empty() {
            pipeline.push(doc! { "$unset": unset });
        }
        Ok(pipeline)
    }

    /// Rating pipeline: the new mean is computed from the stored aggregate,
    /// rounded half up to one decimal place.
    fn rating_pipeline(stars: u8, updated_at: DateTime<Utc>) -> Vec<Document> {
        let stars = i32::from(stars);
        let count = doc! { "$add": ["$ratings.count", 1] };
        let mean = doc! {
            "$divide": [
                { "$add": [{ "$multiply": ["$ratings.average", "$ratings.count"] }, stars] },
                count.clone(),
            ]
        };
        vec![doc! {
            "$set": {
                "ratings.average": {
                    "$divide": [{ "$floor": { "$add": [{ "$multiply": [mean, 10] }, 0.5] } }, 10]
                },
                "ratings.count": count,
                "updatedAt": advanced_updated_at(updated_at),
            }
        }]
    }

    async fn find_one_and_apply(
        &self,
        lookup: &ProductLookup,
        pipeline: Vec<Document>,
    ) -> ProductResult<Option<Product>> {
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        let product = self
            .collection
            .find_one_and_update(Self::lookup_filter(lookup), pipeline)
            .with_options(options)
            .await?;
        Ok(product)
    }

    fn max_number_pipeline(prefix: &str) -> Vec<Document> {
        vec![
            doc! { "$match": { "productId": { "$regex": format!("^{}-[0-9]+$", escape_regex(prefix)) } } },
            doc! {
                "$project": {
                    "number": {
                        "$convert": {
                            "input": { "$arrayElemAt": [{ "$split": ["$productId", "-"] }, -1] },
                            "to": "long",
                            "onError": Bson::Null,
                            "onNull": Bson::Null,
                        }
                    }
                }
            },
            doc! { "$group": { "_id": Bson::Null, "max": { "$max": "$number" } } },
        ]
    }
}

/// Aggregation expression for `updatedAt`: `at`, or one millisecond past the
/// stored value when `at` is not later. Evaluated server side so a stale
/// read never moves the stamp backwards.
fn advanced_updated_at(at: DateTime<Utc>) -> Document {
    doc! {
        "$dateToString": {
            "format": "%Y-%m-%dT%H:%M:%S.%LZ",
            "date": {
                "$max": [
                    { "$add": [{ "$dateFromString": { "dateString": "$updatedAt" } }, 1] },
                    { "$dateFromString": { "dateString": timestamp::format(&at) } },
                ]
            }
        }
    }
}

fn field_path(field: SortField) -> &'static str {
    match field {
        SortField::ProductId => "productId",
        SortField::Name => "name",
        SortField::Price => "price",
        SortField::DiscountedPrice => "discountedPrice",
        SortField::Category => "category",
        SortField::Quantity => "quantity",
        SortField::CreatedAt => "createdAt",
        SortField::UpdatedAt => "updatedAt",
        SortField::Rating => "ratings.average",
        SortField::Relevance => "score",
    }
}

fn escape_regex(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if !c.is_ascii_alphanumeric() {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[async_trait]
impl ProductRepository for MongoProductRepository {
    #[instrument(skip(self))]
    async fn list(&self, query: &ProductQuery) -> ProductResult<(Vec<Product>, u64)> {
        let filter = Self::build_filter(query);
        let collation = Self::collation(query);

        let mut count_options = CountOptions::default();
        count_options.collation = collation.clone();
        let total = self
            .collection
            .count_documents(filter.clone())
            .with_options(count_options)
            .await?;

        let skip = query.skip();
        if skip >= total {
            return Ok((Vec::new(), total));
        }

        let mut options = FindOptions::builder()
            .sort(Self::build_sort(query))
            .skip(skip)
            .limit(query.page_size as i64)
            .build();
        options.collation = collation;

        let cursor = self.collection.find(filter).with_options(options).await?;
        let products: Vec<Product> = cursor.try_collect().await?;

        Ok((products, total))
    }

    #[instrument(skip(self))]
    async fn find(&self, lookup: &ProductLookup) -> ProductResult<Option<Product>> {
        let product = self
            .collection
            .find_one(Self::lookup_filter(lookup))
            .await?;
        Ok(product)
    }

    #[instrument(skip(self))]
    async fn max_product_number(&self, prefix: &str) -> ProductResult<Option<u64>> {
        let mut cursor = self
            .collection
            .aggregate(Self::max_number_pipeline(prefix))
            .await?;

        let max = match cursor.try_next().await? {
            Some(result) => match result.get("max") {
                Some(Bson::Int64(n)) => u64::try_from(*n).ok(),
                _ => None,
            },
            None => None,
        };
        Ok(max)
    }

    #[instrument(skip(self, product), fields(product_id = %product.product_id))]
    async fn insert(&self, product: &Product) -> ProductResult<()> {
        self.collection.insert_one(product).await?;
        tracing::info!(product_id = %product.product_id, "Product created successfully");
        Ok(())
    }

    #[instrument(skip(self, update))]
    async fn update(
        &self,
        lookup: &ProductLookup,
        update: &UpdateProduct,
        updated_at: DateTime<Utc>,
    ) -> ProductResult<Option<Product>> {
        let pipeline = Self::update_pipeline(update, updated_at)?;
        let product = self.find_one_and_apply(lookup, pipeline).await?;

        if product.is_some() {
            tracing::info!(product = lookup.as_str(), "Product updated successfully");
        }
        Ok(product)
    }

    #[instrument(skip(self))]
    async fn delete(&self, lookup: &ProductLookup) -> ProductResult<bool> {
        let result = self
            .collection
            .delete_one(Self::lookup_filter(lookup))
            .await?;

        let deleted = result.deleted_count > 0;
        if deleted {
            tracing::info!(product = lookup.as_str(), "Product deleted successfully");
        }
        Ok(deleted)
    }

    #[instrument(skip(self))]
    async fn apply_rating(
        &self,
        lookup: &ProductLookup,
        stars: u8,
        updated_at: DateTime<Utc>,
    ) -> ProductResult<Option<Product>> {
        self.find_one_and_apply(lookup, Self::rating_pipeline(stars, updated_at))
            .await
    }
}
