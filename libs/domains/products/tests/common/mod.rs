//! In-memory `ProductRepository` for handler tests.
//!
//! Mirrors the MongoDB semantics the handlers depend on: unique `productId`,
//! atomic rating and update writes, numeric id ordering, text matching over
//! name/description/tags.
//! `find` and `max_product_number` yield after reading so that concurrent
//! requests interleave the way they would against a real store.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, header};
use axum_helpers::{JwtConfig, JwtVerifier};
use chrono::{DateTime, Utc};
use domain_products::id::{parse_product_number, product_id_order};
use domain_products::query::{SortDirection, SortField};
use domain_products::*;
use http_body_util::BodyExt;
use serde_json::Value;
use std::cmp::Ordering;
use std::sync::{Arc, Mutex};

pub const TEST_SECRET: &str = "handler-tests-secret-with-32-plus-chars";

#[derive(Clone, Default)]
pub struct InMemoryProductRepository {
    products: Arc<Mutex<Vec<Product>>>,
}

impl InMemoryProductRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, product: Product) {
        self.products.lock().unwrap().push(product);
    }

    pub fn snapshot(&self) -> Vec<Product> {
        self.products.lock().unwrap().clone()
    }

    fn matches(lookup: &ProductLookup, product: &Product) -> bool {
        match lookup {
            ProductLookup::ByInternalId(id) => product.id == *id,
            ProductLookup::ByBusinessId(product_id) => product.product_id == *product_id,
        }
    }
}

fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
}

/// Number of search terms found as whole words in the indexed fields
fn text_score(product: &Product, search: &str) -> usize {
    let mut indexed: Vec<String> = words(&product.name)
        .chain(words(&product.description))
        .collect();
    for tag in &product.tags {
        indexed.extend(words(tag));
    }
    words(search)
        .filter(|term| indexed.iter().any(|w| w == term))
        .count()
}

fn filter_matches(query: &ProductQuery, product: &Product) -> bool {
    if let Some(ref category) = query.category {
        if product.category != *category {
            return false;
        }
    }
    if let Some(range) = query.price_range {
        if !range.contains(product.price) {
            return false;
        }
    }
    if query.only_in_stock && !product.in_stock {
        return false;
    }
    if let Some(ref search) = query.text_search {
        if text_score(product, search) == 0 {
            return false;
        }
    }
    true
}

fn compare(query: &ProductQuery, a: &Product, b: &Product) -> Ordering {
    let sort = query.effective_sort();
    let by_field = match sort.field {
        SortField::ProductId => product_id_order(&a.product_id, &b.product_id),
        SortField::Name => a.name.cmp(&b.name),
        SortField::Price => a.price.total_cmp(&b.price),
        SortField::DiscountedPrice => a
            .discounted_price
            .unwrap_or(f64::MIN)
            .total_cmp(&b.discounted_price.unwrap_or(f64::MIN)),
        SortField::Category => a.category.cmp(&b.category),
        SortField::Quantity => a.quantity.cmp(&b.quantity),
        SortField::CreatedAt => a.created_at.cmp(&b.created_at),
        SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        SortField::Rating => a
            .ratings
            .average
            .total_cmp(&b.ratings.average)
            .then(a.ratings.count.cmp(&b.ratings.count)),
        SortField::Relevance => {
            let term = query.text_search.as_deref().unwrap_or_default();
            text_score(a, term).cmp(&text_score(b, term))
        }
    };
    let ordering = by_field.then_with(|| a.id.cmp(&b.id));
    match sort.direction {
        SortDirection::Ascending => ordering,
        SortDirection::Descending => ordering.reverse(),
    }
}

#[async_trait]
impl ProductRepository for InMemoryProductRepository {
    async fn list(&self, query: &ProductQuery) -> ProductResult<(Vec<Product>, u64)> {
        let mut matching: Vec<Product> = self
            .products
            .lock()
            .unwrap()
            .iter()
            .filter(|p| filter_matches(query, p))
            .cloned()
            .collect();
        matching.sort_by(|a, b| compare(query, a, b));

        let total = matching.len() as u64;
        let page = matching
            .into_iter()
            .skip(usize::try_from(query.skip()).unwrap_or(usize::MAX))
            .take(query.page_size as usize)
            .collect();
        Ok((page, total))
    }

    async fn find(&self, lookup: &ProductLookup) -> ProductResult<Option<Product>> {
        let found = self
            .products
            .lock()
            .unwrap()
            .iter()
            .find(|p| Self::matches(lookup, p))
            .cloned();
        tokio::task::yield_now().await;
        Ok(found)
    }

    async fn max_product_number(&self, prefix: &str) -> ProductResult<Option<u64>> {
        let max = self
            .products
            .lock()
            .unwrap()
            .iter()
            .filter_map(|p| parse_product_number(prefix, &p.product_id))
            .max();
        tokio::task::yield_now().await;
        Ok(max)
    }

    async fn insert(&self, product: &Product) -> ProductResult<()> {
        let mut products = self.products.lock().unwrap();
        if products.iter().any(|p| p.product_id == product.product_id) {
            return Err(ProductError::DuplicateProductId(product.product_id.clone()));
        }
        products.push(product.clone());
        Ok(())
    }

    async fn update(
        &self,
        lookup: &ProductLookup,
        update: &UpdateProduct,
        updated_at: DateTime<Utc>,
    ) -> ProductResult<Option<Product>> {
        let mut products = self.products.lock().unwrap();
        Ok(products
            .iter_mut()
            .find(|p| Self::matches(lookup, p))
            .map(|p| {
                p.apply_update(update.clone(), updated_at);
                p.clone()
            }))
    }

    async fn delete(&self, lookup: &ProductLookup) -> ProductResult<bool> {
        let mut products = self.products.lock().unwrap();
        let before = products.len();
        products.retain(|p| !Self::matches(lookup, p));
        Ok(products.len() < before)
    }

    async fn apply_rating(
        &self,
        lookup: &ProductLookup,
        stars: u8,
        updated_at: DateTime<Utc>,
    ) -> ProductResult<Option<Product>> {
        let mut products = self.products.lock().unwrap();
        Ok(products
            .iter_mut()
            .find(|p| Self::matches(lookup, p))
            .map(|p| {
                p.ratings = p.ratings.with_rating(stars);
                p.updated_at = models::timestamp::advance_to(p.updated_at, updated_at);
                p.clone()
            }))
    }
}

pub fn verifier() -> JwtVerifier {
    JwtVerifier::new(&JwtConfig::new(TEST_SECRET).unwrap())
}

pub fn token() -> String {
    verifier()
        .create_token("user-1", Some("user@example.com"), Some("admin"), &[], 3600)
        .unwrap()
}

/// Router over a fresh in-memory repository; the repository handle is
/// returned for seeding and inspection.
pub fn app() -> (axum::Router, InMemoryProductRepository) {
    let repo = InMemoryProductRepository::new();
    let service = ProductService::new(repo.clone());
    (handlers::router(service, verifier()), repo)
}

pub fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

pub fn authed(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    bearer(&token(), method, uri, body)
}

pub fn bearer(token: &str, method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token));
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub async fn json_body(body: Body) -> Value {
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn draft_json(name: &str, category: &str, price: f64) -> Value {
    serde_json::json!({
        "name": name,
        "description": format!("{} description", name),
        "price": price,
        "category": category,
        "mainImage": format!("https://cdn.example.com/{}.jpg", name.replace(' ', "-")),
        "images": ["a.jpg", "b.jpg"],
        "features": ["light"],
        "specifications": [{"name": "Weight", "value": "1kg"}],
        "tags": ["sale"]
    })
}

/// A stored product with the given attributes; timestamps spaced by `age_ms`.
pub fn product(number: u64, category: &str, price: f64, in_stock: bool, age_ms: i64) -> Product {
    let draft: CreateProduct =
        serde_json::from_value(draft_json(&format!("Item {}", number), category, price)).unwrap();
    let created = models::timestamp::now() - chrono::TimeDelta::milliseconds(age_ms);
    let mut product = Product::from_draft(
        id::new_internal_id(),
        format!("PROD-{}", number),
        draft,
        created,
    );
    product.in_stock = in_stock;
    product
}
