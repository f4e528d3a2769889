use crate::error::{ProductError, ProductResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

/// Fields the server owns; silently dropped from update payloads.
pub const SERVER_MANAGED_FIELDS: [&str; 6] =
    ["_id", "id", "productId", "createdAt", "updatedAt", "ratings"];

/// Aggregate star rating
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, ToSchema)]
pub struct Ratings {
    /// Mean of all ratings, rounded to one decimal place
    #[schema(example = 4.3)]
    pub average: f64,
    /// Number of ratings received
    #[schema(example = 12)]
    pub count: i64,
}

impl Ratings {
    /// Fold one more rating into the aggregate.
    pub fn with_rating(&self, stars: u8) -> Ratings {
        let count = self.count + 1;
        let total = self.average * self.count as f64 + f64::from(stars);
        Ratings {
            average: (total / count as f64 * 10.0).round() / 10.0,
            count,
        }
    }
}

/// Name/value pair shown in a product's spec sheet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct Specification {
    #[schema(example = "Weight")]
    pub name: String,
    #[schema(example = "1.2 kg")]
    pub value: String,
}

/// Product entity as stored in MongoDB and returned to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Internal identifier (ObjectId hex, stored as _id)
    #[serde(rename = "_id")]
    #[schema(example = "66f1c0ffee0ddba11ca7f00d")]
    pub id: String,
    /// Business identifier, `<PREFIX>-<n>`
    #[schema(example = "PROD-1001")]
    pub product_id: String,
    pub name: String,
    pub description: String,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discounted_price: Option<f64>,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    pub main_image: String,
    #[serde(default = "default_in_stock")]
    pub in_stock: bool,
    #[serde(default)]
    pub quantity: i64,
    #[serde(default)]
    pub ratings: Ratings,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub specifications: Vec<Specification>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(with = "timestamp")]
    #[schema(value_type = String, example = "2026-01-31T09:30:00.000Z")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    #[schema(value_type = String, example = "2026-01-31T09:30:00.000Z")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Build a new product from a validated draft. Ratings start at zero.
    pub fn from_draft(
        id: String,
        product_id: String,
        draft: CreateProduct,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            product_id,
            name: draft.name,
            description: draft.description,
            price: draft.price,
            discounted_price: draft.discounted_price,
            category: draft.category,
            subcategory: draft.subcategory,
            images: draft.images,
            main_image: draft.main_image,
            in_stock: draft.in_stock,
            quantity: draft.quantity,
            ratings: Ratings::default(),
            features: draft.features,
            specifications: draft.specifications,
            tags: draft.tags,
            created_at: now,
            updated_at: now,
        }
    }

    /// Overwrite the supplied fields and stamp `updated_at`, which never
    /// moves backwards.
    pub fn apply_update(&mut self, update: UpdateProduct, updated_at: DateTime<Utc>) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(description) = update.description {
            self.description = description;
        }
        if let Some(price) = update.price {
            self.price = price;
        }
        if let Some(discounted_price) = update.discounted_price {
            self.discounted_price = discounted_price;
        }
        if let Some(category) = update.category {
            self.category = category;
        }
        if let Some(subcategory) = update.subcategory {
            self.subcategory = subcategory;
        }
        if let Some(images) = update.images {
            self.images = images;
        }
        if let Some(main_image) = update.main_image {
            self.main_image = main_image;
        }
        if let Some(in_stock) = update.in_stock {
            self.in_stock = in_stock;
        }
        if let Some(quantity) = update.quantity {
            self.quantity = quantity;
        }
        if let Some(features) = update.features {
            self.features = features;
        }
        if let Some(specifications) = update.specifications {
            self.specifications = specifications;
        }
        if let Some(tags) = update.tags {
            self.tags = tags;
        }
        self.updated_at = timestamp::advance_to(self.updated_at, updated_at);
    }
}

/// DTO for creating a new product
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateProduct {
    #[validate(length(min = 1, max = 200), custom(function = "not_blank"))]
    #[schema(example = "Trail Running Shoe")]
    pub name: String,
    #[validate(custom(function = "not_blank"))]
    pub description: String,
    #[validate(range(min = 0.0))]
    #[schema(example = 129.99)]
    pub price: f64,
    #[validate(range(min = 0.0))]
    pub discounted_price: Option<f64>,
    #[validate(custom(function = "not_blank"))]
    #[schema(example = "footwear")]
    pub category: String,
    pub subcategory: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[validate(custom(function = "not_blank"))]
    pub main_image: String,
    #[serde(default = "default_in_stock")]
    pub in_stock: bool,
    #[validate(range(min = 0))]
    #[serde(default)]
    pub quantity: i64,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub specifications: Vec<Specification>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Partial update; only supplied fields change.
///
/// Serializes to the fields to write, so absent fields are skipped. The
/// optional attributes distinguish absent (`None`) from an explicit `null`
/// (`Some(None)`), which clears the stored value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateProduct {
    #[validate(length(min = 1, max = 200), custom(function = "not_blank"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[validate(custom(function = "not_blank"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[validate(range(min = 0.0))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[validate(range(min = 0.0))]
    #[serde(
        default,
        deserialize_with = "explicit_null",
        skip_serializing_if = "Option::is_none"
    )]
    #[schema(value_type = Option<f64>, nullable)]
    pub discounted_price: Option<Option<f64>>,
    #[validate(custom(function = "not_blank"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(
        default,
        deserialize_with = "explicit_null",
        skip_serializing_if = "Option::is_none"
    )]
    #[schema(value_type = Option<String>, nullable)]
    pub subcategory: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
    #[validate(custom(function = "not_blank"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub main_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_stock: Option<bool>,
    #[validate(range(min = 0))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub features: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specifications: Option<Vec<Specification>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

/// A present field, `null` included, becomes `Some`; serde's `default`
/// covers the absent case.
fn explicit_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl UpdateProduct {
    /// Parse a raw JSON patch.
    ///
    /// Server-managed fields are stripped first; anything else that is not an
    /// editable field, or has the wrong type, is rejected.
    pub fn from_patch(mut patch: Map<String, Value>) -> ProductResult<Self> {
        for field in SERVER_MANAGED_FIELDS {
            patch.remove(field);
        }
        let update: UpdateProduct = serde_json::from_value(Value::Object(patch))
            .map_err(|e| ProductError::Validation(e.to_string()))?;
        update.validate()?;
        Ok(update)
    }
}

/// Rating submission
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct RateProduct {
    /// Whole number of stars, 1 to 5
    #[schema(minimum = 1, maximum = 5, example = 4)]
    pub rating: f64,
    /// Free text; acknowledged but not stored
    #[serde(default)]
    pub review: Option<String>,
}

impl RateProduct {
    pub const MIN_STARS: u8 = 1;
    pub const MAX_STARS: u8 = 5;

    /// The rating as a star count, rejecting fractions and out-of-range values.
    pub fn stars(&self) -> ProductResult<u8> {
        let range = f64::from(Self::MIN_STARS)..=f64::from(Self::MAX_STARS);
        if self.rating.fract() != 0.0 || !range.contains(&self.rating) {
            return Err(ProductError::Validation(format!(
                "Rating must be a whole number between {} and {}",
                Self::MIN_STARS,
                Self::MAX_STARS
            )));
        }
        Ok(self.rating as u8)
    }
}

// Response envelopes

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductListResponse {
    pub success: bool,
    pub current_page: u64,
    pub total_pages: u64,
    pub total_products: u64,
    pub products: Vec<Product>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductResponse {
    pub success: bool,
    pub product: Product,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductMutationResponse {
    pub success: bool,
    pub message: String,
    pub product: Product,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RatingResponse {
    pub success: bool,
    pub message: String,
    pub new_rating: Ratings,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductsResponse {
    pub success: bool,
    pub products: Vec<Product>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub success: bool,
    pub token: String,
    /// Lifetime in seconds
    #[schema(example = 3600)]
    pub expires_in: i64,
}

fn default_in_stock() -> bool {
    true
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank").with_message("must not be blank".into()));
    }
    Ok(())
}

/// Millisecond-precision UTC timestamps, serialized as RFC 3339 with a `Z`
/// suffix. The fixed width keeps stored values sortable as strings.
pub mod timestamp {
    use chrono::{DateTime, SecondsFormat, TimeDelta, Timelike, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    /// Current time truncated to whole milliseconds.
    pub fn now() -> DateTime<Utc> {
        let now = Utc::now();
        now.with_nanosecond(now.nanosecond() / 1_000_000 * 1_000_000)
            .unwrap_or(now)
    }

    /// `at`, or one millisecond past `previous` when `at` is not later.
    pub fn advance_to(previous: DateTime<Utc>, at: DateTime<Utc>) -> DateTime<Utc> {
        at.max(previous + TimeDelta::milliseconds(1))
    }

    pub fn format(value: &DateTime<Utc>) -> String {
        value.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(D::Error::custom)
    }
}
