//! Query-string parsing for the listing endpoints.
//!
//! Parameters arrive as raw strings and never fail extraction: malformed
//! paging or filter values fall back to defaults instead of producing 400s.
//! The one hard requirement is the search term on `/search`.

use crate::error::{ProductError, ProductResult};
use serde::Deserialize;
use strum::{Display, EnumString};
use utoipa::IntoParams;

/// Default page size for the full catalog listing
pub const CATALOG_PAGE_SIZE: u64 = 1000;
/// Default page size for category and search listings
pub const LISTING_PAGE_SIZE: u64 = 10;
/// Default size of the featured and new-arrival showcases
pub const SHOWCASE_LIMIT: u64 = 5;
/// Upper bound on any requested page size
pub const MAX_PAGE_SIZE: u64 = 1000;

/// `GET /products`
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListParams {
    /// 1-based page number
    pub page: Option<String>,
    /// Page size
    pub limit: Option<String>,
    /// Exact category match
    pub category: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    /// Only `true` restricts to in-stock products
    pub in_stock: Option<String>,
    /// Full-text search over name, description and tags
    pub search: Option<String>,
    /// Field to sort by
    pub sort_field: Option<String>,
    /// `asc` for ascending; anything else sorts descending
    pub sort_order: Option<String>,
}

/// `GET /category/{category}/products`
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageParams {
    pub page: Option<String>,
    pub limit: Option<String>,
}

/// `GET /search`
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchParams {
    /// Search term (required)
    pub q: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

/// `GET /featured-products` and `GET /new-arrivals`
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LimitParams {
    pub limit: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("asc") => SortDirection::Ascending,
            _ => SortDirection::Descending,
        }
    }

    /// MongoDB sort order value
    pub fn as_i32(self) -> i32 {
        match self {
            SortDirection::Ascending => 1,
            SortDirection::Descending => -1,
        }
    }
}

/// Sortable fields, named as clients send them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "camelCase")]
pub enum SortField {
    ProductId,
    Name,
    Price,
    DiscountedPrice,
    Category,
    Quantity,
    CreatedAt,
    UpdatedAt,
    #[strum(serialize = "rating", serialize = "ratings.average")]
    Rating,
    /// Text-search score; only meaningful alongside a text filter
    #[strum(disabled)]
    Relevance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub field: SortField,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn new(field: SortField, direction: SortDirection) -> Self {
        Self { field, direction }
    }

    /// Parse client-supplied sort parameters; unknown fields use `default`.
    fn parse(field: Option<&str>, order: Option<&str>, default: SortField) -> Self {
        let field = field
            .and_then(|f| f.trim().parse::<SortField>().ok())
            .unwrap_or(default);
        Self::new(field, SortDirection::parse(order))
    }
}

/// Inclusive price bounds; either side may be open.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl PriceRange {
    fn parse(min: Option<&str>, max: Option<&str>) -> Option<Self> {
        let range = PriceRange {
            min: parse_price(min),
            max: parse_price(max),
        };
        (range.min.is_some() || range.max.is_some()).then_some(range)
    }

    pub fn contains(&self, price: f64) -> bool {
        self.min.is_none_or(|min| price >= min) && self.max.is_none_or(|max| price <= max)
    }
}

/// A fully resolved listing request: filter, sort and page window.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductQuery {
    pub category: Option<String>,
    pub price_range: Option<PriceRange>,
    pub only_in_stock: bool,
    pub text_search: Option<String>,
    pub sort: SortSpec,
    pub page: u64,
    pub page_size: u64,
}

impl ProductQuery {
    fn unfiltered(sort: SortSpec, page: u64, page_size: u64) -> Self {
        Self {
            category: None,
            price_range: None,
            only_in_stock: false,
            text_search: None,
            sort,
            page,
            page_size,
        }
    }

    /// Full catalog listing, sorted by product id unless asked otherwise.
    pub fn catalog(params: &ListParams) -> Self {
        let sort = SortSpec::parse(
            params.sort_field.as_deref(),
            params.sort_order.as_deref(),
            SortField::ProductId,
        );
        Self {
            category: non_blank(params.category.as_deref()),
            price_range: PriceRange::parse(params.min_price.as_deref(), params.max_price.as_deref()),
            only_in_stock: params.in_stock.as_deref() == Some("true"),
            text_search: non_blank(params.search.as_deref()),
            ..Self::unfiltered(
                sort,
                parse_page(params.page.as_deref()),
                parse_limit(params.limit.as_deref(), CATALOG_PAGE_SIZE),
            )
        }
    }

    /// One category, newest first.
    pub fn by_category(category: &str, params: &PageParams) -> Self {
        Self {
            category: Some(category.to_string()),
            ..Self::unfiltered(
                SortSpec::new(SortField::CreatedAt, SortDirection::Descending),
                parse_page(params.page.as_deref()),
                parse_limit(params.limit.as_deref(), LISTING_PAGE_SIZE),
            )
        }
    }

    /// Full-text search ranked by relevance.
    ///
    /// # Errors
    /// [`ProductError::Validation`] when `q` is missing or blank.
    pub fn search(params: &SearchParams) -> ProductResult<Self> {
        let term = non_blank(params.q.as_deref())
            .ok_or_else(|| ProductError::Validation("Search query is required".to_string()))?;
        Ok(Self {
            text_search: Some(term),
            ..Self::unfiltered(
                SortSpec::new(SortField::Relevance, SortDirection::Descending),
                parse_page(params.page.as_deref()),
                parse_limit(params.limit.as_deref(), LISTING_PAGE_SIZE),
            )
        })
    }

    /// Best-rated products; ties broken by number of ratings.
    pub fn featured(params: &LimitParams) -> Self {
        Self::unfiltered(
            SortSpec::new(SortField::Rating, SortDirection::Descending),
            1,
            parse_limit(params.limit.as_deref(), SHOWCASE_LIMIT),
        )
    }

    /// Most recently created products.
    pub fn new_arrivals(params: &LimitParams) -> Self {
        Self::unfiltered(
            SortSpec::new(SortField::CreatedAt, SortDirection::Descending),
            1,
            parse_limit(params.limit.as_deref(), SHOWCASE_LIMIT),
        )
    }

    /// The sort actually applied. Relevance needs a text filter to rank
    /// against and degrades to newest-first without one.
    pub fn effective_sort(&self) -> SortSpec {
        match (self.sort.field, &self.text_search) {
            (SortField::Relevance, None) => {
                SortSpec::new(SortField::CreatedAt, SortDirection::Descending)
            }
            _ => self.sort,
        }
    }

    /// Number of documents to skip for the requested page, capped at what a
    /// signed 64-bit skip can carry
    pub fn skip(&self) -> u64 {
        (self.page - 1)
            .saturating_mul(self.page_size)
            .min(i64::MAX as u64)
    }

    pub fn total_pages(&self, total: u64) -> u64 {
        total.div_ceil(self.page_size)
    }
}

fn parse_page(raw: Option<&str>) -> u64 {
    raw.and_then(|s| s.trim().parse::<i64>().ok())
        .map(|n| n.max(1) as u64)
        .unwrap_or(1)
}

fn parse_limit(raw: Option<&str>, default: u64) -> u64 {
    raw.and_then(|s| s.trim().parse::<u64>().ok())
        .filter(|n| *n > 0)
        .map(|n| n.min(MAX_PAGE_SIZE))
        .unwrap_or(default)
}

fn parse_price(raw: Option<&str>) -> Option<f64> {
    raw.and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

fn non_blank(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
