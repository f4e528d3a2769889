//! HTTP handlers for the product catalog

use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware::from_fn_with_state,
    response::IntoResponse,
    routing::{get, post, put},
};
use axum_helpers::{
    AppError, JsonBody, JwtClaims, JwtVerifier, ValidatedJson,
    errors::responses::{
        BadRequestValidationResponse, ConflictResponse, ForbiddenResponse,
        InternalServerErrorResponse, NotFoundResponse, UnauthorizedResponse,
    },
    jwt_auth_middleware, optional_jwt_auth_middleware, require_permission,
};
use serde_json::{Map, Value};
use utoipa::OpenApi;

use crate::error::ProductResult;
use crate::models::{
    CreateProduct, MessageResponse, Product, ProductListResponse, ProductMutationResponse,
    ProductResponse, ProductsResponse, RateProduct, Ratings, RatingResponse, Specification,
    TokenResponse, UpdateProduct,
};
use crate::query::{LimitParams, ListParams, PageParams, ProductQuery, SearchParams};
use crate::repository::ProductRepository;
use crate::service::{ProductPage, ProductService};

/// Scope granted by `POST /get-product-token`
pub const PRODUCT_READ_SCOPE: &str = "read:products";
/// Scope a scoped token needs to create, change, delete or rate products
pub const PRODUCT_WRITE_SCOPE: &str = "write:products";
/// Lifetime of tokens minted by `POST /get-product-token`, in seconds
pub const PRODUCT_TOKEN_TTL_SECS: i64 = 3600;

/// OpenAPI documentation for the catalog endpoints
#[derive(OpenApi)]
#[openapi(
    paths(
        list_products,
        create_product,
        get_product,
        update_product,
        delete_product,
        rate_product,
        list_by_category,
        search_products,
        featured_products,
        new_arrivals,
        get_product_token,
    ),
    components(
        schemas(
            Product, Ratings, Specification, CreateProduct, UpdateProduct, RateProduct,
            ProductListResponse, ProductResponse, ProductMutationResponse, MessageResponse,
            RatingResponse, ProductsResponse, TokenResponse
        ),
        responses(
            NotFoundResponse,
            BadRequestValidationResponse,
            UnauthorizedResponse,
            ForbiddenResponse,
            ConflictResponse,
            InternalServerErrorResponse
        )
    ),
    tags(
        (name = "Products", description = "Product catalog endpoints"),
        (name = "Auth", description = "Token exchange")
    )
)]
pub struct ApiDoc;

/// Shared state for the catalog routes
pub struct ProductsState<R: ProductRepository> {
    pub service: ProductService<R>,
    pub verifier: JwtVerifier,
}

impl<R: ProductRepository> Clone for ProductsState<R> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            verifier: self.verifier.clone(),
        }
    }
}

/// Create the catalog router.
///
/// Reads are public. Writes, ratings and token exchange need a valid bearer
/// token; a scoped token must also carry [`PRODUCT_WRITE_SCOPE`] to write.
/// `GET /products` accepts a token optionally, for attribution only.
pub fn router<R: ProductRepository + 'static>(
    service: ProductService<R>,
    verifier: JwtVerifier,
) -> Router {
    let require_auth = from_fn_with_state(verifier.clone(), jwt_auth_middleware);
    let optional_auth = from_fn_with_state(verifier.clone(), optional_jwt_auth_middleware);
    let require_write = from_fn_with_state(PRODUCT_WRITE_SCOPE, require_permission);
    let state = ProductsState { service, verifier };

    // Later route_layer calls wrap earlier ones, so authentication runs first
    Router::new()
        .route(
            "/products",
            get(list_products::<R>).route_layer(optional_auth).merge(
                post(create_product::<R>)
                    .route_layer(require_write.clone())
                    .route_layer(require_auth.clone()),
            ),
        )
        .route(
            "/products/{product_id}",
            get(get_product::<R>).merge(
                put(update_product::<R>)
                    .delete(delete_product::<R>)
                    .route_layer(require_write.clone())
                    .route_layer(require_auth.clone()),
            ),
        )
        .route(
            "/products/{product_id}/rate",
            post(rate_product::<R>)
                .route_layer(require_write)
                .route_layer(require_auth.clone()),
        )
        .route("/category/{category}/products", get(list_by_category::<R>))
        .route("/search", get(search_products::<R>))
        .route("/featured-products", get(featured_products::<R>))
        .route("/new-arrivals", get(new_arrivals::<R>))
        .route(
            "/get-product-token",
            post(get_product_token::<R>).route_layer(require_auth),
        )
        .with_state(state)
}

fn list_response(page: ProductPage) -> Json<ProductListResponse> {
    Json(ProductListResponse {
        success: true,
        current_page: page.page,
        total_pages: page.total_pages,
        total_products: page.total,
        products: page.products,
    })
}

/// List products with filtering, sorting and pagination
#[utoipa::path(
    get,
    path = "/products",
    tag = "Products",
    params(ListParams),
    responses(
        (status = 200, description = "Page of products", body = ProductListResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn list_products<R: ProductRepository>(
    State(state): State<ProductsState<R>>,
    caller: Option<Extension<JwtClaims>>,
    Query(params): Query<ListParams>,
) -> ProductResult<Json<ProductListResponse>> {
    if let Some(Extension(claims)) = caller {
        tracing::debug!(caller = %claims.sub, "Authenticated catalog listing");
    }
    let page = state
        .service
        .list_products(ProductQuery::catalog(&params))
        .await?;
    Ok(list_response(page))
}

/// Create a new product
#[utoipa::path(
    post,
    path = "/products",
    tag = "Products",
    request_body = CreateProduct,
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "Product created successfully", body = ProductMutationResponse),
        (status = 400, response = BadRequestValidationResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 409, response = ConflictResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn create_product<R: ProductRepository>(
    State(state): State<ProductsState<R>>,
    Extension(claims): Extension<JwtClaims>,
    ValidatedJson(input): ValidatedJson<CreateProduct>,
) -> ProductResult<impl IntoResponse> {
    let product = state.service.create_product(input).await?;
    tracing::info!(product_id = %product.product_id, caller = %claims.sub, "Product created");
    Ok((
        StatusCode::CREATED,
        Json(ProductMutationResponse {
            success: true,
            message: "Product created successfully".to_string(),
            product,
        }),
    ))
}

/// Get a product by internal id or product id
#[utoipa::path(
    get,
    path = "/products/{product_id}",
    tag = "Products",
    params(
        ("product_id" = String, Path, description = "Product id such as PROD-1001, or the internal id")
    ),
    responses(
        (status = 200, description = "Product found", body = ProductResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn get_product<R: ProductRepository>(
    State(state): State<ProductsState<R>>,
    Path(product_id): Path<String>,
) -> ProductResult<Json<ProductResponse>> {
    let product = state.service.get_product(&product_id).await?;
    Ok(Json(ProductResponse {
        success: true,
        product,
    }))
}

/// Update a product.
///
/// Only supplied fields change. `_id`, `productId`, `createdAt`,
/// `updatedAt` and `ratings` are ignored if present.
#[utoipa::path(
    put,
    path = "/products/{product_id}",
    tag = "Products",
    params(
        ("product_id" = String, Path, description = "Internal id or product id")
    ),
    request_body = UpdateProduct,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Product updated successfully", body = ProductMutationResponse),
        (status = 400, response = BadRequestValidationResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn update_product<R: ProductRepository>(
    State(state): State<ProductsState<R>>,
    Extension(claims): Extension<JwtClaims>,
    Path(product_id): Path<String>,
    JsonBody(patch): JsonBody<Map<String, Value>>,
) -> ProductResult<Json<ProductMutationResponse>> {
    let update = UpdateProduct::from_patch(patch)?;
    let product = state.service.update_product(&product_id, update).await?;
    tracing::info!(product_id = %product.product_id, caller = %claims.sub, "Product updated");
    Ok(Json(ProductMutationResponse {
        success: true,
        message: "Product updated successfully".to_string(),
        product,
    }))
}

/// Delete a product
#[utoipa::path(
    delete,
    path = "/products/{product_id}",
    tag = "Products",
    params(
        ("product_id" = String, Path, description = "Internal id or product id")
    ),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Product deleted successfully", body = MessageResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn delete_product<R: ProductRepository>(
    State(state): State<ProductsState<R>>,
    Extension(claims): Extension<JwtClaims>,
    Path(product_id): Path<String>,
) -> ProductResult<Json<MessageResponse>> {
    state.service.delete_product(&product_id).await?;
    tracing::info!(product = %product_id, caller = %claims.sub, "Product deleted");
    Ok(Json(MessageResponse {
        success: true,
        message: "Product deleted successfully".to_string(),
    }))
}

/// Rate a product from 1 to 5 stars
#[utoipa::path(
    post,
    path = "/products/{product_id}/rate",
    tag = "Products",
    params(
        ("product_id" = String, Path, description = "Internal id or product id")
    ),
    request_body = RateProduct,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Rating recorded", body = RatingResponse),
        (status = 400, response = BadRequestValidationResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn rate_product<R: ProductRepository>(
    State(state): State<ProductsState<R>>,
    Path(product_id): Path<String>,
    JsonBody(rating): JsonBody<RateProduct>,
) -> ProductResult<Json<RatingResponse>> {
    let product = state.service.rate_product(&product_id, rating).await?;
    Ok(Json(RatingResponse {
        success: true,
        message: "Product rated successfully".to_string(),
        new_rating: product.ratings,
    }))
}

/// Products in one category, newest first
#[utoipa::path(
    get,
    path = "/category/{category}/products",
    tag = "Products",
    params(
        ("category" = String, Path, description = "Category name (exact match)"),
        PageParams
    ),
    responses(
        (status = 200, description = "Page of products", body = ProductListResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn list_by_category<R: ProductRepository>(
    State(state): State<ProductsState<R>>,
    Path(category): Path<String>,
    Query(params): Query<PageParams>,
) -> ProductResult<Json<ProductListResponse>> {
    let page = state
        .service
        .list_products(ProductQuery::by_category(&category, &params))
        .await?;
    Ok(list_response(page))
}

/// Full-text search over name, description and tags
#[utoipa::path(
    get,
    path = "/search",
    tag = "Products",
    params(SearchParams),
    responses(
        (status = 200, description = "Page of matching products", body = ProductListResponse),
        (status = 400, response = BadRequestValidationResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn search_products<R: ProductRepository>(
    State(state): State<ProductsState<R>>,
    Query(params): Query<SearchParams>,
) -> ProductResult<Json<ProductListResponse>> {
    let query = ProductQuery::search(&params)?;
    let page = state.service.list_products(query).await?;
    Ok(list_response(page))
}

/// Best-rated products
#[utoipa::path(
    get,
    path = "/featured-products",
    tag = "Products",
    params(LimitParams),
    responses(
        (status = 200, description = "Featured products", body = ProductsResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn featured_products<R: ProductRepository>(
    State(state): State<ProductsState<R>>,
    Query(params): Query<LimitParams>,
) -> ProductResult<Json<ProductsResponse>> {
    let products = state
        .service
        .list_showcase(ProductQuery::featured(&params))
        .await?;
    Ok(Json(ProductsResponse {
        success: true,
        products,
    }))
}

/// Most recently added products
#[utoipa::path(
    get,
    path = "/new-arrivals",
    tag = "Products",
    params(LimitParams),
    responses(
        (status = 200, description = "Newest products", body = ProductsResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn new_arrivals<R: ProductRepository>(
    State(state): State<ProductsState<R>>,
    Query(params): Query<LimitParams>,
) -> ProductResult<Json<ProductsResponse>> {
    let products = state
        .service
        .list_showcase(ProductQuery::new_arrivals(&params))
        .await?;
    Ok(Json(ProductsResponse {
        success: true,
        products,
    }))
}

/// Exchange a valid identity token for a short-lived, read-only product token.
///
/// Only unscoped tokens can be exchanged, so a product token cannot renew itself.
#[utoipa::path(
    post,
    path = "/get-product-token",
    tag = "Auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Token issued", body = TokenResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn get_product_token<R: ProductRepository>(
    State(state): State<ProductsState<R>>,
    Extension(claims): Extension<JwtClaims>,
) -> Result<Json<TokenResponse>, AppError> {
    if claims.is_scoped() {
        return Err(AppError::Forbidden(
            "Scoped tokens cannot be exchanged".to_string(),
        ));
    }
    let token = state
        .verifier
        .attenuate(&claims, &[PRODUCT_READ_SCOPE], PRODUCT_TOKEN_TTL_SECS)?;
    tracing::info!(caller = %claims.sub, "Issued product token");
    Ok(Json(TokenResponse {
        success: true,
        token,
        expires_in: PRODUCT_TOKEN_TTL_SECS,
    }))
}
