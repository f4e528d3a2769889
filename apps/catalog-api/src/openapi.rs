//! OpenAPI documentation configuration

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// Combined OpenAPI documentation for the Catalog API
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Catalog API",
        version = "0.1.0",
        description = "Product catalog with search, ratings and bearer-token protected writes",
        license(name = "MIT")
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server")
    ),
    paths(
        axum_helpers::server::health::health_handler,
        crate::api::health::ready,
    ),
    modifiers(&CatalogPaths, &SecurityAddon),
    tags(
        (name = "health", description = "Liveness and readiness checks")
    )
)]
pub struct ApiDoc;

/// Mounts the product routes, which are served from the root.
struct CatalogPaths;

impl Modify for CatalogPaths {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi.merge(domain_products::ApiDoc::openapi());
    }
}

/// Registers the `bearer_auth` scheme referenced by protected routes.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
