use super::shutdown::ShutdownCoordinator;
use crate::errors::handlers::{method_not_allowed, not_found};
use crate::http::{create_cors_layer, security_headers};
use axum::{Router, middleware};
use core_config::server::ServerConfig;
use std::future::{Future, IntoFuture};
use std::io;
use tower_http::compression::CompressionLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{Level, info, warn};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Wrap the API routes with documentation and the cross-cutting layers.
///
/// - Swagger UI at `/swagger-ui`, spec at `/api-docs/openapi.json`
/// - JSON 404 and 405 fallbacks
/// - request tracing, request timeout (408 on expiry)
/// - security headers, CORS, response compression
///
/// Routes are mounted at the root; `apis` must already have its state applied.
///
/// # Errors
/// Fails when `server_config.cors_allowed_origins` contains an invalid origin.
pub fn create_router<T>(apis: Router, server_config: &ServerConfig) -> io::Result<Router>
where
    T: OpenApi + 'static,
{
    let cors_layer = create_cors_layer(&server_config.cors_allowed_origins)?;

    let router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", T::openapi()))
        .merge(apis)
        .method_not_allowed_fallback(method_not_allowed)
        .fallback(not_found)
        .layer(TimeoutLayer::new(server_config.request_timeout()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(middleware::from_fn(security_headers))
        .layer(cors_layer)
        .layer(CompressionLayer::new());

    Ok(router)
}

/// Serve `router` until SIGINT/SIGTERM, then shut down in order:
///
/// 1. stop accepting connections and let in-flight requests finish,
/// 2. run `cleanup` (closing store clients and the like).
///
/// Each phase is bounded by `server_config.shutdown_timeout()`; a phase that
/// overruns is abandoned with a warning.
pub async fn create_production_app<F>(
    router: Router,
    server_config: &ServerConfig,
    cleanup: F,
) -> io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let shutdown_timeout = server_config.shutdown_timeout();
    let coordinator = ShutdownCoordinator::new();
    let mut drain_started = coordinator.subscribe();

    let listener = tokio::net::TcpListener::bind(server_config.address()).await?;
    info!("Server starting on {}", listener.local_addr()?);

    let server = axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(coordinator.clone().wait_for_signal())
        .into_future();

    let drain_deadline = async move {
        let _ = drain_started.recv().await;
        tokio::time::sleep(shutdown_timeout).await;
    };

    tokio::select! {
        result = server => {
            result.inspect_err(|e| tracing::error!("Server encountered an error: {:?}", e))?;
        }
        _ = drain_deadline => {
            warn!("In-flight requests exceeded {:?}, forcing shutdown", shutdown_timeout);
        }
    }

    info!("Starting cleanup tasks (timeout: {:?})", shutdown_timeout);
    match tokio::time::timeout(shutdown_timeout, cleanup).await {
        Ok(()) => info!("Cleanup completed successfully"),
        Err(_) => warn!(
            "Cleanup exceeded timeout of {:?}, forcing shutdown",
            shutdown_timeout
        ),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode, header},
        routing::get,
    };
    use http_body_util::BodyExt;
    use std::time::Duration;
    use tower::ServiceExt;

    #[derive(OpenApi)]
    #[openapi(info(title = "test"))]
    struct TestDoc;

    fn router(timeout_secs: u64) -> Router {
        let apis = Router::new()
            .route("/ping", get(|| async { "pong" }))
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    "late"
                }),
            );
        let config = ServerConfig {
            request_timeout_secs: timeout_secs,
            ..ServerConfig::default()
        };
        create_router::<TestDoc>(apis, &config).unwrap()
    }

    #[tokio::test]
    async fn test_routes_are_mounted_at_root() {
        let response = router(30)
            .oneshot(Request::get("/ping").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::X_FRAME_OPTIONS], "DENY");
    }

    #[tokio::test]
    async fn test_unknown_path_gets_json_404() {
        let response = router(30)
            .oneshot(Request::get("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_wrong_method_gets_json_405() {
        let response = router(30)
            .oneshot(Request::delete("/ping").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_openapi_document_is_served() {
        let response = router(30)
            .oneshot(
                Request::get("/api-docs/openapi.json")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_slow_requests_time_out() {
        let response = router(1)
            .oneshot(Request::get("/slow").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
    }
}
