//! REST API server module
//!
//! Exposes the provider through a GA4GH DRS-flavoured HTTP API with an
//! OpenAPI 3.1 description.

use crate::{Config, ImmunespaceProvider, Result};
use axum::{
    Router,
    http::HeaderValue,
    routing::{delete, get, post},
};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod error_response;
pub mod openapi;
pub mod routes;
pub mod state;

pub use openapi::ApiDoc;
pub use state::AppState;

/// Create the API router with all route definitions
///
/// # Routes
///
/// ## Downloads
/// - `POST /submit` - Fetch or reuse a dataset
/// - `GET /search/:submitter_id` - List a submitter's files
/// - `GET /status/:download_id` - Job status
/// - `DELETE /delete/:id` - Delete by object or download id
///
/// ## Objects
/// - `GET /objects/:object_id` - Object descriptor
/// - `POST /objects/:object_id` - Passport lookup (501)
/// - `GET|POST /objects/:object_id/access/:access_id` - Access URL (501)
///
/// ## Files
/// - `GET /files/:id` - Single CSV (object id) or zip bundle (download id)
/// - `GET /files/:id/:file_name` - Named CSV
///
/// ## System
/// - `GET /service-info` - GA4GH service descriptor
/// - `GET /health` - Health check
/// - `GET /openapi.json` - OpenAPI specification
/// - `GET /swagger-ui` - Interactive Swagger UI documentation (if enabled)
pub fn create_router(provider: Arc<ImmunespaceProvider>, config: Arc<Config>) -> Router {
    let state = AppState::new(provider, config.clone());

    let router = Router::new()
        // Downloads
        .route("/submit", post(routes::submit))
        .route("/search/:submitter_id", get(routes::search))
        .route("/status/:download_id", get(routes::get_status))
        .route("/delete/:id", delete(routes::delete_download))
        // Objects
        .route(
            "/objects/:object_id",
            get(routes::get_object).post(routes::post_object),
        )
        .route(
            "/objects/:object_id/access/:access_id",
            get(routes::get_access_url).post(routes::post_access_url),
        )
        // Files
        .route("/files/:id", get(routes::get_file))
        .route("/files/:id/:file_name", get(routes::get_named_file))
        // System
        .route("/service-info", get(routes::service_info))
        .route("/health", get(routes::health_check))
        .route("/openapi.json", get(routes::openapi_spec));

    // Swagger UI serves its own copy of the document under /api-docs
    let router = if config.server.api.swagger_ui {
        router.merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
    } else {
        router
    };

    let router = router
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if config.server.api.cors_enabled {
        let cors = build_cors_layer(&config.server.api.cors_origins);
        router.layer(cors)
    } else {
        router
    }
}

/// Build a CORS layer based on configured origins
///
/// `"*"` (or an empty list) allows any origin; otherwise only the listed
/// origins are allowed. All methods and headers are permitted.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_any = origins.iter().any(|o| o == "*");

    if allow_any || origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Start the API server on the configured bind address.
///
/// Serves until `shutdown` resolves, then stops accepting connections and
/// lets in-flight requests finish.
///
/// # Example
///
/// ```no_run
/// use immunespace_provider::{Config, ImmunespaceProvider};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Arc::new(Config::default());
/// let provider = Arc::new(ImmunespaceProvider::new((*config).clone()).await?);
///
/// immunespace_provider::api::start_api_server(provider, config, async {
///     let _ = tokio::signal::ctrl_c().await;
/// })
/// .await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_api_server<F>(
    provider: Arc<ImmunespaceProvider>,
    config: Arc<Config>,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let bind_address = config.server.api.bind_address;

    tracing::info!(
        address = %bind_address,
        "Starting API server"
    );

    let app = create_router(provider, config);

    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(crate::error::Error::Io)?;

    tracing::info!(
        address = %bind_address,
        "API server listening"
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await
    .map_err(|e| crate::error::Error::ApiServerError(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
