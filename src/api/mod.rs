//! REST API server module
//!
//! Embeds an axum HTTP server exposing the download engine: task
//! submission, status polling, health, and OpenAPI documentation.

use crate::{Config, Result, TubeDownloader};
use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{get, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod auth;
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
/// - `POST /api/download` - Submit a single or batch download task
/// - `GET /api/download/:task_id` - Query a task's status and result
/// - `GET /api/health` - Health check (unauthenticated in every mode)
/// - `GET /api/openapi.json` - OpenAPI specification
/// - `GET /swagger-ui` - Interactive Swagger UI documentation (if enabled)
pub fn create_router(downloader: Arc<TubeDownloader>, config: Arc<Config>) -> Router {
    let state = AppState::new(downloader, config.clone());

    let router = Router::new()
        .route("/api/download", post(routes::create_task))
        .route("/api/download/:task_id", get(routes::task_status))
        .route("/api/health", get(routes::health_check))
        .route("/api/openapi.json", get(routes::openapi_spec));

    // Merge Swagger UI routes if enabled in config (before applying state).
    // SwaggerUi registers its own copy of the spec under /api-docs; the
    // /api/openapi.json route above stays the canonical one.
    let router = if config.api.swagger_ui {
        router.merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
    } else {
        router
    };

    // Add state to all routes
    let router = router.with_state(state);

    // Apply authentication middleware when the mode demands keys (innermost)
    let router = if config.api.mode.requires_key() {
        router.layer(middleware::from_fn_with_state(
            config.api.api_keys.clone(),
            auth::require_api_key,
        ))
    } else {
        router
    };

    // Apply CORS middleware if enabled in config (outermost)
    if config.api.cors_enabled {
        let cors = build_cors_layer(&config.api.cors_origins);
        router.layer(cors)
    } else {
        router
    }
}

/// Build a CORS layer based on configured origins
///
/// Origins containing `"*"` (or an empty list) allow any origin; otherwise
/// only the listed origins are allowed, with all methods and headers.
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
/// Validates the API configuration (a keyed mode with an empty keylist
/// refuses to start), binds a TCP listener, and serves the router until
/// the server stops.
///
/// # Example
///
/// ```no_run
/// use tube_dl::{Config, TubeDownloader};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Arc::new(Config::default());
/// let downloader = Arc::new(TubeDownloader::new((*config).clone())?);
/// downloader.start();
///
/// // Serve the API (blocks until the server stops)
/// tube_dl::api::start_api_server(downloader, config).await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_api_server(
    downloader: Arc<TubeDownloader>,
    config: Arc<Config>,
) -> Result<()> {
    config.api.validate()?;
    let bind_address = config.api.effective_bind();

    tracing::info!(
        address = %bind_address,
        mode = ?config.api.mode,
        "Starting API server"
    );

    let app = create_router(downloader, config);

    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(crate::error::Error::Io)?;

    tracing::info!(
        address = %bind_address,
        "API server listening"
    );

    axum::serve(listener, app)
        .await
        .map_err(|e| crate::error::Error::ApiServerError(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
