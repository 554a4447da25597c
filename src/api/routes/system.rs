//! System handlers: health and the OpenAPI spec.

use crate::api::AppState;
use axum::{Json, extract::State, response::IntoResponse};

/// GET /api/health - Health check with task statistics
///
/// Unauthenticated in every mode so monitoring never needs a key.
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "system",
    responses(
        (status = 200, description = "Service is healthy", body = crate::types::HealthReport)
    )
)]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.downloader.health().await)
}

/// GET /api/openapi.json - OpenAPI specification
#[utoipa::path(
    get,
    path = "/api/openapi.json",
    tag = "system",
    responses(
        (status = 200, description = "OpenAPI 3.1 specification in JSON format")
    )
)]
pub async fn openapi_spec() -> impl IntoResponse {
    use crate::api::openapi::ApiDoc;
    use utoipa::OpenApi;

    Json(ApiDoc::openapi())
}
