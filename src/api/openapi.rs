//! OpenAPI documentation and schema generation
//!
//! Compile-time OpenAPI specification for the tube-dl REST API via utoipa.

use utoipa::OpenApi;

/// OpenAPI documentation for the tube-dl REST API
///
/// Served at:
/// - `/api/openapi.json` - JSON format OpenAPI specification
/// - `/swagger-ui` - Interactive Swagger UI documentation (if enabled)
#[derive(OpenApi)]
#[openapi(
    info(
        title = "tube-dl REST API",
        version = "0.1.0",
        description = "REST API for asynchronous YouTube media download tasks: submit single or batch downloads, poll task status, monitor service health",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:8591", description = "Local private-mode server")
    ),
    paths(
        crate::api::routes::create_task,
        crate::api::routes::task_status,
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
    ),
    components(schemas(
        // Request/response types
        crate::validate::ItemRequest,
        crate::types::SubmitReceipt,
        crate::api::routes::TaskReport,
        crate::api::routes::TaskResult,
        crate::api::routes::ItemReport,

        // Core types
        crate::types::TaskId,
        crate::types::TaskStatus,
        crate::types::MediaFormat,
        crate::types::ItemOutcome,
        crate::types::BatchSummary,
        crate::types::TaskCounts,
        crate::types::HealthReport,

        // Error types
        crate::error::ApiError,
        crate::error::ErrorDetail,
        crate::error::ValidationFailure,
        crate::error::VideoError,
    )),
    tags(
        (name = "download", description = "Download tasks - Submit single or batch downloads and poll their status"),
        (name = "system", description = "System endpoints - Health check and OpenAPI spec"),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Security addon registering the X-Api-Key scheme used in unprivate mode
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = &mut openapi.components {
            components.add_security_scheme(
                "api_key",
                utoipa::openapi::security::SecurityScheme::ApiKey(
                    utoipa::openapi::security::ApiKey::Header(
                        utoipa::openapi::security::ApiKeyValue::new("X-Api-Key"),
                    ),
                ),
            );
        }
    }
}
