//! Task submission and status handlers.

use super::TaskReport;
use crate::api::AppState;
use crate::error::{Error, Result, ValidationFailure};
use crate::types::TaskId;
use crate::validate::ItemRequest;
use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

/// POST /api/download - Create a download task
///
/// Accepts either a single-video payload or a batch wrapped in a `videos`
/// array. The body is parsed by hand rather than through an extractor so a
/// malformed body produces the same structured validation error as a
/// malformed field.
#[utoipa::path(
    post,
    path = "/api/download",
    tag = "download",
    request_body(
        content = ItemRequest,
        description = "Single video payload, or `{\"videos\": [...]}` for an ordered batch",
        content_type = "application/json"
    ),
    responses(
        (status = 202, description = "Task accepted and queued", body = crate::types::SubmitReceipt),
        (status = 400, description = "Validation failure, no task created", body = crate::error::ApiError),
        (status = 503, description = "Shutting down, not accepting tasks", body = crate::error::ApiError)
    ),
    security(("api_key" = []))
)]
pub async fn create_task(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<impl IntoResponse> {
    let value: serde_json::Value = serde_json::from_slice(&body)
        .map_err(|_| ValidationFailure::new("Request body must be valid JSON."))?;

    let receipt = if let Some(videos) = value.get("videos") {
        let requests: Vec<ItemRequest> = serde_json::from_value(videos.clone())
            .map_err(|_| ValidationFailure::new("videos must be a non-empty array."))?;
        state.downloader.submit_batch(requests).await?
    } else {
        let request: ItemRequest = serde_json::from_value(value)
            .map_err(|_| ValidationFailure::new("Request body must be a JSON object."))?;
        state.downloader.submit(request).await?
    };

    Ok((StatusCode::ACCEPTED, Json(receipt)))
}

/// GET /api/download/:task_id - Query a task's current state
///
/// An unparseable id reports not-found rather than a parse error; from the
/// caller's perspective both mean "no such task".
#[utoipa::path(
    get,
    path = "/api/download/{task_id}",
    tag = "download",
    params(
        ("task_id" = String, Path, description = "Task id from the submission receipt")
    ),
    responses(
        (status = 200, description = "Current task state", body = TaskReport),
        (status = 404, description = "Unknown task id (never existed, or already evicted)", body = crate::error::ApiError)
    ),
    security(("api_key" = []))
)]
pub async fn task_status(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<impl IntoResponse> {
    let id: TaskId = task_id
        .parse()
        .map_err(|_| Error::NotFound(format!("task {task_id}")))?;

    let task = state.downloader.task_status(id).await?;
    Ok(Json(TaskReport::from_task(&task)))
}
