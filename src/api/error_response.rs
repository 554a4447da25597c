//! HTTP error response handling for the API
//!
//! Converts domain errors to HTTP responses with the right status code and
//! a JSON body in the `{error: {code, message, details?}}` shape.

use crate::error::{ApiError, Error, ToHttpStatus};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// Implement IntoResponse for Error so handlers can return `Result<_, Error>`
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status_code =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let api_error: ApiError = self.into();

        (status_code, Json(api_error)).into_response()
    }
}

/// Implement IntoResponse for ApiError for explicit error responses
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Default to 500 when converting an ApiError directly
        // (errors normally go through Error::into_response, which knows the code)
        (StatusCode::INTERNAL_SERVER_ERROR, Json(self)).into_response()
    }
}
