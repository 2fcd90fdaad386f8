//! Maps `AppError` onto HTTP responses.
//!
//! Validation problems are reported to the form; every other failure is
//! logged and flattened to a bare 500.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use kate_core::error::AppError;
use tracing::error;

use crate::handlers::SubmitResponse;

#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self.0 {
            AppError::ValidationError(message) => {
                (StatusCode::BAD_REQUEST, Json(SubmitResponse::failure(message))).into_response()
            }
            other => {
                error!(error = %other, "request failed");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}
