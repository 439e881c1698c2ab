use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use planmark_shared::{AnnotationFileDecodeError, AnnotationFileEncodeError, ErrorResponse};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("corrupt annotation file: {0}")]
    Decode(#[from] AnnotationFileDecodeError),
    #[error(transparent)]
    Encode(#[from] AnnotationFileEncodeError),
}

/// Failures a request can end with; rendered as `{success: false, error}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid floor plan ID")]
    InvalidFloorPlanId,
    #[error("Invalid request body: {0}")]
    BadRequest(String),
    #[error("Annotation storage unavailable")]
    Storage(#[from] StorageError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidFloorPlanId | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Storage(err) = &self {
            tracing::error!(%err, "storage failure");
        }
        let body = ErrorResponse {
            success: false,
            error: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}
