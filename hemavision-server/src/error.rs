use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use hemavision_core::PipelineError;
use serde_json::json;
use thiserror::Error;

use crate::upload::UploadError;

pub const NO_FILE_PROVIDED: &str = "No file provided";
pub const INVALID_CELL_TYPE: &str = "Invalid cell type";
pub const PROCESSING_FAILED: &str = "Failed to process image";
pub const INTERNAL_ERROR: &str = "Internal server error";
pub const NOT_FOUND: &str = "Endpoint not found";

/// Everything a handler can fail with. Client mistakes become 400s; the rest
/// become 500s whose detail only reaches the logs.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),
    #[error("upload rejected: {0}")]
    Multipart(#[from] MultipartError),
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error("prediction failed")]
    Pipeline(#[from] PipelineError),
    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_)
            | AppError::Upload(UploadError::NoFileSelected | UploadError::InvalidType) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Multipart(err) => err.status(),
            AppError::Upload(UploadError::Io(_))
            | AppError::Pipeline(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message sent to the client.
    fn public_message(&self) -> String {
        match self {
            AppError::Validation(msg) => msg.clone(),
            AppError::Upload(UploadError::Io(_)) => INTERNAL_ERROR.to_owned(),
            AppError::Upload(err) => err.to_string(),
            AppError::Multipart(err) => err.body_text(),
            AppError::Pipeline(_) => PROCESSING_FAILED.to_owned(),
            AppError::Internal(_) => INTERNAL_ERROR.to_owned(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = ?self, "{self}");
        } else {
            tracing::warn!(%status, "{self}");
        }
        (status, Json(json!({ "error": self.public_message() }))).into_response()
    }
}
