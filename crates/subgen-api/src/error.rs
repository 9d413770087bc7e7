//! API error types.

use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use subgen_media::MediaError;
use subgen_models::api::{
    GENERATION_FAILED_DETAIL, INVALID_FILE_TYPE_DETAIL, PROCESSING_FAILED_DETAIL,
};
use subgen_models::ErrorDetail;

pub type ApiResult<T> = Result<T, ApiError>;

pub const MISSING_FILE_DETAIL: &str = "No video file provided.";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("No video file provided")]
    MissingFile,

    #[error("Invalid file type")]
    InvalidFileType,

    #[error("Malformed upload: {message}")]
    Multipart { status: StatusCode, message: String },

    #[error("Media error: {0}")]
    Media(#[from] MediaError),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MissingFile | ApiError::InvalidFileType => StatusCode::BAD_REQUEST,
            ApiError::Multipart { status, .. } => *status,
            ApiError::Media(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The client-facing message. Media failures collapse to fixed sentences;
    /// the full error is logged by the handler.
    pub fn detail(&self) -> String {
        match self {
            ApiError::MissingFile => MISSING_FILE_DETAIL.to_string(),
            ApiError::InvalidFileType => INVALID_FILE_TYPE_DETAIL.to_string(),
            ApiError::Multipart { message, .. } => message.clone(),
            ApiError::Media(e) if e.is_generation() => GENERATION_FAILED_DETAIL.to_string(),
            ApiError::Media(_) => PROCESSING_FAILED_DETAIL.to_string(),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        Self::Multipart {
            status: err.status(),
            message: err.body_text(),
        }
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        Self::Media(MediaError::Io(err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(ErrorDetail::new(self.detail()))).into_response()
    }
}
