use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::io;

use crate::services::derivatives::DerivativeError;
use crate::services::photo_store::StoreError;

/// The collaborator refused the metadata write.
pub const CODE_PERSISTENCE: i32 = -4001;
/// Structural filter failure: file count, extension, declared type or size.
pub const CODE_FILE_FILTER: i32 = -4002;
/// The bytes are not an accepted image type.
pub const CODE_CONTENT_TYPE: i32 = -4003;
/// A resized copy could not be produced.
pub const CODE_DERIVATIVE: i32 = -4004;
/// The request itself could not be read.
pub const CODE_MALFORMED_REQUEST: i32 = -4005;
/// Local filesystem failure while staging or committing files.
pub const CODE_STORAGE: i32 = -5001;

/// Every way a single photo upload can end without a stored photo.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("File not uploaded")]
    NoFile,

    #[error("Only one file may be uploaded per request")]
    TooManyFiles,

    #[error("Bad file extension: {filename}")]
    BadExtension { filename: String },

    #[error("Bad declared content type: {mime}")]
    BadDeclaredType { mime: String },

    #[error("File too large (max: {max_bytes} bytes)")]
    FileTooLarge { max_bytes: u64 },

    #[error("Can not detect file type")]
    Undetectable,

    #[error("Bad file content type: {mime}")]
    BadRealType { mime: String },

    #[error("Failed to create resized image: {0}")]
    Derivative(#[from] DerivativeError),

    #[error("Failed to save photo: {0}")]
    Persistence(#[from] StoreError),

    #[error("Failed to read upload: {0}")]
    Transport(#[source] io::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] io::Error),
}

impl PipelineError {
    pub fn code(&self) -> i32 {
        match self {
            Self::NoFile
            | Self::TooManyFiles
            | Self::BadExtension { .. }
            | Self::BadDeclaredType { .. }
            | Self::FileTooLarge { .. } => CODE_FILE_FILTER,
            Self::Undetectable | Self::BadRealType { .. } => CODE_CONTENT_TYPE,
            Self::Derivative(_) => CODE_DERIVATIVE,
            Self::Persistence(_) => CODE_PERSISTENCE,
            Self::Transport(_) => CODE_MALFORMED_REQUEST,
            Self::Storage(_) => CODE_STORAGE,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::NoFile
            | Self::TooManyFiles
            | Self::BadExtension { .. }
            | Self::BadDeclaredType { .. }
            | Self::Transport(_) => StatusCode::BAD_REQUEST,
            Self::FileTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Undetectable | Self::BadRealType { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::Persistence(StoreError::ArticleNotFound(_)) => StatusCode::NOT_FOUND,
            Self::Derivative(_) | Self::Persistence(_) | Self::Storage(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message safe to show to the client. Server-side failures are logged in full
    /// and reported generically.
    pub fn public_message(&self) -> String {
        match self {
            Self::Derivative(_) => "Failed to create resized image".to_string(),
            Self::Persistence(StoreError::Database(_)) => "Failed to save photo".to_string(),
            Self::Storage(_) => "Internal storage error".to_string(),
            other => other.to_string(),
        }
    }
}

/// Uniform error body: `{"status": "error", "code": -4002, "message": "..."}`.
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ApiResponse {
    pub status: String,
    pub code: i32,
    pub message: String,
}

impl ApiResponse {
    pub fn error(code: i32, message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            code,
            message: message.into(),
        }
    }
}

#[derive(Debug)]
pub enum AppError {
    Pipeline(PipelineError),
    BadRequest(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::Pipeline(err) => {
                if err.status().is_server_error() {
                    tracing::error!(error = %err, code = err.code(), "photo upload failed");
                }
                (err.status(), ApiResponse::error(err.code(), err.public_message()))
            }
            AppError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                ApiResponse::error(CODE_MALFORMED_REQUEST, msg),
            ),
        };

        (status, Json(body)).into_response()
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        AppError::Pipeline(err)
    }
}
