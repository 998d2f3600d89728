use crate::services::storage::StorageError;
use crate::services::upload_service::UploadError;
use axum::{
    Json,
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::io;
use thiserror::Error;
use utoipa::ToSchema;

pub const MISSING_FILE: &str = "Missing file";
pub const FILE_TOO_LARGE: &str = "File too large";
pub const FAILED_TO_OPEN: &str = "Failed to open file";
pub const FAILED_TO_SAVE: &str = "Failed to save file";
pub const FAILED_TO_WRITE: &str = "Failed to write file";

#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("{message}: {source}")]
    Storage {
        message: &'static str,
        #[source]
        source: io::Error,
    },
}

impl AppError {
    pub fn missing_file() -> Self {
        AppError::BadRequest(MISSING_FILE.to_string())
    }

    pub fn file_too_large() -> Self {
        AppError::BadRequest(FILE_TOO_LARGE.to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Storage { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<UploadError> for AppError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::TooLarge(_) => AppError::file_too_large(),
            UploadError::Open(source) if exceeded_body_limit(&source) => AppError::file_too_large(),
            UploadError::Open(source) => AppError::Storage {
                message: FAILED_TO_OPEN,
                source,
            },
            UploadError::Storage(err) => err.into(),
            err @ UploadError::Retention { .. } => AppError::Storage {
                message: FAILED_TO_SAVE,
                source: io::Error::new(io::ErrorKind::InvalidInput, err.to_string()),
            },
        }
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::TooLarge { .. } => AppError::file_too_large(),
            StorageError::Read(source) if exceeded_body_limit(&source) => {
                AppError::file_too_large()
            }
            StorageError::Read(source) | StorageError::Write(source) => AppError::Storage {
                message: FAILED_TO_WRITE,
                source,
            },
            StorageError::Create(source) | StorageError::Persist(source) => AppError::Storage {
                message: FAILED_TO_SAVE,
                source,
            },
        }
    }
}

/// Whether a stream error comes from the request body limiter tripping mid-upload
pub fn exceeded_body_limit(err: &io::Error) -> bool {
    err.get_ref()
        .and_then(|inner| inner.downcast_ref::<MultipartError>())
        .is_some_and(|multipart| multipart.status() == StatusCode::PAYLOAD_TOO_LARGE)
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            AppError::BadRequest(msg) => {
                tracing::debug!("Rejected upload: {}", msg);
                msg
            }
            AppError::Storage { message, source } => {
                tracing::error!("{}: {:?}", message, source);
                message.to_string()
            }
        };

        let body = Json(ErrorResponse {
            success: false,
            error: message,
        });

        (status, body).into_response()
    }
}
