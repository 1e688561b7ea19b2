use crate::storage::{InvalidFileName, StorageError};
use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error as ThisError;

/// Body returned when the request carries no file part.
pub const NO_FILE_MESSAGE: &str = "No file uploaded.";
/// Body returned when the file name cannot be used on the share.
pub const INVALID_FILE_NAME_MESSAGE: &str = "Invalid file name.";

#[derive(ThisError, Debug)]
pub enum Error {
    /// The request contained no file part
    #[error("No file uploaded")]
    NoFile,

    /// The client supplied a file name that cannot be stored safely
    #[error("Invalid file name '{name}': {reason}")]
    InvalidFileName { name: String, reason: InvalidFileName },

    /// The multipart body could not be read (malformed, or over the size limit)
    #[error("Failed to parse multipart data: {0}")]
    Multipart(#[from] MultipartError),

    /// Function key missing or not recognised
    #[error("Missing or invalid function key")]
    Unauthenticated,

    /// The configured share does not exist
    #[error("File share '{share}' does not exist")]
    ShareUnavailable { share: String },

    /// Any failure talking to the remote share
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::NoFile | Error::InvalidFileName { .. } => StatusCode::BAD_REQUEST,
            Error::Multipart(e) => e.status(),
            Error::Unauthenticated => StatusCode::UNAUTHORIZED,
            Error::ShareUnavailable { .. } | Error::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns a user-safe response body, without leaking internal implementation details
    pub fn user_message(&self) -> String {
        match self {
            Error::NoFile => NO_FILE_MESSAGE.to_string(),
            Error::InvalidFileName { .. } => INVALID_FILE_NAME_MESSAGE.to_string(),
            Error::Multipart(e) => e.body_text(),
            Error::Unauthenticated | Error::ShareUnavailable { .. } | Error::Storage(_) => String::new(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        // Log full error details for debugging - different log levels based on severity
        match &self {
            Error::ShareUnavailable { .. } => {
                tracing::error!("File share unavailable: {}", self);
            }
            Error::Storage(_) => {
                tracing::error!("An error occurred during file upload: {:#}", self);
            }
            Error::Unauthenticated => {
                tracing::info!("Authorization error: {}", self);
            }
            Error::NoFile | Error::InvalidFileName { .. } | Error::Multipart(_) => {
                tracing::debug!("Client error: {}", self);
            }
        }

        (self.status_code(), self.user_message()).into_response()
    }
}

/// Type alias for handler results
pub type Result<T> = std::result::Result<T, Error>;
