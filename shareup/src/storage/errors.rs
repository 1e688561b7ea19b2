use reqwest::StatusCode;
use thiserror::Error;

use super::connection_string::ConnectionStringError;

/// Unified error type for remote file share operations
#[derive(Error, Debug)]
pub enum StorageError {
    /// The connection string is missing or cannot be turned into a credential
    #[error("Invalid storage credential: {0}")]
    Credential(#[from] ConnectionStringError),

    /// Transport-level failure talking to the share (connect, TLS, timeout, body)
    #[error("HTTP error during {operation}: {source}")]
    Http {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// The share service answered with a non-success status
    #[error("{operation} failed with status {status}{}", .code.as_deref().map(|c| format!(" ({c})")).unwrap_or_default())]
    Service {
        operation: &'static str,
        status: StatusCode,
        /// Value of the `x-ms-error-code` response header, if present
        code: Option<String>,
    },

    /// A write addressed bytes past the end of the file
    #[error("Range {offset}+{len} is outside file {path} of length {file_len}")]
    RangeOutOfBounds {
        path: String,
        offset: u64,
        len: u64,
        file_len: u64,
    },

    /// The target file does not exist
    #[error("File not found: {0}")]
    NotFound(String),

    /// Fault raised on purpose by the in-memory share
    #[error("Injected fault during {0}")]
    Injected(&'static str),
}

impl StorageError {
    pub(crate) fn http(operation: &'static str) -> impl FnOnce(reqwest::Error) -> Self {
        move |source| StorageError::Http { operation, source }
    }
}

pub type Result<T> = std::result::Result<T, StorageError>;
