//! Remote file share access.
//!
//! The upload handler only ever needs four operations from the remote share, so that is all the
//! [`FileShare`] trait exposes. Two backends implement it:
//!
//! - [`azure::AzureFileShare`]: the Azure Files REST API over `reqwest`
//! - `in_memory::InMemoryFileShare`: a recording fake, compiled for tests only
//!
//! # Modules
//!
//! - [`connection_string`]: parsing of Azure storage connection strings
//! - [`signing`]: Shared Key request signing
//! - [`errors`]: storage error type

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

pub mod azure;
pub mod connection_string;
pub mod errors;
#[cfg(test)]
pub mod in_memory;
pub mod signing;

pub use errors::{Result, StorageError};

/// Operations on a single, pre-existing file share.
#[async_trait]
pub trait FileShare: Send + Sync {
    /// Whether the configured share exists. Never creates it.
    async fn share_exists(&self) -> Result<bool>;

    /// Create `path` with the given length, replacing any existing file of the same name.
    async fn create_file(&self, path: &FilePath, length: u64) -> Result<()>;

    /// Write `data` into `path` starting at byte `offset`.
    async fn write_range(&self, path: &FilePath, offset: u64, data: Bytes) -> Result<()>;

    /// Delete `path`. Deleting a file that does not exist succeeds.
    async fn delete_file(&self, path: &FilePath) -> Result<()>;
}

/// Maximum length of a file name on an Azure file share.
pub const MAX_FILE_NAME_LEN: usize = 255;

/// Characters Azure Files does not allow in a file name.
const FORBIDDEN_CHARS: &[char] = &['"', '\\', '/', ':', '|', '<', '>', '*', '?'];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidFileName {
    #[error("file name is empty")]
    Empty,
    #[error("'{0}' is a relative path reference")]
    Relative(String),
    #[error("file name is longer than {MAX_FILE_NAME_LEN} characters")]
    TooLong,
    #[error("file name contains forbidden character {0:?}")]
    ForbiddenChar(char),
}

/// Location of a file inside the share: a fixed directory plus a validated file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePath {
    directory: String,
    name: String,
}

impl FilePath {
    /// Build a destination path from a client supplied file name.
    ///
    /// Only the last path component of `client_name` is kept (browsers on some platforms send
    /// full local paths), so the result can never leave `directory`.
    pub fn from_client_name(directory: &str, client_name: &str) -> std::result::Result<Self, InvalidFileName> {
        let name = client_name.rsplit(['/', '\\']).next().unwrap_or_default().trim();

        if name.is_empty() {
            return Err(InvalidFileName::Empty);
        }
        if name == "." || name == ".." {
            return Err(InvalidFileName::Relative(name.to_string()));
        }
        if name.chars().count() > MAX_FILE_NAME_LEN {
            return Err(InvalidFileName::TooLong);
        }
        if let Some(c) = name.chars().find(|c| FORBIDDEN_CHARS.contains(c) || c.is_control()) {
            return Err(InvalidFileName::ForbiddenChar(c));
        }

        Ok(Self {
            directory: directory.trim_matches('/').to_string(),
            name: name.to_string(),
        })
    }

    pub fn directory(&self) -> &str {
        &self.directory
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path segments from the share root, e.g. `["uploads", "a.txt"]`.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.directory.split('/').filter(|s| !s.is_empty()).chain(std::iter::once(self.name.as_str()))
    }
}

impl fmt::Display for FilePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.directory, self.name)
    }
}
