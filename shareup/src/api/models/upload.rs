use axum::extract::{Multipart, multipart::MultipartError};
use bytes::Bytes;
use tracing::trace;

/// The file part selected from a multipart upload.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// File name exactly as supplied by the client
    pub file_name: String,
    pub content: Bytes,
}

impl UploadedFile {
    /// Declared length of the upload in bytes.
    pub fn len(&self) -> u64 {
        self.content.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Read fields until the first file part (a part with a non-empty `filename`) and return it.
    ///
    /// Plain form fields before it are skipped, as are parts with `filename=""`, which browsers
    /// send for a file input left empty. Parts after it are never read.
    pub async fn first_from(multipart: &mut Multipart) -> Result<Option<Self>, MultipartError> {
        while let Some(field) = multipart.next_field().await? {
            let Some(file_name) = field.file_name().filter(|name| !name.is_empty()).map(str::to_string) else {
                trace!(field = ?field.name(), "Skipping non-file form field");
                continue;
            };

            let content = field.bytes().await?;
            return Ok(Some(Self { file_name, content }));
        }

        Ok(None)
    }
}
