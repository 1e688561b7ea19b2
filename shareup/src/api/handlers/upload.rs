use crate::api::models::upload::UploadedFile;
use crate::errors::{Error, Result};
use crate::storage::{FilePath, FileShare};
use crate::AppState;
use axum::extract::{Multipart, State, multipart::MultipartRejection};

/// Body returned after a successful upload.
pub const SUCCESS_MESSAGE: &str = "File uploaded successfully.";

#[utoipa::path(
    post,
    path = "/api/UploadFileToShare",
    tag = "files",
    summary = "Upload file",
    description = "Upload a file to the configured file share. Only the first file part is stored; \
                   the destination name is the final component of the supplied file name.",
    request_body(content_type = "multipart/form-data", description = "Form with at least one file part"),
    params(
        ("code" = Option<String>, Query, description = "Function key (alternative to the x-functions-key header)")
    ),
    responses(
        (status = 200, description = "File uploaded successfully", body = String),
        (status = 400, description = "No file uploaded, invalid file name or malformed form"),
        (status = 401, description = "Missing or invalid function key"),
        (status = 413, description = "Payload too large"),
        (status = 500, description = "File share unavailable or upload failed")
    )
)]
#[tracing::instrument(skip_all)]
pub async fn upload_file(State(state): State<AppState>, multipart: std::result::Result<Multipart, MultipartRejection>) -> Result<&'static str> {
    tracing::info!("Processing a file upload request");

    // A body that is not multipart at all carries no files
    let Ok(mut multipart) = multipart else {
        return Err(Error::NoFile);
    };
    let upload = UploadedFile::first_from(&mut multipart).await?.ok_or(Error::NoFile)?;

    let path = FilePath::from_client_name(&state.config.storage.directory, &upload.file_name).map_err(|reason| {
        Error::InvalidFileName {
            name: upload.file_name.clone(),
            reason,
        }
    })?;

    tracing::info!(
        client_name = %upload.file_name,
        path = %path,
        size = upload.len(),
        "Uploading file to share"
    );

    copy_to_share(state.share.as_ref(), &state.config.storage.share_name, &path, upload).await?;

    tracing::info!(path = %path, "File uploaded");
    Ok(SUCCESS_MESSAGE)
}

/// Create `path` on the share sized to the upload and copy its bytes in one range.
///
/// The share must already exist. If the range write fails after the file was created, the
/// partially written file is deleted before the error is returned.
pub async fn copy_to_share(share: &dyn FileShare, share_name: &str, path: &FilePath, upload: UploadedFile) -> Result<()> {
    if !share.share_exists().await? {
        return Err(Error::ShareUnavailable {
            share: share_name.to_string(),
        });
    }

    let length = upload.len();
    share.create_file(path, length).await?;

    if upload.is_empty() {
        return Ok(());
    }

    if let Err(e) = share.write_range(path, 0, upload.content).await {
        if let Err(cleanup) = share.delete_file(path).await {
            tracing::warn!(path = %path, "Failed to remove partially uploaded file: {}", cleanup);
        }
        return Err(e.into());
    }

    Ok(())
}
