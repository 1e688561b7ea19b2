//! API layer for HTTP request handling and data models.
//!
//! - **[`handlers`]**: Axum route handlers
//! - **[`models`]**: Request data structures extracted from multipart bodies
//!
//! # API Structure
//!
//! - **Upload** (`/api/UploadFileToShare`): forward the first uploaded file to the file share
//! - **OpenAPI** (`/api/openapi.json`): machine readable description of the above
//!
//! When function keys are configured, every route requires one (see [`crate::auth`]).

use utoipa::OpenApi;

pub mod handlers;
pub mod models;

#[derive(OpenApi)]
#[openapi(
    paths(handlers::upload::upload_file),
    tags((name = "files", description = "File share uploads"))
)]
pub struct ApiDoc;
