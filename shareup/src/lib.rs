//! # shareup: multipart uploads into an Azure file share
//!
//! `shareup` is a small HTTP service with a single job: accept a multipart file upload and copy
//! the first file it contains into a fixed directory of a pre-existing Azure file share.
//!
//! ## Request Flow
//!
//! A request to `/api/UploadFileToShare` first passes the function key check ([`auth`]) when keys
//! are configured. The handler ([`api::handlers::upload`]) then:
//!
//! 1. reads multipart fields up to the first file part, answering `400 No file uploaded.` if
//!    there is none;
//! 2. reduces the client file name to a safe destination inside the upload directory;
//! 3. checks that the share exists, creates the destination sized to the upload and writes the
//!    bytes as a single range through the [`storage::FileShare`] trait;
//! 4. answers `200 File uploaded successfully.`, or an empty `500` if anything on the storage side
//!    failed. The failure itself is only written to the log.
//!
//! Nothing is retried and no state is kept between requests apart from the HTTP connection pool
//! used to reach the share.
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use shareup::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = shareup::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     shareup::telemetry::init_telemetry(config.enable_otel_export)?;
//!
//!     let app = Application::new(config)?;
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!     })
//!     .await
//! }
//! ```
//!
//! ## Configuration
//!
//! See the [`config`] module for configuration options.

pub mod api;
pub mod auth;
pub mod config;
pub mod errors;
pub mod storage;
pub mod telemetry;
#[cfg(test)]
mod test_utils;

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::get,
};
use bon::Builder;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};
use utoipa::OpenApi;

pub use config::Config;
use storage::{FileShare, azure::AzureFileShare};

/// Route the upload handler is mounted on.
pub const UPLOAD_ROUTE: &str = "/api/UploadFileToShare";

/// Application state shared across all request handlers.
///
/// # Example
///
/// ```ignore
/// let share = Arc::new(AzureFileShare::from_config(&config.storage)?);
/// let state = AppState::builder().config(config).share(share).build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub config: Config,
    pub share: Arc<dyn FileShare>,
}

/// Build the HTTP router: the upload endpoint behind the function key check, plus the OpenAPI
/// document.
pub fn build_router(state: AppState) -> Router {
    let upload = Router::new()
        .route(
            UPLOAD_ROUTE,
            get(api::handlers::upload::upload_file).post(api::handlers::upload::upload_file),
        )
        .route("/api/openapi.json", get(|| async { Json(api::ApiDoc::openapi()) }))
        .layer(DefaultBodyLimit::max(state.config.limits.max_upload_size))
        .route_layer(from_fn_with_state(state.clone(), auth::function_key_middleware));

    upload.layer(TraceLayer::new_for_http()).with_state(state)
}

/// Main application struct that owns the router and configuration.
///
/// # Lifecycle
///
/// 1. **Create**: [`Application::new`] builds the Azure backend from configuration, or
///    [`Application::with_share`] accepts any [`FileShare`]
/// 2. **Serve**: [`Application::serve`] binds to a TCP port and handles requests until the
///    shutdown future resolves
pub struct Application {
    router: Router,
    config: Config,
}

impl Application {
    /// Create a new application backed by the Azure file share from `config.storage`
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let share = AzureFileShare::from_config(&config.storage)?;
        Ok(Self::with_share(config, Arc::new(share)))
    }

    /// Create a new application writing to the given share
    pub fn with_share(config: Config, share: Arc<dyn FileShare>) -> Self {
        debug!("Starting with configuration: {:#?}", config);

        if config.auth.function_keys.is_empty() {
            warn!("No function keys configured; the upload endpoint accepts unauthenticated requests");
        }

        let state = AppState::builder().config(config.clone()).share(share).build();
        let router = build_router(state);

        Self { router, config }
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router.into_make_service()).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "Upload endpoint listening on http://{}{}, writing to share '{}' directory '{}'",
            bind_addr, UPLOAD_ROUTE, self.config.storage.share_name, self.config.storage.directory
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}
