//! Azure Files backend.
//!
//! Talks to the File service REST API directly with `reqwest`. Requests are authorised either with
//! Shared Key signing or by appending a SAS token, depending on what the connection string holds.
//!
//! The connection string is parsed on every operation rather than at construction, so a missing
//! or malformed credential does not prevent startup and surfaces as a storage error on the first
//! request that needs it.
//!
//! Operations used:
//!
//! | Trait method   | REST call                                   | Success status |
//! |----------------|---------------------------------------------|----------------|
//! | `share_exists` | `GET /{share}?restype=share`                | 200 (404 = no) |
//! | `create_file`  | `PUT /{share}/{dir}/{name}`                 | 201            |
//! | `write_range`  | `PUT /{share}/{dir}/{name}?comp=range`      | 201            |
//! | `delete_file`  | `DELETE /{share}/{dir}/{name}`              | 202 (404 = ok) |

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use reqwest::{
    Method, StatusCode,
    header::{AUTHORIZATION, CONTENT_LENGTH},
};
use tracing::{debug, instrument};
use url::Url;

use super::connection_string::{ConnectionString, ConnectionStringError, Credential};
use super::{FilePath, FileShare, Result, StorageError, signing};
use crate::config::StorageConfig;

/// REST API version sent with every request.
pub const API_VERSION: &str = "2023-11-03";

/// Largest range the service accepts in a single Put Range call.
pub const MAX_RANGE_SIZE: usize = 4 * 1024 * 1024;

/// Azure Files implementation of [`FileShare`] for one named share.
pub struct AzureFileShare {
    client: reqwest::Client,
    share_name: String,
    connection_string: Option<String>,
}

impl AzureFileShare {
    pub fn new(client: reqwest::Client, share_name: impl Into<String>, connection_string: Option<String>) -> Self {
        Self {
            client,
            share_name: share_name.into(),
            connection_string,
        }
    }

    /// Build the backend from configuration, with an HTTP client honouring the request timeout.
    pub fn from_config(config: &StorageConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))?;

        if config.connection_string.is_none() {
            tracing::warn!("No storage connection string configured; uploads will fail until one is provided");
        }

        Ok(Self::new(client, config.share_name.clone(), config.connection_string.clone()))
    }

    fn connect(&self) -> Result<ConnectionString> {
        let raw = self.connection_string.as_deref().ok_or(ConnectionStringError::Missing)?;
        Ok(ConnectionString::parse(raw)?)
    }

    /// URL for a path below the share root, with the SAS token appended when that is the credential.
    fn url<'a>(&self, conn: &ConnectionString, segments: impl IntoIterator<Item = &'a str>, query: &[(&str, &str)]) -> Result<Url> {
        let mut url = conn.file_endpoint.clone();
        {
            let mut path = url.path_segments_mut().map_err(|_| ConnectionStringError::InvalidEndpoint {
                endpoint: conn.file_endpoint.to_string(),
                reason: "not a base URL".to_string(),
            })?;
            path.pop_if_empty().push(&self.share_name).extend(segments);
        }

        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }

        if let Credential::Sas { token } = &conn.credential {
            let combined = match url.query() {
                Some(existing) if !existing.is_empty() => format!("{existing}&{token}"),
                _ => token.clone(),
            };
            url.set_query(Some(&combined));
        }

        Ok(url)
    }

    async fn send(
        &self,
        conn: &ConnectionString,
        method: Method,
        url: Url,
        extra_headers: Vec<(&'static str, String)>,
        body: Bytes,
        operation: &'static str,
    ) -> Result<reqwest::Response> {
        let date = Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string();
        let mut headers = vec![("x-ms-date", date), ("x-ms-version", API_VERSION.to_string())];
        headers.extend(extra_headers);
        let content_length = body.len() as u64;

        let mut request = self.client.request(method.clone(), url.clone());
        for (name, value) in &headers {
            request = request.header(*name, value);
        }
        request = request.header(CONTENT_LENGTH, content_length);

        if let Credential::SharedKey { account, key } = &conn.credential {
            let string_to_sign = signing::string_to_sign(account, method.as_str(), &url, content_length, &headers);
            request = request.header(AUTHORIZATION, signing::authorization(account, key, &string_to_sign));
        }

        debug!(%method, path = url.path(), content_length, "Sending file share request");
        request.body(body).send().await.map_err(StorageError::http(operation))
    }

    fn service_error(response: &reqwest::Response, operation: &'static str) -> StorageError {
        StorageError::Service {
            operation,
            status: response.status(),
            code: response
                .headers()
                .get("x-ms-error-code")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
        }
    }
}

#[async_trait]
impl FileShare for AzureFileShare {
    #[instrument(skip(self), fields(share = %self.share_name), err)]
    async fn share_exists(&self) -> Result<bool> {
        let conn = self.connect()?;
        let url = self.url(&conn, [], &[("restype", "share")])?;
        let response = self.send(&conn, Method::GET, url, vec![], Bytes::new(), "get share properties").await?;

        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(Self::service_error(&response, "get share properties")),
        }
    }

    #[instrument(skip(self), fields(share = %self.share_name, path = %path), err)]
    async fn create_file(&self, path: &FilePath, length: u64) -> Result<()> {
        let conn = self.connect()?;
        let url = self.url(&conn, path.segments(), &[])?;
        let headers = vec![("x-ms-type", "file".to_string()), ("x-ms-content-length", length.to_string())];
        let response = self.send(&conn, Method::PUT, url, headers, Bytes::new(), "create file").await?;

        if response.status() != StatusCode::CREATED {
            return Err(Self::service_error(&response, "create file"));
        }
        Ok(())
    }

    #[instrument(skip(self, data), fields(share = %self.share_name, path = %path, len = data.len()), err)]
    async fn write_range(&self, path: &FilePath, offset: u64, data: Bytes) -> Result<()> {
        let conn = self.connect()?;

        let mut start = 0;
        while start < data.len() {
            let end = (start + MAX_RANGE_SIZE).min(data.len());
            let first = offset + start as u64;
            let last = offset + end as u64 - 1;

            let url = self.url(&conn, path.segments(), &[("comp", "range")])?;
            let headers = vec![
                ("x-ms-range", format!("bytes={first}-{last}")),
                ("x-ms-write", "update".to_string()),
            ];
            let response = self.send(&conn, Method::PUT, url, headers, data.slice(start..end), "put range").await?;

            if response.status() != StatusCode::CREATED {
                return Err(Self::service_error(&response, "put range"));
            }
            start = end;
        }

        Ok(())
    }

    #[instrument(skip(self), fields(share = %self.share_name, path = %path), err)]
    async fn delete_file(&self, path: &FilePath) -> Result<()> {
        let conn = self.connect()?;
        let url = self.url(&conn, path.segments(), &[])?;
        let response = self.send(&conn, Method::DELETE, url, vec![], Bytes::new(), "delete file").await?;

        match response.status() {
            StatusCode::ACCEPTED | StatusCode::NOT_FOUND => Ok(()),
            _ => Err(Self::service_error(&response, "delete file")),
        }
    }
}
