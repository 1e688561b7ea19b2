//! Parsing of Azure storage connection strings.
//!
//! A connection string is a `;`-separated list of `Key=Value` pairs, for example:
//!
//! ```text
//! DefaultEndpointsProtocol=https;AccountName=myaccount;AccountKey=<base64>;EndpointSuffix=core.windows.net
//! ```
//!
//! Only the keys relevant to the File service are interpreted. Unknown keys are ignored so that
//! the same string used for blobs and queues can be shared with this service.

use base64::{Engine, engine::general_purpose::STANDARD as BASE64_STANDARD};
use thiserror::Error;
use url::Url;

const DEFAULT_PROTOCOL: &str = "https";
const DEFAULT_ENDPOINT_SUFFIX: &str = "core.windows.net";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectionStringError {
    #[error("no storage connection string is configured")]
    Missing,

    #[error("segment '{0}' is not a Key=Value pair")]
    MalformedSegment(String),

    #[error("'{0}' is required")]
    MissingKey(&'static str),

    #[error("AccountKey is not valid base64")]
    InvalidAccountKey,

    #[error("invalid file endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("neither AccountKey nor SharedAccessSignature is present")]
    NoCredential,
}

/// How requests to the share are authorised.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    /// Account name and decoded account key, used for Shared Key signing
    SharedKey { account: String, key: Vec<u8> },
    /// SAS token without the leading `?`, appended to every request URL
    Sas { token: String },
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credential::SharedKey { account, .. } => f.debug_struct("SharedKey").field("account", account).finish_non_exhaustive(),
            Credential::Sas { .. } => f.debug_struct("Sas").finish_non_exhaustive(),
        }
    }
}

/// A parsed connection string: where the File service lives and how to authenticate against it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionString {
    pub file_endpoint: Url,
    pub credential: Credential,
}

impl ConnectionString {
    pub fn parse(raw: &str) -> Result<Self, ConnectionStringError> {
        let mut protocol = None;
        let mut account_name = None;
        let mut account_key = None;
        let mut endpoint_suffix = None;
        let mut file_endpoint = None;
        let mut sas = None;

        for segment in raw.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            // Values (base64 keys, SAS tokens) may themselves contain '='
            let (key, value) = segment
                .split_once('=')
                .ok_or_else(|| ConnectionStringError::MalformedSegment(segment.to_string()))?;
            let value = value.trim();
            match key.trim() {
                "DefaultEndpointsProtocol" => protocol = Some(value),
                "AccountName" => account_name = Some(value),
                "AccountKey" => account_key = Some(value),
                "EndpointSuffix" => endpoint_suffix = Some(value),
                "FileEndpoint" => file_endpoint = Some(value),
                "SharedAccessSignature" => sas = Some(value),
                _ => {}
            }
        }

        let file_endpoint = match file_endpoint {
            Some(endpoint) => parse_endpoint(endpoint)?,
            None => {
                let account = account_name.ok_or(ConnectionStringError::MissingKey("AccountName"))?;
                let derived = format!(
                    "{}://{}.file.{}",
                    protocol.unwrap_or(DEFAULT_PROTOCOL),
                    account,
                    endpoint_suffix.unwrap_or(DEFAULT_ENDPOINT_SUFFIX)
                );
                parse_endpoint(&derived)?
            }
        };

        let credential = if let Some(key) = account_key {
            let account = account_name.ok_or(ConnectionStringError::MissingKey("AccountName"))?;
            let key = BASE64_STANDARD.decode(key).map_err(|_| ConnectionStringError::InvalidAccountKey)?;
            Credential::SharedKey {
                account: account.to_string(),
                key,
            }
        } else if let Some(token) = sas {
            Credential::Sas {
                token: token.trim_start_matches('?').to_string(),
            }
        } else {
            return Err(ConnectionStringError::NoCredential);
        };

        Ok(Self { file_endpoint, credential })
    }
}

fn parse_endpoint(endpoint: &str) -> Result<Url, ConnectionStringError> {
    let url = Url::parse(endpoint).map_err(|e| ConnectionStringError::InvalidEndpoint {
        endpoint: endpoint.to_string(),
        reason: e.to_string(),
    })?;
    if url.cannot_be_a_base() {
        return Err(ConnectionStringError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason: "not a base URL".to_string(),
        });
    }
    Ok(url)
}
