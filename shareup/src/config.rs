//! Application configuration management.
//!
//! Configuration is loaded once at startup from a YAML file with environment variable overrides,
//! then passed explicitly into the application. The file path defaults to `config.yaml` but can be
//! specified via the `-f` flag or the `SHAREUP_CONFIG` environment variable.
//!
//! ## Loading Priority
//!
//! Sources are merged in the following order (later sources override earlier ones):
//!
//! 1. **YAML config file** - Base configuration (default: `config.yaml`)
//! 2. **Environment variables** - Variables prefixed with `SHAREUP_` override YAML values
//! 3. **AzureWebJobsStorage** - Special case: overrides `storage.connection_string` if set
//!
//! For nested values use double underscores, e.g. `SHAREUP_STORAGE__SHARE_NAME=contracts`.
//!
//! ## Environment Variable Examples
//!
//! ```bash
//! # Override server port
//! SHAREUP_PORT=8080
//!
//! # Storage credential, as set by the Functions host
//! AzureWebJobsStorage="DefaultEndpointsProtocol=https;AccountName=acme;AccountKey=...;EndpointSuffix=core.windows.net"
//!
//! # Require a function key on every request
//! SHAREUP_AUTH__FUNCTION_KEYS='["s3cret"]'
//! ```
//!
//! The connection string is deliberately not validated here: a missing or malformed value only
//! fails the first upload that needs it.

use std::time::Duration;

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};

/// Environment variable the Functions host uses for the storage connection string.
pub const CONNECTION_STRING_ENV: &str = "AzureWebJobsStorage";

/// Simple CLI args - just for specifying config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "SHAREUP_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    #[arg(long)]
    pub validate: bool,
}

/// Main application configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to (e.g., "0.0.0.0" for all interfaces)
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// Enable OpenTelemetry OTLP export for distributed tracing
    pub enable_otel_export: bool,
    /// Remote file share settings
    pub storage: StorageConfig,
    /// Function key authentication
    pub auth: AuthConfig,
    /// Request size limits
    pub limits: LimitsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 7071,
            enable_otel_export: false,
            storage: StorageConfig::default(),
            auth: AuthConfig::default(),
            limits: LimitsConfig::default(),
        }
    }
}

/// Where uploads are written.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// Azure storage connection string. Usually supplied through `AzureWebJobsStorage`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_string: Option<String>,
    /// Name of the (pre-existing) file share
    pub share_name: String,
    /// Directory inside the share that receives uploads. Must already exist.
    pub directory: String,
    /// Timeout applied to each request to the share
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            connection_string: None,
            share_name: "contractsshare".to_string(),
            directory: "uploads".to_string(),
            request_timeout: Duration::from_secs(300),
        }
    }
}

impl std::fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageConfig")
            .field("connection_string", &self.connection_string.as_ref().map(|_| "<redacted>"))
            .field("share_name", &self.share_name)
            .field("directory", &self.directory)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

/// Function key authentication. An empty key list disables the check.
#[derive(Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthConfig {
    pub function_keys: Vec<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("function_keys", &format_args!("[{} keys]", self.function_keys.len()))
            .finish()
    }
}

/// Request size limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct LimitsConfig {
    /// Maximum request body size in bytes. Default: 100MB
    pub max_upload_size: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_upload_size: 100 * 1024 * 1024,
        }
    }
}

impl Config {
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let config: Self = Self::figment(args).extract()?;
        config.validate().map_err(|e| figment::Error::from(e.to_string()))?;
        Ok(config)
    }

    pub fn figment(args: &Args) -> Figment {
        Figment::new()
            // Load base config file
            .merge(Yaml::file(&args.config))
            // Environment variables can still override specific values
            // (SHAREUP_CONFIG names the file itself and is consumed by clap)
            .merge(Env::prefixed("SHAREUP_").ignore(&["CONFIG"]).split("__"))
            // The Functions host convention for the storage credential
            .merge(
                Env::raw()
                    .only(&[CONNECTION_STRING_ENV])
                    .map(|_| "storage.connection_string".into()),
            )
    }

    /// Validate the configuration for consistency and required fields
    pub fn validate(&self) -> anyhow::Result<()> {
        validate_share_name(&self.storage.share_name)?;

        let directory = self.storage.directory.trim_matches('/');
        if directory.is_empty() {
            anyhow::bail!("storage.directory must not be empty");
        }
        if directory.split('/').any(|c| c.is_empty() || c == "." || c == "..") {
            anyhow::bail!("storage.directory '{}' contains an empty or relative component", self.storage.directory);
        }

        if self.limits.max_upload_size == 0 {
            anyhow::bail!("limits.max_upload_size must be greater than zero");
        }

        if self.auth.function_keys.iter().any(|k| k.is_empty()) {
            anyhow::bail!("auth.function_keys must not contain empty keys");
        }

        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Share names: 3-63 characters of lowercase letters, digits and single hyphens, starting and
/// ending with a letter or digit.
fn validate_share_name(name: &str) -> anyhow::Result<()> {
    let valid_chars = name.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    let valid = (3..=63).contains(&name.len())
        && valid_chars
        && !name.starts_with('-')
        && !name.ends_with('-')
        && !name.contains("--");

    if !valid {
        anyhow::bail!("storage.share_name '{}' is not a valid share name", name);
    }
    Ok(())
}
