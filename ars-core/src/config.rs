//! Client configuration.
//!
//! Holds everything the request engine needs at construction time: the
//! service endpoint, credentials, TLS material, retry behaviour and logging.
//! Configuration can be built in code or deserialized from TOML.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::error::{ArsError, ArsResult};

/// Top-level client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Service endpoint URL (e.g., "https://arsenal.example.com:8080/").
    #[serde(default)]
    pub endpoint: String,

    /// Pre-obtained authentication token sent as `X-Auth-Token`.
    #[serde(default)]
    pub token: Option<String>,

    /// API version pinned by the user. When unset the client negotiates.
    #[serde(default)]
    pub api_version: Option<String>,

    /// Maximum retries for transient failures. `None` means the default.
    #[serde(default)]
    pub max_retries: Option<u32>,

    /// Seconds to wait between retries. `None` means the default.
    #[serde(default)]
    pub retry_interval_secs: Option<u64>,

    /// Overall transport timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Maximum redirects followed within one logical request.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: u32,

    /// TLS settings, applied to https endpoints only.
    #[serde(default)]
    pub tls: TlsConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// TLS configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TlsConfig {
    /// Skip server certificate verification.
    #[serde(default)]
    pub insecure: bool,

    /// PEM bundle of additional trusted CA certificates.
    #[serde(default)]
    pub ca_file: Option<PathBuf>,

    /// PEM client certificate.
    #[serde(default)]
    pub cert_file: Option<PathBuf>,

    /// PEM private key matching `cert_file`.
    #[serde(default)]
    pub key_file: Option<PathBuf>,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for log files. If empty, logs go to the console only.
    #[serde(default)]
    pub directory: String,

    /// Enable JSON structured logging output.
    #[serde(default)]
    pub json_output: bool,
}

// Default value functions for serde

fn default_timeout() -> u64 {
    constants::DEFAULT_TIMEOUT_SECS
}

fn default_max_redirects() -> u32 {
    constants::DEFAULT_MAX_REDIRECTS
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            token: None,
            api_version: None,
            max_retries: None,
            retry_interval_secs: None,
            timeout_secs: default_timeout(),
            max_redirects: default_max_redirects(),
            tls: TlsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directory: String::new(),
            json_output: false,
        }
    }
}

impl ClientConfig {
    /// Configuration for `endpoint` with every other setting at its default.
    pub fn new(endpoint: &str) -> Self {
        Self {
            endpoint: Self::sanitize_endpoint(endpoint),
            ..Self::default()
        }
    }

    /// Set the authentication token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Set retry count and interval. `None` keeps the defaults.
    pub fn with_retries(mut self, max_retries: Option<u32>, interval_secs: Option<u64>) -> Self {
        self.max_retries = max_retries;
        self.retry_interval_secs = interval_secs;
        self
    }

    /// Pin the API version instead of negotiating one.
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = Some(version.into());
        self
    }

    /// Parse configuration from a TOML document.
    pub fn from_toml_str(contents: &str) -> ArsResult<Self> {
        let mut config: ClientConfig = toml::from_str(contents)?;
        config.endpoint = Self::sanitize_endpoint(&config.endpoint);
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from_file(path: &Path) -> ArsResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Save configuration to a specific file path.
    pub fn save_to_file(&self, path: &Path) -> ArsResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)
            .map_err(|e| ArsError::Config(format!("failed to serialize config: {e}")))?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Effective retry count, falling back to the default.
    pub fn effective_max_retries(&self) -> u32 {
        self.max_retries.unwrap_or(constants::DEFAULT_MAX_RETRIES)
    }

    /// Effective retry interval in seconds, falling back to the default.
    pub fn effective_retry_interval_secs(&self) -> u64 {
        self.retry_interval_secs
            .unwrap_or(constants::DEFAULT_RETRY_INTERVAL_SECS)
    }

    /// Whether both halves of a client certificate are configured.
    pub fn has_client_cert(&self) -> bool {
        self.tls.cert_file.is_some() && self.tls.key_file.is_some()
    }

    /// Trim whitespace, surrounding quotes and trailing slashes from an endpoint.
    pub fn sanitize_endpoint(endpoint: &str) -> String {
        let trimmed = endpoint.trim().trim_matches('"').trim();
        let stripped = trimmed.trim_end_matches('/');
        if stripped.ends_with(':') || stripped.is_empty() {
            // "http://" and friends: keep the original so the scheme check reports it.
            return trimmed.to_string();
        }
        stripped.to_string()
    }
}
