//! Global error types for the Arsenal client.
//!
//! Every failure the request engine can surface is unified into a single
//! `ArsError` enum with conversions from underlying library errors.
//! HTTP-level failures carry an [`HttpFailure`] describing the response.

use std::fmt;

use thiserror::Error;

/// Convenience type alias for Results using ArsError.
pub type ArsResult<T> = Result<T, ArsError>;

/// Details of a failed HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpFailure {
    /// HTTP status code returned by the server.
    pub status: u16,
    /// Human-readable message (server fault string, raw body or reason phrase).
    pub message: String,
    /// Supplementary server-side debug information, when provided.
    pub details: Option<String>,
    /// Method of the request that failed.
    pub method: String,
    /// Absolute URL of the request that failed, after joining onto the
    /// endpoint and following any redirects.
    pub url: String,
}

impl fmt::Display for HttpFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (HTTP {}) [{} {}]",
            self.message, self.status, self.method, self.url
        )
    }
}

/// Unified error type covering all error categories of the client.
#[derive(Error, Debug)]
pub enum ArsError {
    // -- Construction errors --
    /// The endpoint URL is unparsable or uses an unsupported scheme.
    #[error("endpoint error: {0}")]
    Endpoint(String),

    /// Failed to load or parse client configuration.
    #[error("configuration error: {0}")]
    Config(String),

    // -- Transport errors --
    /// The request could not be built (bad URL, invalid header, ...).
    #[error("validation error: {0}")]
    Validation(String),

    /// The server could not be reached.
    #[error("connection refused: {0}")]
    ConnectionRefused(String),

    // -- Server errors --
    /// The server reported a conflicting state (HTTP 409).
    #[error("conflict: {0}")]
    Conflict(HttpFailure),

    /// The server is temporarily unavailable (HTTP 503).
    #[error("service unavailable: {0}")]
    ServiceUnavailable(HttpFailure),

    /// Any other failed HTTP exchange (4xx, 5xx, 300 Multiple Choices).
    #[error("http error: {0}")]
    Http(HttpFailure),

    /// A redirect chain exceeded the configured bound.
    #[error("too many redirects (limit {limit}) while requesting {url}")]
    TooManyRedirects {
        /// Maximum number of redirects followed.
        limit: u32,
        /// Target of the redirect that was refused.
        url: String,
    },

    /// No API version acceptable to both client and server.
    #[error("unsupported API version: {0}")]
    UnsupportedVersion(String),

    // -- File/IO errors --
    /// File system operation failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Wrapping anyhow errors for interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ArsError {
    /// Whether the retry wrapper should attempt the request again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ArsError::Conflict(_) | ArsError::ServiceUnavailable(_) | ArsError::ConnectionRefused(_)
        )
    }

    /// The HTTP failure carried by this error, if any.
    pub fn http_failure(&self) -> Option<&HttpFailure> {
        match self {
            ArsError::Conflict(f) | ArsError::ServiceUnavailable(f) | ArsError::Http(f) => Some(f),
            _ => None,
        }
    }

    /// HTTP status code carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        self.http_failure().map(|f| f.status)
    }
}

impl From<serde_json::Error> for ArsError {
    fn from(e: serde_json::Error) -> Self {
        ArsError::Serialization(e.to_string())
    }
}

impl From<toml::de::Error> for ArsError {
    fn from(e: toml::de::Error) -> Self {
        ArsError::Config(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(status: u16) -> HttpFailure {
        HttpFailure {
            status,
            message: "boom".into(),
            details: None,
            method: "GET".into(),
            url: "http://localhost:6543/v1/nodes".into(),
        }
    }

    #[test]
    fn test_retryable_kinds() {
        assert!(ArsError::Conflict(failure(409)).is_retryable());
        assert!(ArsError::ServiceUnavailable(failure(503)).is_retryable());
        assert!(ArsError::ConnectionRefused("down".into()).is_retryable());

        assert!(!ArsError::Http(failure(500)).is_retryable());
        assert!(!ArsError::Validation("bad url".into()).is_retryable());
        assert!(!ArsError::Endpoint("ftp".into()).is_retryable());
        assert!(!ArsError::TooManyRedirects { limit: 5, url: "/x".into() }.is_retryable());
    }

    #[test]
    fn test_status_accessor() {
        assert_eq!(ArsError::Http(failure(404)).status(), Some(404));
        assert_eq!(ArsError::Conflict(failure(409)).status(), Some(409));
        assert_eq!(ArsError::ConnectionRefused("x".into()).status(), None);
    }

    #[test]
    fn test_ars_error_display() {
        let err = ArsError::Config("bad value".to_string());
        assert_eq!(err.to_string(), "configuration error: bad value");

        let err = ArsError::Http(failure(404));
        assert_eq!(err.to_string(), "http error: boom (HTTP 404) [GET http://localhost:6543/v1/nodes]");
    }

    #[test]
    fn test_json_error_converts_to_serialization() {
        let err: ArsError = serde_json::from_str::<serde_json::Value>("{nope")
            .unwrap_err()
            .into();
        assert!(matches!(err, ArsError::Serialization(_)));
    }
}
