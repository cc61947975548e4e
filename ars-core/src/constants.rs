//! Client-wide constants.

/// Identifier sent in the `User-Agent` header.
pub const USER_AGENT: &str = "arsenal-client-rs";

/// Size of the chunks response bodies are read in (64 KiB).
pub const CHUNK_SIZE: usize = 64 * 1024;

/// API version requested when the caller pins none.
pub const DEFAULT_API_VERSION: &str = "1";

/// Default number of retries for transient failures.
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Default pause between retries in seconds.
pub const DEFAULT_RETRY_INTERVAL_SECS: u64 = 2;

/// Default overall transport timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 600;

/// Default bound on redirects followed within one logical request.
pub const DEFAULT_MAX_REDIRECTS: u32 = 5;

/// Endpoint URL schemes the client accepts.
pub const SUPPORTED_SCHEMES: &[&str] = &["http", "https"];

/// Content types negotiated by the request facades.
pub mod content_type {
    pub const JSON: &str = "application/json";
    pub const OCTET_STREAM: &str = "application/octet-stream";
}

/// Header names used on the wire.
pub mod headers {
    /// Authentication token header.
    pub const AUTH_TOKEN: &str = "X-Auth-Token";
    /// Request-side API version override.
    pub const API_VERSION: &str = "X-OpenStack-Arsenal-API-Version";
    /// Response-side minimum supported API version.
    pub const API_MIN_VERSION: &str = "X-OpenStack-Arsenal-API-Minimum-Version";
    /// Response-side maximum supported API version.
    pub const API_MAX_VERSION: &str = "X-OpenStack-Arsenal-API-Maximum-Version";

    /// Headers whose values must never appear in logs.
    pub const SENSITIVE: &[&str] = &[AUTH_TOKEN];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_schemes() {
        assert_eq!(SUPPORTED_SCHEMES.len(), 2);
        assert!(SUPPORTED_SCHEMES.contains(&"https"));
        assert!(!SUPPORTED_SCHEMES.contains(&"ftp"));
    }

    #[test]
    fn test_user_agent_is_fixed_identifier() {
        assert_eq!(USER_AGENT, "arsenal-client-rs");
    }

    #[test]
    fn test_auth_header_is_sensitive() {
        assert!(headers::SENSITIVE.contains(&headers::AUTH_TOKEN));
    }
}
