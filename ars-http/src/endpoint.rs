//! Service endpoint validation and URL resolution.

use reqwest::Url;

use ars_core::constants::SUPPORTED_SCHEMES;
use ars_core::error::{ArsError, ArsResult};

/// Validated base URL of the service.
///
/// Constructed once per client; relative request targets are joined onto it
/// with RFC 3986 semantics, so an absolute target (as found in a redirect's
/// `Location`) replaces it entirely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    url: Url,
}

impl Endpoint {
    /// Parse and validate an endpoint URL.
    ///
    /// Fails with [`ArsError::Endpoint`] for unparsable URLs and schemes
    /// other than http/https.
    pub fn parse(endpoint: &str) -> ArsResult<Self> {
        let url = Url::parse(endpoint.trim())
            .map_err(|e| ArsError::Endpoint(format!("invalid endpoint {endpoint:?}: {e}")))?;

        if !SUPPORTED_SCHEMES.contains(&url.scheme()) {
            return Err(ArsError::Endpoint(format!(
                "unsupported scheme: {}",
                url.scheme()
            )));
        }
        if url.host_str().is_none() {
            return Err(ArsError::Endpoint(format!("endpoint has no host: {endpoint}")));
        }

        Ok(Self { url })
    }

    /// The endpoint as a URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// URL scheme, either "http" or "https".
    pub fn scheme(&self) -> &str {
        self.url.scheme()
    }

    /// Whether TLS settings apply to this endpoint.
    pub fn is_https(&self) -> bool {
        self.url.scheme() == "https"
    }

    /// Host name or address.
    pub fn host(&self) -> &str {
        self.url.host_str().unwrap_or_default()
    }

    /// Port, falling back to the scheme default.
    pub fn port(&self) -> u16 {
        self.url.port_or_known_default().unwrap_or(80)
    }

    /// Path component of the endpoint.
    pub fn base_path(&self) -> &str {
        self.url.path()
    }

    /// Host and port we're connecting to, for diagnostics.
    pub fn server(&self) -> (String, String) {
        (self.host().to_string(), self.port().to_string())
    }

    /// Resolve a request target against the endpoint.
    ///
    /// Malformed targets are a [`ArsError::Validation`] failure.
    pub fn join(&self, target: &str) -> ArsResult<Url> {
        self.url
            .join(target)
            .map_err(|e| ArsError::Validation(format!("invalid request url {target:?}: {e}")))
    }
}
