//! Transport layer: the capability set the executor needs from an HTTP stack.
//!
//! Two implementations exist, chosen once when the client is built:
//! - [`SessionTransport`]: a plain connection pool with a static token.
//! - [`AuthSessionTransport`]: defers the token (and optionally the endpoint)
//!   to an externally managed [`AuthSession`].
//!
//! Both wrap `reqwest::blocking::Client` with automatic redirects disabled;
//! redirects are the executor's business.

use std::io::Read;
use std::sync::Arc;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::{Certificate, Identity, Method, StatusCode, Url, Version};
use thiserror::Error;
use tracing::debug;

use ars_core::config::{ClientConfig, TlsConfig};
use ars_core::error::{ArsError, ArsResult};

use crate::endpoint::Endpoint;
use crate::negotiate::{self, VersionRange};

/// A fully resolved request handed to a transport.
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
    /// Overrides the transport-wide timeout when set.
    pub timeout: Option<Duration>,
}

/// Raw response as returned by a transport. The body is not read yet.
pub struct TransportResponse {
    pub status: u16,
    pub version: Version,
    pub headers: HeaderMap,
    pub body: Box<dyn Read + Send>,
}

impl TransportResponse {
    /// Canonical reason phrase for the status code.
    pub fn reason(&self) -> &'static str {
        StatusCode::from_u16(self.status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("")
    }

    /// Value of the `Content-Type` header, if present and readable.
    pub fn content_type(&self) -> Option<String> {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }

    /// A single header value as text.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

impl std::fmt::Debug for TransportResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportResponse")
            .field("status", &self.status)
            .field("version", &self.version)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// Transport-level failure, before any HTTP status is known.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The request itself is malformed; retrying cannot help.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// DNS, connect, TLS handshake, timeout or I/O failure.
    #[error("{0}")]
    Connection(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_builder() {
            TransportError::InvalidRequest(e.to_string())
        } else {
            TransportError::Connection(e.to_string())
        }
    }
}

/// Externally managed authentication session.
///
/// Implementations are typically backed by an identity service client that
/// refreshes its token on its own schedule.
pub trait AuthSession: Send + Sync {
    /// Current token to send as `X-Auth-Token`, if any.
    fn token(&self) -> Option<String>;

    /// Endpoint to use instead of the configured one, if the session knows better.
    fn endpoint_override(&self) -> Option<String> {
        None
    }
}

/// Capability set required by the request executor.
pub trait Transport: Send + Sync {
    /// Configured service endpoint.
    fn endpoint(&self) -> &Endpoint;

    /// Resolve a request target (relative or absolute) to a full URL.
    fn resolve(&self, target: &str) -> ArsResult<Url>;

    /// Token to inject when the caller did not supply one.
    fn auth_token(&self) -> Option<String>;

    /// TLS settings in effect, `None` for plain http.
    fn tls(&self) -> Option<&TlsConfig>;

    /// Perform one HTTP round trip.
    fn send(&self, request: PreparedRequest) -> Result<TransportResponse, TransportError>;

    /// Read the server's advertised version range from response headers.
    fn parse_version_headers(&self, headers: &HeaderMap) -> VersionRange {
        negotiate::parse_version_headers(headers)
    }

    /// Bare request without executor processing, used while negotiating.
    fn simple_request(
        &self,
        method: Method,
        target: &str,
    ) -> Result<TransportResponse, TransportError> {
        let url = self
            .resolve(target)
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;
        self.send(PreparedRequest {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
            timeout: None,
        })
    }
}

/// Build the blocking reqwest client shared by both transports.
fn build_http_client(config: &ClientConfig, endpoint: &Endpoint) -> ArsResult<Client> {
    let mut builder = Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .redirect(reqwest::redirect::Policy::none());

    if endpoint.is_https() {
        let tls = &config.tls;
        if tls.insecure {
            builder = builder.danger_accept_invalid_certs(true);
        } else if let Some(ca_file) = &tls.ca_file {
            let pem = std::fs::read(ca_file)?;
            let cert = Certificate::from_pem(&pem)
                .map_err(|e| ArsError::Config(format!("invalid CA bundle {}: {e}", ca_file.display())))?;
            builder = builder.add_root_certificate(cert);
        }
        if let (Some(cert_file), Some(key_file)) = (&tls.cert_file, &tls.key_file) {
            let mut pem = std::fs::read(cert_file)?;
            pem.push(b'\n');
            pem.extend(std::fs::read(key_file)?);
            let identity = Identity::from_pem(&pem).map_err(|e| {
                ArsError::Config(format!("invalid client certificate {}: {e}", cert_file.display()))
            })?;
            builder = builder.identity(identity);
        }
    }

    builder
        .build()
        .map_err(|e| ArsError::Config(format!("failed to build HTTP client: {e}")))
}

/// Run a prepared request on a reqwest client.
fn send_with(client: &Client, request: PreparedRequest) -> Result<TransportResponse, TransportError> {
    let mut builder = client
        .request(request.method, request.url)
        .headers(request.headers);
    if let Some(body) = request.body {
        builder = builder.body(body);
    }
    if let Some(timeout) = request.timeout {
        builder = builder.timeout(timeout);
    }

    let response = builder.send()?;
    Ok(TransportResponse {
        status: response.status().as_u16(),
        version: response.version(),
        headers: response.headers().clone(),
        body: Box::new(response),
    })
}

/// Plain session: one connection pool, static credentials from configuration.
pub struct SessionTransport {
    client: Client,
    endpoint: Endpoint,
    token: Option<String>,
    tls: Option<TlsConfig>,
}

impl SessionTransport {
    /// Build a session for an already validated endpoint.
    pub fn new(config: &ClientConfig, endpoint: Endpoint) -> ArsResult<Self> {
        let client = build_http_client(config, &endpoint)?;
        let tls = endpoint.is_https().then(|| config.tls.clone());
        debug!("session transport ready for {}", endpoint.url());
        Ok(Self {
            client,
            endpoint,
            token: config.token.clone().filter(|t| !t.is_empty()),
            tls,
        })
    }
}

impl Transport for SessionTransport {
    fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    fn resolve(&self, target: &str) -> ArsResult<Url> {
        self.endpoint.join(target)
    }

    fn auth_token(&self) -> Option<String> {
        self.token.clone()
    }

    fn tls(&self) -> Option<&TlsConfig> {
        self.tls.as_ref()
    }

    fn send(&self, request: PreparedRequest) -> Result<TransportResponse, TransportError> {
        send_with(&self.client, request)
    }
}

/// Session whose credentials are owned by an external [`AuthSession`].
pub struct AuthSessionTransport {
    client: Client,
    endpoint: Endpoint,
    session: Arc<dyn AuthSession>,
    tls: Option<TlsConfig>,
}

impl AuthSessionTransport {
    /// Build a session-backed transport for an already validated endpoint.
    pub fn new(
        config: &ClientConfig,
        endpoint: Endpoint,
        session: Arc<dyn AuthSession>,
    ) -> ArsResult<Self> {
        let client = build_http_client(config, &endpoint)?;
        let tls = endpoint.is_https().then(|| config.tls.clone());
        debug!("auth-session transport ready for {}", endpoint.url());
        Ok(Self {
            client,
            endpoint,
            session,
            tls,
        })
    }
}

impl Transport for AuthSessionTransport {
    fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    fn resolve(&self, target: &str) -> ArsResult<Url> {
        match self.session.endpoint_override() {
            Some(override_url) => Endpoint::parse(&override_url)?.join(target),
            None => self.endpoint.join(target),
        }
    }

    fn auth_token(&self) -> Option<String> {
        self.session.token().filter(|t| !t.is_empty())
    }

    fn tls(&self) -> Option<&TlsConfig> {
        self.tls.as_ref()
    }

    fn send(&self, request: PreparedRequest) -> Result<TransportResponse, TransportError> {
        send_with(&self.client, request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    struct FixedSession;

    impl AuthSession for FixedSession {
        fn token(&self) -> Option<String> {
            Some("session-token".into())
        }

        fn endpoint_override(&self) -> Option<String> {
            Some("http://override.example.com:7000/".into())
        }
    }

    #[test]
    fn test_session_transport_uses_config_token() {
        let config = ClientConfig::new("http://localhost:6543").with_token("t0k");
        let endpoint = Endpoint::parse(&config.endpoint).unwrap();
        let transport = SessionTransport::new(&config, endpoint).unwrap();
        assert_eq!(transport.auth_token().as_deref(), Some("t0k"));
        assert!(transport.tls().is_none());
        assert_eq!(
            transport.resolve("/api/nodes").unwrap().as_str(),
            "http://localhost:6543/api/nodes"
        );
    }

    #[test]
    fn test_empty_token_is_ignored() {
        let config = ClientConfig::new("http://localhost:6543").with_token("");
        let endpoint = Endpoint::parse(&config.endpoint).unwrap();
        let transport = SessionTransport::new(&config, endpoint).unwrap();
        assert!(transport.auth_token().is_none());
    }

    #[test]
    fn test_https_exposes_tls_settings() {
        let mut config = ClientConfig::new("https://arsenal.example.com");
        config.tls.insecure = true;
        let endpoint = Endpoint::parse(&config.endpoint).unwrap();
        let transport = SessionTransport::new(&config, endpoint).unwrap();
        assert!(transport.tls().unwrap().insecure);
    }

    #[test]
    fn test_missing_ca_file_is_io_error() {
        let mut config = ClientConfig::new("https://arsenal.example.com");
        config.tls.ca_file = Some("/nonexistent/ca.pem".into());
        let endpoint = Endpoint::parse(&config.endpoint).unwrap();
        assert!(matches!(
            SessionTransport::new(&config, endpoint),
            Err(ArsError::Io(_))
        ));
    }

    #[test]
    fn test_auth_session_transport_defers_to_session() {
        let config = ClientConfig::new("http://localhost:6543");
        let endpoint = Endpoint::parse(&config.endpoint).unwrap();
        let transport =
            AuthSessionTransport::new(&config, endpoint, Arc::new(FixedSession)).unwrap();
        assert_eq!(transport.auth_token().as_deref(), Some("session-token"));
        assert_eq!(
            transport.resolve("/api/nodes").unwrap().as_str(),
            "http://override.example.com:7000/api/nodes"
        );
        assert_eq!(transport.endpoint().host(), "localhost");
    }

    #[test]
    fn test_transport_response_accessors() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, "application/json".parse().unwrap());
        let response = TransportResponse {
            status: 404,
            version: Version::HTTP_11,
            headers,
            body: Box::new(Cursor::new(Vec::new())),
        };
        assert_eq!(response.reason(), "Not Found");
        assert_eq!(response.content_type().as_deref(), Some("application/json"));
        assert!(response.header("location").is_none());
    }
}
