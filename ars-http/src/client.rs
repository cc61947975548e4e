//! Request executor for the Arsenal service API.
//!
//! Handles default headers, redirects, API version negotiation, error
//! classification, fixed-interval retry and debug diagnostics for every
//! logical request. Resource-specific clients build on [`HttpClient::json_request`]
//! and [`HttpClient::raw_request`].

use std::sync::{Arc, RwLock};
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE, LOCATION, USER_AGENT};
use reqwest::{Method, Url};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, warn};

use ars_core::config::ClientConfig;
use ars_core::constants::headers::{API_VERSION, AUTH_TOKEN};
use ars_core::constants::{self, content_type};
use ars_core::error::{ArsError, ArsResult};

use crate::classify::classify;
use crate::diagnostics::{log_curl_request, log_http_response};
use crate::endpoint::Endpoint;
use crate::envelope::ErrorEnvelope;
use crate::negotiate::{self, ApiVersion, VersionState};
use crate::response::{read_text, JsonBody, ResponseBody, ResponseEnvelope};
use crate::retry::{with_retries, RetryPolicy};
use crate::transport::{
    AuthSession, AuthSessionTransport, PreparedRequest, SessionTransport, Transport,
    TransportError, TransportResponse,
};

/// Request payload.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Bytes(Vec<u8>),
    Text(String),
    Json(Value),
}

impl RequestBody {
    /// Wire representation of the body.
    pub fn to_bytes(&self) -> ArsResult<Vec<u8>> {
        match self {
            RequestBody::Bytes(bytes) => Ok(bytes.clone()),
            RequestBody::Text(text) => Ok(text.as_bytes().to_vec()),
            RequestBody::Json(value) => Ok(serde_json::to_vec(value)?),
        }
    }
}

/// Per-request headers, body and timeout.
///
/// The executor never mutates these; defaults are applied to a copy.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub headers: HeaderMap,
    pub body: Option<RequestBody>,
    pub timeout: Option<Duration>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a header, rejecting invalid names or values.
    pub fn header(mut self, name: &str, value: &str) -> ArsResult<Self> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ArsError::Validation(format!("invalid header name {name:?}: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| ArsError::Validation(format!("invalid value for header {name}: {e}")))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn bytes(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(RequestBody::Bytes(body.into()));
        self
    }

    pub fn text(mut self, body: impl Into<String>) -> Self {
        self.body = Some(RequestBody::Text(body.into()));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(RequestBody::Json(body));
        self
    }

    /// Serialize any serde value as the JSON body.
    pub fn json_body<T: Serialize>(self, body: &T) -> ArsResult<Self> {
        Ok(self.json(serde_json::to_value(body)?))
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Synchronous client for the Arsenal service API.
///
/// Safe to share between threads; retry policy and negotiated version are
/// the only mutable state.
pub struct HttpClient {
    transport: Box<dyn Transport>,
    retry_policy: RwLock<RetryPolicy>,
    version: RwLock<VersionState>,
    max_redirects: u32,
}

impl HttpClient {
    /// Create a client with a plain session from configuration.
    pub fn new(config: &ClientConfig) -> ArsResult<Self> {
        let endpoint = Endpoint::parse(&config.endpoint)?;
        let transport = SessionTransport::new(config, endpoint)?;
        Self::with_transport(config, Box::new(transport))
    }

    /// Create a client whose credentials come from an external auth session.
    pub fn with_session(config: &ClientConfig, session: Arc<dyn AuthSession>) -> ArsResult<Self> {
        let endpoint = Endpoint::parse(&config.endpoint)?;
        let transport = AuthSessionTransport::new(config, endpoint, session)?;
        Self::with_transport(config, Box::new(transport))
    }

    /// Create a client on top of any transport.
    pub fn with_transport(config: &ClientConfig, transport: Box<dyn Transport>) -> ArsResult<Self> {
        let version = match config.api_version.as_deref() {
            Some(pinned) => VersionState::pinned(
                pinned
                    .parse()
                    .map_err(|e| ArsError::Config(format!("api_version: {e}")))?,
            ),
            None => VersionState::default_version(constants::DEFAULT_API_VERSION.parse()?),
        };
        debug!(
            "http client for {} (retries {:?}, interval {:?}s, max redirects {})",
            transport.endpoint().url(),
            config.max_retries,
            config.retry_interval_secs,
            config.max_redirects
        );

        Ok(Self {
            transport,
            retry_policy: RwLock::new(RetryPolicy::from_config(config)),
            version: RwLock::new(version),
            max_redirects: config.max_redirects,
        })
    }

    pub fn endpoint(&self) -> &Endpoint {
        self.transport.endpoint()
    }

    /// Retry policy applied to the next logical request.
    pub fn retry_policy(&self) -> RetryPolicy {
        match self.retry_policy.read() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Replace the retry policy. In-flight requests keep the policy they started with.
    pub fn set_retry_policy(&self, policy: RetryPolicy) {
        match self.retry_policy.write() {
            Ok(mut guard) => *guard = policy,
            Err(poisoned) => *poisoned.into_inner() = policy,
        }
        debug!(
            "retry policy set to {} retries every {:?}",
            policy.max_retries, policy.retry_interval
        );
    }

    /// API version currently sent on requests, if any.
    pub fn api_version(&self) -> Option<ApiVersion> {
        let state = self.version_state();
        state.header_value().map(|_| state.version)
    }

    fn version_state(&self) -> VersionState {
        match self.version.read() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    fn store_version(&self, state: VersionState) {
        match self.version.write() {
            Ok(mut guard) => *guard = state,
            Err(poisoned) => *poisoned.into_inner() = state,
        }
    }

    // --- Executor ---

    /// Execute one logical request with retries.
    ///
    /// `url` is relative to the endpoint or absolute. On success the body is
    /// buffered text, except `application/octet-stream` payloads which are
    /// returned unread.
    pub fn execute(
        &self,
        url: &str,
        method: Method,
        options: &RequestOptions,
    ) -> ArsResult<(ResponseEnvelope, ResponseBody)> {
        let policy = self.retry_policy();
        let body = options.body.as_ref().map(RequestBody::to_bytes).transpose()?;
        with_retries(policy, method.as_str(), url, || {
            self.attempt(url, &method, options, body.as_deref())
        })
    }

    /// One attempt: the redirect and renegotiation loop around the transport.
    fn attempt(
        &self,
        url: &str,
        method: &Method,
        options: &RequestOptions,
        body: Option<&[u8]>,
    ) -> ArsResult<(ResponseEnvelope, ResponseBody)> {
        let mut headers = options.headers.clone();
        self.apply_default_headers(&mut headers)?;

        let mut target = self.transport.resolve(url)?;
        let mut redirects = 0u32;
        let mut renegotiated = false;

        loop {
            log_curl_request(method, &target, &headers, self.transport.tls(), body);
            let response = self
                .transport
                .send(PreparedRequest {
                    method: method.clone(),
                    url: target.clone(),
                    headers: headers.clone(),
                    body: body.map(<[u8]>::to_vec),
                    timeout: options.timeout,
                })
                .map_err(|e| transport_failure(e, method, &target))?;

            let envelope = ResponseEnvelope::from_transport(&response);
            let status = envelope.status;

            if envelope.is_success() && envelope.is_octet_stream() {
                log_http_response(envelope.version, status, &envelope.reason, &envelope.headers, None);
                return Ok((envelope, ResponseBody::Stream(response.body)));
            }

            let text = read_body(response, &target)?;
            log_http_response(
                envelope.version,
                status,
                &envelope.reason,
                &envelope.headers,
                Some(&text),
            );

            match status {
                406 if !renegotiated => {
                    let state = self.version_state();
                    let version =
                        negotiate::negotiate(self.transport.as_ref(), &envelope.headers, &state)?;
                    self.store_version(state.negotiated(version));
                    headers.insert(API_VERSION, version_header(version)?);
                    warn!("server rejected {method} {target}, retrying with API version {version}");
                    renegotiated = true;
                }
                s if s >= 400 => {
                    return Err(classify(
                        status,
                        &ErrorEnvelope::parse(&text),
                        Some(&text),
                        method.as_str(),
                        target.as_str(),
                    ));
                }
                301 | 302 | 305 => {
                    let Some(location) = envelope.header(LOCATION.as_str()) else {
                        warn!("redirect {status} from {target} without a Location header");
                        return Err(classify(
                            status,
                            &ErrorEnvelope::default(),
                            Some(&text),
                            method.as_str(),
                            target.as_str(),
                        ));
                    };
                    redirects += 1;
                    if redirects > self.max_redirects {
                        return Err(ArsError::TooManyRedirects {
                            limit: self.max_redirects,
                            url: location.to_string(),
                        });
                    }
                    let next = self.transport.resolve(location)?;
                    debug!("redirect {status} ({redirects}/{}): {target} -> {next}", self.max_redirects);
                    target = next;
                }
                300 => {
                    return Err(classify(
                        status,
                        &ErrorEnvelope::parse(&text),
                        Some(&text),
                        method.as_str(),
                        target.as_str(),
                    ));
                }
                _ => return Ok((envelope, ResponseBody::Buffered(text))),
            }
        }
    }

    /// Fill in `User-Agent`, auth token and API version unless the caller set them.
    fn apply_default_headers(&self, headers: &mut HeaderMap) -> ArsResult<()> {
        if !headers.contains_key(USER_AGENT) {
            headers.insert(USER_AGENT, HeaderValue::from_static(constants::USER_AGENT));
        }
        if !headers.contains_key(AUTH_TOKEN) {
            if let Some(token) = self.transport.auth_token() {
                let value = HeaderValue::from_str(&token)
                    .map_err(|e| ArsError::Validation(format!("invalid auth token: {e}")))?;
                headers.insert(AUTH_TOKEN, value);
            }
        }
        if !headers.contains_key(API_VERSION) {
            let state = self.version_state();
            if state.header_value().is_some() {
                headers.insert(API_VERSION, version_header(state.version)?);
            }
        }
        Ok(())
    }

    // --- Facades ---

    /// JSON request: sets JSON content headers and decodes the response.
    pub fn json_request(
        &self,
        method: Method,
        url: &str,
        options: RequestOptions,
    ) -> ArsResult<(ResponseEnvelope, JsonBody)> {
        let mut options = options;
        options
            .headers
            .entry(CONTENT_TYPE)
            .or_insert(HeaderValue::from_static(content_type::JSON));
        options
            .headers
            .entry(ACCEPT)
            .or_insert(HeaderValue::from_static(content_type::JSON));
        if let Some(RequestBody::Json(value)) = &options.body {
            options.body = Some(RequestBody::Text(serde_json::to_string(value)?));
        }

        let (envelope, body) = self.execute(url, method, &options)?;

        if matches!(envelope.status, 204 | 205) || envelope.content_type.is_none() {
            return Ok((envelope, JsonBody::Empty));
        }
        if !envelope.is_json() {
            return Ok((envelope, JsonBody::NotJson));
        }
        let text = body.into_text()?;
        let decoded = match serde_json::from_str(&text) {
            Ok(value) => JsonBody::Json(value),
            Err(e) => {
                error!("Could not decode response body as JSON: {e}");
                JsonBody::Undecodable(text)
            }
        };
        Ok((envelope, decoded))
    }

    /// Binary request: the response body is returned unread.
    pub fn raw_request(
        &self,
        method: Method,
        url: &str,
        options: RequestOptions,
    ) -> ArsResult<(ResponseEnvelope, ResponseBody)> {
        let mut options = options;
        options
            .headers
            .entry(CONTENT_TYPE)
            .or_insert(HeaderValue::from_static(content_type::OCTET_STREAM));
        self.execute(url, method, &options)
    }
}

fn version_header(version: ApiVersion) -> ArsResult<HeaderValue> {
    HeaderValue::from_str(&version.to_string())
        .map_err(|e| ArsError::Validation(format!("invalid API version header: {e}")))
}

/// Map a transport failure to its retry class.
fn transport_failure(e: TransportError, method: &Method, target: &Url) -> ArsError {
    match e {
        TransportError::InvalidRequest(msg) => {
            ArsError::Validation(format!("{method} {target}: {msg}"))
        }
        TransportError::Connection(msg) => {
            ArsError::ConnectionRefused(format!("error contacting {target}: {msg}"))
        }
    }
}

/// Buffer a response body; a failure mid-body counts as a connection failure.
fn read_body(response: TransportResponse, target: &Url) -> ArsResult<String> {
    read_text(response.body).map_err(|e| {
        ArsError::ConnectionRefused(format!("error reading response from {target}: {e}"))
    })
}
