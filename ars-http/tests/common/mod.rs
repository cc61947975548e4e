//! Shared test utilities for integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::io::Cursor;
use std::net::TcpListener;
use std::sync::mpsc::{Receiver, Sender};
use std::sync::{Arc, Mutex};

use axum::extract::Request;
use axum::http::StatusCode;
use axum::Router;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Url, Version};
use tokio::sync::oneshot;

use ars_core::config::{ClientConfig, TlsConfig};
use ars_core::error::ArsResult;
use ars_http::endpoint::Endpoint;
use ars_http::transport::{PreparedRequest, Transport, TransportError, TransportResponse};
use ars_http::HttpClient;

pub const TEST_ENDPOINT: &str = "http://arsenal.test:6543";

/// One scripted transport outcome.
pub enum Reply {
    Response {
        status: u16,
        headers: HeaderMap,
        body: Vec<u8>,
    },
    Refused,
    Invalid,
}

impl Reply {
    pub fn status(status: u16) -> Self {
        Reply::Response {
            status,
            headers: HeaderMap::new(),
            body: Vec::new(),
        }
    }

    pub fn json(status: u16, body: &str) -> Self {
        Self::status(status)
            .header("Content-Type", "application/json")
            .body(body)
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        if let Reply::Response { headers, .. } = &mut self {
            headers.insert(
                HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        self
    }

    pub fn body(mut self, data: impl Into<Vec<u8>>) -> Self {
        if let Reply::Response { body, .. } = &mut self {
            *body = data.into();
        }
        self
    }
}

/// Requests seen by a [`ScriptedTransport`], in order.
pub type Calls = Arc<Mutex<Vec<PreparedRequest>>>;

/// Transport that replays a fixed script and records every request.
pub struct ScriptedTransport {
    endpoint: Endpoint,
    token: Option<String>,
    script: Mutex<VecDeque<Reply>>,
    calls: Calls,
}

impl ScriptedTransport {
    pub fn new(replies: Vec<Reply>) -> (Self, Calls) {
        let calls = Calls::default();
        let transport = Self {
            endpoint: Endpoint::parse(TEST_ENDPOINT).unwrap(),
            token: Some("t0k3n".into()),
            script: Mutex::new(replies.into()),
            calls: calls.clone(),
        };
        (transport, calls)
    }
}

impl Transport for ScriptedTransport {
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
        None
    }

    fn send(&self, request: PreparedRequest) -> Result<TransportResponse, TransportError> {
        self.calls.lock().unwrap().push(request);
        match self.script.lock().unwrap().pop_front() {
            Some(Reply::Response {
                status,
                headers,
                body,
            }) => Ok(TransportResponse {
                status,
                version: Version::HTTP_11,
                headers,
                body: Box::new(Cursor::new(body)),
            }),
            Some(Reply::Refused) => Err(TransportError::Connection("connection refused".into())),
            Some(Reply::Invalid) => Err(TransportError::InvalidRequest("bad header".into())),
            None => Err(TransportError::Connection("script exhausted".into())),
        }
    }
}

/// Configuration for scripted clients: no retries, no retry pause.
pub fn test_config() -> ClientConfig {
    ClientConfig::new(TEST_ENDPOINT).with_retries(Some(0), Some(0))
}

/// Client over a scripted transport with retries disabled.
pub fn scripted_client(replies: Vec<Reply>) -> (HttpClient, Calls) {
    scripted_client_with(test_config(), replies)
}

/// Client over a scripted transport. The retry policy comes from `config`.
pub fn scripted_client_with(config: ClientConfig, replies: Vec<Reply>) -> (HttpClient, Calls) {
    let (transport, calls) = ScriptedTransport::new(replies);
    let client = HttpClient::with_transport(&config, Box::new(transport)).unwrap();
    (client, calls)
}

/// Scripted transport whose first send blocks until released.
///
/// `started` fires when the first request reaches the transport; the request
/// proceeds once a value is sent on the paired release channel.
pub struct GatedTransport {
    inner: ScriptedTransport,
    started: Mutex<Option<Sender<()>>>,
    release: Mutex<Option<Receiver<()>>>,
}

impl GatedTransport {
    pub fn new(
        replies: Vec<Reply>,
        started: Sender<()>,
        release: Receiver<()>,
    ) -> (Self, Calls) {
        let (inner, calls) = ScriptedTransport::new(replies);
        let transport = Self {
            inner,
            started: Mutex::new(Some(started)),
            release: Mutex::new(Some(release)),
        };
        (transport, calls)
    }
}

impl Transport for GatedTransport {
    fn endpoint(&self) -> &Endpoint {
        self.inner.endpoint()
    }

    fn resolve(&self, target: &str) -> ArsResult<Url> {
        self.inner.resolve(target)
    }

    fn auth_token(&self) -> Option<String> {
        self.inner.auth_token()
    }

    fn tls(&self) -> Option<&TlsConfig> {
        self.inner.tls()
    }

    fn send(&self, request: PreparedRequest) -> Result<TransportResponse, TransportError> {
        if let Some(started) = self.started.lock().unwrap().take() {
            started.send(()).unwrap();
            let release = self.release.lock().unwrap().take().unwrap();
            release.recv().unwrap();
        }
        self.inner.send(request)
    }
}

// ---- Local HTTP server ----

/// A request as seen by a [`MockServer`] route.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub headers: axum::http::HeaderMap,
    pub body: Vec<u8>,
}

pub type Recorded = Arc<Mutex<Vec<RecordedRequest>>>;

/// Axum server on an ephemeral local port, running on its own thread.
///
/// Shuts down when dropped.
pub struct MockServer {
    pub base: String,
    shutdown: Option<oneshot::Sender<()>>,
}

impl MockServer {
    pub fn start(router: Router) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.set_nonblocking(true).unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let (shutdown, signal) = oneshot::channel::<()>();

        std::thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            runtime.block_on(async move {
                let listener = tokio::net::TcpListener::from_std(listener).unwrap();
                axum::serve(listener, router)
                    .with_graceful_shutdown(async {
                        let _ = signal.await;
                    })
                    .await
                    .unwrap();
            });
        });

        Self {
            base,
            shutdown: Some(shutdown),
        }
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

/// Router answering every request with a fixed response and recording it.
pub fn recording_router(
    status: u16,
    content_type: &'static str,
    body: &'static str,
) -> (Router, Recorded) {
    let recorded = Recorded::default();
    let log = recorded.clone();
    let router = Router::new().fallback(move |request: Request| {
        let log = log.clone();
        async move {
            let (parts, request_body) = request.into_parts();
            let bytes = axum::body::to_bytes(request_body, usize::MAX)
                .await
                .unwrap_or_default();
            log.lock().unwrap().push(RecordedRequest {
                method: parts.method.to_string(),
                path: parts.uri.path().to_string(),
                headers: parts.headers,
                body: bytes.to_vec(),
            });
            (
                StatusCode::from_u16(status).unwrap(),
                [(CONTENT_TYPE, content_type)],
                body,
            )
        }
    });
    (router, recorded)
}

/// A local port with nothing listening on it.
pub fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}
