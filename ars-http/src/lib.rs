//! Arsenal HTTP - synchronous request engine for the Arsenal service API.
//!
//! This crate provides the transport-level plumbing shared by resource
//! clients: fixed-interval retry of transient failures, bounded redirect
//! following, API microversion negotiation, typed error extraction from JSON
//! error envelopes, and curl-style debug logging with credentials redacted.

pub mod classify;
pub mod client;
pub mod diagnostics;
pub mod endpoint;
pub mod envelope;
pub mod negotiate;
pub mod redact;
pub mod response;
pub mod retry;
pub mod transport;

// Re-export key types
pub use client::{HttpClient, RequestBody, RequestOptions};
pub use endpoint::Endpoint;
pub use negotiate::ApiVersion;
pub use response::{JsonBody, ResponseBody, ResponseEnvelope};
pub use retry::RetryPolicy;
pub use transport::{AuthSession, PreparedRequest, Transport, TransportError, TransportResponse};
