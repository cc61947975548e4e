//! Debug rendering of requests and responses.
//!
//! Requests are rendered as an equivalent `curl` command line so an operator
//! can replay them by hand; responses as a raw HTTP status line, headers and
//! body. Everything goes through [`crate::redact`] first.

use reqwest::header::HeaderMap;
use reqwest::{Method, Url, Version};
use tracing::debug;

use ars_core::config::TlsConfig;

use crate::redact::{mask_password, redact_headers};

/// Render a request as a `curl` command line.
///
/// `tls` is the TLS configuration actually in effect, i.e. `None` for plain
/// http endpoints.
pub fn curl_command(
    method: &Method,
    url: &Url,
    headers: &HeaderMap,
    tls: Option<&TlsConfig>,
    body: Option<&[u8]>,
) -> String {
    let mut curl = vec![format!("curl -i -X {method}")];

    for (name, value) in redact_headers(headers) {
        curl.push(format!("-H '{name}: {value}'"));
    }

    if let Some(tls) = tls {
        if tls.insecure {
            curl.push("-k".to_string());
        } else if let Some(ca_file) = &tls.ca_file {
            curl.push(format!("--cacert {}", ca_file.display()));
        }
        if let (Some(cert), Some(key)) = (&tls.cert_file, &tls.key_file) {
            curl.push(format!("--cert {}", cert.display()));
            curl.push(format!("--key {}", key.display()));
        }
    }

    if let Some(body) = body {
        let body = mask_password(&String::from_utf8_lossy(body));
        curl.push(format!("-d '{body}'"));
    }

    curl.push(url.to_string());
    curl.join(" ")
}

/// Render a response status line, headers and optional body.
pub fn response_dump(
    version: Version,
    status: u16,
    reason: &str,
    headers: &HeaderMap,
    body: Option<&str>,
) -> String {
    let mut dump = vec![format!("\n{version:?} {status} {reason}")];
    dump.extend(
        redact_headers(headers)
            .into_iter()
            .map(|(name, value)| format!("{name}: {value}")),
    );
    dump.push(String::new());
    if let Some(body) = body.filter(|b| !b.is_empty()) {
        dump.push(mask_password(body));
        dump.push(String::new());
    }
    dump.join("\n")
}

/// Log a request at debug level.
pub fn log_curl_request(
    method: &Method,
    url: &Url,
    headers: &HeaderMap,
    tls: Option<&TlsConfig>,
    body: Option<&[u8]>,
) {
    debug!("{}", curl_command(method, url, headers, tls, body));
}

/// Log a response at debug level. Pass `None` for binary bodies.
pub fn log_http_response(
    version: Version,
    status: u16,
    reason: &str,
    headers: &HeaderMap,
    body: Option<&str>,
) {
    debug!("{}", response_dump(version, status, reason, headers, body));
}
