//! Mapping of failed responses to typed errors.

use reqwest::StatusCode;

use ars_core::error::{ArsError, HttpFailure};

use crate::envelope::ErrorEnvelope;

/// Build the typed failure for a response the executor will not accept.
///
/// The status code alone picks the error kind; the envelope and raw body only
/// feed the message, so an unparsable body never changes the classification.
pub fn classify(
    status: u16,
    envelope: &ErrorEnvelope,
    raw_body: Option<&str>,
    method: &str,
    url: &str,
) -> ArsError {
    let failure = HttpFailure {
        status,
        message: failure_message(status, envelope, raw_body),
        details: envelope.debuginfo.clone(),
        method: method.to_string(),
        url: url.to_string(),
    };

    match status {
        409 => ArsError::Conflict(failure),
        503 => ArsError::ServiceUnavailable(failure),
        _ => ArsError::Http(failure),
    }
}

/// Fault string, else raw body, else reason phrase, else the bare status.
fn failure_message(status: u16, envelope: &ErrorEnvelope, raw_body: Option<&str>) -> String {
    if let Some(fault) = envelope.faultstring.as_deref().filter(|s| !s.is_empty()) {
        return fault.to_string();
    }
    if let Some(body) = raw_body.map(str::trim).filter(|b| !b.is_empty()) {
        return body.to_string();
    }
    StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {status}"))
}
