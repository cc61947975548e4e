//! Error envelope extraction.
//!
//! Failing responses carry a JSON body of the form
//! `{"error_message": "<json-encoded string>"}` where the inner string decodes
//! to `{"faultstring": "...", "debuginfo": "..." | null}`. Both decoding steps
//! are best effort: any mismatch produces an empty envelope.

use serde_json::Value;
use tracing::debug;

/// Structured fault description extracted from an error response body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorEnvelope {
    /// Human-readable fault message.
    pub faultstring: Option<String>,
    /// Server-side trace or other debug payload.
    pub debuginfo: Option<String>,
}

impl ErrorEnvelope {
    /// Extract the envelope from a raw response body. Never fails.
    pub fn parse(body: &str) -> Self {
        let Some(inner) = Self::outer_message(body) else {
            return Self::default();
        };
        Self::inner_fault(inner)
    }

    /// Whether neither field was found.
    pub fn is_empty(&self) -> bool {
        self.faultstring.is_none() && self.debuginfo.is_none()
    }

    /// First step: the `error_message` member of the outer document.
    fn outer_message(body: &str) -> Option<Value> {
        let mut outer: Value = match serde_json::from_str(body) {
            Ok(v) => v,
            Err(e) => {
                debug!("error body is not JSON: {e}");
                return None;
            }
        };
        outer.get_mut("error_message").map(Value::take)
    }

    /// Second step: decode the fault from the inner message.
    ///
    /// The message is normally a JSON-encoded string; an already-decoded
    /// object is accepted as well.
    fn inner_fault(inner: Value) -> Self {
        let decoded = match inner {
            Value::String(raw) => match serde_json::from_str::<Value>(&raw) {
                Ok(v) => v,
                Err(e) => {
                    debug!("error_message is not JSON: {e}");
                    return Self::default();
                }
            },
            other => other,
        };
        if !decoded.is_object() {
            return Self::default();
        }
        // Non-string members are ignored rather than failing the whole envelope.
        Self {
            faultstring: decoded.get("faultstring").and_then(Value::as_str).map(str::to_string),
            debuginfo: decoded.get("debuginfo").and_then(Value::as_str).map(str::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested_envelope() {
        let body = r#"{"error_message": "{\"faultstring\": \"boom\", \"debuginfo\": \"trace\"}"}"#;
        let envelope = ErrorEnvelope::parse(body);
        assert_eq!(envelope.faultstring.as_deref(), Some("boom"));
        assert_eq!(envelope.debuginfo.as_deref(), Some("trace"));
    }

    #[test]
    fn test_parse_null_debuginfo() {
        let body = r#"{"error_message": "{\"faultstring\": \"boom\", \"debuginfo\": null}"}"#;
        let envelope = ErrorEnvelope::parse(body);
        assert_eq!(envelope.faultstring.as_deref(), Some("boom"));
        assert!(envelope.debuginfo.is_none());
    }

    #[test]
    fn test_parse_object_message() {
        let body = r#"{"error_message": {"faultstring": "direct"}}"#;
        assert_eq!(
            ErrorEnvelope::parse(body).faultstring.as_deref(),
            Some("direct")
        );
    }

    #[test]
    fn test_parse_malformed_bodies_are_empty() {
        for body in [
            "",
            "<html>Service Unavailable</html>",
            r#"{"message": "no envelope"}"#,
            r#"{"error_message": "not json"}"#,
            r#"{"error_message": "[1, 2]"}"#,
            r#"{"error_message": 42}"#,
            r#"[{"error_message": "{}"}]"#,
        ] {
            assert!(ErrorEnvelope::parse(body).is_empty(), "body {body:?}");
        }
    }

    #[test]
    fn test_parse_ignores_non_string_members() {
        let body = r#"{"error_message": "{\"faultstring\": 7, \"debuginfo\": \"d\"}"}"#;
        let envelope = ErrorEnvelope::parse(body);
        assert!(envelope.faultstring.is_none());
        assert_eq!(envelope.debuginfo.as_deref(), Some("d"));
    }
}
