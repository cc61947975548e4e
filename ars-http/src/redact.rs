//! Credential redaction for diagnostic output.
//!
//! Two independent concerns live here:
//! - [`redact_header`] replaces the value of designated secret headers with a
//!   digest, so two log lines can be compared for "same credential" without
//!   revealing it.
//! - [`mask_password`] scans free text (request and response bodies) for
//!   known sensitive field names and blanks their values.

use lazy_static::lazy_static;
use regex::Regex;
use reqwest::header::HeaderMap;
use sha2::{Digest, Sha256};

use ars_core::constants::headers::SENSITIVE;

/// Prefix marking a digested header value.
pub const DIGEST_PREFIX: &str = "{SHA256}";

/// Replacement for masked body values.
pub const MASK: &str = "***";

/// Field names whose values are masked in bodies.
const SANITIZE_KEYS: &[&str] = &[
    "admin_password",
    "admin_pass",
    "adminpass",
    "auth_password",
    "auth_token",
    "chappassword",
    "configdrive",
    "encrypted_key",
    "fernetkey",
    "new_pass",
    "passphrase",
    "password",
    "private_key",
    "secret_uuid",
    "secret",
    "sslkey",
    "sys_pswd",
    "token",
];

lazy_static! {
    static ref KEY_ALTERNATION: String = SANITIZE_KEYS.join("|");

    // "password": "value", password="va\"lue". The value runs to the quote
    // that opened it; backslash escapes stay inside. A missing closing quote
    // masks to the end of the text.
    static ref DOUBLE_QUOTED_VALUE: Regex = Regex::new(&format!(
        r#"(?i)(["']?(?:{})["']?\s*[:=]\s*)"(?:[^"\\]|\\.)*"?"#,
        *KEY_ALTERNATION
    ))
    .expect("double-quoted value pattern");

    // 'password': 'value', password='it\'s'
    static ref SINGLE_QUOTED_VALUE: Regex = Regex::new(&format!(
        r#"(?i)(["']?(?:{})["']?\s*[:=]\s*)'(?:[^'\\]|\\.)*'?"#,
        *KEY_ALTERNATION
    ))
    .expect("single-quoted value pattern");

    // password=value&other=1
    static ref BARE_VALUE: Regex = Regex::new(&format!(
        r#"(?i)\b((?:{})\s*=\s*)[^\s&,;"'<>]+"#,
        *KEY_ALTERNATION
    ))
    .expect("bare value pattern");

    // <password>value</password>
    static ref XML_VALUE: Regex = Regex::new(&format!(
        r#"(?i)(<(?:{0})>)[^<]*(</(?:{0})>)"#,
        *KEY_ALTERNATION
    ))
    .expect("xml value pattern");
}

/// Whether a header's value must be digested before logging.
pub fn is_sensitive_header(name: &str) -> bool {
    SENSITIVE.iter().any(|s| s.eq_ignore_ascii_case(name))
}

/// Return a safe-to-log `(name, value)` pair for a header.
///
/// Values of sensitive headers are replaced by `{SHA256}` followed by the hex
/// digest of the original value. Everything else passes through unchanged.
pub fn redact_header(name: &str, value: &str) -> (String, String) {
    if is_sensitive_header(name) {
        let digest = Sha256::digest(value.as_bytes());
        (name.to_string(), format!("{DIGEST_PREFIX}{}", hex::encode(digest)))
    } else {
        (name.to_string(), value.to_string())
    }
}

/// Redact every header of a map, preserving iteration order.
pub fn redact_headers(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| redact_header(name.as_str(), &String::from_utf8_lossy(value.as_bytes())))
        .collect()
}

/// Mask the values of sensitive fields found in `text`.
pub fn mask_password(text: &str) -> String {
    let lowered = text.to_ascii_lowercase();
    if !SANITIZE_KEYS.iter().any(|k| lowered.contains(k)) {
        return text.to_string();
    }

    let masked = DOUBLE_QUOTED_VALUE.replace_all(text, format!("${{1}}\"{MASK}\"").as_str());
    let masked = SINGLE_QUOTED_VALUE.replace_all(&masked, format!("${{1}}'{MASK}'").as_str());
    let masked = BARE_VALUE.replace_all(&masked, format!("${{1}}{MASK}").as_str());
    let masked = XML_VALUE.replace_all(&masked, format!("${{1}}{MASK}${{2}}").as_str());
    masked.into_owned()
}
