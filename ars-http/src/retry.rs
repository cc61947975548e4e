//! Retry wrapper for transient failures.
//!
//! A logical request is attempted up to `max_retries + 1` times. Only
//! conflicts, service-unavailable responses and refused connections are
//! retried; anything else surfaces on the first attempt.

use std::time::Duration;

use tracing::{debug, error};

use ars_core::config::ClientConfig;
use ars_core::constants::{DEFAULT_MAX_RETRIES, DEFAULT_RETRY_INTERVAL_SECS};
use ars_core::error::ArsResult;

/// How many times and how often a failed request is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Fixed pause between attempts.
    pub retry_interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            retry_interval: Duration::from_secs(DEFAULT_RETRY_INTERVAL_SECS),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, retry_interval: Duration) -> Self {
        Self {
            max_retries,
            retry_interval,
        }
    }

    /// Policy from configuration; unset values fall back to the defaults.
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            max_retries: config.effective_max_retries(),
            retry_interval: Duration::from_secs(config.effective_retry_interval_secs()),
        }
    }

    /// A policy that makes exactly one attempt.
    pub fn no_retries() -> Self {
        Self::new(0, Duration::ZERO)
    }

    /// Total attempts including the first.
    pub fn attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

/// Run `op` under `policy`, retrying retryable failures.
///
/// `method` and `url` only feed the log lines.
pub fn with_retries<T, F>(policy: RetryPolicy, method: &str, url: &str, mut op: F) -> ArsResult<T>
where
    F: FnMut() -> ArsResult<T>,
{
    let attempts = policy.attempts();
    let mut attempt = 1;
    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < attempts => {
                debug!(
                    "Error contacting server at {method} {url}: {e}. \
                     Attempt {attempt} of {attempts}, retrying in {:?}",
                    policy.retry_interval
                );
                if !policy.retry_interval.is_zero() {
                    std::thread::sleep(policy.retry_interval);
                }
                attempt += 1;
            }
            Err(e) => {
                if e.is_retryable() {
                    error!("Giving up on {method} {url} after {attempts} attempts: {e}");
                }
                return Err(e);
            }
        }
    }
}
