//! Arsenal Core - Foundation types, error handling, configuration, and logging.
//!
//! This crate provides the shared foundation used by the request engine:
//! - Client configuration (endpoint, credentials, TLS, retries)
//! - Global error type covering every failure kind
//! - Structured logging with tracing
//! - Wire constants and defaults

pub mod config;
pub mod constants;
pub mod error;
pub mod logging;

// Re-export commonly used items at the crate root
pub use config::{ClientConfig, LoggingConfig, TlsConfig};
pub use error::{ArsError, ArsResult, HttpFailure};
pub use logging::{init_console_logging, init_logging};
