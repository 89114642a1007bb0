//! Error types for one plugin invocation.
//!
//! # Design
//! One variant per failure class. Every variant is terminal: nothing in the
//! crate retries, so there is no retryability flag. Each variant carries the
//! underlying cause as text so the binary can print it verbatim.

use std::time::Duration;

use thiserror::Error;

/// Errors returned by the request pipeline.
#[derive(Debug, Error)]
pub enum RequestError {
    /// Bad url, method, headers, auth or other parameter, caught before I/O.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The client certificate file could not be read or parsed.
    #[error("certificate error: {0}")]
    CertificateError(String),

    /// The transport could not be configured (for example a malformed proxy URL).
    #[error("configuration error: {0}")]
    ConfigurationError(String),

    /// The upload file is missing or unreadable.
    #[error("body error: {0}")]
    BodyError(String),

    /// Connection, TLS or protocol failure while talking to the server.
    #[error("network error: {0}")]
    NetworkError(String),

    /// The deadline expired before the exchange completed.
    #[error("request timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// The response did not meet a configured expectation.
    #[error("validation failed: {0}")]
    ValidationError(String),

    /// The output file or the env-file sink could not be written.
    #[error("output error: {0}")]
    OutputError(String),
}

pub type Result<T> = std::result::Result<T, RequestError>;
