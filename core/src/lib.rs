//! Request pipeline for the CI HTTP request plugin.
//!
//! # Overview
//! Turns a flat parameter record into one fully specified, correctly
//! secured HTTP request, sends it under a deadline, and disposes of the
//! response as a `ResultRecord` the pipeline can consume.
//!
//! # Design
//! - `validate` rejects malformed input before any I/O.
//! - `body` picks the payload source: multipart file, raw file or literal.
//! - `connection` resolves TLS verification, client certificate and proxy
//!   from one eight-row table.
//! - `executor` assembles and sends the request; `disposer` reads or saves
//!   the response and checks expectations.
//! - `report` delivers the record to the env file and the stdout card.
//! - Every failure is terminal; nothing is retried.

pub mod body;
pub mod client;
pub mod connection;
pub mod disposer;
pub mod error;
pub mod executor;
pub mod http;
pub mod logging;
pub mod params;
pub mod report;
pub mod types;
pub mod validate;

pub use client::HttpRequestClient;
pub use connection::{resolve, ConnectionConfig, ConnectionFlags, TlsMode};
pub use error::{RequestError, Result};
pub use http::HttpMethod;
pub use logging::PluginLog;
pub use params::ParameterRecord;
pub use report::{CardSink, Channel, EnvFileSink, Reporter, ResultSink};
pub use types::{Outcome, ResultRecord};
