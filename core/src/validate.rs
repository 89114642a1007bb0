//! Checks and normalizes a `ParameterRecord` before any network I/O.
//!
//! Checks run in a fixed order and stop at the first failure: url, method,
//! headers, body eligibility, basic auth, client certificate, then the
//! upload file and status expectations.

use std::ops::RangeInclusive;
use std::path::Path;

use log::debug;

use crate::connection::ClientIdentity;
use crate::error::{RequestError, Result};
use crate::http::{parse_headers, parse_status_codes, Credentials, HttpMethod};
use crate::params::ParameterRecord;

/// A parameter record plus the fields derived from it.
#[derive(Debug, Clone)]
pub struct ValidatedRequest {
    pub params: ParameterRecord,
    pub method: HttpMethod,
    pub headers: Vec<(String, String)>,
    /// The literal body, present only for methods that carry one.
    pub body: Option<String>,
    pub credentials: Option<Credentials>,
    pub expected_status: Vec<RangeInclusive<u16>>,
}

pub fn validate(params: &ParameterRecord) -> Result<ValidatedRequest> {
    validate_url(&params.url)?;

    let method = HttpMethod::parse(&params.http_method)
        .ok_or_else(|| RequestError::InvalidInput("unsupported method".to_string()))?;

    let headers = parse_headers(&params.headers)?;

    let body = (method.carries_body() && !params.request_body.is_empty())
        .then(|| params.request_body.clone());
    if body.is_none() && !params.request_body.is_empty() {
        debug!("dropping request_body for {method}");
    }

    let credentials = match params.auth_basic.trim() {
        "" => None,
        raw => Some(Credentials::parse(raw)?),
    };

    let cert_path = params.client_cert_path();
    if !cert_path.is_empty() {
        ClientIdentity::load(Path::new(cert_path))
            .map_err(|_| RequestError::InvalidInput("certificate unreadable".to_string()))?;
    }

    let expected_status = parse_status_codes(&params.valid_response_codes)?;

    Ok(ValidatedRequest {
        params: params.clone(),
        method,
        headers,
        body,
        credentials,
        expected_status,
    })
}

fn validate_url(raw: &str) -> Result<()> {
    if raw.trim().is_empty() {
        return Err(RequestError::InvalidInput("url required".to_string()));
    }
    let url = url::Url::parse(raw.trim())
        .map_err(|e| RequestError::InvalidInput(format!("invalid url '{raw}': {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(RequestError::InvalidInput(format!(
            "invalid url '{raw}': unsupported scheme '{other}'"
        ))),
    }
}
