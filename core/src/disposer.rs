//! Reads or saves the response, checks expectations and builds the
//! `ResultRecord`.
//!
//! # Design
//! The response is consumed here and dropped before the record is
//! returned, so the connection is released on every path. A failed
//! expectation does not abort disposal: it is recorded in the record's
//! `Outcome` so the record can still be reported before the invocation
//! fails.

use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::time::Duration;

use log::debug;
use ureq::http::{HeaderMap, Response};
use ureq::Body;

use crate::error::{RequestError, Result};
use crate::executor::Completion;
use crate::http::canonical_header_name;
use crate::logging::PluginLog;
use crate::types::{Outcome, ResultRecord};
use crate::validate::ValidatedRequest;

/// Standard success range, 200 through 299 inclusive.
pub fn is_success(status: u16) -> bool {
    (200..=299).contains(&status)
}

/// Join headers as one `Key: v1,v2` line per distinct name.
pub fn join_headers(headers: &HeaderMap) -> String {
    headers
        .keys()
        .map(|name| {
            let values: Vec<_> = headers
                .get_all(name)
                .iter()
                .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
                .collect();
            format!("{}: {}", canonical_header_name(name.as_str()), values.join(","))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub struct ResponseDisposer<'a> {
    request: &'a ValidatedRequest,
    timeout: Duration,
    log: PluginLog,
}

impl<'a> ResponseDisposer<'a> {
    pub fn new(request: &'a ValidatedRequest, timeout: Duration, log: PluginLog) -> Self {
        Self {
            request,
            timeout,
            log,
        }
    }

    pub fn dispose(&self, completion: Completion) -> Result<ResultRecord> {
        let (mut response, rejection) = match completion {
            Completion::Accepted(response) => (response, None),
            Completion::Rejected { response, reason } => (response, Some(reason)),
        };
        let params = &self.request.params;
        let status = response.status().as_u16();
        let headers = join_headers(response.headers());

        let (content, file) = if params.output_file.is_empty() {
            (self.read_body(&mut response)?, String::new())
        } else {
            self.save_body(&mut response, &params.output_file)?;
            (String::new(), params.output_file.clone())
        };
        drop(response);

        if !is_success(status) {
            self.log.info(format!("status {status} is outside 200-299"));
        }
        if params.log_response && self.log.enabled() {
            let shown = if file.is_empty() {
                content.clone()
            } else {
                format!("saved to {file}")
            };
            self.log.info(format!("response content: {shown}"));
        }

        let outcome = match rejection {
            Some(reason) => Outcome::Failed(reason),
            None => self.check_expectations(status, &content, &file)?,
        };
        Ok(ResultRecord {
            status,
            content,
            headers,
            file,
            outcome,
        })
    }

    fn check_expectations(&self, status: u16, content: &str, file: &str) -> Result<Outcome> {
        let expected = &self.request.expected_status;
        if !expected.is_empty() && !expected.iter().any(|range| range.contains(&status)) {
            return Ok(Outcome::Failed(format!(
                "status {status} is not in valid_response_codes '{}'",
                self.request.params.valid_response_codes
            )));
        }

        let needle = &self.request.params.valid_response_body;
        if !needle.is_empty() {
            let saved;
            let haystack = if file.is_empty() {
                content
            } else {
                let bytes = fs::read(file).map_err(|e| {
                    RequestError::OutputError(format!("reading back {file}: {e}"))
                })?;
                saved = String::from_utf8_lossy(&bytes).into_owned();
                saved.as_str()
            };
            if !haystack.contains(needle.as_str()) {
                return Ok(Outcome::Failed(format!(
                    "response body does not contain '{needle}'"
                )));
            }
        }
        Ok(Outcome::Passed)
    }

    fn read_error(&self, e: io::Error) -> RequestError {
        if e.kind() == io::ErrorKind::TimedOut {
            RequestError::Timeout(self.timeout)
        } else {
            RequestError::NetworkError(format!("error reading response: {e}"))
        }
    }

    fn read_body(&self, response: &mut Response<Body>) -> Result<String> {
        let mut bytes = Vec::new();
        response
            .body_mut()
            .as_reader()
            .read_to_end(&mut bytes)
            .map_err(|e| self.read_error(e))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn save_body(&self, response: &mut Response<Body>, path: &str) -> Result<()> {
        let output_error = |e: io::Error| RequestError::OutputError(format!("{path}: {e}"));
        let mut writer = BufWriter::new(File::create(path).map_err(output_error)?);
        let mut reader = response.body_mut().as_reader();

        let mut buf = [0u8; 8 * 1024];
        let mut written = 0u64;
        loop {
            let n = reader.read(&mut buf).map_err(|e| self.read_error(e))?;
            if n == 0 {
                break;
            }
            writer.write_all(&buf[..n]).map_err(output_error)?;
            written += n as u64;
        }

        // Both steps run; the first failure is the one reported.
        let flushed = writer.flush();
        let synced = writer.get_ref().sync_all();
        flushed.and(synced).map_err(output_error)?;
        debug!("wrote {written} bytes to {path}");
        Ok(())
    }
}
