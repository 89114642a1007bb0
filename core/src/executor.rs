//! Builds the outgoing request, sends it under a deadline and classifies
//! the result.
//!
//! # Design
//! A `RequestContext` is the built-but-unsent request. `execute` consumes
//! it, so a context is sent at most once, and the body reader it owns is
//! dropped when the send returns, on success or failure. The agent's global
//! timeout is the deadline: expiry cancels the in-flight exchange and is
//! reported as `Timeout`, every other transport failure as `NetworkError`.
//! Neither is retried.
//!
//! Sized bodies (literal strings and files) go out with `Content-Length`, so
//! a server answering before it has read the body (415, 401) does not cut
//! off a chunked upload mid-stream.

use std::io;
use std::time::{Duration, Instant};

use log::debug;
use ureq::http::header::{ACCEPT, AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE};
use ureq::http::request::Parts;
use ureq::http::{HeaderName, HeaderValue, Request, Response, StatusCode, Uri};
use ureq::typestate::WithoutBody;
use ureq::{Agent, Body, RequestBuilder, SendBody};

use crate::body::{BodyKind, BodySource};
use crate::connection::ConnectionConfig;
use crate::error::{RequestError, Result};
use crate::logging::PluginLog;
use crate::validate::ValidatedRequest;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
pub const APPLICATION_JSON: &str = "application/json";

/// Configured seconds, or the default when zero.
pub fn effective_timeout(seconds: u64) -> Duration {
    if seconds == 0 {
        DEFAULT_TIMEOUT
    } else {
        Duration::from_secs(seconds)
    }
}

/// One built request waiting to be sent.
#[derive(Debug)]
pub struct RequestContext {
    request: Request<BodySource>,
    started: Instant,
    deadline: Instant,
}

impl RequestContext {
    pub fn request(&self) -> &Request<BodySource> {
        &self.request
    }

    pub fn started(&self) -> Instant {
        self.started
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }
}

/// A response that came back, and whether the exchange is acceptable.
pub enum Completion {
    Accepted(Response<Body>),
    /// A response arrived but the invocation must still fail.
    Rejected {
        response: Response<Body>,
        reason: String,
    },
}

impl Completion {
    pub fn response(&self) -> &Response<Body> {
        match self {
            Completion::Accepted(response) | Completion::Rejected { response, .. } => response,
        }
    }
}

pub struct RequestExecutor {
    agent: Agent,
    timeout: Duration,
    log: PluginLog,
}

impl RequestExecutor {
    pub fn new(connection: &ConnectionConfig, timeout: Duration, log: PluginLog) -> Result<Self> {
        Ok(Self {
            agent: connection.agent(timeout)?,
            timeout,
            log,
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Assemble method, url, body and headers into a `RequestContext`.
    ///
    /// Header precedence, lowest first: the content type (multipart
    /// boundary, else the configured override, else the body's own type,
    /// else JSON), `Accept`, the configured header list, basic auth.
    pub fn prepare(&self, request: &ValidatedRequest, body: BodySource) -> Result<RequestContext> {
        let params = &request.params;
        let invalid = |e: ureq::http::Error| {
            RequestError::InvalidInput(format!("error creating request: {e}"))
        };

        let override_type = params.content_type.trim();
        let content_type = match body.kind() {
            BodyKind::Multipart => body.content_type(),
            _ if !override_type.is_empty() => Some(override_type),
            _ => body.content_type(),
        }
        .unwrap_or(APPLICATION_JSON)
        .to_string();

        let mut builder = Request::builder()
            .method(request.method.as_str())
            .uri(params.url.trim())
            .header(CONTENT_TYPE, content_type);
        if let Some(len) = body.len().filter(|_| !body.is_empty()) {
            builder = builder.header(CONTENT_LENGTH, len.to_string());
        }
        let accept = params.accept_type.trim();
        if !accept.is_empty() {
            builder = builder.header(ACCEPT, accept);
        }
        let mut built = builder.body(body).map_err(invalid)?;

        let headers = built.headers_mut();
        for (name, value) in &request.headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| invalid(e.into()))?;
            let value = HeaderValue::from_str(value).map_err(|e| invalid(e.into()))?;
            headers.insert(name, value);
        }
        if let Some(credentials) = &request.credentials {
            let value = HeaderValue::from_str(&credentials.header_value())
                .map_err(|e| invalid(e.into()))?;
            headers.insert(AUTHORIZATION, value);
        }

        let started = Instant::now();
        Ok(RequestContext {
            request: built,
            started,
            deadline: started + self.timeout,
        })
    }

    /// Send the request. Opens one connection and releases the body reader
    /// before returning.
    pub fn execute(&self, context: RequestContext) -> Result<Completion> {
        let RequestContext {
            request, started, ..
        } = context;
        let (parts, body) = request.into_parts();
        self.log.info(format!("{} {}", parts.method, loggable_uri(&parts.uri)));

        let outcome = match body.into_reader() {
            Some(reader) => match self.forced_body_builder(&parts) {
                Some(builder) => self.send_forced(builder, &parts, reader),
                None => self
                    .agent
                    .run(Request::from_parts(parts, SendBody::from_owned_reader(reader))),
            },
            None => self.agent.run(Request::from_parts(parts, SendBody::none())),
        };
        debug!("exchange finished after {:?}", started.elapsed());

        let response = outcome.map_err(|e| classify_failure(e, self.timeout))?;
        self.log.info(format!("response status: {}", response.status()));
        Ok(classify_response(response))
    }

    /// ureq refuses a body on these methods unless it is forced through
    /// the request builder.
    fn forced_body_builder(&self, parts: &Parts) -> Option<RequestBuilder<WithoutBody>> {
        let uri = parts.uri.to_string();
        match parts.method.as_str() {
            "GET" => Some(self.agent.get(&uri)),
            "DELETE" => Some(self.agent.delete(&uri)),
            "HEAD" => Some(self.agent.head(&uri)),
            "OPTIONS" => Some(self.agent.options(&uri)),
            _ => None,
        }
    }

    fn send_forced(
        &self,
        builder: RequestBuilder<WithoutBody>,
        parts: &Parts,
        reader: Box<dyn io::Read + Send + Sync>,
    ) -> std::result::Result<Response<Body>, ureq::Error> {
        let mut builder = builder.force_send_body();
        for (name, value) in &parts.headers {
            builder = builder.header(name.as_str(), value.as_bytes());
        }
        builder.send(SendBody::from_owned_reader(reader))
    }
}

/// The request URI with any `user:pass@` userinfo removed.
pub fn loggable_uri(uri: &Uri) -> String {
    let raw = uri.to_string();
    match url::Url::parse(&raw) {
        Ok(mut url) if !url.username().is_empty() || url.password().is_some() => {
            // Both setters only fail for URLs that cannot carry credentials.
            let _ = url.set_username("");
            let _ = url.set_password(None);
            url.to_string()
        }
        _ => raw,
    }
}

fn classify_failure(err: ureq::Error, timeout: Duration) -> RequestError {
    match err {
        ureq::Error::Timeout(_) => RequestError::Timeout(timeout),
        ureq::Error::Io(e) if e.kind() == io::ErrorKind::TimedOut => RequestError::Timeout(timeout),
        other => RequestError::NetworkError(format!("error sending request: {other}")),
    }
}

fn classify_response(response: Response<Body>) -> Completion {
    if response.status() == StatusCode::UNSUPPORTED_MEDIA_TYPE {
        return Completion::Rejected {
            response,
            reason: "server answered 415 Unsupported Media Type".to_string(),
        };
    }
    Completion::Accepted(response)
}
