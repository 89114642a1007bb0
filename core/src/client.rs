//! One plugin invocation, from parameter record to reported result.
//!
//! # Design
//! `HttpRequestClient` holds only the parameter record and carries no state
//! between calls. `run` walks the pipeline in order: validate, build the
//! body source, resolve the connection, prepare and execute the request,
//! dispose of the response, report. Each stage owns what it acquires, so an
//! early `?` drops (and closes) everything acquired before it.
//!
//! The record is reported before a failed expectation turns into
//! `ValidationError`, so the pipeline still sees what came back.

use log::debug;

use crate::body::BodySource;
use crate::connection::resolve_params;
use crate::disposer::ResponseDisposer;
use crate::error::{RequestError, Result};
use crate::executor::{effective_timeout, RequestExecutor};
use crate::logging::PluginLog;
use crate::params::ParameterRecord;
use crate::report::Reporter;
use crate::types::{Outcome, ResultRecord};
use crate::validate::validate;

#[derive(Debug, Clone)]
pub struct HttpRequestClient {
    params: ParameterRecord,
}

impl HttpRequestClient {
    pub fn new(params: ParameterRecord) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &ParameterRecord {
        &self.params
    }

    pub fn log(&self) -> PluginLog {
        PluginLog::new(self.params.quiet)
    }

    /// Run without reporting anywhere.
    pub fn execute(&self) -> Result<ResultRecord> {
        self.run(&mut Reporter::new(self.log()))
    }

    pub fn run(&self, reporter: &mut Reporter) -> Result<ResultRecord> {
        let log = self.log();
        let request = validate(&self.params)?;
        let body = BodySource::build(&request)?;
        debug!("body source: {body:?}");

        let connection = resolve_params(&self.params)?;
        log.info(format!(
            "connection: ignore ssl {}, client cert {}, proxy {}",
            self.params.ignore_ssl,
            connection.client_identity.is_some(),
            connection.proxy.is_some()
        ));

        let timeout = effective_timeout(self.params.timeout);
        let executor = RequestExecutor::new(&connection, timeout, log)?;
        let context = executor.prepare(&request, body)?;
        let completion = executor.execute(context)?;

        let record = ResponseDisposer::new(&request, timeout, log).dispose(completion)?;
        reporter.emit(&record)?;

        match &record.outcome {
            Outcome::Passed => Ok(record),
            Outcome::Failed(reason) => Err(RequestError::ValidationError(reason.clone())),
        }
    }
}
