//! CI step wrapper around `http-request-core`.
//!
//! # Overview
//! The pipeline passes configuration as `PLUGIN_*` environment variables and
//! reads results back from the `DRONE_OUTPUT` env file and the card printed
//! on stdout. This crate does that wiring; all request semantics live in the
//! core crate.
//!
//! # Design
//! - `env` builds a `ParameterRecord` from any key lookup, so tests never
//!   touch the process environment.
//! - `logger` initialises `env_logger` once, writing to stderr; stdout is
//!   reserved for the card.
//! - `command` renders a record back into shell and docker invocations for
//!   documentation.

pub mod command;
pub mod env;
pub mod logger;

use http_request_core::{CardSink, Channel, EnvFileSink, ParameterRecord, PluginLog, Reporter};

/// Variable naming the env file the pipeline reads step outputs from.
pub const OUTPUT_VAR: &str = "DRONE_OUTPUT";

/// Wire the sinks for one run: the env file when the pipeline named one,
/// and the stdout card unless testing locally.
pub fn reporter_for(params: &ParameterRecord, output: Option<String>) -> Reporter {
    let mut reporter = Reporter::new(PluginLog::new(params.quiet));
    if let Some(path) = output.filter(|p| !p.trim().is_empty()) {
        reporter = reporter.with_sink(Channel::Primary, EnvFileSink::new(path));
    }
    if !params.local_testing {
        reporter = reporter.with_sink(Channel::Echo, CardSink::stdout());
    }
    reporter
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_testing_without_output_reports_nowhere() {
        let params = ParameterRecord {
            local_testing: true,
            ..Default::default()
        };
        assert!(reporter_for(&params, None).is_empty());
        assert!(reporter_for(&params, Some("  ".to_string())).is_empty());
    }

    #[test]
    fn output_file_alone_is_enough() {
        let params = ParameterRecord {
            local_testing: true,
            ..Default::default()
        };
        assert!(!reporter_for(&params, Some("/tmp/out.env".to_string())).is_empty());
    }

    #[test]
    fn card_is_on_by_default() {
        assert!(!reporter_for(&ParameterRecord::default(), None).is_empty());
    }
}
