//! Delivery of the `ResultRecord` to the pipeline.
//!
//! # Design
//! A `Reporter` fans one record out to several `ResultSink`s. Primary sinks
//! (the env file the pipeline reads variables from) must succeed; echo sinks
//! (the card on stdout) are best effort, and their failures are logged and
//! dropped. Every sink is attempted even after a failure, and the first
//! primary failure is the one returned.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Serialize;

use crate::error::{RequestError, Result};
use crate::logging::PluginLog;
use crate::types::ResultRecord;

pub const CARD_SCHEMA: &str = "https://drone.github.io/drone-jira/card.json";

pub trait ResultSink {
    fn name(&self) -> &str;
    fn emit(&mut self, record: &ResultRecord) -> io::Result<()>;
}

/// Appends `KEY=value` lines to the file named by `DRONE_OUTPUT`.
#[derive(Debug, Clone)]
pub struct EnvFileSink {
    path: PathBuf,
}

impl EnvFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Quote values that would not survive as a single `KEY=value` line.
pub fn env_value(raw: &str) -> String {
    if !raw.contains(['\n', '\r', '"', '\\']) {
        return raw.to_string();
    }
    let mut quoted = String::with_capacity(raw.len() + 2);
    quoted.push('"');
    for c in raw.chars() {
        match c {
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}

impl ResultSink for EnvFileSink {
    fn name(&self) -> &str {
        "env file"
    }

    fn emit(&mut self, record: &ResultRecord) -> io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut lines = String::new();
        for (key, value) in record.env_pairs() {
            lines.push_str(&format!("{key}={}\n", env_value(&value)));
        }
        file.write_all(lines.as_bytes())?;
        file.flush()
    }
}

#[derive(Serialize)]
struct Card<'a> {
    schema: &'a str,
    data: &'a ResultRecord,
}

/// Writes the record as a base64 card wrapped in terminal escape codes.
pub struct CardSink<W: Write> {
    out: W,
}

impl<W: Write> CardSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl CardSink<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

pub fn encode_card(record: &ResultRecord) -> io::Result<String> {
    let card = Card {
        schema: CARD_SCHEMA,
        data: record,
    };
    let json = serde_json::to_vec(&card)?;
    Ok(STANDARD.encode(json))
}

impl<W: Write> ResultSink for CardSink<W> {
    fn name(&self) -> &str {
        "card"
    }

    fn emit(&mut self, record: &ResultRecord) -> io::Result<()> {
        let encoded = encode_card(record)?;
        writeln!(self.out, "\u{1b}]1338;{encoded}\u{1b}]0m")?;
        self.out.flush()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Primary,
    Echo,
}

pub struct Reporter {
    sinks: Vec<(Channel, Box<dyn ResultSink>)>,
    log: PluginLog,
}

impl Reporter {
    pub fn new(log: PluginLog) -> Self {
        Self {
            sinks: Vec::new(),
            log,
        }
    }

    pub fn with_sink(mut self, channel: Channel, sink: impl ResultSink + 'static) -> Self {
        self.sinks.push((channel, Box::new(sink)));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    pub fn emit(&mut self, record: &ResultRecord) -> Result<()> {
        let mut first_failure = None;
        for (channel, sink) in &mut self.sinks {
            let Err(e) = sink.emit(record) else {
                continue;
            };
            match channel {
                Channel::Echo => self.log.warn(format!("{} output skipped: {e}", sink.name())),
                Channel::Primary => {
                    first_failure.get_or_insert_with(|| {
                        RequestError::OutputError(format!("{} output failed: {e}", sink.name()))
                    });
                }
            }
        }
        first_failure.map_or(Ok(()), Err)
    }
}
