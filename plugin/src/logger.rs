//! Logger initialisation for the plugin binary.

use log::LevelFilter;

pub const LEVEL_VAR: &str = "PLUGIN_LOG_LEVEL";

/// Parse a level name; unknown or empty names fall back to `Info`.
pub fn level_from(raw: Option<&str>) -> LevelFilter {
    raw.and_then(|s| s.trim().parse().ok())
        .unwrap_or(LevelFilter::Info)
}

/// Initialise `env_logger` on stderr.
///
/// `RUST_LOG` is read first so per-module filters still work; `level` then
/// sets the global default. Transport internals stay at `warn` unless the
/// whole plugin runs at `trace`.
pub fn init_logger(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    let mut builder = env_logger::Builder::from_default_env();
    builder.filter_level(level);

    let transport = if level == LevelFilter::Trace {
        LevelFilter::Trace
    } else {
        LevelFilter::Warn.min(level)
    };
    builder.filter_module("ureq", transport);
    builder.filter_module("ureq_proto", transport);
    builder.filter_module("rustls", transport);

    builder.target(env_logger::Target::Stderr);
    builder.format_timestamp_secs();
    builder.try_init()
}

pub fn init_from_env() -> Result<(), log::SetLoggerError> {
    init_logger(level_from(std::env::var(LEVEL_VAR).ok().as_deref()))
}
