//! Loading the parameter record from `PLUGIN_*` variables.

use http_request_core::params::FIELDS;
use http_request_core::{ParameterRecord, Result};
use log::trace;

/// Build a record from `lookup`, one call per known field.
///
/// Unset variables leave the field at its default. Present but unparsable
/// flags or timeouts are `InvalidInput`.
pub fn load_with<F>(lookup: F) -> Result<ParameterRecord>
where
    F: Fn(&str) -> Option<String>,
{
    let mut record = ParameterRecord::default();
    for field in FIELDS {
        if let Some(raw) = lookup(field.env) {
            trace!("{} is set", field.env);
            record.assign(field.name, &raw)?;
        }
    }
    Ok(record)
}

pub fn from_env() -> Result<ParameterRecord> {
    load_with(|key| std::env::var(key).ok())
}
