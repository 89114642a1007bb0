//! The flat parameter record a pipeline step hands to the plugin.
//!
//! # Design
//! `ParameterRecord` is plain data: every field is a string, a flag or a
//! number of seconds, and the empty/zero value means "not configured".
//! `FIELDS` is the single table mapping record fields to their `PLUGIN_*`
//! variable names. Loading from the environment and emitting documentation
//! command lines both go through it, so the two can never disagree.
//! Values are read and written through the record's serde map, keyed by
//! the table's field names and parsed by its `FieldKind`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{RequestError, Result};

pub const DEFAULT_MULTIPART_NAME: &str = "file";

/// The validated input describing one HTTP request to perform.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterRecord {
    pub url: String,
    pub http_method: String,
    /// Comma-separated `Name: Value` pairs.
    pub headers: String,
    pub request_body: String,
    /// `user:pass` or `Authorization: Basic <base64>`.
    pub auth_basic: String,
    pub auth_cert: String,
    pub ssl_cert_path: String,
    /// Comma-separated codes or inclusive ranges, e.g. `200,300-399`.
    pub valid_response_codes: String,
    pub valid_response_body: String,
    /// Seconds; 0 selects the default.
    pub timeout: u64,
    pub ignore_ssl: bool,
    pub proxy: String,
    pub output_file: String,
    pub accept_type: String,
    pub content_type: String,
    pub log_response: bool,
    pub quiet: bool,
    pub upload_file: String,
    pub multipart_name: String,
    pub wrap_as_multipart: bool,
    /// Suppresses the card echo on stdout.
    pub local_testing: bool,
}

/// How a field's textual value is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Flag,
    Seconds,
}

/// One entry of the field table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub env: &'static str,
    pub kind: FieldKind,
}

const fn field(name: &'static str, env: &'static str, kind: FieldKind) -> Field {
    Field { name, env, kind }
}

pub const FIELDS: &[Field] = &[
    field("url", "PLUGIN_URL", FieldKind::Text),
    field("http_method", "PLUGIN_HTTP_METHOD", FieldKind::Text),
    field("headers", "PLUGIN_HEADERS", FieldKind::Text),
    field("request_body", "PLUGIN_REQUEST_BODY", FieldKind::Text),
    field("auth_basic", "PLUGIN_AUTH_BASIC", FieldKind::Text),
    field("auth_cert", "PLUGIN_AUTH_CERT", FieldKind::Text),
    field("ssl_cert_path", "PLUGIN_SSL_CERT_PATH", FieldKind::Text),
    field("valid_response_codes", "PLUGIN_VALID_RESPONSE_CODES", FieldKind::Text),
    field("valid_response_body", "PLUGIN_VALID_RESPONSE_BODY", FieldKind::Text),
    field("timeout", "PLUGIN_TIMEOUT", FieldKind::Seconds),
    field("ignore_ssl", "PLUGIN_IGNORE_SSL", FieldKind::Flag),
    field("proxy", "PLUGIN_PROXY", FieldKind::Text),
    field("output_file", "PLUGIN_OUTPUT_FILE", FieldKind::Text),
    field("accept_type", "PLUGIN_ACCEPT_TYPE", FieldKind::Text),
    field("content_type", "PLUGIN_CONTENT_TYPE", FieldKind::Text),
    field("log_response", "PLUGIN_LOG_RESPONSE", FieldKind::Flag),
    field("quiet", "PLUGIN_QUIET", FieldKind::Flag),
    field("upload_file", "PLUGIN_UPLOAD_FILE", FieldKind::Text),
    field("multipart_name", "PLUGIN_MULTIPART_NAME", FieldKind::Text),
    field("wrap_as_multipart", "PLUGIN_WRAP_AS_MULTIPART", FieldKind::Flag),
    field("local_testing", "PLUGIN_LOCAL_TESTING", FieldKind::Flag),
];

impl ParameterRecord {
    /// Client certificate path; `ssl_cert_path` wins over `auth_cert`.
    pub fn client_cert_path(&self) -> &str {
        if self.ssl_cert_path.is_empty() {
            &self.auth_cert
        } else {
            &self.ssl_cert_path
        }
    }

    pub fn multipart_field(&self) -> &str {
        if self.multipart_name.trim().is_empty() {
            DEFAULT_MULTIPART_NAME
        } else {
            self.multipart_name.trim()
        }
    }

    /// Assign `raw` to the field called `name`, parsed according to the
    /// field's kind in `FIELDS`.
    pub fn assign(&mut self, name: &str, raw: &str) -> Result<()> {
        let field = field_named(name).ok_or_else(|| {
            RequestError::InvalidInput(format!("unknown parameter '{name}'"))
        })?;
        let value = match field.kind {
            FieldKind::Text => Value::from(raw),
            FieldKind::Flag => Value::from(parse_flag(name, raw)?),
            FieldKind::Seconds => Value::from(parse_seconds(name, raw)?),
        };

        let mut fields = self.to_fields()?;
        fields.insert(name.to_string(), value);
        *self = serde_json::from_value(Value::Object(fields))
            .map_err(|e| RequestError::InvalidInput(format!("{name}: {e}")))?;
        Ok(())
    }

    /// Textual value of the field called `name`, or `None` when unset.
    pub fn value_of(&self, name: &str) -> Option<String> {
        let fields = self.to_fields().ok()?;
        field_named(name).and_then(|f| rendered(f, &fields))
    }

    /// Configured fields as `(PLUGIN_*, value)` pairs in table order.
    pub fn env_pairs(&self) -> Vec<(&'static str, String)> {
        let Ok(fields) = self.to_fields() else {
            return Vec::new();
        };
        FIELDS
            .iter()
            .filter_map(|f| rendered(f, &fields).map(|v| (f.env, v)))
            .collect()
    }

    fn to_fields(&self) -> Result<Map<String, Value>> {
        match serde_json::to_value(self) {
            Ok(Value::Object(fields)) => Ok(fields),
            Ok(_) => Err(RequestError::InvalidInput(
                "parameter record is not a map".to_string(),
            )),
            Err(e) => Err(RequestError::InvalidInput(e.to_string())),
        }
    }
}

pub fn field_named(name: &str) -> Option<&'static Field> {
    FIELDS.iter().find(|f| f.name == name)
}

/// The field's value as text, `None` for the empty string, `false` and `0`.
fn rendered(field: &Field, fields: &Map<String, Value>) -> Option<String> {
    match (field.kind, fields.get(field.name)?) {
        (FieldKind::Text, Value::String(s)) if !s.is_empty() => Some(s.clone()),
        (FieldKind::Flag, Value::Bool(true)) => Some("true".to_string()),
        (FieldKind::Seconds, Value::Number(n)) if n.as_u64() != Some(0) => Some(n.to_string()),
        _ => None,
    }
}

pub fn parse_flag(name: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "" | "false" | "0" | "no" => Ok(false),
        "true" | "1" | "yes" => Ok(true),
        _ => Err(RequestError::InvalidInput(format!(
            "{name} must be a boolean, got '{raw}'"
        ))),
    }
}

fn parse_seconds(name: &str, raw: &str) -> Result<u64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(0);
    }
    raw.parse().map_err(|_| {
        RequestError::InvalidInput(format!(
            "{name} must be a non-negative number of seconds, got '{raw}'"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_table_field_round_trips_through_assign() {
        let mut record = ParameterRecord::default();
        for f in FIELDS {
            let raw = match f.kind {
                FieldKind::Text => "x",
                FieldKind::Flag => "true",
                FieldKind::Seconds => "5",
            };
            record.assign(f.name, raw).unwrap();
            assert!(record.value_of(f.name).is_some(), "{} not stored", f.name);
        }
        assert_eq!(record.env_pairs().len(), FIELDS.len());
    }

    #[test]
    fn table_matches_record_fields_and_kinds() {
        let fields = ParameterRecord::default().to_fields().unwrap();
        assert_eq!(fields.len(), FIELDS.len());
        for f in FIELDS {
            let value = &fields[f.name];
            let kind_matches = match f.kind {
                FieldKind::Text => value.is_string(),
                FieldKind::Flag => value.is_boolean(),
                FieldKind::Seconds => value.is_u64(),
            };
            assert!(kind_matches, "{} is not {:?}", f.name, f.kind);
            assert_eq!(f.env, format!("PLUGIN_{}", f.name.to_uppercase()));
        }
    }

    #[test]
    fn assign_parses_by_kind() {
        let mut record = ParameterRecord::default();
        record.assign("timeout", " 45 ").unwrap();
        record.assign("ignore_ssl", "yes").unwrap();
        record.assign("headers", "X-A: 1").unwrap();
        assert_eq!(record.timeout, 45);
        assert!(record.ignore_ssl);
        assert_eq!(record.headers, "X-A: 1");
        record.assign("ignore_ssl", "no").unwrap();
        assert!(!record.ignore_ssl);
    }

    #[test]
    fn env_pairs_skip_unset_fields() {
        let record = ParameterRecord {
            url: "http://localhost/".to_string(),
            timeout: 30,
            quiet: true,
            ..Default::default()
        };
        assert_eq!(
            record.env_pairs(),
            vec![
                ("PLUGIN_URL", "http://localhost/".to_string()),
                ("PLUGIN_TIMEOUT", "30".to_string()),
                ("PLUGIN_QUIET", "true".to_string()),
            ]
        );
    }

    #[test]
    fn flags_accept_common_spellings() {
        assert!(parse_flag("quiet", "TRUE").unwrap());
        assert!(parse_flag("quiet", "yes").unwrap());
        assert!(!parse_flag("quiet", "0").unwrap());
        assert!(!parse_flag("quiet", "").unwrap());
        assert!(matches!(
            parse_flag("quiet", "maybe"),
            Err(RequestError::InvalidInput(_))
        ));
    }

    #[test]
    fn negative_timeout_is_rejected() {
        let mut record = ParameterRecord::default();
        let err = record.assign("timeout", "-1").unwrap_err();
        assert!(err.to_string().contains("timeout"));
    }

    #[test]
    fn unknown_field_is_rejected() {
        let mut record = ParameterRecord::default();
        assert!(record.assign("retries", "3").is_err());
    }

    #[test]
    fn ssl_cert_path_wins_over_auth_cert() {
        let mut record = ParameterRecord {
            auth_cert: "/a.pem".to_string(),
            ..Default::default()
        };
        assert_eq!(record.client_cert_path(), "/a.pem");
        record.ssl_cert_path = "/b.pem".to_string();
        assert_eq!(record.client_cert_path(), "/b.pem");
    }

    #[test]
    fn multipart_name_defaults_to_file() {
        let record = ParameterRecord::default();
        assert_eq!(record.multipart_field(), "file");
    }
}
