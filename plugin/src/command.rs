//! Rendering a record as the command lines that would reproduce it.
//!
//! Used for documentation and bug reports; the output is never parsed back.

use http_request_core::ParameterRecord;

pub const BINARY_NAME: &str = "http-request-plugin";

/// Single-quote `value` for a POSIX shell.
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// `KEY='value' \` lines followed by the binary name.
pub fn shell_command(params: &ParameterRecord) -> String {
    let mut out = String::new();
    for (key, value) in params.env_pairs() {
        out.push_str(&format!("{key}={} \\\n", shell_quote(&value)));
    }
    out.push_str(BINARY_NAME);
    out
}

/// `docker run --rm -e KEY='value' ... <image>`, one option per line.
pub fn docker_command(params: &ParameterRecord, image: &str) -> String {
    let mut out = String::from("docker run --rm \\\n");
    for (key, value) in params.env_pairs() {
        out.push_str(&format!("  -e {key}={} \\\n", shell_quote(&value)));
    }
    out.push_str("  ");
    out.push_str(image);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> ParameterRecord {
        ParameterRecord {
            url: "https://example.com/hook".to_string(),
            http_method: "POST".to_string(),
            request_body: r#"{"msg":"it's done"}"#.to_string(),
            quiet: true,
            ..Default::default()
        }
    }

    #[test]
    fn quotes_embedded_single_quotes() {
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
        assert_eq!(shell_quote(""), "''");
    }

    #[test]
    fn shell_command_lists_set_fields_then_binary() {
        let expected = "PLUGIN_URL='https://example.com/hook' \\\n\
                        PLUGIN_HTTP_METHOD='POST' \\\n\
                        PLUGIN_REQUEST_BODY='{\"msg\":\"it'\\''s done\"}' \\\n\
                        PLUGIN_QUIET='true' \\\n\
                        http-request-plugin";
        assert_eq!(shell_command(&record()), expected);
    }

    #[test]
    fn docker_command_ends_with_image() {
        let rendered = docker_command(&record(), "plugins/http-request:latest");
        assert!(rendered.starts_with("docker run --rm \\\n"));
        assert!(rendered.contains("  -e PLUGIN_HTTP_METHOD='POST' \\\n"));
        assert!(rendered.ends_with("\n  plugins/http-request:latest"));
    }

    #[test]
    fn default_record_renders_bare_binary() {
        assert_eq!(shell_command(&ParameterRecord::default()), BINARY_NAME);
    }
}
