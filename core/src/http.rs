//! HTTP vocabulary shared by the validator, executor and disposer.
//!
//! # Design
//! These are plain data types parsed from the flat parameter strings:
//! methods, header pairs, basic credentials and accepted status codes. The
//! parsers return owned values so a validated request never borrows from
//! the parameter record.

use std::fmt;
use std::ops::RangeInclusive;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use ureq::http::{HeaderName, HeaderValue};

use crate::error::{RequestError, Result};

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
    /// WebDAV collection creation.
    Mkcol,
}

impl HttpMethod {
    /// Parse a method name case-insensitively. Empty means `GET`.
    pub fn parse(raw: &str) -> Option<Self> {
        let method = match raw.trim().to_ascii_uppercase().as_str() {
            "" | "GET" => HttpMethod::Get,
            "POST" => HttpMethod::Post,
            "PUT" => HttpMethod::Put,
            "DELETE" => HttpMethod::Delete,
            "PATCH" => HttpMethod::Patch,
            "HEAD" => HttpMethod::Head,
            "OPTIONS" => HttpMethod::Options,
            "MKCOL" => HttpMethod::Mkcol,
            _ => return None,
        };
        Some(method)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Mkcol => "MKCOL",
        }
    }

    /// Whether a request payload is attached for this method.
    pub fn carries_body(self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse a comma-separated `Name: Value` list.
///
/// Every item must split on its first colon into a non-empty trimmed name
/// and a non-empty trimmed value, both legal in an HTTP header.
pub fn parse_headers(raw: &str) -> Result<Vec<(String, String)>> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    raw.split(',').map(parse_header_item).collect()
}

fn parse_header_item(item: &str) -> Result<(String, String)> {
    let item = item.trim();
    let malformed = |why: &str| {
        RequestError::InvalidInput(format!("malformed header: '{item}' ({why})"))
    };

    let (name, value) = item.split_once(':').ok_or_else(|| malformed("missing colon"))?;
    let (name, value) = (name.trim(), value.trim());
    if name.is_empty() {
        return Err(malformed("empty header name"));
    }
    if value.is_empty() {
        return Err(malformed("empty header value"));
    }
    HeaderName::from_bytes(name.as_bytes()).map_err(|_| malformed("invalid header name"))?;
    HeaderValue::from_str(value).map_err(|_| malformed("invalid header value"))?;
    Ok((name.to_string(), value.to_string()))
}

/// Basic-auth credentials split into user and password.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub pass: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("pass", &"<redacted>")
            .finish()
    }
}

const BASIC_PREFIX: &str = "Authorization: Basic ";

impl Credentials {
    /// Parse `user:pass` or the pre-encoded `Authorization: Basic <base64>`.
    pub fn parse(raw: &str) -> Result<Self> {
        let bad = || RequestError::InvalidInput("bad auth format".to_string());
        let raw = raw.trim();

        let decoded;
        let pair = match raw.strip_prefix(BASIC_PREFIX) {
            Some(encoded) => {
                let bytes = STANDARD.decode(encoded.trim()).map_err(|_| bad())?;
                decoded = String::from_utf8(bytes).map_err(|_| bad())?;
                decoded.as_str()
            }
            None => raw,
        };

        let (user, pass) = pair.split_once(':').ok_or_else(bad)?;
        if user.is_empty() || pass.is_empty() {
            return Err(bad());
        }
        Ok(Self {
            user: user.to_string(),
            pass: pass.to_string(),
        })
    }

    /// Value for the `Authorization` header.
    pub fn header_value(&self) -> String {
        let token = STANDARD.encode(format!("{}:{}", self.user, self.pass));
        format!("Basic {token}")
    }
}

/// Parse `200,201,300-399` into inclusive status ranges.
pub fn parse_status_codes(raw: &str) -> Result<Vec<RangeInclusive<u16>>> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    raw.split(',')
        .map(|item| {
            let item = item.trim();
            let bad = || {
                RequestError::InvalidInput(format!("invalid valid_response_codes entry '{item}'"))
            };
            let code = |s: &str| {
                s.trim()
                    .parse::<u16>()
                    .ok()
                    .filter(|c| (100..=599).contains(c))
                    .ok_or_else(bad)
            };
            match item.split_once('-') {
                Some((lo, hi)) => {
                    let (lo, hi) = (code(lo)?, code(hi)?);
                    if lo > hi {
                        return Err(bad());
                    }
                    Ok(lo..=hi)
                }
                None => code(item).map(|c| c..=c),
            }
        })
        .collect()
}

/// Rewrite a lowercase header name as `Content-Type` style.
pub fn canonical_header_name(name: &str) -> String {
    name.split('-')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_parse_is_case_insensitive_and_defaults_to_get() {
        assert_eq!(HttpMethod::parse(""), Some(HttpMethod::Get));
        assert_eq!(HttpMethod::parse("mkcol"), Some(HttpMethod::Mkcol));
        assert_eq!(HttpMethod::parse("Patch"), Some(HttpMethod::Patch));
        assert_eq!(HttpMethod::parse("TRACE"), None);
    }

    #[test]
    fn only_post_put_patch_carry_a_body() {
        let carrying: Vec<_> = [
            HttpMethod::Get,
            HttpMethod::Post,
            HttpMethod::Put,
            HttpMethod::Delete,
            HttpMethod::Patch,
            HttpMethod::Head,
            HttpMethod::Options,
            HttpMethod::Mkcol,
        ]
        .into_iter()
        .filter(|m| m.carries_body())
        .collect();
        assert_eq!(carrying, vec![HttpMethod::Post, HttpMethod::Put, HttpMethod::Patch]);
    }

    #[test]
    fn headers_parse_into_trimmed_pairs() {
        let headers = parse_headers("Content-Type: application/json, X-Trace : abc:def").unwrap();
        assert_eq!(
            headers,
            vec![
                ("Content-Type".to_string(), "application/json".to_string()),
                ("X-Trace".to_string(), "abc:def".to_string()),
            ]
        );
    }

    #[test]
    fn empty_header_value_is_rejected() {
        let err = parse_headers("Content-Type:").unwrap_err();
        assert!(matches!(err, RequestError::InvalidInput(_)));
        assert!(err.to_string().contains("empty header value"));
    }

    #[test]
    fn empty_header_name_is_rejected() {
        let err = parse_headers(": value").unwrap_err();
        assert!(err.to_string().contains("empty header name"));
    }

    #[test]
    fn header_without_colon_names_the_item() {
        let err = parse_headers("Accept: */*, broken").unwrap_err();
        assert!(err.to_string().contains("'broken'"));
    }

    #[test]
    fn trailing_comma_is_an_empty_item() {
        assert!(parse_headers("Accept: */*,").is_err());
    }

    #[test]
    fn credentials_from_plain_pair() {
        let c = Credentials::parse("alice:s3cret").unwrap();
        assert_eq!(c.user, "alice");
        assert_eq!(c.pass, "s3cret");
        assert_eq!(c.header_value(), "Basic YWxpY2U6czNjcmV0");
    }

    #[test]
    fn credentials_from_encoded_header() {
        let c = Credentials::parse("Authorization: Basic YWxpY2U6czNjcmV0").unwrap();
        assert_eq!(c, Credentials { user: "alice".into(), pass: "s3cret".into() });
    }

    #[test]
    fn credentials_need_both_parts() {
        for raw in ["alice:", ":s3cret", "alice", "Authorization: Basic !!!"] {
            let err = Credentials::parse(raw).unwrap_err();
            assert_eq!(err.to_string(), "invalid input: bad auth format", "{raw}");
        }
    }

    #[test]
    fn credentials_debug_hides_password() {
        let c = Credentials::parse("alice:s3cret").unwrap();
        assert!(!format!("{c:?}").contains("s3cret"));
    }

    #[test]
    fn status_codes_accept_codes_and_ranges() {
        let ranges = parse_status_codes("200, 201,300-399").unwrap();
        assert_eq!(ranges, vec![200..=200, 201..=201, 300..=399]);
        assert!(parse_status_codes("").unwrap().is_empty());
    }

    #[test]
    fn status_codes_reject_garbage() {
        for raw in ["ok", "99", "399-300", "200,"] {
            assert!(parse_status_codes(raw).is_err(), "{raw}");
        }
    }

    #[test]
    fn canonical_names() {
        assert_eq!(canonical_header_name("content-type"), "Content-Type");
        assert_eq!(canonical_header_name("x-request-id"), "X-Request-Id");
        assert_eq!(canonical_header_name("etag"), "Etag");
    }
}
