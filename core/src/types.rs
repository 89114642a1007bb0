//! The result record handed to the pipeline.
//!
//! # Design
//! Field names on the wire are the pipeline variable names, so the same
//! record serializes into the card JSON and into `KEY=value` lines without
//! a second mapping. The validation outcome is not part of the wire form:
//! the pipeline learns about a failed validation from the exit status.

use serde::{Deserialize, Serialize};

pub const RESPONSE_STATUS: &str = "RESPONSE_STATUS";
pub const RESPONSE_CONTENT: &str = "RESPONSE_CONTENT";
pub const RESPONSE_HEADERS: &str = "RESPONSE_HEADERS";
pub const RESPONSE_FILE: &str = "RESPONSE_FILE";

/// Whether the response met every configured expectation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Outcome {
    #[default]
    Passed,
    Failed(String),
}

/// Status, headers and content (or saved file) of one response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRecord {
    #[serde(rename = "RESPONSE_STATUS")]
    pub status: u16,
    /// Empty when the body was written to `file`.
    #[serde(rename = "RESPONSE_CONTENT")]
    pub content: String,
    /// One `Key: v1,v2` line per header.
    #[serde(rename = "RESPONSE_HEADERS")]
    pub headers: String,
    /// Empty when the body was kept in `content`.
    #[serde(rename = "RESPONSE_FILE")]
    pub file: String,
    #[serde(skip)]
    pub outcome: Outcome,
}

impl ResultRecord {
    pub fn passed(&self) -> bool {
        self.outcome == Outcome::Passed
    }

    /// The record as `(variable, value)` pairs, one per field.
    pub fn env_pairs(&self) -> [(&'static str, String); 4] {
        [
            (RESPONSE_STATUS, self.status.to_string()),
            (RESPONSE_CONTENT, self.content.clone()),
            (RESPONSE_HEADERS, self.headers.clone()),
            (RESPONSE_FILE, self.file.clone()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> ResultRecord {
        ResultRecord {
            status: 201,
            content: r#"{"ok":true}"#.to_string(),
            headers: "Content-Type: application/json".to_string(),
            file: String::new(),
            outcome: Outcome::Failed("status".to_string()),
        }
    }

    #[test]
    fn serializes_with_pipeline_variable_names() {
        let json = serde_json::to_value(record()).unwrap();
        assert_eq!(json["RESPONSE_STATUS"], 201);
        assert_eq!(json["RESPONSE_CONTENT"], r#"{"ok":true}"#);
        assert_eq!(json["RESPONSE_HEADERS"], "Content-Type: application/json");
        assert_eq!(json["RESPONSE_FILE"], "");
        assert!(json.get("outcome").is_none());
    }

    #[test]
    fn env_pairs_cover_every_field() {
        let pairs = record().env_pairs();
        let names: Vec<_> = pairs.iter().map(|(k, _)| *k).collect();
        assert_eq!(
            names,
            vec![RESPONSE_STATUS, RESPONSE_CONTENT, RESPONSE_HEADERS, RESPONSE_FILE]
        );
        assert_eq!(pairs[0].1, "201");
    }

    #[test]
    fn outcome_defaults_to_passed() {
        assert!(ResultRecord::default().passed());
        assert!(!record().passed());
    }
}
