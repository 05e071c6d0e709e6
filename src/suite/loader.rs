//! Suite loader
//!
//! A suite is a JSONL file, one test case object per line.

use serde_json::Value;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::models::TestCase;

#[derive(Error, Debug)]
pub enum SuiteError {
    #[error("Failed to read suite {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid JSON on line {line}: {source}")]
    Json {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Schema error on line {line}: {message}")]
    Schema { line: usize, message: String },
}

/// Read and validate every case in a suite file
pub fn load_suite(path: impl AsRef<Path>) -> Result<Vec<TestCase>, SuiteError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| SuiteError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let cases = parse_suite(&content)?;
    debug!("Loaded {} test case(s) from {}", cases.len(), path.display());
    Ok(cases)
}

/// Parse suite content; blank lines are skipped, line numbers are 1-based
pub fn parse_suite(content: &str) -> Result<Vec<TestCase>, SuiteError> {
    let mut cases = Vec::new();

    for (idx, raw) in content.lines().enumerate() {
        let line = idx + 1;
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }

        let value: Value =
            serde_json::from_str(raw).map_err(|source| SuiteError::Json { line, source })?;
        validate(&value).map_err(|message| SuiteError::Schema { line, message })?;

        let case = serde_json::from_value(value).map_err(|e| SuiteError::Schema {
            line,
            message: e.to_string(),
        })?;
        cases.push(case);
    }

    Ok(cases)
}

/// Cache namespace of a suite: its file stem
pub fn suite_id(path: impl AsRef<Path>) -> String {
    path.as_ref()
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "suite".to_string())
}

fn validate(value: &Value) -> Result<(), String> {
    let obj = value
        .as_object()
        .ok_or_else(|| "test case must be a JSON object".to_string())?;

    for field in ["id", "category", "prompt", "evaluation"] {
        if !obj.contains_key(field) {
            return Err(format!("missing required field '{field}'"));
        }
    }
    for field in ["id", "category", "prompt"] {
        if !obj[field].is_string() {
            return Err(format!("'{field}' must be a string"));
        }
    }

    let evaluation = obj["evaluation"]
        .as_object()
        .ok_or_else(|| "'evaluation' must be an object".to_string())?;

    match evaluation.get("type").and_then(Value::as_str) {
        Some("exact_match") => {}
        Some("regex") => require_string(evaluation, "pattern")?,
        Some("contains") => require_string(evaluation, "value")?,
        Some("numeric") => {
            match evaluation.get("value") {
                Some(v) if v.is_number() => {}
                Some(_) => return Err("evaluation 'value' must be a number".to_string()),
                None => return Err("evaluation requires 'value'".to_string()),
            }
            match evaluation.get("tolerance") {
                None => {}
                Some(v) if v.as_f64().is_some_and(|t| t >= 0.0) => {}
                Some(_) => {
                    return Err("evaluation 'tolerance' must be a non-negative number".to_string())
                }
            }
        }
        Some("refusal") => {
            if evaluation.get("expect_refusal").is_some_and(|v| !v.is_boolean()) {
                return Err("evaluation 'expect_refusal' must be a boolean".to_string());
            }
        }
        other => {
            let shown = other.map(str::to_string).unwrap_or_else(|| "none".to_string());
            return Err(format!("unsupported evaluation type: {shown}"));
        }
    }

    if obj.get("expected").is_some_and(|v| !v.is_string()) {
        return Err("'expected' must be a string if provided".to_string());
    }
    if obj.get("metadata").is_some_and(|v| !v.is_object()) {
        return Err("'metadata' must be an object if provided".to_string());
    }

    Ok(())
}

fn require_string(evaluation: &serde_json::Map<String, Value>, field: &str) -> Result<(), String> {
    match evaluation.get(field) {
        Some(Value::String(_)) => Ok(()),
        Some(_) => Err(format!("evaluation '{field}' must be a string")),
        None => Err(format!("evaluation requires '{field}'")),
    }
}
