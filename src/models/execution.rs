//! Execution models
//!
//! Parameters shared by every case in a run, raw provider output, and the
//! normalized result produced once per test case.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Inference parameters shared by reference across a run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExecutionParams {
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    /// Provider-specific parameters, part of the cache fingerprint
    #[serde(flatten, default)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl ExecutionParams {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: 0.0,
            max_tokens: 256,
            extra: BTreeMap::new(),
        }
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

/// What a provider hands back for one successful call
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProviderOutput {
    pub output: String,
    pub model: String,
    pub latency_ms: u64,
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
}

impl ProviderOutput {
    pub fn new(output: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            model: model.into(),
            latency_ms: 0,
            prompt_tokens: None,
            completion_tokens: None,
        }
    }

    pub fn with_tokens(mut self, prompt_tokens: u32, completion_tokens: u32) -> Self {
        self.prompt_tokens = Some(prompt_tokens);
        self.completion_tokens = Some(completion_tokens);
        self
    }
}

/// Failure classification carried by a failed result
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// The attempt exceeded its duration budget
    Timeout,
    /// The provider call failed
    ProviderError,
    /// Failure inside the scheduling plumbing itself
    #[serde(rename = "internal")]
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Timeout => "Timeout",
            ErrorKind::ProviderError => "ProviderError",
            ErrorKind::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal payload of a test case: either an answer or a classified failure
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Outcome {
    Success {
        output: String,
        latency_ms: u64,
        prompt_tokens: Option<u32>,
        completion_tokens: Option<u32>,
    },
    Failure {
        error: String,
        error_kind: ErrorKind,
    },
}

/// Normalized result, produced exactly once per test case
///
/// Serialized flat, one record per line: success records carry `output`,
/// failure records carry `error` and `error_kind`, never both.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub id: String,
    pub prompt: String,
    pub model: String,
    pub cache_hit: bool,
    pub attempts: u32,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub outcome: Outcome,
}

impl ExecutionResult {
    pub fn success(
        id: impl Into<String>,
        prompt: impl Into<String>,
        provider_output: ProviderOutput,
        attempts: u32,
    ) -> Self {
        Self {
            id: id.into(),
            prompt: prompt.into(),
            model: provider_output.model,
            cache_hit: false,
            attempts,
            timestamp: Utc::now(),
            outcome: Outcome::Success {
                output: provider_output.output,
                latency_ms: provider_output.latency_ms,
                prompt_tokens: provider_output.prompt_tokens,
                completion_tokens: provider_output.completion_tokens,
            },
        }
    }

    pub fn failure(
        id: impl Into<String>,
        prompt: impl Into<String>,
        model: impl Into<String>,
        kind: ErrorKind,
        error: impl Into<String>,
        attempts: u32,
    ) -> Self {
        Self {
            id: id.into(),
            prompt: prompt.into(),
            model: model.into(),
            cache_hit: false,
            attempts,
            timestamp: Utc::now(),
            outcome: Outcome::Failure {
                error: error.into(),
                error_kind: kind,
            },
        }
    }

    pub fn internal(
        id: impl Into<String>,
        prompt: impl Into<String>,
        model: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self::failure(id, prompt, model, ErrorKind::Internal, error, 0)
    }

    /// Mark as served from the cache
    pub fn into_cache_hit(mut self) -> Self {
        self.cache_hit = true;
        self.timestamp = Utc::now();
        self
    }

    pub fn is_error(&self) -> bool {
        matches!(self.outcome, Outcome::Failure { .. })
    }

    pub fn output(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Success { output, .. } => Some(output),
            Outcome::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Success { .. } => None,
            Outcome::Failure { error, .. } => Some(error),
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match &self.outcome {
            Outcome::Success { .. } => None,
            Outcome::Failure { error_kind, .. } => Some(*error_kind),
        }
    }

    pub fn latency_ms(&self) -> Option<u64> {
        match &self.outcome {
            Outcome::Success { latency_ms, .. } => Some(*latency_ms),
            Outcome::Failure { .. } => None,
        }
    }

    pub fn prompt_tokens(&self) -> Option<u32> {
        match &self.outcome {
            Outcome::Success { prompt_tokens, .. } => *prompt_tokens,
            Outcome::Failure { .. } => None,
        }
    }

    pub fn completion_tokens(&self) -> Option<u32> {
        match &self.outcome {
            Outcome::Success {
                completion_tokens, ..
            } => *completion_tokens,
            Outcome::Failure { .. } => None,
        }
    }
}

impl fmt::Display for ExecutionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            Outcome::Success {
                output, latency_ms, ..
            } => {
                write!(f, "✓ {} [{}ms] {}", self.id, latency_ms, output)?;
                if self.cache_hit {
                    write!(f, " (cached)")?;
                }
                Ok(())
            }
            Outcome::Failure { error, error_kind } => write!(
                f,
                "✗ {} [{} after {} attempt(s)] {}",
                self.id, error_kind, self.attempts, error
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_record_is_flat() {
        let result = ExecutionResult::success(
            "1",
            "X",
            ProviderOutput::new("X", "m").with_tokens(3, 1),
            1,
        );
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["output"], "X");
        assert_eq!(value["prompt_tokens"], 3);
        assert!(value.get("error").is_none());
        assert!(value.get("error_kind").is_none());
    }

    #[test]
    fn test_failure_record_is_flat() {
        let result = ExecutionResult::failure("a", "p", "m", ErrorKind::Timeout, "too slow", 3);
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["error_kind"], "Timeout");
        assert_eq!(value["error"], "too slow");
        assert!(value.get("output").is_none());
    }

    #[test]
    fn test_record_parses_back() {
        let line = serde_json::to_string(&ExecutionResult::internal("z", "p", "m", "boom")).unwrap();
        assert!(line.contains(r#""error_kind":"internal""#));

        let parsed: ExecutionResult = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed.error_kind(), Some(ErrorKind::Internal));
        assert_eq!(parsed.output(), None);

        let ok = ExecutionResult::success("y", "p", ProviderOutput::new("out", "m"), 2);
        let parsed: ExecutionResult =
            serde_json::from_str(&serde_json::to_string(&ok).unwrap()).unwrap();
        assert_eq!(parsed, ok);
    }

    #[test]
    fn test_cache_hit_marking() {
        let result = ExecutionResult::success("1", "p", ProviderOutput::new("o", "m"), 2);
        let hit = result.clone().into_cache_hit();
        assert!(hit.cache_hit);
        assert_eq!(hit.attempts, 2);
        assert_eq!(hit.outcome, result.outcome);
    }
}
