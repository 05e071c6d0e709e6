//! Test case models
//!
//! A test case is one line of a suite: a prompt plus the rule used to judge
//! the provider's answer.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How a provider output is judged
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EvaluationSpec {
    /// Output must equal the case's `expected` value
    ExactMatch,
    /// Output must match the pattern from its first character
    Regex { pattern: String },
    /// Output must contain the value, ignoring case
    Contains { value: String },
    /// Output must parse as a number within `tolerance` of `value`
    Numeric {
        value: f64,
        #[serde(default)]
        tolerance: f64,
    },
    /// Output must read as a refusal, or must not when `expect_refusal` is false
    Refusal {
        #[serde(default = "default_expect_refusal")]
        expect_refusal: bool,
    },
}

fn default_expect_refusal() -> bool {
    true
}

impl EvaluationSpec {
    /// Evaluator name as written in suites and summaries
    pub fn name(&self) -> &'static str {
        match self {
            EvaluationSpec::ExactMatch => "exact_match",
            EvaluationSpec::Regex { .. } => "regex",
            EvaluationSpec::Contains { .. } => "contains",
            EvaluationSpec::Numeric { .. } => "numeric",
            EvaluationSpec::Refusal { .. } => "refusal",
        }
    }
}

/// A single suite entry
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    pub id: String,
    pub category: String,
    pub prompt: String,
    pub evaluation: EvaluationSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

/// Fixture constructors; suites are deserialized from JSON
#[cfg(test)]
impl TestCase {
    pub fn new(id: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            category: "uncategorized".to_string(),
            prompt: prompt.into(),
            evaluation: EvaluationSpec::ExactMatch,
            expected: None,
            metadata: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_evaluation(mut self, evaluation: EvaluationSpec) -> Self {
        self.evaluation = evaluation;
        self
    }

    pub fn with_expected(mut self, expected: impl Into<String>) -> Self {
        self.expected = Some(expected.into());
        self
    }
}

impl fmt::Display for TestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.id, self.category)
    }
}

/// A test case paired with the prompt text actually sent to the provider
#[derive(Clone, Debug)]
pub struct PreparedCase {
    pub case: TestCase,
    pub rendered_prompt: String,
}

impl PreparedCase {
    pub fn new(case: TestCase, rendered_prompt: impl Into<String>) -> Self {
        Self {
            case,
            rendered_prompt: rendered_prompt.into(),
        }
    }

    /// Use the case prompt verbatim
    pub fn verbatim(case: TestCase) -> Self {
        let rendered_prompt = case.prompt.clone();
        Self {
            case,
            rendered_prompt,
        }
    }
}
