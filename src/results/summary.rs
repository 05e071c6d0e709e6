//! Run summary
//!
//! Aggregates cases, results, and verdicts into the numbers a run is judged by.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::pricing::{estimate_cost, round6};
use crate::evaluate::Evaluation;
use crate::models::{ExecutionResult, TestCase};

const TOP_FAILURES: usize = 10;

/// Pass/fail counts for one group
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
}

impl Tally {
    fn record(&mut self, passed: bool) {
        self.total += 1;
        if passed {
            self.passed += 1;
        } else {
            self.failed += 1;
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureEntry {
    pub id: String,
    pub category: String,
    pub evaluator: String,
    pub reason: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenTotals {
    pub prompt: u64,
    pub completion: u64,
}

/// Aggregated outcome of a run, persisted as `summary.json`
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSummary {
    pub run_id: String,
    pub suite_id: String,
    pub model: String,
    pub prompt_hash: Option<String>,
    pub total_tests: usize,
    pub passed: usize,
    pub failed: usize,
    /// Fraction in `[0, 1]`
    pub pass_rate: f64,
    pub by_category: BTreeMap<String, Tally>,
    pub by_evaluator: BTreeMap<String, Tally>,
    pub top_failures: Vec<FailureEntry>,
    pub avg_latency_ms: f64,
    pub tokens: TokenTotals,
    pub cache_hits: usize,
    pub errors: usize,
    pub errors_by_kind: BTreeMap<String, usize>,
    /// USD, provider calls only: cache hits cost nothing
    pub estimated_cost: f64,
}

impl RunSummary {
    pub fn with_run(mut self, run_id: impl Into<String>, suite_id: impl Into<String>) -> Self {
        self.run_id = run_id.into();
        self.suite_id = suite_id.into();
        self
    }

    pub fn with_prompt_hash(mut self, hash: Option<String>) -> Self {
        self.prompt_hash = hash;
        self
    }
}

/// Aggregate index-aligned cases, results, and evaluations
pub fn summarize(
    model: &str,
    cases: &[TestCase],
    results: &[ExecutionResult],
    evaluations: &[Evaluation],
) -> RunSummary {
    let mut summary = RunSummary {
        model: model.to_string(),
        total_tests: cases.len(),
        ..RunSummary::default()
    };

    let mut latency_sum = 0u64;
    let mut latency_count = 0u64;
    let mut cost = 0.0;

    for (idx, case) in cases.iter().enumerate() {
        let evaluation = evaluations.get(idx);
        let passed = evaluation.is_some_and(|e| e.passed);
        let evaluator = evaluation
            .map(|e| e.evaluator.clone())
            .unwrap_or_else(|| case.evaluation.name().to_string());

        if passed {
            summary.passed += 1;
        } else {
            summary.failed += 1;
            summary.top_failures.push(FailureEntry {
                id: case.id.clone(),
                category: case.category.clone(),
                evaluator: evaluator.clone(),
                reason: evaluation
                    .map(|e| e.reason.clone())
                    .unwrap_or_else(|| "not evaluated".to_string()),
            });
        }
        summary
            .by_category
            .entry(case.category.clone())
            .or_default()
            .record(passed);
        summary.by_evaluator.entry(evaluator).or_default().record(passed);

        let Some(result) = results.get(idx) else {
            continue;
        };

        if let Some(latency) = result.latency_ms() {
            latency_sum += latency;
            latency_count += 1;
        }

        let prompt_tokens = u64::from(result.prompt_tokens().unwrap_or(0));
        let completion_tokens = u64::from(result.completion_tokens().unwrap_or(0));
        summary.tokens.prompt += prompt_tokens;
        summary.tokens.completion += completion_tokens;

        if result.cache_hit {
            summary.cache_hits += 1;
        } else {
            cost += estimate_cost(&result.model, prompt_tokens, completion_tokens);
        }

        if let Some(kind) = result.error_kind() {
            summary.errors += 1;
            *summary.errors_by_kind.entry(kind.to_string()).or_default() += 1;
        }
    }

    summary.top_failures.truncate(TOP_FAILURES);
    if summary.total_tests > 0 {
        summary.pass_rate = summary.passed as f64 / summary.total_tests as f64;
    }
    if latency_count > 0 {
        summary.avg_latency_ms = latency_sum as f64 / latency_count as f64;
    }
    summary.estimated_cost = round6(cost);

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluate::evaluate_all;
    use crate::models::{ErrorKind, ProviderOutput};

    fn output(id: &str, text: &str, latency_ms: u64, model: &str) -> ExecutionResult {
        let mut out = ProviderOutput::new(text, model).with_tokens(1000, 1000);
        out.latency_ms = latency_ms;
        ExecutionResult::success(id, "p", out, 1)
    }

    #[test]
    fn test_summarize() {
        let cases = vec![
            TestCase::new("m1", "p").with_category("math").with_expected("408"),
            TestCase::new("m2", "p").with_category("math").with_expected("63"),
            TestCase::new("s1", "p").with_category("science").with_expected("x"),
        ];
        let results = vec![
            output("m1", "408", 10, "gpt-4o-mini"),
            output("m2", "64", 30, "gpt-4o-mini").into_cache_hit(),
            ExecutionResult::failure("s1", "p", "gpt-4o-mini", ErrorKind::Timeout, "slow", 3),
        ];
        let evaluations = evaluate_all(&cases, &results);

        let summary = summarize("gpt-4o-mini", &cases, &results, &evaluations)
            .with_run("20260101_000000_0001", "demo");

        assert_eq!(summary.total_tests, 3);
        assert_eq!(summary.passed, 1);
        assert_eq!(summary.failed, 2);
        assert!((summary.pass_rate - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(
            summary.by_category["math"],
            Tally {
                total: 2,
                passed: 1,
                failed: 1
            }
        );
        assert_eq!(summary.by_evaluator["exact_match"].total, 3);
        assert_eq!(summary.avg_latency_ms, 20.0);
        assert_eq!(summary.tokens.prompt, 2000);
        assert_eq!(summary.cache_hits, 1);
        assert_eq!(summary.errors, 1);
        assert_eq!(summary.errors_by_kind["Timeout"], 1);
        // Only the fresh call is billed
        assert_eq!(summary.estimated_cost, 0.00075);

        let ids: Vec<_> = summary.top_failures.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["m2", "s1"]);
        assert!(summary.top_failures[1].reason.contains("Timeout"));
    }

    #[test]
    fn test_top_failures_are_capped() {
        let cases: Vec<_> = (0..15)
            .map(|i| TestCase::new(i.to_string(), "p").with_expected("yes"))
            .collect();
        let results: Vec<_> = (0..15)
            .map(|i| output(&i.to_string(), "no", 1, "dummy-v0"))
            .collect();
        let evaluations = evaluate_all(&cases, &results);

        let summary = summarize("dummy-v0", &cases, &results, &evaluations);
        assert_eq!(summary.failed, 15);
        assert_eq!(summary.top_failures.len(), 10);
        assert_eq!(summary.estimated_cost, 0.0);
    }

    #[test]
    fn test_empty_run() {
        let summary = summarize("m", &[], &[], &[]);
        assert_eq!(summary.total_tests, 0);
        assert_eq!(summary.pass_rate, 0.0);
        assert_eq!(summary.avg_latency_ms, 0.0);
    }
}
