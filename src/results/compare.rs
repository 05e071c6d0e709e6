//! Baseline comparison
//!
//! Compares a run against an earlier one: aggregate deltas plus the cases
//! that flipped between pass and fail.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::summary::RunSummary;
use crate::evaluate::Evaluation;

/// A case whose verdict differs between the two runs
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseChange {
    pub id: String,
    pub baseline_reason: String,
    pub current_reason: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub baseline_run_id: String,
    pub current_run_id: String,
    pub total_tests_delta: i64,
    pub passed_delta: i64,
    pub failed_delta: i64,
    pub pass_rate_delta: f64,
    pub estimated_cost_delta: f64,
    pub avg_latency_ms_delta: f64,
    pub prompt_tokens_delta: i64,
    pub completion_tokens_delta: i64,
    /// Passed in the baseline, failed now; sorted by id
    pub regressions: Vec<CaseChange>,
    /// Failed in the baseline, passed now; sorted by id
    pub improvements: Vec<CaseChange>,
}

impl Comparison {
    /// A falling pass rate fails the run
    pub fn is_regression(&self) -> bool {
        self.pass_rate_delta < 0.0
    }
}

pub fn compare_runs(
    baseline: &RunSummary,
    baseline_evals: &[Evaluation],
    current: &RunSummary,
    current_evals: &[Evaluation],
) -> Comparison {
    let before = index_by_id(baseline_evals);
    let after = index_by_id(current_evals);

    let mut regressions = Vec::new();
    let mut improvements = Vec::new();

    // BTreeMap iteration keeps both lists sorted by id
    for (id, b) in &before {
        let Some(c) = after.get(id) else {
            continue;
        };
        let change = || CaseChange {
            id: id.to_string(),
            baseline_reason: b.reason.clone(),
            current_reason: c.reason.clone(),
        };
        match (b.passed, c.passed) {
            (true, false) => regressions.push(change()),
            (false, true) => improvements.push(change()),
            _ => {}
        }
    }

    Comparison {
        baseline_run_id: baseline.run_id.clone(),
        current_run_id: current.run_id.clone(),
        total_tests_delta: delta(current.total_tests, baseline.total_tests),
        passed_delta: delta(current.passed, baseline.passed),
        failed_delta: delta(current.failed, baseline.failed),
        pass_rate_delta: current.pass_rate - baseline.pass_rate,
        estimated_cost_delta: current.estimated_cost - baseline.estimated_cost,
        avg_latency_ms_delta: current.avg_latency_ms - baseline.avg_latency_ms,
        prompt_tokens_delta: current.tokens.prompt as i64 - baseline.tokens.prompt as i64,
        completion_tokens_delta: current.tokens.completion as i64
            - baseline.tokens.completion as i64,
        regressions,
        improvements,
    }
}

fn index_by_id(evals: &[Evaluation]) -> BTreeMap<&str, &Evaluation> {
    evals
        .iter()
        .filter(|e| !e.id.is_empty())
        .map(|e| (e.id.as_str(), e))
        .collect()
}

fn delta(current: usize, baseline: usize) -> i64 {
    current as i64 - baseline as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verdict(id: &str, passed: bool) -> Evaluation {
        Evaluation {
            id: id.to_string(),
            evaluator: "exact_match".to_string(),
            passed,
            reason: if passed { "exact match" } else { "mismatch" }.to_string(),
        }
    }

    fn summary(run_id: &str, passed: usize, total: usize) -> RunSummary {
        RunSummary {
            run_id: run_id.to_string(),
            total_tests: total,
            passed,
            failed: total - passed,
            pass_rate: passed as f64 / total as f64,
            avg_latency_ms: 10.0,
            ..RunSummary::default()
        }
    }

    #[test]
    fn test_regressions_and_improvements() {
        let baseline = [
            verdict("c", true),
            verdict("a", true),
            verdict("b", false),
            verdict("gone", true),
        ];
        let current = [
            verdict("a", false),
            verdict("b", true),
            verdict("c", false),
            verdict("new", false),
        ];

        let cmp = compare_runs(
            &summary("base", 3, 4),
            &baseline,
            &summary("cur", 1, 4),
            &current,
        );

        let ids: Vec<_> = cmp.regressions.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
        assert_eq!(cmp.regressions[0].baseline_reason, "exact match");
        assert_eq!(cmp.regressions[0].current_reason, "mismatch");
        assert_eq!(cmp.improvements.len(), 1);
        assert_eq!(cmp.improvements[0].id, "b");

        assert_eq!(cmp.passed_delta, -2);
        assert_eq!(cmp.failed_delta, 2);
        assert_eq!(cmp.pass_rate_delta, -0.5);
        assert!(cmp.is_regression());
        assert_eq!(cmp.baseline_run_id, "base");
    }

    #[test]
    fn test_unchanged_run_is_not_a_regression() {
        let evals = [verdict("a", true), verdict("b", false)];
        let cmp = compare_runs(&summary("x", 1, 2), &evals, &summary("y", 1, 2), &evals);

        assert!(!cmp.is_regression());
        assert!(cmp.regressions.is_empty());
        assert!(cmp.improvements.is_empty());
        assert_eq!(cmp.avg_latency_ms_delta, 0.0);
    }
}
