//! Markdown report generation

use anyhow::{Context, Result};
use std::fmt::{self, Write};
use std::path::{Path, PathBuf};

use super::compare::{CaseChange, Comparison};
use super::storage::REPORT_FILE;
use super::summary::RunSummary;
use crate::models::ExecutionResult;

const MAX_CHANGES_LISTED: usize = 25;

/// Render the run report
pub fn render_report(
    summary: &RunSummary,
    errors: &[ExecutionResult],
    comparison: Option<&Comparison>,
) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail
    let _ = write_report(&mut out, summary, errors, comparison);
    out
}

/// Render and save as `report.md` in the run directory
pub fn save_report(
    run_dir: &Path,
    summary: &RunSummary,
    errors: &[ExecutionResult],
    comparison: Option<&Comparison>,
) -> Result<PathBuf> {
    let path = run_dir.join(REPORT_FILE);
    std::fs::write(&path, render_report(summary, errors, comparison))
        .with_context(|| format!("Failed to write report: {}", path.display()))?;
    Ok(path)
}

fn write_report(
    out: &mut String,
    summary: &RunSummary,
    errors: &[ExecutionResult],
    comparison: Option<&Comparison>,
) -> fmt::Result {
    writeln!(out, "# Evaluation Report\n")?;
    writeln!(out, "## Run\n")?;
    writeln!(out, "- Run ID: `{}`", summary.run_id)?;
    writeln!(out, "- Suite: `{}`", summary.suite_id)?;
    writeln!(out, "- Model: `{}`", summary.model)?;
    if let Some(hash) = &summary.prompt_hash {
        writeln!(out, "- Prompt hash: `{}`", short_hash(hash))?;
    }
    writeln!(out, "- Total tests: `{}`", summary.total_tests)?;
    writeln!(out, "- Passed: `{}`", summary.passed)?;
    writeln!(out, "- Failed: `{}`", summary.failed)?;
    writeln!(out, "- Pass rate: `{}`", pct(summary.pass_rate))?;
    writeln!(out, "- Avg latency: `{:.2} ms`", summary.avg_latency_ms)?;
    writeln!(out, "- Cache hits: `{}`", summary.cache_hits)?;
    writeln!(out, "- Estimated cost: `{}`", usd(summary.estimated_cost))?;
    writeln!(out)?;

    writeln!(out, "## Tokens\n")?;
    writeln!(out, "| Prompt | Completion |")?;
    writeln!(out, "|---:|---:|")?;
    writeln!(
        out,
        "| {} | {} |\n",
        summary.tokens.prompt, summary.tokens.completion
    )?;

    if !summary.by_category.is_empty() {
        writeln!(out, "## By category\n")?;
        writeln!(out, "| Category | Total | Passed | Failed |")?;
        writeln!(out, "|---|---:|---:|---:|")?;
        for (category, t) in &summary.by_category {
            writeln!(out, "| {} | {} | {} | {} |", category, t.total, t.passed, t.failed)?;
        }
        writeln!(out)?;
    }

    if !summary.by_evaluator.is_empty() {
        writeln!(out, "## By evaluator\n")?;
        writeln!(out, "| Evaluator | Total | Failed |")?;
        writeln!(out, "|---|---:|---:|")?;
        for (evaluator, t) in &summary.by_evaluator {
            writeln!(out, "| {} | {} | {} |", evaluator, t.total, t.failed)?;
        }
        writeln!(out)?;
    }

    if !summary.top_failures.is_empty() {
        writeln!(out, "## Top failures\n")?;
        for f in &summary.top_failures {
            writeln!(
                out,
                "- `{}` ({}, {}): {}",
                f.id, f.category, f.evaluator, f.reason
            )?;
        }
        writeln!(out)?;
    }

    if !errors.is_empty() {
        writeln!(out, "## Execution errors\n")?;
        writeln!(out, "| Test | Kind | Attempts | Error |")?;
        writeln!(out, "|---|---|---:|---|")?;
        for result in errors {
            writeln!(
                out,
                "| {} | {} | {} | {} |",
                result.id,
                result.error_kind().map(|k| k.as_str()).unwrap_or("-"),
                result.attempts,
                result.error().unwrap_or("").replace('|', "\\|")
            )?;
        }
        writeln!(out)?;
    }

    if let Some(cmp) = comparison {
        writeln!(out, "## Baseline comparison\n")?;
        writeln!(out, "- Baseline run: `{}`", cmp.baseline_run_id)?;
        writeln!(out, "- Pass rate delta: `{}`", pct(cmp.pass_rate_delta))?;
        writeln!(out, "- Cost delta: `{}`", usd(cmp.estimated_cost_delta))?;
        writeln!(out, "- Latency delta: `{:.2} ms`", cmp.avg_latency_ms_delta)?;
        writeln!(
            out,
            "- Token delta: `{:+}` prompt, `{:+}` completion",
            cmp.prompt_tokens_delta, cmp.completion_tokens_delta
        )?;
        writeln!(out)?;

        write_changes(out, "Regressions (pass → fail)", &cmp.regressions)?;
        write_changes(out, "Improvements (fail → pass)", &cmp.improvements)?;
    }

    Ok(())
}

fn write_changes(out: &mut String, title: &str, changes: &[CaseChange]) -> fmt::Result {
    if changes.is_empty() {
        return Ok(());
    }
    writeln!(out, "### {title}\n")?;
    for change in changes.iter().take(MAX_CHANGES_LISTED) {
        writeln!(out, "- `{}`: {}", change.id, change.current_reason)?;
    }
    if changes.len() > MAX_CHANGES_LISTED {
        writeln!(out, "- … and {} more", changes.len() - MAX_CHANGES_LISTED)?;
    }
    writeln!(out)
}

fn pct(fraction: f64) -> String {
    format!("{:.2}%", fraction * 100.0)
}

fn usd(amount: f64) -> String {
    format!("${amount:.4}")
}

fn short_hash(hash: &str) -> &str {
    hash.get(..12).unwrap_or(hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ErrorKind;
    use crate::results::summary::{FailureEntry, Tally};
    use tempfile::tempdir;

    fn summary() -> RunSummary {
        let mut summary = RunSummary {
            run_id: "20260101_120000_0042".to_string(),
            suite_id: "demo".to_string(),
            model: "dummy-v0".to_string(),
            total_tests: 4,
            passed: 3,
            failed: 1,
            pass_rate: 0.75,
            avg_latency_ms: 12.5,
            ..RunSummary::default()
        };
        summary.by_category.insert(
            "math".to_string(),
            Tally {
                total: 4,
                passed: 3,
                failed: 1,
            },
        );
        summary.top_failures.push(FailureEntry {
            id: "m4".to_string(),
            category: "math".to_string(),
            evaluator: "exact_match".to_string(),
            reason: "expected '1', got '2'".to_string(),
        });
        summary
    }

    #[test]
    fn test_report_sections() {
        let errors = vec![ExecutionResult::failure(
            "m4",
            "p",
            "dummy-v0",
            ErrorKind::Timeout,
            "attempt exceeded 10ms",
            3,
        )];
        let report = render_report(&summary(), &errors, None);

        assert!(report.starts_with("# Evaluation Report"));
        assert!(report.contains("- Pass rate: `75.00%`"));
        assert!(report.contains("- Avg latency: `12.50 ms`"));
        assert!(report.contains("| math | 4 | 3 | 1 |"));
        assert!(report.contains("- `m4` (math, exact_match): expected '1', got '2'"));
        assert!(report.contains("| m4 | Timeout | 3 | attempt exceeded 10ms |"));
        assert!(!report.contains("Baseline comparison"));
    }

    #[test]
    fn test_report_with_comparison() {
        let cmp = Comparison {
            baseline_run_id: "base".to_string(),
            current_run_id: "cur".to_string(),
            total_tests_delta: 0,
            passed_delta: -1,
            failed_delta: 1,
            pass_rate_delta: -0.25,
            estimated_cost_delta: 0.0,
            avg_latency_ms_delta: 1.5,
            prompt_tokens_delta: 10,
            completion_tokens_delta: -2,
            regressions: vec![CaseChange {
                id: "m4".to_string(),
                baseline_reason: "exact match".to_string(),
                current_reason: "expected '1', got '2'".to_string(),
            }],
            improvements: Vec::new(),
        };
        let report = render_report(&summary(), &[], Some(&cmp));

        assert!(report.contains("- Pass rate delta: `-25.00%`"));
        assert!(report.contains("`+10` prompt, `-2` completion"));
        assert!(report.contains("### Regressions (pass → fail)"));
        assert!(!report.contains("### Improvements"));
    }

    #[test]
    fn test_save_report() {
        let dir = tempdir().unwrap();
        let path = save_report(dir.path(), &summary(), &[], None).unwrap();
        assert_eq!(path, dir.path().join("report.md"));
        assert!(std::fs::read_to_string(path).unwrap().contains("demo"));
    }
}
