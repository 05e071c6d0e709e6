//! Console formatters for run results
//!
//! Renders results, run summaries, baseline comparisons, and run listings
//! as tables, JSON, or one-line summaries.

use serde::Serialize;
use std::str::FromStr;

use crate::evaluate::Evaluation;
use crate::models::ExecutionResult;
use crate::results::{Comparison, RunInfo, RunSummary};

const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

/// Longest output excerpt shown in a table row
const EXCERPT_LEN: usize = 40;

/// Output format options
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    JsonPretty,
    Summary,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "json-pretty" | "jsonpretty" => Ok(OutputFormat::JsonPretty),
            "summary" => Ok(OutputFormat::Summary),
            _ => Err(format!(
                "Unknown format: {s} (expected table, json, json-pretty, or summary)"
            )),
        }
    }
}

/// Everything printed for a finished run in the JSON formats
#[derive(Serialize)]
struct RunView<'a> {
    summary: &'a RunSummary,
    results: &'a [ExecutionResult],
    evaluations: &'a [Evaluation],
}

/// Result formatter
pub struct ResultFormatter {
    format: OutputFormat,
    colorize: bool,
}

impl ResultFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            colorize: true,
        }
    }

    pub fn no_color(mut self) -> Self {
        self.colorize = false;
        self
    }

    fn paint(&self, color: &str, text: &str) -> String {
        if self.colorize {
            format!("{color}{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    fn paint_rate(&self, rate: f64) -> String {
        let text = format!("{:5.1}%", rate * 100.0);
        let color = if rate >= 0.9 {
            GREEN
        } else if rate >= 0.5 {
            YELLOW
        } else {
            RED
        };
        self.paint(color, &text)
    }

    fn to_json<T: Serialize>(&self, value: &T) -> String {
        if self.format == OutputFormat::JsonPretty {
            serde_json::to_string_pretty(value).unwrap_or_default()
        } else {
            serde_json::to_string(value).unwrap_or_default()
        }
    }

    fn format_result_table(&self, result: &ExecutionResult, verdict: Option<&Evaluation>) -> String {
        let status = match (result.error_kind(), verdict.map(|v| v.passed)) {
            (Some(_), _) => self.paint(RED, "! ERROR"),
            (None, Some(true)) => self.paint(GREEN, "✓ PASS "),
            (None, Some(false)) => self.paint(RED, "✗ FAIL "),
            (None, None) => self.paint(YELLOW, "○ DONE "),
        };

        let timing = match result.latency_ms() {
            Some(ms) if result.cache_hit => format!("{ms:>6}ms cached"),
            Some(ms) => format!("{ms:>6}ms       "),
            None => format!("{:>6} attempt(s)", result.attempts),
        };

        let detail = match (result.output(), result.error()) {
            (_, Some(error)) => format!(
                "{}: {}",
                result.error_kind().map(|k| k.as_str()).unwrap_or("error"),
                excerpt(error)
            ),
            (Some(output), None) => excerpt(output),
            (None, None) => String::new(),
        };

        format!("{:24} {} [{}] {}", result.id, status, timing, detail)
    }

    /// Format a finished run: every result followed by the summary footer
    pub fn format_run(
        &self,
        summary: &RunSummary,
        results: &[ExecutionResult],
        evaluations: &[Evaluation],
    ) -> String {
        match self.format {
            OutputFormat::Table => self.format_run_table(summary, results, evaluations),
            OutputFormat::Json | OutputFormat::JsonPretty => self.to_json(&RunView {
                summary,
                results,
                evaluations,
            }),
            OutputFormat::Summary => self.format_summary_brief(summary),
        }
    }

    fn format_run_table(
        &self,
        summary: &RunSummary,
        results: &[ExecutionResult],
        evaluations: &[Evaluation],
    ) -> String {
        let mut output = String::new();

        output.push_str("\n════════════════════════════════════════════════════════════════\n");
        output.push_str(&format!(
            " Run {} | suite {} | model {}\n",
            summary.run_id, summary.suite_id, summary.model
        ));
        output.push_str("════════════════════════════════════════════════════════════════\n");

        for (idx, result) in results.iter().enumerate() {
            let verdict = evaluations.get(idx).filter(|e| e.id == result.id);
            output.push_str(&format!(" {}\n", self.format_result_table(result, verdict)));
        }

        output.push_str("────────────────────────────────────────────────────────────────\n");
        output.push_str(&self.format_summary_table(summary));
        output
    }

    fn format_summary_table(&self, summary: &RunSummary) -> String {
        let mut output = String::new();

        let failed = if summary.failed > 0 {
            self.paint(RED, &summary.failed.to_string())
        } else {
            summary.failed.to_string()
        };
        output.push_str(&format!(
            " Total: {} | Pass: {} | Fail: {} | Errors: {} | Cached: {}\n",
            summary.total_tests,
            self.paint(GREEN, &summary.passed.to_string()),
            failed,
            summary.errors,
            summary.cache_hits
        ));
        output.push_str(&format!(
            " Pass Rate: {} | Avg Latency: {:.1}ms | Cost: ${:.6}\n",
            self.paint_rate(summary.pass_rate),
            summary.avg_latency_ms,
            summary.estimated_cost
        ));

        if !summary.by_category.is_empty() {
            output.push_str("\n Category              Pass  Fail  Total\n");
            for (category, tally) in &summary.by_category {
                output.push_str(&format!(
                    " {:20} {:5} {:5} {:6}\n",
                    category, tally.passed, tally.failed, tally.total
                ));
            }
        }

        output
    }

    fn format_summary_brief(&self, summary: &RunSummary) -> String {
        format!(
            "{} on {}: {}/{} passed ({:.1}%), {} errors, {} cached",
            summary.model,
            summary.suite_id,
            summary.passed,
            summary.total_tests,
            summary.pass_rate * 100.0,
            summary.errors,
            summary.cache_hits
        )
    }

    /// Format a baseline comparison
    pub fn format_comparison(&self, comparison: &Comparison) -> String {
        match self.format {
            OutputFormat::Json | OutputFormat::JsonPretty => self.to_json(comparison),
            OutputFormat::Summary => format!(
                "vs {}: pass rate {:+.1}pp, {} regressions, {} improvements",
                comparison.baseline_run_id,
                comparison.pass_rate_delta * 100.0,
                comparison.regressions.len(),
                comparison.improvements.len()
            ),
            OutputFormat::Table => self.format_comparison_table(comparison),
        }
    }

    fn format_comparison_table(&self, comparison: &Comparison) -> String {
        let mut output = String::new();

        output.push_str(&format!(
            "\n Baseline {} -> {}\n",
            comparison.baseline_run_id, comparison.current_run_id
        ));

        let delta = format!("{:+.1}pp", comparison.pass_rate_delta * 100.0);
        let delta = if comparison.is_regression() {
            self.paint(RED, &delta)
        } else {
            self.paint(GREEN, &delta)
        };
        output.push_str(&format!(
            " Pass Rate: {} | Passed: {:+} | Failed: {:+} | Cost: {:+.6}\n",
            delta, comparison.passed_delta, comparison.failed_delta, comparison.estimated_cost_delta
        ));

        for change in &comparison.regressions {
            output.push_str(&format!(
                "   {} {}: {}\n",
                self.paint(RED, "▼"),
                change.id,
                change.current_reason
            ));
        }
        for change in &comparison.improvements {
            output.push_str(&format!("   {} {}\n", self.paint(GREEN, "▲"), change.id));
        }

        output
    }

    /// Format stored runs, newest first
    pub fn format_runs(&self, runs: &[RunInfo]) -> String {
        match self.format {
            OutputFormat::Json | OutputFormat::JsonPretty => self.to_json(&runs),
            OutputFormat::Summary => runs
                .iter()
                .map(|run| run.id.as_str())
                .collect::<Vec<_>>()
                .join("\n"),
            OutputFormat::Table => self.format_runs_table(runs),
        }
    }

    fn format_runs_table(&self, runs: &[RunInfo]) -> String {
        if runs.is_empty() {
            return "No runs found.".to_string();
        }

        let mut output = String::new();
        output.push_str(&format!(
            "{:22} {:20} {:18} {:>6} {:>7}\n",
            "RUN", "CREATED", "MODEL", "TESTS", "PASS"
        ));
        output.push_str(&format!("{}\n", "─".repeat(77)));

        for run in runs {
            output.push_str(&format!(
                "{:22} {:20} {:18} {:>6} {}\n",
                run.id,
                run.created_at.format("%Y-%m-%d %H:%M:%S"),
                run.model,
                run.total_tests,
                self.paint_rate(run.pass_rate)
            ));
        }

        output
    }
}

impl Default for ResultFormatter {
    fn default() -> Self {
        Self::new(OutputFormat::Table)
    }
}

/// First line of `text`, cut to the excerpt length
fn excerpt(text: &str) -> String {
    let line = text.lines().next().unwrap_or("");
    if line.chars().count() > EXCERPT_LEN {
        let cut: String = line.chars().take(EXCERPT_LEN).collect();
        format!("{cut}…")
    } else {
        line.to_string()
    }
}
