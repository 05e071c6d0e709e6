//! Run artifact storage
//!
//! Each run gets its own directory under the runs root holding the inputs,
//! raw results, verdicts, and summary as JSON/JSONL files.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::summary::RunSummary;
use crate::evaluate::Evaluation;
use crate::models::{ExecutionResult, TestCase};

pub const TEST_CASES_FILE: &str = "test_cases.jsonl";
pub const RESULTS_FILE: &str = "results.jsonl";
pub const EVALUATIONS_FILE: &str = "evaluations.jsonl";
pub const SUMMARY_FILE: &str = "summary.json";
pub const META_FILE: &str = "meta.json";
pub const REPORT_FILE: &str = "report.md";

const SCHEMA_VERSION: &str = "v1";

/// Everything a finished run writes to disk
pub struct RunArtifacts<'a> {
    pub cases: &'a [TestCase],
    pub results: &'a [ExecutionResult],
    pub evaluations: &'a [Evaluation],
    pub summary: &'a RunSummary,
}

/// Contents of `meta.json`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunMeta {
    pub run_id: String,
    pub created_at: DateTime<Utc>,
    pub artifacts: BTreeMap<String, String>,
    pub schema_version: String,
    pub tool_version: String,
}

impl RunMeta {
    fn new(run_id: &str) -> Self {
        let artifacts = [
            ("test_cases", TEST_CASES_FILE),
            ("results", RESULTS_FILE),
            ("evaluations", EVALUATIONS_FILE),
            ("summary", SUMMARY_FILE),
            ("report", REPORT_FILE),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Self {
            run_id: run_id.to_string(),
            created_at: Utc::now(),
            artifacts,
            schema_version: SCHEMA_VERSION.to_string(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Brief run information
#[derive(Clone, Debug, Serialize)]
pub struct RunInfo {
    pub id: String,
    pub dir: PathBuf,
    pub created_at: DateTime<Utc>,
    pub model: String,
    pub total_tests: usize,
    pub pass_rate: f64,
}

/// Generate unique run ID: `YYYYMMDD_HHMMSS_NNNN`
pub fn generate_run_id() -> String {
    let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
    let random: u32 = rand::random::<u32>() % 10000;
    format!("{timestamp}_{random:04}")
}

/// Run artifact storage manager
pub struct RunStorage {
    /// Directory holding one subdirectory per run
    base_dir: PathBuf,
}

impl RunStorage {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn run_dir(&self, run_id: &str) -> PathBuf {
        self.base_dir.join(run_id)
    }

    /// Write every artifact of a run, returning its directory
    pub fn write_artifacts(&self, run_id: &str, artifacts: &RunArtifacts<'_>) -> Result<PathBuf> {
        let dir = self.run_dir(run_id);
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create run directory: {}", dir.display()))?;

        write_jsonl(&dir.join(TEST_CASES_FILE), artifacts.cases)?;
        write_jsonl(&dir.join(RESULTS_FILE), artifacts.results)?;
        write_jsonl(&dir.join(EVALUATIONS_FILE), artifacts.evaluations)?;
        write_json(&dir.join(SUMMARY_FILE), artifacts.summary)?;
        write_json(&dir.join(META_FILE), &RunMeta::new(run_id))?;

        info!("Saved run artifacts to {}", dir.display());
        Ok(dir)
    }

    /// List runs, newest first; unreadable directories are skipped
    pub fn list_runs(&self) -> Result<Vec<RunInfo>> {
        if !self.base_dir.exists() {
            return Ok(Vec::new());
        }

        let mut runs = Vec::new();
        for entry in fs::read_dir(&self.base_dir)
            .with_context(|| format!("Failed to read runs directory: {}", self.base_dir.display()))?
        {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }

            let dir = entry.path();
            match (load_meta(&dir), load_summary(&dir)) {
                (Ok(meta), Ok(summary)) => runs.push(RunInfo {
                    id: meta.run_id,
                    dir,
                    created_at: meta.created_at,
                    model: summary.model,
                    total_tests: summary.total_tests,
                    pass_rate: summary.pass_rate,
                }),
                (Err(e), _) | (_, Err(e)) => {
                    debug!("Skipping {}: {}", dir.display(), e);
                }
            }
        }

        runs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(runs)
    }
}

pub fn load_meta(run_dir: &Path) -> Result<RunMeta> {
    read_json(&run_dir.join(META_FILE))
}

/// Load `summary.json` of a previous run
pub fn load_summary(run_dir: &Path) -> Result<RunSummary> {
    read_json(&run_dir.join(SUMMARY_FILE))
}

/// Load `evaluations.jsonl` of a previous run; a missing file yields none
pub fn load_evaluations(run_dir: &Path) -> Result<Vec<Evaluation>> {
    let path = run_dir.join(EVALUATIONS_FILE);
    if !path.exists() {
        return Ok(Vec::new());
    }
    read_jsonl(&path)
}

pub fn load_results(run_dir: &Path) -> Result<Vec<ExecutionResult>> {
    read_jsonl(&run_dir.join(RESULTS_FILE))
}

/// Export one row per result, joined with its verdict, as CSV
pub fn export_csv(run_dir: &Path, output: &Path) -> Result<usize> {
    let results = load_results(run_dir)?;
    let verdicts: BTreeMap<String, Evaluation> = load_evaluations(run_dir)?
        .into_iter()
        .map(|e| (e.id.clone(), e))
        .collect();

    let mut writer = csv::Writer::from_path(output)
        .with_context(|| format!("Failed to create {}", output.display()))?;

    writer.write_record([
        "id",
        "model",
        "passed",
        "reason",
        "output",
        "error_kind",
        "error",
        "latency_ms",
        "prompt_tokens",
        "completion_tokens",
        "cache_hit",
        "attempts",
    ])?;

    for result in &results {
        let verdict = verdicts.get(&result.id);
        writer.write_record([
            result.id.clone(),
            result.model.clone(),
            verdict.map(|v| v.passed.to_string()).unwrap_or_default(),
            verdict.map(|v| v.reason.clone()).unwrap_or_default(),
            result.output().unwrap_or_default().to_string(),
            result.error_kind().map(|k| k.to_string()).unwrap_or_default(),
            result.error().unwrap_or_default().to_string(),
            result.latency_ms().map(|n| n.to_string()).unwrap_or_default(),
            result.prompt_tokens().map(|n| n.to_string()).unwrap_or_default(),
            result.completion_tokens().map(|n| n.to_string()).unwrap_or_default(),
            result.cache_hit.to_string(),
            result.attempts.to_string(),
        ])?;
    }
    writer.flush()?;

    info!("Exported {} result(s) to {}", results.len(), output.display());
    Ok(results.len())
}

fn write_jsonl<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    for row in rows {
        serde_json::to_writer(&mut writer, row)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    writer.flush()?;
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse {}", path.display()))
}

fn read_jsonl<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;

    let mut rows = Vec::new();
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        rows.push(
            serde_json::from_str(&line)
                .with_context(|| format!("Failed to parse {} line {}", path.display(), idx + 1))?,
        );
    }
    Ok(rows)
}
