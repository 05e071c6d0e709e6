//! evalrun - concurrent LLM test-suite runner
//!
//! Executes a suite of prompts against a model provider under a concurrency
//! ceiling, with per-attempt timeouts, retries with exponential backoff, and a
//! content-addressed result cache. Every case yields exactly one result, in
//! suite order, whatever happened to its siblings.
//!
//! ## Features
//!
//! - Bounded concurrent execution with index-stable result ordering
//! - Per-attempt timeouts and exponential backoff retries
//! - On-disk result cache keyed by suite, case, prompt, and parameters
//! - Exact-match, regex, and substring evaluators
//! - Run artifacts, markdown reports, and baseline comparison
//!
//! ## Usage
//!
//! ```bash
//! # Run a suite against the built-in dummy provider
//! evalrun run suites/demo.jsonl
//!
//! # Use an OpenAI-compatible endpoint with a prompt template
//! evalrun run suites/demo.jsonl --provider openai --model gpt-4o-mini --prompt prompts/v1.txt
//!
//! # Compare against an earlier run (exits 1 if the pass rate drops)
//! evalrun run suites/demo.jsonl --baseline runs/20260101_120000_0001
//!
//! # Cache and run maintenance
//! evalrun cache stats
//! evalrun runs list
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

mod cache;
mod cli;
mod config;
mod evaluate;
mod executor;
mod models;
mod output;
mod provider;
mod results;
mod suite;
mod utils;

use cache::{CacheStore, FileCacheStore};
use cli::Args;
use config::{AppConfig, ConfigFile, EnvConfig};
use executor::{split, AttemptRunner, RetryController, Scheduler};
use output::{OutputFormat, ResultFormatter};
use results::{RunArtifacts, RunStorage};
use utils::logger::{init_logger, LogLevel};
use utils::timer::Stopwatch;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let env = EnvConfig::load();

    let level = LogLevel::resolve(
        args.verbose,
        args.log_level.as_deref().or(env.log_level.as_deref()),
    );
    init_logger(level);

    if env.has_any() {
        debug!("Applying EVALRUN_* environment overrides");
    }

    let config_path = args.config.clone().or_else(|| env.config_file.clone());
    let mut config = load_config(config_path.as_deref())?;
    env.apply_to(&mut config);

    match args.command {
        cli::Command::Run(run_args) => {
            let regressed = run_suite(config, run_args).await?;
            if regressed {
                std::process::exit(1);
            }
        }
        cli::Command::Cache(cache_args) => {
            manage_cache(config, cache_args)?;
        }
        cli::Command::Config(config_args) => {
            manage_config(config, config_path.as_deref(), config_args)?;
        }
        cli::Command::Runs(runs_args) => {
            manage_runs(config, runs_args)?;
        }
    }

    Ok(())
}

/// Configuration file named on the command line or environment, else the
/// first standard location found, else built-in defaults
fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let file = match path {
        Some(path) => ConfigFile::load(path)?,
        None => ConfigFile::load_default()?,
    };
    Ok(file.app)
}

fn apply_run_overrides(config: &mut AppConfig, args: &cli::RunArgs) {
    if let Some(model) = &args.model {
        config.model = model.clone();
    }
    if let Some(provider) = args.provider {
        config.provider = provider;
    }
    if let Some(concurrency) = args.concurrency {
        config.max_concurrency = concurrency;
    }
    if let Some(timeout_ms) = args.timeout_ms {
        config.attempt_timeout_ms = timeout_ms;
    }
    if let Some(retries) = args.retries {
        config.max_retries = retries;
    }
    if let Some(backoff_ms) = args.backoff_ms {
        config.backoff_base_ms = backoff_ms;
    }
    if args.no_cache {
        config.cache_enabled = false;
    }
    if let Some(dir) = &args.cache_dir {
        config.cache_dir = dir.clone();
    }
    if let Some(dir) = &args.runs_dir {
        config.runs_dir = dir.clone();
    }
}

/// Execute a suite end to end. Returns true when the run regressed against
/// the baseline.
async fn run_suite(mut config: AppConfig, args: cli::RunArgs) -> Result<bool> {
    apply_run_overrides(&mut config, &args);
    config.validate().context("Invalid run settings")?;
    let mut stopwatch = Stopwatch::new();

    let cases = suite::load_suite(&args.suite)?;
    let suite_id = suite::suite_id(&args.suite);
    let template = args
        .prompt
        .as_ref()
        .map(suite::PromptTemplate::load)
        .transpose()?;
    let prepared = suite::prepare(cases.clone(), template.as_ref());
    info!(
        "Loaded {} test case(s) from {}",
        cases.len(),
        args.suite.display()
    );
    stopwatch.lap("load");

    let params = config.execution_params();
    let policy = config.execution_policy();
    let provider = provider::build(&config, &params)?;
    let runner = AttemptRunner::new(provider, policy.attempt_timeout);
    let mut controller = RetryController::new(runner, policy, &suite_id);
    if config.cache_enabled {
        let store: Arc<dyn CacheStore> = Arc::new(FileCacheStore::new(config.cache_dir.clone()));
        controller = controller.with_cache(store);
    } else {
        info!("Cache disabled for this run");
    }

    let results = Scheduler::new(controller).run(prepared, Arc::new(params)).await;
    stopwatch.lap("execute");

    let evaluations = evaluate::evaluate_all(&cases, &results);
    let run_id = results::generate_run_id();
    let summary = results::summarize(&config.model, &cases, &results, &evaluations)
        .with_run(&run_id, &suite_id)
        .with_prompt_hash(template.map(|t| t.hash));

    let storage = RunStorage::new(config.runs_dir.clone());
    let run_dir = storage.write_artifacts(
        &run_id,
        &RunArtifacts {
            cases: &cases,
            results: &results,
            evaluations: &evaluations,
            summary: &summary,
        },
    )?;

    let comparison = match &args.baseline {
        Some(baseline_dir) => {
            let baseline = results::load_summary(baseline_dir)
                .with_context(|| format!("Failed to load baseline: {}", baseline_dir.display()))?;
            let baseline_evals = results::load_evaluations(baseline_dir)?;
            Some(results::compare_runs(
                &baseline,
                &baseline_evals,
                &summary,
                &evaluations,
            ))
        }
        None => None,
    };

    let formatter = ResultFormatter::new(args.format);
    println!("{}", formatter.format_run(&summary, &results, &evaluations));
    if let Some(comparison) = &comparison {
        println!("{}", formatter.format_comparison(comparison));
    }

    let (all, errors) = split(results);
    if !errors.is_empty() {
        warn!(
            "{} of {} case(s) ended in an execution error",
            errors.len(),
            all.len()
        );
    }

    let report = results::save_report(&run_dir, &summary, &errors, comparison.as_ref())?;
    stopwatch.lap("report");

    info!("Run {} saved to {}", run_id, run_dir.display());
    debug!("Report written to {}", report.display());
    info!("Timing: {}", stopwatch.format());

    let regressed = comparison.is_some_and(|c| c.is_regression());
    if regressed {
        warn!("Pass rate dropped against the baseline");
    }
    Ok(regressed)
}

fn manage_cache(config: AppConfig, args: cli::CacheArgs) -> Result<()> {
    let dir = args.cache_dir.unwrap_or(config.cache_dir);
    let store = FileCacheStore::new(dir);

    match args.action {
        cli::CacheAction::Clear => {
            let removed = store.clear()?;
            println!(
                "✓ Removed {} cached result(s) from {}",
                removed,
                store.dir().display()
            );
        }
        cli::CacheAction::Stats => {
            let stats = store.stats()?;
            println!("Cache: {}", store.dir().display());
            println!("  Entries: {}", stats.entries);
            println!("  Size:    {} bytes", stats.bytes);
        }
    }

    Ok(())
}

fn manage_config(
    config: AppConfig,
    config_path: Option<&Path>,
    args: cli::ConfigArgs,
) -> Result<()> {
    match args.action {
        cli::ConfigAction::Init { output, force } => {
            if output.exists() && !force {
                anyhow::bail!(
                    "Configuration file already exists: {}. Use --force to overwrite.",
                    output.display()
                );
            }

            ConfigFile::example().save(&output)?;
            println!("✓ Configuration file created: {}", output.display());
            println!("\nEdit the file to customize your settings.");
        }

        cli::ConfigAction::Show { format } => {
            let effective = ConfigFile {
                app: config,
                ..ConfigFile::default()
            };
            let rendered = if format == "json" {
                serde_json::to_string_pretty(&effective)?
            } else {
                serde_yaml::to_string(&effective)?
            };
            println!("{rendered}");
        }

        cli::ConfigAction::Validate { file } => {
            let Some(path) = file
                .or_else(|| config_path.map(Path::to_path_buf))
                .or_else(ConfigFile::find)
            else {
                anyhow::bail!("No configuration file found");
            };

            match ConfigFile::load(&path) {
                Ok(_) => {
                    println!("✓ Configuration file is valid: {}", path.display());
                }
                Err(e) => {
                    println!("✗ Configuration file is invalid: {}", path.display());
                    println!("  Error: {e:#}");
                    return Err(e);
                }
            }
        }

        cli::ConfigAction::Env => {
            config::print_env_help();
        }
    }

    Ok(())
}

fn manage_runs(config: AppConfig, args: cli::RunsArgs) -> Result<()> {
    let runs_dir = args.runs_dir.unwrap_or(config.runs_dir);

    match args.action {
        cli::RunsAction::List { format } => {
            let runs = RunStorage::new(runs_dir).list_runs()?;
            println!("{}", ResultFormatter::new(format).format_runs(&runs));
        }

        cli::RunsAction::Show { run, format } => {
            let meta = results::load_meta(&run)?;
            let summary = results::load_summary(&run)?;
            let results = results::load_results(&run)?;
            let evaluations = results::load_evaluations(&run)?;

            if format == OutputFormat::Table {
                println!(
                    "Run {} created {} (schema {}, evalrun {})",
                    meta.run_id,
                    meta.created_at.format("%Y-%m-%d %H:%M:%S"),
                    meta.schema_version,
                    meta.tool_version
                );
            }
            println!(
                "{}",
                ResultFormatter::new(format).format_run(&summary, &results, &evaluations)
            );
        }

        cli::RunsAction::Export { run, output } => {
            let rows = results::export_csv(&run, &output)?;
            println!("✓ Exported {} result(s) to {}", rows, output.display());
        }
    }

    Ok(())
}
