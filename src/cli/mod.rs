//! CLI argument parsing
//!
//! Defines command-line interface using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::ProviderKind;
use crate::output::OutputFormat;

/// Concurrent LLM test-suite runner with caching, retries, and baselines
#[derive(Parser, Debug)]
#[command(name = "evalrun")]
#[command(version)]
#[command(about = "Run LLM test suites concurrently with caching, retries, and baseline comparison")]
#[command(long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file (overrides the standard locations)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Execute a test suite
    Run(RunArgs),

    /// Manage the result cache
    Cache(CacheArgs),

    /// Manage configuration
    Config(ConfigArgs),

    /// Inspect stored runs
    Runs(RunsArgs),
}

/// Arguments for run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Line-delimited JSON suite file
    pub suite: PathBuf,

    /// Prompt template file; `{{prompt}}` is replaced by each case prompt
    #[arg(short, long)]
    pub prompt: Option<PathBuf>,

    /// Model name
    #[arg(short, long)]
    pub model: Option<String>,

    /// Provider backend (dummy, openai)
    #[arg(long)]
    pub provider: Option<ProviderKind>,

    /// Maximum test cases in flight
    #[arg(short = 'j', long)]
    pub concurrency: Option<usize>,

    /// Per-attempt timeout in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Retries after the first attempt
    #[arg(long)]
    pub retries: Option<u32>,

    /// Base backoff delay in milliseconds
    #[arg(long)]
    pub backoff_ms: Option<u64>,

    /// Bypass the cache for this run
    #[arg(long)]
    pub no_cache: bool,

    /// Cache directory
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// Run artifact directory
    #[arg(long)]
    pub runs_dir: Option<PathBuf>,

    /// Previous run directory to compare against
    #[arg(short, long)]
    pub baseline: Option<PathBuf>,

    /// Output format (table, json, json-pretty, summary)
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for cache command
#[derive(Parser, Debug)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub action: CacheAction,

    /// Cache directory
    #[arg(long, global = true)]
    pub cache_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// Delete every cached result
    Clear,

    /// Show entry count and size
    Stats,
}

/// Arguments for config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Write an example configuration file
    Init {
        /// Output file
        #[arg(short, long, default_value = "evalrun.yaml")]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Show the effective configuration
    Show {
        /// Output format (yaml, json)
        #[arg(short, long, default_value = "yaml")]
        format: String,
    },

    /// Validate a configuration file
    Validate {
        /// File to validate (defaults to the first standard location found)
        file: Option<PathBuf>,
    },

    /// List the EVALRUN_* environment variables
    Env,
}

/// Arguments for runs command
#[derive(Parser, Debug)]
pub struct RunsArgs {
    #[command(subcommand)]
    pub action: RunsAction,

    /// Run artifact directory
    #[arg(long, global = true)]
    pub runs_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum RunsAction {
    /// List stored runs, newest first
    List {
        /// Output format (table, json, json-pretty, summary)
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Show a stored run
    Show {
        /// Run directory
        run: PathBuf,

        /// Output format (table, json, json-pretty, summary)
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Export a run's results to CSV
    Export {
        /// Run directory
        run: PathBuf,

        /// Output CSV file
        #[arg(short, long, default_value = "results.csv")]
        output: PathBuf,
    },
}
