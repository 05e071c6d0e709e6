//! Environment variable configuration
//!
//! Provides environment variable overrides for configuration.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use super::{AppConfig, ProviderKind};

/// Environment variable prefix
const ENV_PREFIX: &str = "EVALRUN";

/// Overrides read from `EVALRUN_*` variables
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EnvConfig {
    /// Model from EVALRUN_MODEL
    pub model: Option<String>,
    /// Concurrency ceiling from EVALRUN_CONCURRENCY
    pub concurrency: Option<usize>,
    /// Attempt timeout from EVALRUN_TIMEOUT_MS
    pub timeout_ms: Option<u64>,
    /// Retry count from EVALRUN_RETRIES
    pub retries: Option<u32>,
    /// Backoff base from EVALRUN_BACKOFF_MS
    pub backoff_ms: Option<u64>,
    /// Cache directory from EVALRUN_CACHE_DIR
    pub cache_dir: Option<PathBuf>,
    /// Cache bypass from EVALRUN_NO_CACHE
    pub no_cache: Option<bool>,
    /// Run artifact directory from EVALRUN_RUNS_DIR
    pub runs_dir: Option<PathBuf>,
    /// Config file from EVALRUN_CONFIG
    pub config_file: Option<PathBuf>,
    /// Log level from EVALRUN_LOG_LEVEL
    pub log_level: Option<String>,
    /// Provider from EVALRUN_PROVIDER
    pub provider: Option<ProviderKind>,
}

impl EnvConfig {
    /// Load configuration from environment variables
    pub fn load() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |name: &str| get_env(&lookup, name);

        Self {
            model: get("MODEL"),
            concurrency: get_env_parse(&lookup, "CONCURRENCY"),
            timeout_ms: get_env_parse(&lookup, "TIMEOUT_MS"),
            retries: get_env_parse(&lookup, "RETRIES"),
            backoff_ms: get_env_parse(&lookup, "BACKOFF_MS"),
            cache_dir: get("CACHE_DIR").map(PathBuf::from),
            no_cache: get("NO_CACHE").map(|v| parse_bool(&v)),
            runs_dir: get("RUNS_DIR").map(PathBuf::from),
            config_file: get("CONFIG").map(PathBuf::from),
            log_level: get("LOG_LEVEL"),
            provider: get_env_parse(&lookup, "PROVIDER"),
        }
    }

    /// Check if any environment variables are set
    pub fn has_any(&self) -> bool {
        *self != Self::default()
    }

    /// Overlay the variables that are set onto `config`
    pub fn apply_to(&self, config: &mut AppConfig) {
        if let Some(model) = &self.model {
            config.model = model.clone();
        }
        if let Some(concurrency) = self.concurrency {
            config.max_concurrency = concurrency;
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.attempt_timeout_ms = timeout_ms;
        }
        if let Some(retries) = self.retries {
            config.max_retries = retries;
        }
        if let Some(backoff_ms) = self.backoff_ms {
            config.backoff_base_ms = backoff_ms;
        }
        if let Some(dir) = &self.cache_dir {
            config.cache_dir = dir.clone();
        }
        if let Some(no_cache) = self.no_cache {
            config.cache_enabled = !no_cache;
        }
        if let Some(dir) = &self.runs_dir {
            config.runs_dir = dir.clone();
        }
        if let Some(provider) = self.provider {
            config.provider = provider;
        }
    }
}

/// Get environment variable with prefix, ignoring blank values
fn get_env(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(&format!("{ENV_PREFIX}_{name}")).filter(|v| !v.trim().is_empty())
}

/// Get environment variable and parse to type
fn get_env_parse<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<T> {
    get_env(lookup, name).and_then(|v| v.trim().parse().ok())
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on" | "enabled"
    )
}

/// Print all EVALRUN environment variables
pub fn print_env_help() {
    println!("Environment Variables:");
    println!();
    println!("  {ENV_PREFIX}_MODEL        Model name");
    println!("  {ENV_PREFIX}_CONCURRENCY  Maximum test cases in flight");
    println!("  {ENV_PREFIX}_TIMEOUT_MS   Per-attempt timeout in milliseconds");
    println!("  {ENV_PREFIX}_RETRIES      Retries after the first attempt");
    println!("  {ENV_PREFIX}_BACKOFF_MS   Base backoff delay in milliseconds");
    println!("  {ENV_PREFIX}_CACHE_DIR    Cache directory");
    println!("  {ENV_PREFIX}_NO_CACHE     Bypass the cache (true/false)");
    println!("  {ENV_PREFIX}_RUNS_DIR     Run artifact directory");
    println!("  {ENV_PREFIX}_CONFIG       Path to configuration file");
    println!("  {ENV_PREFIX}_LOG_LEVEL    Log level (error, warn, info, debug, trace)");
    println!("  {ENV_PREFIX}_PROVIDER     Provider backend (dummy, openai)");
    println!();
    println!("Example:");
    println!("  export {ENV_PREFIX}_CONCURRENCY=8");
    println!("  evalrun run suites/demo.jsonl");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_vars(vars: &[(&str, &str)]) -> EnvConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        EnvConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_env_config_default() {
        let config = from_vars(&[]);
        assert_eq!(config, EnvConfig::default());
        assert!(!config.has_any());
    }

    #[test]
    fn test_env_values_parse() {
        let config = from_vars(&[
            ("EVALRUN_MODEL", "gpt-4o"),
            ("EVALRUN_CONCURRENCY", "16"),
            ("EVALRUN_TIMEOUT_MS", "1500"),
            ("EVALRUN_NO_CACHE", "yes"),
            ("EVALRUN_PROVIDER", "openai"),
        ]);

        assert!(config.has_any());
        assert_eq!(config.model.as_deref(), Some("gpt-4o"));
        assert_eq!(config.concurrency, Some(16));
        assert_eq!(config.timeout_ms, Some(1500));
        assert_eq!(config.no_cache, Some(true));
        assert_eq!(config.provider, Some(ProviderKind::OpenAi));
    }

    #[test]
    fn test_unparseable_values_are_ignored() {
        let config = from_vars(&[("EVALRUN_RETRIES", "many"), ("EVALRUN_MODEL", "  ")]);
        assert_eq!(config.retries, None);
        assert_eq!(config.model, None);
    }

    #[test]
    fn test_apply_to() {
        let mut app = AppConfig::default();
        from_vars(&[
            ("EVALRUN_RETRIES", "5"),
            ("EVALRUN_BACKOFF_MS", "10"),
            ("EVALRUN_NO_CACHE", "1"),
            ("EVALRUN_RUNS_DIR", "/tmp/runs"),
        ])
        .apply_to(&mut app);

        assert_eq!(app.max_retries, 5);
        assert_eq!(app.backoff_base_ms, 10);
        assert!(!app.cache_enabled);
        assert_eq!(app.runs_dir, PathBuf::from("/tmp/runs"));
        assert_eq!(app.max_concurrency, 4);
    }
}
