//! Configuration module
//!
//! Handles loading and managing configuration.

mod env;
mod file;

pub use env::{print_env_help, EnvConfig};
pub use file::ConfigFile;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::executor::ExecutionPolicy;
use crate::models::ExecutionParams;
use crate::provider::DUMMY_MODEL;

const MAX_RETRIES_LIMIT: u32 = 10;

/// Which provider backend answers prompts
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Dummy,
    #[serde(rename = "openai")]
    OpenAi,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::Dummy => write!(f, "dummy"),
            ProviderKind::OpenAi => write!(f, "openai"),
        }
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dummy" => Ok(ProviderKind::Dummy),
            "openai" => Ok(ProviderKind::OpenAi),
            _ => Err(format!("Unknown provider: {s} (expected dummy or openai)")),
        }
    }
}

/// Application configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Model name sent to the provider
    pub model: String,

    /// Sampling temperature
    pub temperature: f64,

    /// Completion token limit
    pub max_tokens: u32,

    /// Maximum test cases in flight at once
    pub max_concurrency: usize,

    /// Duration budget of a single attempt
    pub attempt_timeout_ms: u64,

    /// Retries after the first attempt
    pub max_retries: u32,

    /// Base delay of the exponential backoff
    pub backoff_base_ms: u64,

    /// Cache directory
    pub cache_dir: PathBuf,

    /// Serve and store results through the cache
    pub cache_enabled: bool,

    /// Directory that receives run artifacts
    pub runs_dir: PathBuf,

    /// Provider backend
    pub provider: ProviderKind,

    /// OpenAI-compatible endpoint settings
    pub openai: OpenAiConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model: DUMMY_MODEL.to_string(),
            temperature: 0.0,
            max_tokens: 256,
            max_concurrency: 4,
            attempt_timeout_ms: 30_000,
            max_retries: 2,
            backoff_base_ms: 50,
            cache_dir: PathBuf::from(".cache"),
            cache_enabled: true,
            runs_dir: PathBuf::from("runs"),
            provider: ProviderKind::Dummy,
            openai: OpenAiConfig::default(),
        }
    }
}

impl AppConfig {
    /// Inference parameters shared by every case of a run
    pub fn execution_params(&self) -> ExecutionParams {
        ExecutionParams::new(&self.model)
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens)
    }

    /// Reject settings the engine cannot run with
    ///
    /// Checked on the merged result, after file, environment, and flags.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.max_concurrency >= 1,
            "max_concurrency must be at least 1"
        );
        anyhow::ensure!(
            self.max_retries <= MAX_RETRIES_LIMIT,
            "max_retries {} exceeds the limit of {}",
            self.max_retries,
            MAX_RETRIES_LIMIT
        );
        anyhow::ensure!(
            (0.0..=2.0).contains(&self.temperature),
            "temperature {} is outside [0, 2]",
            self.temperature
        );
        Ok(())
    }

    /// Scheduling and retry policy handed to the engine at construction
    pub fn execution_policy(&self) -> ExecutionPolicy {
        ExecutionPolicy::default()
            .with_max_concurrency(self.max_concurrency)
            .with_attempt_timeout(Duration::from_millis(self.attempt_timeout_ms))
            .with_max_attempts(self.max_retries.saturating_add(1))
            .with_backoff_base(Duration::from_millis(self.backoff_base_ms))
    }
}

/// OpenAI-compatible endpoint configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    /// API base URL, `/chat/completions` is appended
    pub base_url: String,

    /// Environment variable holding the API key
    pub api_key_env: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.model, "dummy-v0");
        assert_eq!(config.max_concurrency, 4);
        assert_eq!(config.attempt_timeout_ms, 30_000);
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.backoff_base_ms, 50);
        assert!(config.cache_enabled);
    }

    #[test]
    fn test_execution_policy() {
        let policy = AppConfig::default().execution_policy();
        assert_eq!(policy.max_concurrency, 4);
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.attempt_timeout, Duration::from_secs(30));
        assert_eq!(policy.backoff_base, Duration::from_millis(50));
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = "model: gpt-4o-mini\nprovider: openai\nmax_concurrency: 8\n";
        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.provider, ProviderKind::OpenAi);
        assert_eq!(config.max_concurrency, 8);
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.openai.api_key_env, "OPENAI_API_KEY");
    }

    #[test]
    fn test_json_round_trip_keeps_provider_name() {
        let config = AppConfig {
            provider: ProviderKind::OpenAi,
            temperature: 0.7,
            ..AppConfig::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains(r#""provider":"openai""#));
        assert_eq!(serde_json::from_str::<AppConfig>(&json).unwrap(), config);
    }

    #[test]
    fn test_validate_merged_overrides() {
        let mut config = AppConfig::default();
        config.validate().unwrap();

        let env = EnvConfig::from_lookup(|name| match name {
            "EVALRUN_CONCURRENCY" => Some("0".to_string()),
            _ => None,
        });
        env.apply_to(&mut config);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_concurrency"));

        config.max_concurrency = 2;
        config.max_retries = 11;
        assert!(config.validate().is_err());
        config.max_retries = 10;
        config.validate().unwrap();
    }

    #[test]
    fn test_provider_kind_parse() {
        assert_eq!("OpenAI".parse::<ProviderKind>(), Ok(ProviderKind::OpenAi));
        assert_eq!("dummy".parse::<ProviderKind>(), Ok(ProviderKind::Dummy));
        assert!("claude".parse::<ProviderKind>().is_err());
        assert_eq!(ProviderKind::OpenAi.to_string(), "openai");
    }
}
