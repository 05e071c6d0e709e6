//! Versioned configuration file
//!
//! Looks the file up in the standard locations, parses YAML or JSON by
//! extension, and rejects settings the engine cannot run with.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::{AppConfig, ProviderKind};

/// Searched in order; the first existing file wins
const SEARCH_PATHS: &[&str] = &[
    "./evalrun.yaml",
    "./evalrun.yml",
    "./.evalrun.yaml",
    "~/.config/evalrun/config.yaml",
];

const CURRENT_VERSION: &str = "1.0";
const SUPPORTED_VERSIONS: &[&str] = &[CURRENT_VERSION];

/// On-disk encoding, picked from the file extension
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Encoding {
    Yaml,
    Json,
}

impl Encoding {
    fn of(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml" | "yml") => Encoding::Yaml,
            _ => Encoding::Json,
        }
    }

    fn decode(self, text: &str) -> Result<ConfigFile> {
        Ok(match self {
            Encoding::Yaml => serde_yaml::from_str(text)?,
            Encoding::Json => serde_json::from_str(text)?,
        })
    }

    fn encode(self, config: &ConfigFile) -> Result<String> {
        Ok(match self {
            Encoding::Yaml => serde_yaml::to_string(config)?,
            Encoding::Json => serde_json::to_string_pretty(config)?,
        })
    }
}

/// `version` plus the application settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default = "current_version")]
    pub version: String,

    #[serde(default)]
    pub app: AppConfig,
}

fn current_version() -> String {
    CURRENT_VERSION.to_string()
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            version: current_version(),
            app: AppConfig::default(),
        }
    }
}

impl ConfigFile {
    /// First standard location that exists
    pub fn find() -> Option<PathBuf> {
        SEARCH_PATHS
            .iter()
            .map(|candidate| expand_home(candidate))
            .find(|candidate| candidate.is_file())
    }

    /// Load the first file found, or defaults when there is none
    pub fn load_default() -> Result<Self> {
        match Self::find() {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Read, parse, and validate `path`
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config = Encoding::of(path)
            .decode(&text)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        Ok(config)
    }

    /// Write to `path`, creating parent directories as needed
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let text = Encoding::of(path)
            .encode(self)
            .context("Failed to serialize config")?;

        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        }
        std::fs::write(path, text)
            .with_context(|| format!("Failed to write config file: {}", path.display()))
    }

    pub fn validate(&self) -> Result<()> {
        if !SUPPORTED_VERSIONS.contains(&self.version.as_str()) {
            anyhow::bail!(
                "Unsupported config version {} (supported: {})",
                self.version,
                SUPPORTED_VERSIONS.join(", ")
            );
        }

        self.app.validate()
    }

    /// Starter file written by `evalrun config init`
    pub fn example() -> Self {
        Self {
            version: current_version(),
            app: AppConfig {
                model: "gpt-4o-mini".to_string(),
                provider: ProviderKind::OpenAi,
                max_concurrency: 8,
                attempt_timeout_ms: 20_000,
                ..AppConfig::default()
            },
        }
    }
}

fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_is_valid() {
        let config = ConfigFile::default();
        assert_eq!(config.version, "1.0");
        config.validate().unwrap();
    }

    #[test]
    fn test_example_round_trips_through_yaml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("evalrun.yaml");

        ConfigFile::example().save(&path).unwrap();
        let loaded = ConfigFile::load(&path).unwrap();

        assert_eq!(loaded, ConfigFile::example());
        assert_eq!(loaded.app.provider, ProviderKind::OpenAi);
    }

    #[test]
    fn test_json_by_extension() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("evalrun.json");
        std::fs::write(&path, r#"{"app": {"max_retries": 0}}"#).unwrap();

        let loaded = ConfigFile::load(&path).unwrap();
        assert_eq!(loaded.version, "1.0");
        assert_eq!(loaded.app.max_retries, 0);
        assert_eq!(loaded.app.execution_policy().max_attempts, 1);
    }

    #[test]
    fn test_out_of_range_settings_rejected() {
        let broken: [fn(&mut ConfigFile); 4] = [
            |c| c.app.max_concurrency = 0,
            |c| c.app.max_retries = 11,
            |c| c.app.temperature = 2.5,
            |c| c.version = "9.9".to_string(),
        ];
        for mutate in broken {
            let mut config = ConfigFile::default();
            mutate(&mut config);
            assert!(config.validate().is_err(), "{config:?} should be rejected");
        }
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yml");
        std::fs::write(&path, "version: \"1.0\"\napp:\n  max_concurrency: 0\n").unwrap();

        let err = ConfigFile::load(&path).unwrap_err();
        assert!(format!("{err:#}").contains("max_concurrency"));
    }

    #[test]
    fn test_encoding_of() {
        assert_eq!(Encoding::of(Path::new("a.yml")), Encoding::Yaml);
        assert_eq!(Encoding::of(Path::new("a.yaml")), Encoding::Yaml);
        assert_eq!(Encoding::of(Path::new("a.json")), Encoding::Json);
        assert_eq!(expand_home("./x.yaml"), PathBuf::from("./x.yaml"));
    }
}
