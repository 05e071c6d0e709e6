//! Inference providers
//!
//! The engine treats a provider as an opaque async function from prompt
//! text to output text, latency, and token counts.

mod dummy;
mod openai;

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::config::{AppConfig, ProviderKind};
use crate::models::{ExecutionParams, ProviderOutput};

pub use dummy::{DummyProvider, DUMMY_MODEL};
pub use openai::OpenAiProvider;

/// Failure reported by a provider call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{category}: {message}")]
pub struct ProviderError {
    /// Upstream category name, e.g. `transport` or `http_status_503`
    pub category: String,
    pub message: String,
}

impl ProviderError {
    pub fn new(category: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            message: message.into(),
        }
    }
}

#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &str;

    async fn infer(&self, prompt: &str) -> Result<ProviderOutput, ProviderError>;
}

/// Build the provider selected by configuration
pub fn build(config: &AppConfig, params: &ExecutionParams) -> Result<Arc<dyn Provider>> {
    let provider: Arc<dyn Provider> = match config.provider {
        ProviderKind::Dummy => Arc::new(DummyProvider::new()),
        ProviderKind::OpenAi => Arc::new(OpenAiProvider::from_config(&config.openai, params)?),
    };
    Ok(provider)
}
