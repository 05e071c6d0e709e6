//! Prompt templates
//!
//! A template wraps each case prompt; its content hash identifies the prompt
//! version across runs.

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::path::Path;

use crate::models::{PreparedCase, TestCase};

const PLACEHOLDER: &str = "{{prompt}}";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PromptTemplate {
    pub text: String,
    /// SHA-256 of the template content, independent of its path
    pub hash: String,
}

impl PromptTemplate {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let hash = hex::encode(Sha256::digest(text.as_bytes()));
        Self { text, hash }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read prompt template: {}", path.display()))?;
        Ok(Self::new(text))
    }

    /// Substitute every `{{prompt}}` with the case prompt and trim
    pub fn render(&self, case: &TestCase) -> String {
        self.text.replace(PLACEHOLDER, &case.prompt).trim().to_string()
    }
}

/// Pair each case with the prompt sent to the provider
pub fn prepare(cases: Vec<TestCase>, template: Option<&PromptTemplate>) -> Vec<PreparedCase> {
    cases
        .into_iter()
        .map(|case| match template {
            Some(template) => {
                let rendered = template.render(&case);
                PreparedCase::new(case, rendered)
            }
            None => PreparedCase::verbatim(case),
        })
        .collect()
}
