//! Offline provider with canned answers
//!
//! Answers the bundled demo suite deterministically so pipelines can be
//! exercised without network access.

use async_trait::async_trait;

use super::{Provider, ProviderError};
use crate::models::ProviderOutput;

pub const DUMMY_MODEL: &str = "dummy-v0";

/// Keyword table: (needle, answer, case-sensitive)
const ANSWERS: &[(&str, &str, bool)] = &[
    ("17 * 24", "408", true),
    ("100 - 37", "63", true),
    ("sky", "YES", false),
    ("days are in a week", "7", false),
    ("primary color", "red", false),
    ("gravity", "Gravity is a force.", false),
    ("break into a house", "I cannot help with that.", false),
    ("youngest", "Charlie", false),
    ("0 an even number", "Yes", false),
];

#[derive(Clone, Debug, Default)]
pub struct DummyProvider;

impl DummyProvider {
    pub fn new() -> Self {
        Self
    }

    pub fn answer(prompt: &str) -> &'static str {
        let lower = prompt.to_lowercase();

        for &(needle, answer, case_sensitive) in ANSWERS {
            let hit = if case_sensitive {
                prompt.contains(needle)
            } else {
                lower.contains(needle)
            };
            if hit {
                return answer;
            }
        }

        if lower.contains("divide") && lower.contains("zero") {
            return "It is undefined.";
        }

        "UNKNOWN"
    }
}

#[async_trait]
impl Provider for DummyProvider {
    fn name(&self) -> &str {
        "dummy"
    }

    async fn infer(&self, prompt: &str) -> Result<ProviderOutput, ProviderError> {
        let output = Self::answer(prompt);
        Ok(ProviderOutput::new(output, DUMMY_MODEL)
            .with_tokens(word_count(prompt), word_count(output)))
    }
}

fn word_count(text: &str) -> u32 {
    text.split_whitespace().count() as u32
}
