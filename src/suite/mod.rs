//! Suite input
//!
//! Loading line-delimited test cases and rendering prompt templates.

mod loader;
mod prompt;

pub use loader::{load_suite, suite_id};
pub use prompt::{prepare, PromptTemplate};
