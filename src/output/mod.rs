//! Output formatting module
//!
//! Console rendering of results, summaries, comparisons, and run listings.

mod formatter;

pub use formatter::{OutputFormat, ResultFormatter};
