//! Data models for evaluation runs
//!
//! Test cases come in from a suite, execution results go out to aggregation
//! and artifact persistence.

mod execution;
mod test_case;

pub use execution::{ErrorKind, ExecutionParams, ExecutionResult, ProviderOutput};
pub use test_case::{EvaluationSpec, PreparedCase, TestCase};
