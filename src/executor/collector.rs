//! Result collector

use crate::models::ExecutionResult;

/// Split results into the full list and the stable-order subsequence of failures
pub fn split(results: Vec<ExecutionResult>) -> (Vec<ExecutionResult>, Vec<ExecutionResult>) {
    let errors = results.iter().filter(|r| r.is_error()).cloned().collect();
    (results, errors)
}
