//! Run results
//!
//! Aggregation, pricing, artifact storage, baseline comparison, and reports.

mod compare;
mod pricing;
mod report;
mod storage;
mod summary;

pub use compare::{compare_runs, Comparison};
pub use report::save_report;
pub use storage::{
    export_csv, generate_run_id, load_evaluations, load_meta, load_results, load_summary,
    RunArtifacts, RunInfo, RunStorage,
};
pub use summary::{summarize, RunSummary};
