//! Scheduler
//!
//! Fans test cases out as tasks under a concurrency ceiling and gathers
//! exactly one result per case, in input order.

use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info};

use super::attempt::panic_message;
use super::retry::RetryController;
use crate::models::{ExecutionParams, ExecutionResult, PreparedCase};
use crate::utils::timer::Timer;

pub struct Scheduler {
    controller: Arc<RetryController>,
    max_concurrency: usize,
}

impl Scheduler {
    pub fn new(controller: RetryController) -> Self {
        // tokio refuses semaphores above MAX_PERMITS
        let max_concurrency = controller
            .policy()
            .max_concurrency
            .clamp(1, Semaphore::MAX_PERMITS);
        Self {
            controller: Arc::new(controller),
            max_concurrency,
        }
    }

    /// Run every case to completion
    ///
    /// Returns `cases.len()` results, index-aligned with the input. A failing
    /// case never stops its siblings, and a task that dies outside the retry
    /// controller becomes an `internal` result.
    pub async fn run(
        &self,
        cases: Vec<PreparedCase>,
        params: Arc<ExecutionParams>,
    ) -> Vec<ExecutionResult> {
        let total = cases.len();
        info!(
            "Running {} test case(s) with model {} (max {} concurrent)",
            total, params.model, self.max_concurrency
        );
        let timer = Timer::start();

        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut identities = Vec::with_capacity(total);
        let mut handles = Vec::with_capacity(total);

        for prepared in cases {
            identities.push((prepared.case.id.clone(), prepared.rendered_prompt.clone()));

            let semaphore = Arc::clone(&semaphore);
            let controller = Arc::clone(&self.controller);
            let params = Arc::clone(&params);

            handles.push(tokio::spawn(async move {
                // Held for the whole controller invocation, backoff included
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|e| format!("concurrency limiter closed: {e}"))?;

                Ok::<_, String>(
                    controller
                        .execute(&prepared.case, &prepared.rendered_prompt, &params)
                        .await,
                )
            }));
        }

        let results: Vec<ExecutionResult> = join_all(handles)
            .await
            .into_iter()
            .zip(identities)
            .map(|(joined, (id, prompt))| {
                let message = match joined {
                    Ok(Ok(result)) => return result,
                    Ok(Err(message)) => message,
                    Err(e) if e.is_panic() => {
                        format!("task panicked: {}", panic_message(e.into_panic().as_ref()))
                    }
                    Err(e) => format!("task failed: {e}"),
                };
                error!("Internal failure for {}: {}", id, message);
                ExecutionResult::internal(id, prompt, &params.model, message)
            })
            .collect();

        let errors = results.iter().filter(|r| r.is_error()).count();
        let cached = results.iter().filter(|r| r.cache_hit).count();
        info!(
            "Finished {} test case(s) in {}ms: {} error(s), {} cache hit(s)",
            total,
            timer.elapsed_ms(),
            errors,
            cached
        );

        results
    }
}
