//! Retry controller
//!
//! Turns a sequence of attempts into exactly one normalized result.

use std::sync::Arc;
use tracing::{debug, warn};

use super::attempt::{AttemptFailure, AttemptRunner};
use super::policy::ExecutionPolicy;
use crate::cache::{CacheKey, CacheStore};
use crate::models::{ErrorKind, ExecutionParams, ExecutionResult, TestCase};

pub struct RetryController {
    runner: AttemptRunner,
    cache: Option<Arc<dyn CacheStore>>,
    policy: ExecutionPolicy,
    suite_id: String,
}

impl RetryController {
    pub fn new(runner: AttemptRunner, policy: ExecutionPolicy, suite_id: impl Into<String>) -> Self {
        Self {
            runner,
            cache: None,
            policy,
            suite_id: suite_id.into(),
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn CacheStore>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn policy(&self) -> &ExecutionPolicy {
        &self.policy
    }

    /// Execute one test case. Never fails: exhausted retries come back as a failure result.
    pub async fn execute(
        &self,
        case: &TestCase,
        rendered_prompt: &str,
        params: &ExecutionParams,
    ) -> ExecutionResult {
        let key = CacheKey::compute(
            &self.suite_id,
            &case.id,
            &params.model,
            rendered_prompt,
            params,
        );

        if let Some(cache) = &self.cache {
            if let Some(cached) = cache.get(&key) {
                debug!("Cache hit for {} ({})", case.id, key);
                return cached.into_cache_hit();
            }
            debug!("Cache miss for {}", case.id);
        }

        let max_attempts = self.policy.max_attempts;
        let mut last_failure: Option<AttemptFailure> = None;

        for attempt in 1..=max_attempts {
            match self.runner.attempt(rendered_prompt).await {
                Ok(output) => {
                    let result = ExecutionResult::success(&case.id, rendered_prompt, output, attempt);
                    if let Some(cache) = &self.cache {
                        cache.put(&key, &result);
                    }
                    return result;
                }
                Err(failure) => {
                    if attempt < max_attempts {
                        let delay = self.policy.backoff_delay(attempt - 1);
                        warn!(
                            "{} attempt {}/{} failed ({}), retrying in {}ms",
                            case.id,
                            attempt,
                            max_attempts,
                            failure,
                            delay.as_millis()
                        );
                        tokio::time::sleep(delay).await;
                    }
                    last_failure = Some(failure);
                }
            }
        }

        let (kind, message) = match last_failure {
            Some(failure) => (failure.kind(), failure.to_string()),
            None => (ErrorKind::Internal, "no attempt was made".to_string()),
        };
        warn!(
            "{} failed after {} attempt(s): {} {}",
            case.id, max_attempts, kind, message
        );
        ExecutionResult::failure(
            &case.id,
            rendered_prompt,
            &params.model,
            kind,
            message,
            max_attempts,
        )
    }
}
