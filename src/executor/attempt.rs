//! Attempt runner
//!
//! One provider call under a duration budget.

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinError;

use crate::models::{ErrorKind, ProviderOutput};
use crate::provider::{Provider, ProviderError};
use crate::utils::timer::Timer;

/// Why a single attempt failed
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AttemptFailure {
    #[error("attempt exceeded {limit_ms}ms")]
    Timeout { limit_ms: u64 },

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl AttemptFailure {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AttemptFailure::Timeout { .. } => ErrorKind::Timeout,
            AttemptFailure::Provider(_) => ErrorKind::ProviderError,
        }
    }
}

/// Invokes the provider exactly once per attempt
#[derive(Clone)]
pub struct AttemptRunner {
    provider: Arc<dyn Provider>,
    timeout: Duration,
}

impl AttemptRunner {
    pub fn new(provider: Arc<dyn Provider>, timeout: Duration) -> Self {
        Self { provider, timeout }
    }

    /// Run one provider call
    ///
    /// The call runs as its own task. When the budget runs out the task is
    /// aborted and the attempt returns at once; sibling attempts are untouched.
    /// Latency covers this attempt only.
    pub async fn attempt(&self, prompt: &str) -> Result<ProviderOutput, AttemptFailure> {
        let provider = Arc::clone(&self.provider);
        let prompt = prompt.to_string();
        let timer = Timer::start();

        let mut handle = tokio::spawn(async move { provider.infer(&prompt).await });

        match tokio::time::timeout(self.timeout, &mut handle).await {
            Ok(Ok(Ok(mut output))) => {
                output.latency_ms = timer.elapsed_ms();
                Ok(output)
            }
            Ok(Ok(Err(e))) => Err(e.into()),
            Ok(Err(join_error)) => Err(join_failure(join_error).into()),
            Err(_) => {
                handle.abort();
                Err(AttemptFailure::Timeout {
                    limit_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
                })
            }
        }
    }
}

fn join_failure(error: JoinError) -> ProviderError {
    if error.is_cancelled() {
        return ProviderError::new("cancelled", "provider task was cancelled");
    }
    match error.try_into_panic() {
        Ok(payload) => ProviderError::new("panic", panic_message(payload.as_ref())),
        Err(error) => ProviderError::new("join", error.to_string()),
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
