//! Stub providers for engine tests

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::time::Duration;

use crate::models::ProviderOutput;
use crate::provider::{Provider, ProviderError};

pub const STUB_MODEL: &str = "stub-1";

fn echo(prompt: &str) -> ProviderOutput {
    ProviderOutput::new(prompt, STUB_MODEL).with_tokens(1, 1)
}

/// Returns the prompt, failing on prompts containing `FAIL_ME`
#[derive(Default)]
pub struct EchoProvider {
    pub calls: AtomicUsize,
}

#[async_trait]
impl Provider for EchoProvider {
    fn name(&self) -> &str {
        "echo"
    }

    async fn infer(&self, prompt: &str) -> Result<ProviderOutput, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if prompt.contains("FAIL_ME") {
            return Err(ProviderError::new("RuntimeError", "forced failure"));
        }
        Ok(echo(prompt))
    }
}

/// Fails the first `failures` calls, then echoes
pub struct FlakyProvider {
    failures: u32,
    pub calls: AtomicU32,
}

impl FlakyProvider {
    pub fn new(failures: u32) -> Self {
        Self {
            failures,
            calls: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl Provider for FlakyProvider {
    fn name(&self) -> &str {
        "flaky"
    }

    async fn infer(&self, prompt: &str) -> Result<ProviderOutput, ProviderError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            return Err(ProviderError::new(
                "ConnectionError",
                format!("transient failure #{}", call + 1),
            ));
        }
        Ok(echo(prompt))
    }
}

/// Sleeps for the number of milliseconds given as the prompt, then echoes
#[derive(Default)]
pub struct SleepyProvider {
    pub finished: AtomicBool,
}

#[async_trait]
impl Provider for SleepyProvider {
    fn name(&self) -> &str {
        "sleepy"
    }

    async fn infer(&self, prompt: &str) -> Result<ProviderOutput, ProviderError> {
        let ms: u64 = prompt.trim().parse().unwrap_or(0);
        tokio::time::sleep(Duration::from_millis(ms)).await;
        self.finished.store(true, Ordering::SeqCst);
        Ok(echo(prompt))
    }
}

/// Tracks the peak number of concurrent calls
pub struct GaugeProvider {
    delay: Duration,
    in_flight: AtomicUsize,
    pub peak: AtomicUsize,
    pub calls: AtomicUsize,
}

impl GaugeProvider {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Provider for GaugeProvider {
    fn name(&self) -> &str {
        "gauge"
    }

    async fn infer(&self, prompt: &str) -> Result<ProviderOutput, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(echo(prompt))
    }
}

/// Panics on prompts containing `PANIC`, echoes otherwise
pub struct PanickyProvider;

#[async_trait]
impl Provider for PanickyProvider {
    fn name(&self) -> &str {
        "panicky"
    }

    async fn infer(&self, prompt: &str) -> Result<ProviderOutput, ProviderError> {
        if prompt.contains("PANIC") {
            panic!("provider blew up");
        }
        Ok(echo(prompt))
    }
}
