//! Retrying backend wrapper
//!
//! Personas never retry on their own. Retry policy belongs to the backend, so
//! it is provided here as a decorator that any [`GenerationBackend`] can be
//! wrapped in. Transient failures are retried after a fixed wait, up to
//! `max_attempts`; anything else is returned on the spot.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::backend::{GenerationBackend, GenerationRequest, GenerationResponse, LlmError};

/// Retry policy
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts per request, including the first
    pub max_attempts: u32,
    /// Fixed wait between attempts
    pub wait: Duration,
    /// Upper bound on a single attempt; exceeding it counts as [`LlmError::Timeout`]
    pub attempt_timeout: Option<Duration>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        // Six attempts three minutes apart rides out a token-per-minute quota.
        Self {
            max_attempts: 6,
            wait: Duration::from_secs(180),
            attempt_timeout: None,
        }
    }
}

impl RetryConfig {
    /// A single attempt, no retries
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            wait: Duration::ZERO,
            attempt_timeout: None,
        }
    }

    /// Bounded attempts with a fixed wait between them
    pub fn fixed(max_attempts: u32, wait: Duration) -> Self {
        Self {
            max_attempts,
            wait,
            attempt_timeout: None,
        }
    }

    /// Give up on any single attempt after `timeout`
    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = Some(timeout);
        self
    }
}

/// Counters kept by a [`ResilientBackend`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryStats {
    /// Requests received
    pub requests: u64,
    /// Attempts made against the inner backend
    pub attempts: u64,
    /// Attempts that failed with a transient error
    pub transient_failures: u64,
    /// Requests that failed after exhausting their attempts
    pub exhausted: u64,
}

/// Backend wrapper adding bounded retries
#[derive(Debug)]
pub struct ResilientBackend<B: GenerationBackend> {
    inner: B,
    retry: RetryConfig,
    requests: AtomicU64,
    attempts: AtomicU64,
    transient_failures: AtomicU64,
    exhausted: AtomicU64,
}

impl<B: GenerationBackend> ResilientBackend<B> {
    /// Wrap a backend with the given policy
    pub fn new(backend: B, retry: RetryConfig) -> Self {
        Self {
            inner: backend,
            retry,
            requests: AtomicU64::new(0),
            attempts: AtomicU64::new(0),
            transient_failures: AtomicU64::new(0),
            exhausted: AtomicU64::new(0),
        }
    }

    /// Wrap with the default policy
    pub fn wrap(backend: B) -> Self {
        Self::new(backend, RetryConfig::default())
    }

    /// Get the wrapped backend
    pub fn inner(&self) -> &B {
        &self.inner
    }

    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    pub fn stats(&self) -> RetryStats {
        RetryStats {
            requests: self.requests.load(Ordering::Relaxed),
            attempts: self.attempts.load(Ordering::Relaxed),
            transient_failures: self.transient_failures.load(Ordering::Relaxed),
            exhausted: self.exhausted.load(Ordering::Relaxed),
        }
    }

    async fn attempt(&self, request: GenerationRequest) -> Result<GenerationResponse, LlmError> {
        self.attempts.fetch_add(1, Ordering::Relaxed);
        match self.retry.attempt_timeout {
            Some(limit) => tokio::time::timeout(limit, self.inner.complete(request))
                .await
                .unwrap_or(Err(LlmError::Timeout(limit.as_millis() as u64))),
            None => self.inner.complete(request).await,
        }
    }
}

#[async_trait]
impl<B: GenerationBackend> GenerationBackend for ResilientBackend<B> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn complete(&self, request: GenerationRequest) -> Result<GenerationResponse, LlmError> {
        self.requests.fetch_add(1, Ordering::Relaxed);
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match self.attempt(request.clone()).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_transient() => {
                    self.transient_failures.fetch_add(1, Ordering::Relaxed);
                    if attempt >= max_attempts {
                        self.exhausted.fetch_add(1, Ordering::Relaxed);
                        tracing::warn!(
                            backend = %self.inner.name(),
                            attempts = attempt,
                            error = %e,
                            "Giving up after retries"
                        );
                        return Err(e);
                    }
                    tracing::debug!(
                        backend = %self.inner.name(),
                        attempt,
                        wait_ms = self.retry.wait.as_millis() as u64,
                        error = %e,
                        "Transient failure, retrying"
                    );
                    tokio::time::sleep(self.retry.wait).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
