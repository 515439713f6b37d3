//! Retry with exponential backoff
//!
//! The completion loop never retries on its own: a failed request aborts the
//! exchange and rolls the dialogue back. Callers who want transient failures
//! retried wrap their transport in [`Retrying`], which retries each API call
//! individually, so a retried request inside a tool round does not replay
//! the tools already run.
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use toolchat::retry::{RetryConfig, Retrying};
//! use toolchat::{Chat, OpenAiClient};
//!
//! # fn example() -> toolchat::Result<()> {
//! let config = RetryConfig::default()
//!     .with_max_attempts(3)
//!     .with_initial_delay(Duration::from_secs(1));
//!
//! let api = Retrying::new(OpenAiClient::from_env()?, config);
//! let chat = Chat::new(Arc::new(api));
//! # Ok(())
//! # }
//! ```

use crate::client::CompletionApi;
use crate::types::{
    ChatCompletionRequest, ChatCompletionResponse, EmbeddingRequest, EmbeddingResponse,
};
use crate::{Error, Result};
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total number of attempts, including the first one
    pub max_attempts: u32,

    /// Delay before the first retry
    pub initial_delay: Duration,

    /// Upper bound of any single delay
    pub max_delay: Duration,

    /// Growth factor of the delay per attempt
    pub backoff_multiplier: f64,

    /// Random spread around each delay, 0.0 to 1.0
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 2.0,
            jitter_factor: 0.1,
        }
    }
}

impl RetryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Clamped to 0.0..=1.0
    pub fn with_jitter_factor(mut self, jitter: f64) -> Self {
        self.jitter_factor = jitter.clamp(0.0, 1.0);
        self
    }

    fn delay_for(&self, attempt: u32) -> Duration {
        let base_ms = self.initial_delay.as_millis() as f64;
        let exponential = base_ms * self.backoff_multiplier.powi(attempt as i32);
        let capped = exponential.min(self.max_delay.as_millis() as f64);

        let jitter_range = capped * self.jitter_factor;
        let jitter = rand::random::<f64>() * jitter_range;
        let delay = capped + jitter - (jitter_range / 2.0);

        Duration::from_millis(delay.max(0.0) as u64)
    }
}

/// Whether an error is likely transient.
///
/// Network failures, timeouts, and API errors whose leading status code is
/// 429, 500, 502, 503 or 504 are retried. Everything else (bad requests, authentication, content filtering, tool
/// failures, malformed responses) would fail the same way again.
pub fn is_retryable_error(error: &Error) -> bool {
    match error {
        Error::Http(_) | Error::Timeout => true,
        Error::Api(msg) => matches!(api_status(msg), Some(429 | 500 | 502 | 503 | 504)),
        _ => false,
    }
}

/// Status code of an `Api` error message in the form `API error <code> ...`.
///
/// Only the leading code counts; the response body that follows may contain
/// any digits.
fn api_status(msg: &str) -> Option<u16> {
    let rest = msg.strip_prefix("API error ")?;
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    rest[..end].parse().ok()
}

/// Run `operation` until it succeeds, fails with a non-retryable error, or
/// `config.max_attempts` attempts are used up.
///
/// Returns the last error when all attempts fail.
pub async fn retry_with_backoff<F, Fut, T>(config: &RetryConfig, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut last_error = None;

    for attempt in 0..config.max_attempts {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(err) if !is_retryable_error(&err) => return Err(err),
            Err(err) => {
                log::debug!(
                    "attempt {}/{} failed: {}",
                    attempt + 1,
                    config.max_attempts,
                    err
                );
                last_error = Some(err);

                // No sleep after the last attempt
                if attempt + 1 < config.max_attempts {
                    sleep(config.delay_for(attempt)).await;
                }
            }
        }
    }

    Err(last_error.unwrap_or_else(|| Error::other("retry configured with zero attempts")))
}

/// [`CompletionApi`] that retries transient failures of another one.
#[derive(Debug, Clone)]
pub struct Retrying<A> {
    inner: A,
    config: RetryConfig,
}

impl<A: CompletionApi> Retrying<A> {
    pub fn new(inner: A, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    pub fn inner(&self) -> &A {
        &self.inner
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }
}

#[async_trait]
impl<A: CompletionApi> CompletionApi for Retrying<A> {
    async fn create_chat_completion(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse> {
        retry_with_backoff(&self.config, || self.inner.create_chat_completion(request)).await
    }

    async fn create_embeddings(&self, request: &EmbeddingRequest) -> Result<EmbeddingResponse> {
        retry_with_backoff(&self.config, || self.inner.create_embeddings(request)).await
    }
}
