//! Retry Mechanism Module
//!
//! Bounded retries with exponential backoff for provider round-trips. The delay
//! schedule comes from the `backoff` crate; the retry decision is made by a
//! caller-supplied predicate evaluated before each new attempt.

use backoff::ExponentialBackoff;
use backoff::ExponentialBackoffBuilder;
use backoff::backoff::Backoff;
use std::time::Duration;
use tokio::time::sleep;
use tracing::Span;

use crate::config::RetryConfig;
use crate::error::LlmError;

/// Retry policy configuration
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of additional attempts after the first one
    pub max_retries: u32,
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Upper bound for a single delay
    pub max_delay: Duration,
    /// Randomization factor (0.0 to 1.0); 0 keeps the schedule deterministic
    pub jitter_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            jitter_factor: 0.0,
        }
    }
}

impl RetryPolicy {
    /// Create a new retry policy
    pub fn new() -> Self {
        Self::default()
    }

    /// A policy that never retries.
    pub fn none() -> Self {
        Self::default().with_max_retries(0)
    }

    /// Set maximum retries
    pub const fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set base delay
    pub const fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Set maximum delay
    pub const fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Set jitter factor
    pub fn with_jitter_factor(mut self, factor: f64) -> Self {
        self.jitter_factor = factor.clamp(0.0, 1.0);
        self
    }

    /// Build the delay schedule: `base_delay * 2^attempt`, capped at `max_delay`.
    pub fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.base_delay)
            .with_max_interval(self.max_delay.max(self.base_delay))
            .with_multiplier(2.0)
            .with_randomization_factor(self.jitter_factor)
            .with_max_elapsed_time(None)
            .build()
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::new()
            .with_max_retries(config.max_retries)
            .with_base_delay(Duration::from_millis(config.base_delay_ms))
            .with_max_delay(Duration::from_millis(config.max_delay_ms))
            .with_jitter_factor(config.jitter_factor)
    }
}

/// Retry executor that handles the actual retry logic
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    policy: RetryPolicy,
    span: Span,
}

impl RetryExecutor {
    /// Create a new retry executor
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            span: tracing::debug_span!("retry"),
        }
    }

    /// Attach the span retry attempts are logged under.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Execute with [`LlmError::is_retryable`] as the retry predicate.
    pub async fn execute<F, Fut, T>(&self, operation: F) -> Result<T, LlmError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, LlmError>>,
    {
        self.execute_with_retry(operation, LlmError::is_retryable)
            .await
    }

    /// Execute `operation`, retrying while `should_retry` accepts the error.
    ///
    /// A rejected error is returned unchanged with no delay. Once `max_retries`
    /// retries are spent the last error is wrapped in `RetryExhausted`.
    pub async fn execute_with_retry<F, Fut, T, P>(
        &self,
        mut operation: F,
        mut should_retry: P,
    ) -> Result<T, LlmError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, LlmError>>,
        P: FnMut(&LlmError) -> bool,
    {
        let mut schedule = self.policy.backoff();
        let mut attempt: u32 = 0;

        loop {
            let error = match operation().await {
                Ok(result) => return Ok(result),
                Err(error) => error,
            };

            if !should_retry(&error) {
                return Err(error);
            }

            if attempt >= self.policy.max_retries {
                tracing::warn!(
                    parent: &self.span,
                    attempts = attempt + 1,
                    error = %error,
                    "retries exhausted"
                );
                return Err(LlmError::RetryExhausted {
                    attempts: attempt + 1,
                    source: Box::new(error),
                });
            }

            let delay = schedule.next_backoff().unwrap_or(self.policy.max_delay);
            attempt += 1;
            tracing::warn!(
                parent: &self.span,
                attempt,
                max_retries = self.policy.max_retries,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "retrying after error"
            );
            sleep(delay).await;
        }
    }
}

impl Default for RetryExecutor {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}
