//! Pipeline configuration
//!
//! Deserializable, validated settings for the tool loop and the retry wrapper.

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::error::LlmError;

/// Settings for the bounded tool loop and retry behaviour of a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct PipelineConfig {
    /// Maximum tool-call/resubmission cycles per user turn
    #[validate(range(min = 1, max = 128))]
    pub max_iterations: u32,

    /// Run the tool calls of one response concurrently
    pub parallel_tool_calls: bool,

    /// Retry settings for provider round-trips
    #[validate(nested)]
    pub retry: RetryConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_iterations: 8,
            parallel_tool_calls: true,
            retry: RetryConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub const fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub const fn with_parallel_tool_calls(mut self, enabled: bool) -> Self {
        self.parallel_tool_calls = enabled;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Validate the configuration, mapping failures to `ConfigurationError`.
    pub fn validate_config(&self) -> Result<(), LlmError> {
        self.validate()?;
        Ok(())
    }
}

/// Retry settings in serializable form; see [`crate::retry::RetryPolicy`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
#[validate(schema(function = "validate_delays"))]
pub struct RetryConfig {
    #[validate(range(max = 32))]
    pub max_retries: u32,
    #[validate(range(min = 1))]
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    #[validate(range(min = 0.0, max = 1.0))]
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 500,
            max_delay_ms: 30_000,
            jitter_factor: 0.0,
        }
    }
}

impl RetryConfig {
    pub const fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub const fn with_base_delay_ms(mut self, ms: u64) -> Self {
        self.base_delay_ms = ms;
        self
    }

    pub const fn with_max_delay_ms(mut self, ms: u64) -> Self {
        self.max_delay_ms = ms;
        self
    }

    pub const fn with_jitter_factor(mut self, factor: f64) -> Self {
        self.jitter_factor = factor;
        self
    }
}

fn validate_delays(config: &RetryConfig) -> Result<(), ValidationError> {
    if config.max_delay_ms < config.base_delay_ms {
        let mut err = ValidationError::new("max_delay_below_base_delay");
        err.message = Some("max_delay_ms must be greater than or equal to base_delay_ms".into());
        return Err(err);
    }
    Ok(())
}
