//! Core error types.

use thiserror::Error;

/// Coarse error classification used for retry decisions and reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Transport-level failures (resets, timeouts, broken streams)
    Network,
    /// Provider-side 5xx failures
    Server,
    /// Malformed requests and other 4xx failures
    Client,
    /// Provider throttling
    RateLimit,
    /// Credentials rejected
    Authentication,
    /// Response payloads that could not be decoded
    Parsing,
    /// Invalid parameters or configuration
    Validation,
    /// Tool lookup and execution failures
    Tool,
    /// Tool loop safety valve
    Orchestration,
    /// Bugs and invariant violations
    Internal,
}

/// The error type shared by every component of the orchestration core.
#[derive(Error, Debug, Clone)]
pub enum LlmError {
    /// Generic transport failure reported by the provider collaborator
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Connection reset or refused
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The provider call timed out
    #[error("Timeout error: {0}")]
    TimeoutError(String),

    /// Structured API error with a status code
    #[error("API error {code}: {message}")]
    ApiError {
        code: u16,
        message: String,
        details: Option<serde_json::Value>,
    },

    /// Provider rate limit
    #[error("Rate limit exceeded: {0}")]
    RateLimitError(String),

    /// Authentication failure
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    /// A request or option value was rejected before sending
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// A provider payload could not be understood
    #[error("Parse error: {0}")]
    ParseError(String),

    /// JSON (de)serialization failure
    #[error("JSON error: {0}")]
    JsonError(String),

    /// The event stream broke while being consumed
    #[error("Stream error: {0}")]
    StreamError(String),

    /// Invalid client or pipeline configuration
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// The model asked for a tool that is not registered
    #[error("Tool not found: {name}")]
    ToolNotFound { name: String },

    /// Argument validation failed or the tool itself returned an error
    #[error("Tool '{tool_name}' failed: {message}")]
    ToolExecution { tool_name: String, message: String },

    /// The per-turn tool iteration budget is spent
    #[error(
        "Tool iteration limit reached: {iterations} of {max_iterations} iterations used in this turn"
    )]
    ToolIterationLimit { iterations: u32, max_iterations: u32 },

    /// All retry attempts failed; carries the last underlying error
    #[error("Retry exhausted after {attempts} attempts: {source}")]
    RetryExhausted {
        attempts: u32,
        #[source]
        source: Box<LlmError>,
    },

    /// Internal invariant violation
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl LlmError {
    /// Create an `ApiError` without details.
    pub fn api_error(code: u16, message: impl Into<String>) -> Self {
        Self::ApiError {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Create a `ToolExecution` error.
    pub fn tool_execution(tool_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ToolExecution {
            tool_name: tool_name.into(),
            message: message.into(),
        }
    }

    /// HTTP-like status code associated with this error, when known.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::ApiError { code, .. } => Some(*code),
            Self::RateLimitError(_) => Some(429),
            Self::AuthenticationError(_) => Some(401),
            Self::RetryExhausted { source, .. } => source.status_code(),
            _ => None,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::HttpError(_)
            | Self::ConnectionError(_)
            | Self::TimeoutError(_)
            | Self::StreamError(_) => ErrorCategory::Network,
            Self::ApiError { code, .. } => match code {
                401 | 403 => ErrorCategory::Authentication,
                429 => ErrorCategory::RateLimit,
                500..=599 => ErrorCategory::Server,
                _ => ErrorCategory::Client,
            },
            Self::RateLimitError(_) => ErrorCategory::RateLimit,
            Self::AuthenticationError(_) => ErrorCategory::Authentication,
            Self::InvalidParameter(_) | Self::ConfigurationError(_) => ErrorCategory::Validation,
            Self::ParseError(_) | Self::JsonError(_) => ErrorCategory::Parsing,
            Self::ToolNotFound { .. } | Self::ToolExecution { .. } => ErrorCategory::Tool,
            Self::ToolIterationLimit { .. } => ErrorCategory::Orchestration,
            Self::RetryExhausted { source, .. } => source.category(),
            Self::InternalError(_) => ErrorCategory::Internal,
        }
    }

    /// Whether a retry of the same request may succeed.
    ///
    /// Transient network failures, 5xx responses and rate limits are retryable.
    /// Tool-domain and orchestration errors never are.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RetryExhausted { .. } | Self::ToolIterationLimit { .. } => false,
            _ => matches!(
                self.category(),
                ErrorCategory::Network | ErrorCategory::Server | ErrorCategory::RateLimit
            ),
        }
    }

    /// Whether this error belongs to the tool domain (recorded, not propagated).
    pub fn is_tool_error(&self) -> bool {
        matches!(self, Self::ToolNotFound { .. } | Self::ToolExecution { .. })
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, LlmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_errors_are_retryable() {
        assert!(LlmError::ConnectionError("reset".into()).is_retryable());
        assert!(LlmError::TimeoutError("30s".into()).is_retryable());
        assert!(LlmError::RateLimitError("slow down".into()).is_retryable());
        assert!(LlmError::api_error(503, "unavailable").is_retryable());
        assert!(LlmError::api_error(429, "busy").is_retryable());
    }

    #[test]
    fn permanent_errors_are_not_retryable() {
        assert!(!LlmError::AuthenticationError("bad key".into()).is_retryable());
        assert!(!LlmError::api_error(400, "malformed").is_retryable());
        assert!(!LlmError::InvalidParameter("temperature".into()).is_retryable());
        assert!(
            !LlmError::ToolNotFound {
                name: "missing".into()
            }
            .is_retryable()
        );
        assert!(
            !LlmError::ToolIterationLimit {
                iterations: 3,
                max_iterations: 3
            }
            .is_retryable()
        );
    }

    #[test]
    fn retry_exhausted_keeps_last_error_context() {
        let err = LlmError::RetryExhausted {
            attempts: 3,
            source: Box::new(LlmError::api_error(502, "bad gateway")),
        };
        assert_eq!(err.status_code(), Some(502));
        assert_eq!(err.category(), ErrorCategory::Server);
        assert!(!err.is_retryable());
        let text = err.to_string();
        assert!(text.contains("3 attempts"));
        assert!(text.contains("bad gateway"));
    }

    #[test]
    fn tool_errors_are_classified() {
        let err = LlmError::tool_execution("weather", "missing required parameter 'city'");
        assert!(err.is_tool_error());
        assert_eq!(err.category(), ErrorCategory::Tool);
        assert_eq!(
            err.to_string(),
            "Tool 'weather' failed: missing required parameter 'city'"
        );
    }
}
