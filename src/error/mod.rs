//! Error Handling Module
//!
//! Core error type (`LlmError`), its category classification, and conversions
//! from common error types.
//!
//! # Example
//!
//! ```rust,ignore
//! use llm_orchestra::error::{ErrorCategory, LlmError};
//!
//! let error = LlmError::api_error(404, "Not found");
//! assert_eq!(error.category(), ErrorCategory::Client);
//! assert!(!error.is_retryable());
//! ```

mod conversions;
pub mod types;

pub use types::*;
