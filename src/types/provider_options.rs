//! Type-safe provider-specific options
//!
//! Per-request options for one adapter family. Unknown keys are rejected when
//! options are built from JSON instead of being passed through blindly.

use serde::{Deserialize, Serialize};

use crate::error::LlmError;

/// OpenAI Responses-style options
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OpenAiOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_effort: Option<ReasoningEffort>,
    /// Let the model request several tool calls in one response
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parallel_tool_calls: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_tier: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningEffort {
    Low,
    Medium,
    High,
}

/// Anthropic Messages-style options
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnthropicOptions {
    /// Extended thinking budget in tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking_budget: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub beta_features: Vec<String>,
}

/// Options for exactly one adapter family
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "provider", content = "options")]
pub enum ProviderOptions {
    /// No provider-specific options
    #[default]
    None,
    #[serde(rename = "openai")]
    OpenAi(OpenAiOptions),
    #[serde(rename = "anthropic")]
    Anthropic(AnthropicOptions),
}

impl ProviderOptions {
    /// Build options for `provider` from a JSON object, rejecting unknown keys.
    pub fn from_json(provider: &str, value: serde_json::Value) -> Result<Self, LlmError> {
        let invalid = |e: serde_json::Error| {
            LlmError::InvalidParameter(format!("invalid {provider} options: {e}"))
        };
        match provider {
            "openai" => Ok(Self::OpenAi(
                serde_json::from_value(value).map_err(invalid)?,
            )),
            "anthropic" => Ok(Self::Anthropic(
                serde_json::from_value(value).map_err(invalid)?,
            )),
            other => Err(LlmError::InvalidParameter(format!(
                "no provider options defined for '{other}'"
            ))),
        }
    }

    /// Get the provider ID this options is for
    pub fn provider_id(&self) -> Option<&str> {
        match self {
            Self::None => None,
            Self::OpenAi(_) => Some("openai"),
            Self::Anthropic(_) => Some("anthropic"),
        }
    }

    /// Check if options match the given provider
    pub fn is_for_provider(&self, provider_id: &str) -> bool {
        self.provider_id() == Some(provider_id)
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}
