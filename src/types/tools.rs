//! Tool call and tool specification types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::schema::ParameterSchema;

/// Arguments of a tool call once accumulation is complete.
///
/// Arguments that are not a JSON object are kept verbatim rather than
/// failing the stream; the executor reports them when the call is run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolArguments {
    Raw(RawArguments),
    Parsed(Map<String, Value>),
}

/// Argument text that could not be used as a JSON object.
///
/// Serialized as `{"raw_arguments": "..."}`. Any other key makes the value a
/// parsed object instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawArguments {
    pub raw_arguments: String,
}

impl ToolArguments {
    /// An empty argument object.
    pub fn empty() -> Self {
        Self::Parsed(Map::new())
    }

    /// Parse an accumulated argument buffer.
    ///
    /// An empty (or whitespace-only) buffer is `{}`. Invalid JSON and JSON
    /// that is not an object are kept as `Raw`.
    pub fn parse(buffer: &str) -> Self {
        if buffer.trim().is_empty() {
            return Self::empty();
        }
        match serde_json::from_str::<Value>(buffer) {
            Ok(Value::Object(map)) => Self::Parsed(map),
            _ => Self::raw(buffer),
        }
    }

    /// Keep `text` verbatim.
    pub fn raw(text: impl Into<String>) -> Self {
        Self::Raw(RawArguments {
            raw_arguments: text.into(),
        })
    }

    pub fn as_object(&self) -> Option<&Map<String, Value>> {
        match self {
            Self::Parsed(map) => Some(map),
            Self::Raw(_) => None,
        }
    }

    /// Serialize back to the JSON text a provider expects.
    pub fn to_json_string(&self) -> String {
        match self {
            Self::Parsed(map) => Value::Object(map.clone()).to_string(),
            Self::Raw(raw) => raw.raw_arguments.clone(),
        }
    }
}

impl From<Value> for ToolArguments {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => Self::Parsed(map),
            other => Self::raw(other.to_string()),
        }
    }
}

/// A fully assembled tool call requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: ToolArguments,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: ToolArguments) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

/// Tool description advertised to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: ParameterSchema,
}

impl ToolSpec {
    /// JSON-Schema form of the parameters, as providers send it.
    pub fn parameters_json(&self) -> Value {
        self.parameters.to_json_schema()
    }
}
