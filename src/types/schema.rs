//! Tool parameter schemas
//!
//! A typed tree for the subset of JSON Schema tools use, with explicit
//! conversion from and to JSON-Schema values.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;

use crate::error::LlmError;

/// Shape of a schema node
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaKind {
    Object {
        properties: BTreeMap<String, ParameterSchema>,
        required: Vec<String>,
        additional_properties: bool,
    },
    Array {
        items: Option<Box<ParameterSchema>>,
    },
    String,
    Number {
        integer: bool,
    },
    Boolean,
    Enum {
        values: Vec<Value>,
    },
    /// Object with arbitrary keys whose values share one schema
    Record {
        values: Box<ParameterSchema>,
    },
}

/// A schema node with an optional description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct ParameterSchema {
    pub kind: SchemaKind,
    pub description: Option<String>,
}

impl ParameterSchema {
    fn of(kind: SchemaKind) -> Self {
        Self {
            kind,
            description: None,
        }
    }

    /// An object schema with no properties that accepts extra keys.
    pub fn object() -> Self {
        Self::of(SchemaKind::Object {
            properties: BTreeMap::new(),
            required: Vec::new(),
            additional_properties: true,
        })
    }

    pub fn string() -> Self {
        Self::of(SchemaKind::String)
    }

    pub fn number() -> Self {
        Self::of(SchemaKind::Number { integer: false })
    }

    pub fn integer() -> Self {
        Self::of(SchemaKind::Number { integer: true })
    }

    pub fn boolean() -> Self {
        Self::of(SchemaKind::Boolean)
    }

    pub fn array(items: ParameterSchema) -> Self {
        Self::of(SchemaKind::Array {
            items: Some(Box::new(items)),
        })
    }

    pub fn enumeration<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::of(SchemaKind::Enum {
            values: values.into_iter().map(Into::into).collect(),
        })
    }

    pub fn record(values: ParameterSchema) -> Self {
        Self::of(SchemaKind::Record {
            values: Box::new(values),
        })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Add a property to an object schema. No-op on other kinds.
    pub fn property(mut self, name: impl Into<String>, schema: ParameterSchema, required: bool) -> Self {
        if let SchemaKind::Object {
            properties,
            required: required_keys,
            ..
        } = &mut self.kind
        {
            let name = name.into();
            if required && !required_keys.contains(&name) {
                required_keys.push(name.clone());
            }
            properties.insert(name, schema);
        }
        self
    }

    /// Forbid keys not listed in `properties` (object schemas only).
    pub fn deny_additional_properties(mut self) -> Self {
        if let SchemaKind::Object {
            additional_properties,
            ..
        } = &mut self.kind
        {
            *additional_properties = false;
        }
        self
    }

    /// Check a parsed argument object against the top-level constraints:
    /// required keys must be present and, when additional properties are
    /// forbidden, no unknown key may appear.
    pub fn validate_arguments(&self, args: &Map<String, Value>) -> Result<(), String> {
        let SchemaKind::Object {
            properties,
            required,
            additional_properties,
        } = &self.kind
        else {
            return Ok(());
        };

        if let Some(missing) = required.iter().find(|key| !args.contains_key(*key)) {
            return Err(format!("missing required parameter '{missing}'"));
        }

        if !additional_properties {
            if let Some(extra) = args.keys().find(|key| !properties.contains_key(*key)) {
                return Err(format!("unexpected parameter '{extra}'"));
            }
        }

        Ok(())
    }

    /// Convert from a JSON-Schema value.
    pub fn from_json_schema(value: &Value) -> Result<Self, LlmError> {
        let obj = value.as_object().ok_or_else(|| {
            LlmError::InvalidParameter(format!("schema must be an object, got {value}"))
        })?;
        let description = obj
            .get("description")
            .and_then(Value::as_str)
            .map(str::to_string);

        if let Some(values) = obj.get("enum") {
            let values = values.as_array().ok_or_else(|| {
                LlmError::InvalidParameter("schema 'enum' must be an array".to_string())
            })?;
            return Ok(Self {
                kind: SchemaKind::Enum {
                    values: values.clone(),
                },
                description,
            });
        }

        let ty = match obj.get("type").and_then(Value::as_str) {
            Some(ty) => ty,
            None if obj.contains_key("properties") => "object",
            None => {
                return Err(LlmError::InvalidParameter(format!(
                    "schema has no 'type': {value}"
                )));
            }
        };

        let kind = match ty {
            "object" => Self::object_kind_from_json(obj)?,
            "array" => SchemaKind::Array {
                items: obj
                    .get("items")
                    .map(Self::from_json_schema)
                    .transpose()?
                    .map(Box::new),
            },
            "string" => SchemaKind::String,
            "number" => SchemaKind::Number { integer: false },
            "integer" => SchemaKind::Number { integer: true },
            "boolean" => SchemaKind::Boolean,
            other => {
                return Err(LlmError::InvalidParameter(format!(
                    "unsupported schema type '{other}'"
                )));
            }
        };

        Ok(Self { kind, description })
    }

    fn object_kind_from_json(obj: &Map<String, Value>) -> Result<SchemaKind, LlmError> {
        let mut properties = BTreeMap::new();
        if let Some(props) = obj.get("properties") {
            let props = props.as_object().ok_or_else(|| {
                LlmError::InvalidParameter("schema 'properties' must be an object".to_string())
            })?;
            for (name, schema) in props {
                properties.insert(name.clone(), Self::from_json_schema(schema)?);
            }
        }

        let required = obj
            .get("required")
            .and_then(Value::as_array)
            .map(|keys| {
                keys.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        match obj.get("additionalProperties") {
            Some(Value::Object(_)) if properties.is_empty() => {
                let values = Self::from_json_schema(&obj["additionalProperties"])?;
                Ok(SchemaKind::Record {
                    values: Box::new(values),
                })
            }
            Some(Value::Bool(allowed)) => Ok(SchemaKind::Object {
                properties,
                required,
                additional_properties: *allowed,
            }),
            _ => Ok(SchemaKind::Object {
                properties,
                required,
                additional_properties: true,
            }),
        }
    }

    /// Convert to a JSON-Schema value.
    pub fn to_json_schema(&self) -> Value {
        let mut out = match &self.kind {
            SchemaKind::Object {
                properties,
                required,
                additional_properties,
            } => {
                let props: Map<String, Value> = properties
                    .iter()
                    .map(|(name, schema)| (name.clone(), schema.to_json_schema()))
                    .collect();
                let mut out = json!({ "type": "object", "properties": props });
                if !required.is_empty() {
                    out["required"] = json!(required);
                }
                if !additional_properties {
                    out["additionalProperties"] = json!(false);
                }
                out
            }
            SchemaKind::Array { items } => match items {
                Some(items) => json!({ "type": "array", "items": items.to_json_schema() }),
                None => json!({ "type": "array" }),
            },
            SchemaKind::String => json!({ "type": "string" }),
            SchemaKind::Number { integer: true } => json!({ "type": "integer" }),
            SchemaKind::Number { integer: false } => json!({ "type": "number" }),
            SchemaKind::Boolean => json!({ "type": "boolean" }),
            SchemaKind::Enum { values } => json!({ "enum": values }),
            SchemaKind::Record { values } => json!({
                "type": "object",
                "additionalProperties": values.to_json_schema(),
            }),
        };
        if let Some(description) = &self.description {
            out["description"] = json!(description);
        }
        out
    }
}

impl Default for ParameterSchema {
    fn default() -> Self {
        Self::object()
    }
}

impl TryFrom<Value> for ParameterSchema {
    type Error = LlmError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_json_schema(&value)
    }
}

impl From<ParameterSchema> for Value {
    fn from(schema: ParameterSchema) -> Self {
        schema.to_json_schema()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weather_schema() -> ParameterSchema {
        ParameterSchema::object()
            .property("city", ParameterSchema::string(), true)
            .property(
                "unit",
                ParameterSchema::enumeration(["celsius", "fahrenheit"]),
                false,
            )
            .deny_additional_properties()
    }

    #[test]
    fn converts_nested_json_schema() {
        let value = json!({
            "type": "object",
            "description": "search",
            "properties": {
                "query": { "type": "string", "description": "text" },
                "limit": { "type": "integer" },
                "tags": { "type": "array", "items": { "type": "string" } },
                "filters": {
                    "type": "object",
                    "additionalProperties": { "type": "boolean" }
                }
            },
            "required": ["query"],
            "additionalProperties": false
        });
        let schema = ParameterSchema::from_json_schema(&value).unwrap();
        assert_eq!(schema.description.as_deref(), Some("search"));
        let SchemaKind::Object {
            properties,
            required,
            additional_properties,
        } = &schema.kind
        else {
            panic!("expected object schema");
        };
        assert_eq!(required, &vec!["query".to_string()]);
        assert!(!additional_properties);
        assert_eq!(properties["limit"].kind, SchemaKind::Number { integer: true });
        assert!(matches!(properties["filters"].kind, SchemaKind::Record { .. }));
        assert_eq!(schema.to_json_schema(), value);
    }

    #[test]
    fn rejects_unsupported_type() {
        let err = ParameterSchema::from_json_schema(&json!({"type": "null"})).unwrap_err();
        assert!(matches!(err, LlmError::InvalidParameter(_)));
    }

    #[test]
    fn validates_required_keys() {
        let schema = weather_schema();
        let args = json!({"unit": "celsius"});
        let err = schema
            .validate_arguments(args.as_object().unwrap())
            .unwrap_err();
        assert_eq!(err, "missing required parameter 'city'");
    }

    #[test]
    fn validates_additional_properties() {
        let schema = weather_schema();
        let args = json!({"city": "Oslo", "country": "NO"});
        let err = schema
            .validate_arguments(args.as_object().unwrap())
            .unwrap_err();
        assert_eq!(err, "unexpected parameter 'country'");

        let open = ParameterSchema::object().property("city", ParameterSchema::string(), true);
        assert!(open.validate_arguments(args.as_object().unwrap()).is_ok());
    }

    #[test]
    fn serde_uses_json_schema_form() {
        let schema = weather_schema().with_description("weather lookup");
        let value = serde_json::to_value(&schema).unwrap();
        assert_eq!(value["type"], "object");
        assert_eq!(value["description"], "weather lookup");
        let back: ParameterSchema = serde_json::from_value(value).unwrap();
        assert_eq!(back, schema);
    }
}
