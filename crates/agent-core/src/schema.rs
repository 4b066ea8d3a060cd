//! Argument Schema
//!
//! Data-driven description of a tool's named parameters. The same schema
//! renders the JSON Schema handed to structured tool-calling backends and
//! coerces incoming payloads before a tool is invoked.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::error::FieldIssue;

/// Primitive JSON type of a parameter
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
    Object,
    Array,
}

impl ParamType {
    pub fn as_str(self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Integer => "integer",
            ParamType::Number => "number",
            ParamType::Boolean => "boolean",
            ParamType::Object => "object",
            ParamType::Array => "array",
        }
    }

    /// Lax conversion of `value` into this type
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    fn coerce(self, value: &Value) -> Option<Value> {
        match (self, value) {
            (ParamType::String, Value::String(_))
            | (ParamType::Boolean, Value::Bool(_))
            | (ParamType::Object, Value::Object(_))
            | (ParamType::Array, Value::Array(_)) => Some(value.clone()),

            (ParamType::Integer, Value::Number(n)) => {
                if let Some(i) = n.as_i64() {
                    Some(json!(i))
                } else if n.is_f64() {
                    // integral and inside i64; anything else would be clamped by the cast
                    n.as_f64()
                        .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64)
                        .map(|f| json!(f as i64))
                } else {
                    None
                }
            }
            (ParamType::Integer, Value::String(s)) => s.trim().parse::<i64>().ok().map(|i| json!(i)),

            (ParamType::Number, Value::Number(_)) => Some(value.clone()),
            (ParamType::Number, Value::String(s)) => s
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map(|f| json!(f)),

            (ParamType::Boolean, Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => Some(Value::Bool(true)),
                "false" | "no" | "0" => Some(Value::Bool(false)),
                _ => None,
            },
            (ParamType::Boolean, Value::Number(n)) => match n.as_i64() {
                Some(1) => Some(Value::Bool(true)),
                Some(0) => Some(Value::Bool(false)),
                _ => None,
            },

            _ => None,
        }
    }
}

impl std::fmt::Display for ParamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameter definition for tool schema
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParameterSchema {
    /// Parameter name
    pub name: String,

    /// JSON Schema type
    #[serde(rename = "type")]
    pub param_type: ParamType,

    /// Human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Whether this parameter is required
    #[serde(default)]
    pub required: bool,

    /// Default value if not provided
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    /// Enum of allowed values
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
}

impl ParameterSchema {
    /// A required parameter
    pub fn required(name: impl Into<String>, param_type: ParamType) -> Self {
        Self {
            name: name.into(),
            param_type,
            description: None,
            required: true,
            default: None,
            enum_values: None,
        }
    }

    /// An optional parameter
    pub fn optional(name: impl Into<String>, param_type: ParamType) -> Self {
        Self {
            required: false,
            ..Self::required(name, param_type)
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn one_of(mut self, values: Vec<Value>) -> Self {
        self.enum_values = Some(values);
        self
    }

    fn json_schema(&self) -> Value {
        let mut property = Map::new();
        property.insert("title".into(), Value::String(title_case(&self.name)));
        property.insert("type".into(), Value::String(self.param_type.as_str().into()));
        if let Some(description) = &self.description {
            property.insert("description".into(), Value::String(description.clone()));
        }
        if let Some(default) = &self.default {
            property.insert("default".into(), default.clone());
        }
        if let Some(values) = &self.enum_values {
            property.insert("enum".into(), Value::Array(values.clone()));
        }
        Value::Object(property)
    }
}

/// Named parameters accepted by one tool
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ArgumentSchema {
    /// Schema title, kept only in the full JSON Schema rendering
    pub title: String,

    pub parameters: Vec<ParameterSchema>,
}

impl ArgumentSchema {
    pub fn new(title: impl Into<String>, parameters: Vec<ParameterSchema>) -> Self {
        Self {
            title: title.into(),
            parameters,
        }
    }

    /// Accepted argument names, in declaration order
    pub fn names(&self) -> Vec<&str> {
        self.parameters.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn parameter(&self, name: &str) -> Option<&ParameterSchema> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Full JSON Schema, including bookkeeping `title` fields
    pub fn json_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .parameters
            .iter()
            .map(|p| (p.name.clone(), p.json_schema()))
            .collect();
        let required: Vec<Value> = self
            .parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| Value::String(p.name.clone()))
            .collect();

        json!({
            "title": self.title,
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": false,
        })
    }

    /// Coerce a raw payload into validated arguments.
    ///
    /// Accepts an object, a string holding a JSON object, `null` (no
    /// arguments), or a bare scalar when the schema has a single parameter.
    /// Every problem found is reported, not just the first.
    pub fn coerce(&self, raw: &Value) -> Result<Arguments, Vec<FieldIssue>> {
        let payload = self.payload_object(raw)?;
        let mut issues = Vec::new();
        let mut values = Map::new();

        for key in payload.keys() {
            if self.parameter(key).is_none() {
                issues.push(FieldIssue::new(key, "unexpected field"));
            }
        }

        for param in &self.parameters {
            let Some(value) = payload.get(&param.name).filter(|v| !v.is_null()) else {
                if let Some(default) = &param.default {
                    values.insert(param.name.clone(), default.clone());
                } else if param.required {
                    issues.push(FieldIssue::new(&param.name, "field required"));
                }
                continue;
            };

            let Some(coerced) = param.param_type.coerce(value) else {
                issues.push(FieldIssue::new(
                    &param.name,
                    format!("expected {}, got {}", param.param_type, kind_of(value)),
                ));
                continue;
            };

            if let Some(allowed) = &param.enum_values {
                if !allowed.contains(&coerced) {
                    issues.push(FieldIssue::new(&param.name, format!("value {coerced} is not one of the allowed values")));
                    continue;
                }
            }

            values.insert(param.name.clone(), coerced);
        }

        if issues.is_empty() {
            Ok(Arguments(values))
        } else {
            Err(issues)
        }
    }

    fn payload_object(&self, raw: &Value) -> Result<Map<String, Value>, Vec<FieldIssue>> {
        match raw {
            Value::Object(map) => Ok(map.clone()),
            Value::Null => Ok(Map::new()),
            Value::String(text) => match serde_json::from_str::<Value>(text) {
                Ok(Value::Object(map)) => Ok(map),
                _ => self.bind_single(raw),
            },
            _ => self.bind_single(raw),
        }
    }

    fn bind_single(&self, raw: &Value) -> Result<Map<String, Value>, Vec<FieldIssue>> {
        match self.parameters.as_slice() {
            [only] => {
                let mut map = Map::new();
                map.insert(only.name.clone(), raw.clone());
                Ok(map)
            }
            _ => Err(vec![FieldIssue::new(
                "$",
                format!("expected an object of named arguments, got {}", kind_of(raw)),
            )]),
        }
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn title_case(name: &str) -> String {
    name.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            chars
                .next()
                .map(|c| c.to_uppercase().chain(chars).collect::<String>())
                .unwrap_or_default()
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Arguments that passed schema coercion
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Arguments(Map<String, Value>);

impl Arguments {
    pub fn str(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }

    pub fn i64(&self, name: &str) -> Option<i64> {
        self.0.get(name).and_then(Value::as_i64)
    }

    pub fn f64(&self, name: &str) -> Option<f64> {
        self.0.get(name).and_then(Value::as_f64)
    }

    pub fn bool(&self, name: &str) -> Option<bool> {
        self.0.get(name).and_then(Value::as_bool)
    }

    /// Deserialize one argument into a concrete type
    pub fn get<T: DeserializeOwned>(&self, name: &str) -> Option<T> {
        self.0
            .get(name)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weather_schema() -> ArgumentSchema {
        ArgumentSchema::new(
            "GetWeather",
            vec![
                ParameterSchema::required("location", ParamType::String)
                    .describe("City or region"),
                ParameterSchema::optional("unit", ParamType::String)
                    .with_default(json!("F"))
                    .one_of(vec![json!("F"), json!("C")]),
            ],
        )
    }

    #[test]
    fn test_json_schema_shape() {
        let schema = weather_schema().json_schema();
        assert_eq!(schema["title"], "GetWeather");
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["required"], json!(["location"]));
        assert_eq!(schema["properties"]["location"]["type"], "string");
        assert_eq!(schema["properties"]["location"]["title"], "Location");
        assert_eq!(schema["properties"]["unit"]["enum"], json!(["F", "C"]));
    }

    #[test]
    fn test_coerce_fills_defaults() {
        let args = weather_schema().coerce(&json!({"location": "Paris"})).unwrap();
        assert_eq!(args.str("location"), Some("Paris"));
        assert_eq!(args.str("unit"), Some("F"));
    }

    #[test]
    fn test_coerce_reports_every_issue() {
        let issues = weather_schema()
            .coerce(&json!({"loc": "Paris", "unit": "K"}))
            .unwrap_err();
        let fields: Vec<_> = issues.iter().map(|i| i.field.as_str()).collect();
        assert!(fields.contains(&"loc"));
        assert!(fields.contains(&"location"));
        assert!(fields.contains(&"unit"));
    }

    #[test]
    fn test_coerce_lax_primitives() {
        let schema = ArgumentSchema::new(
            "Mixed",
            vec![
                ParameterSchema::required("count", ParamType::Integer),
                ParameterSchema::required("ratio", ParamType::Number),
                ParameterSchema::required("verbose", ParamType::Boolean),
            ],
        );
        let args = schema
            .coerce(&json!({"count": "42", "ratio": "0.5", "verbose": "yes"}))
            .unwrap();
        assert_eq!(args.i64("count"), Some(42));
        assert_eq!(args.f64("ratio"), Some(0.5));
        assert_eq!(args.bool("verbose"), Some(true));

        let args = schema
            .coerce(&json!({"count": 3.0, "ratio": 2, "verbose": 0}))
            .unwrap();
        assert_eq!(args.i64("count"), Some(3));
        assert_eq!(args.bool("verbose"), Some(false));

        assert!(schema
            .coerce(&json!({"count": 3.5, "ratio": 1, "verbose": true}))
            .is_err());
    }

    #[test]
    fn test_integer_out_of_range_is_rejected() {
        let schema = ArgumentSchema::new(
            "Count",
            vec![ParameterSchema::required("count", ParamType::Integer)],
        );

        let issues = schema.coerce(&json!({"count": 1e20})).unwrap_err();
        assert_eq!(issues[0].field, "count");

        assert!(schema.coerce(&json!({"count": u64::MAX})).is_err());
        assert!(schema.coerce(&json!({"count": "99999999999999999999"})).is_err());

        let args = schema.coerce(&json!({"count": i64::MAX})).unwrap();
        assert_eq!(args.i64("count"), Some(i64::MAX));
    }

    #[test]
    fn test_typed_argument_access() {
        let schema = ArgumentSchema::new(
            "Tag",
            vec![
                ParameterSchema::required("labels", ParamType::Array),
                ParameterSchema::optional("note", ParamType::String),
            ],
        );
        let args = schema
            .coerce(&json!({"labels": ["urgent", "network"]}))
            .unwrap();
        assert_eq!(args.len(), 1);
        assert_eq!(
            args.get::<Vec<String>>("labels"),
            Some(vec!["urgent".to_string(), "network".to_string()])
        );
        assert_eq!(args.get::<Vec<String>>("note"), None);
        assert_eq!(args.get::<u32>("labels"), None);
    }

    #[test]
    fn test_string_does_not_accept_numbers() {
        let issues = weather_schema().coerce(&json!({"location": 12})).unwrap_err();
        assert_eq!(issues[0].field, "location");
        assert!(issues[0].reason.contains("expected string"));
    }

    #[test]
    fn test_serialized_and_scalar_payloads() {
        let schema = weather_schema();
        let args = schema.coerce(&json!("{\"location\": \"Oslo\"}")).unwrap();
        assert_eq!(args.str("location"), Some("Oslo"));

        let greet = ArgumentSchema::new(
            "Greet",
            vec![ParameterSchema::required("person", ParamType::String)],
        );
        let args = greet.coerce(&json!("Roberto")).unwrap();
        assert_eq!(args.str("person"), Some("Roberto"));

        // two parameters: a bare scalar is ambiguous
        assert!(schema.coerce(&json!("Oslo")).is_err());
    }

    #[test]
    fn test_null_payload_means_no_arguments() {
        let schema = ArgumentSchema::new(
            "Now",
            vec![ParameterSchema::optional("format", ParamType::String)],
        );
        let args = schema.coerce(&Value::Null).unwrap();
        assert!(args.is_empty());
    }
}
