//! Tool System
//!
//! A [`Tool`] is any callable with explicit metadata: a name, a description
//! and an [`ArgumentSchema`]. Wrapping it in a [`ToolDescriptor`] checks that
//! metadata once, up front, and gives the two renderings the LM needs.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AgentError, Result, ToolError};
use crate::schema::{ArgumentSchema, Arguments, ParameterSchema};

/// Metadata a tool declares about itself
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Unique tool identifier
    pub name: String,

    /// Human-readable description (shown to LLM)
    pub description: Option<String>,

    /// Parameter definitions
    pub schema: ArgumentSchema,
}

/// Tool trait - implement to add new capabilities
#[async_trait]
pub trait Tool: Send + Sync {
    /// Name, description and argument schema
    fn spec(&self) -> ToolSpec;

    /// Run with arguments that already passed schema coercion
    async fn call(&self, args: Arguments) -> anyhow::Result<Value>;
}

type ToolFn = dyn Fn(Arguments) -> BoxFuture<'static, anyhow::Result<Value>> + Send + Sync;

/// Closure-backed tool
pub struct FnTool {
    spec: ToolSpec,
    func: Arc<ToolFn>,
}

impl FnTool {
    pub fn new<F, Fut>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(Arguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        let name = name.into();
        Self {
            spec: ToolSpec {
                schema: ArgumentSchema::new(schema_title(&name), Vec::new()),
                name,
                description: None,
            },
            func: Arc::new(move |args| Box::pin(func(args))),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.spec.description = Some(description.into());
        self
    }

    pub fn param(mut self, parameter: ParameterSchema) -> Self {
        self.spec.schema.parameters.push(parameter);
        self
    }
}

#[async_trait]
impl Tool for FnTool {
    fn spec(&self) -> ToolSpec {
        self.spec.clone()
    }

    async fn call(&self, args: Arguments) -> anyhow::Result<Value> {
        (self.func)(args).await
    }
}

fn schema_title(name: &str) -> String {
    name.split('_')
        .map(|part| {
            let mut chars = part.chars();
            chars
                .next()
                .map(|c| c.to_uppercase().chain(chars).collect::<String>())
                .unwrap_or_default()
        })
        .collect()
}

/// Machine-readable definition for structured tool calling
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema with bookkeeping `title` fields removed
    pub parameters: Value,
}

/// A tool bound to its validated metadata
pub struct ToolDescriptor {
    name: String,
    description: String,
    schema: ArgumentSchema,
    tool: Arc<dyn Tool>,
}

impl fmt::Debug for ToolDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolDescriptor")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

impl ToolDescriptor {
    /// Wrap a tool, rejecting it if its metadata is incomplete
    pub fn new<T: Tool + 'static>(tool: T) -> Result<Self> {
        Self::from_arc(Arc::new(tool))
    }

    pub fn from_arc(tool: Arc<dyn Tool>) -> Result<Self> {
        let spec = tool.spec();
        let name = spec.name.trim().to_string();
        if name.is_empty() {
            return Err(AgentError::Config("tool name must not be empty".into()));
        }

        let description = spec
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty())
            .ok_or_else(|| AgentError::MissingDocumentation(name.clone()))?;

        Ok(Self {
            name,
            description,
            schema: spec.schema,
            tool,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn schema(&self) -> &ArgumentSchema {
        &self.schema
    }

    pub fn describe_for_structured_calling(&self) -> ToolDefinition {
        let mut parameters = self.schema.json_schema();
        strip_titles(&mut parameters);
        ToolDefinition {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters,
        }
    }

    /// One line: name, description and argument names with descriptions
    pub fn describe_for_text_prompt(&self) -> String {
        let args = self
            .schema
            .parameters
            .iter()
            .map(|p| match &p.description {
                Some(d) => format!("{} ({}): {}", p.name, p.param_type, d),
                None => format!("{} ({})", p.name, p.param_type),
            })
            .collect::<Vec<_>>()
            .join(", ");
        format!("{}: {} Args: {{{}}}", self.name, self.description, args)
    }

    /// Whether `raw` would pass coercion
    pub fn validate(&self, raw: &Value) -> bool {
        self.schema.coerce(raw).is_ok()
    }

    pub fn coerce(&self, raw: &Value) -> std::result::Result<Arguments, ToolError> {
        self.schema
            .coerce(raw)
            .map_err(|issues| ToolError::ArgumentValidation {
                tool: self.name.clone(),
                issues,
            })
    }

    /// Coerce `raw` and call the tool
    pub async fn invoke(&self, raw: &Value) -> std::result::Result<Value, ToolError> {
        let args = self.coerce(raw)?;
        self.invoke_validated(args).await
    }

    pub async fn invoke_validated(&self, args: Arguments) -> std::result::Result<Value, ToolError> {
        self.tool.call(args).await.map_err(|source| ToolError::Runtime {
            tool: self.name.clone(),
            source,
        })
    }
}

fn strip_titles(schema: &mut Value) {
    if let Value::Object(map) = schema {
        map.remove("title");
        if let Some(Value::Object(properties)) = map.get_mut("properties") {
            for property in properties.values_mut() {
                if let Value::Object(p) = property {
                    p.remove("title");
                }
            }
        }
    }
}

/// Tool call request from the LLM
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Call ID used to correlate the result
    pub id: String,

    /// Tool identifier
    pub name: String,

    /// Serialized argument payload, as produced by the LLM
    pub arguments: String,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }
}

/// Result from tool execution
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolResult {
    /// Tool that was called
    pub name: String,

    /// Call ID (if provided in request)
    pub id: Option<String>,

    /// Whether execution succeeded
    pub success: bool,

    /// Output rendered as text for the conversation
    pub output: String,

    /// Structured data (if applicable)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ToolResult {
    /// Build a successful result; strings are kept verbatim, other values as JSON
    pub fn from_value(name: impl Into<String>, value: Value) -> Self {
        let output = match &value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        Self {
            name: name.into(),
            id: None,
            success: true,
            output,
            data: Some(value),
        }
    }

    pub fn failure(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: None,
            success: false,
            output: error.into(),
            data: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ParamType;
    use serde_json::json;

    fn greet() -> FnTool {
        FnTool::new("greet", |args: Arguments| async move {
            let person = args.str("person").unwrap_or_default().to_string();
            Ok(json!(format!("Hello, {person}!")))
        })
        .description("Greet a person by name.")
        .param(ParameterSchema::required("person", ParamType::String).describe("Who to greet"))
    }

    #[test]
    fn test_missing_description_is_rejected() {
        let tool = FnTool::new("undocumented", |_| async { Ok(Value::Null) });
        let err = ToolDescriptor::new(tool).unwrap_err();
        assert!(matches!(err, AgentError::MissingDocumentation(name) if name == "undocumented"));

        let blank = FnTool::new("blank", |_| async { Ok(Value::Null) }).description("   ");
        assert!(matches!(
            ToolDescriptor::new(blank),
            Err(AgentError::MissingDocumentation(_))
        ));
    }

    #[test]
    fn test_empty_name_is_rejected() {
        let tool = FnTool::new("", |_| async { Ok(Value::Null) }).description("nameless");
        assert!(matches!(ToolDescriptor::new(tool), Err(AgentError::Config(_))));
    }

    #[test]
    fn test_structured_description_strips_titles() {
        let descriptor = ToolDescriptor::new(greet()).unwrap();
        let definition = descriptor.describe_for_structured_calling();

        assert_eq!(definition.name, "greet");
        assert_eq!(definition.description, "Greet a person by name.");
        assert!(definition.parameters.get("title").is_none());
        assert!(definition.parameters["properties"]["person"].get("title").is_none());
        assert_eq!(definition.parameters["properties"]["person"]["type"], "string");
        assert_eq!(descriptor.schema().title, "Greet");
    }

    #[test]
    fn test_structured_description_matches_accepted_names() {
        let tool = greet().param(ParameterSchema::optional("formal", ParamType::Boolean));
        let descriptor = ToolDescriptor::new(tool).unwrap();
        let definition = descriptor.describe_for_structured_calling();

        let mut advertised: Vec<String> = definition.parameters["properties"]
            .as_object()
            .unwrap()
            .keys()
            .cloned()
            .collect();
        advertised.sort();

        let payload: serde_json::Map<String, Value> = advertised
            .iter()
            .map(|name| {
                let value = match descriptor.schema().parameter(name).unwrap().param_type {
                    ParamType::Boolean => json!(true),
                    _ => json!("x"),
                };
                (name.clone(), value)
            })
            .collect();
        assert!(descriptor.validate(&Value::Object(payload)));

        let mut accepted: Vec<String> =
            descriptor.schema().names().into_iter().map(String::from).collect();
        accepted.sort();
        assert_eq!(advertised, accepted);
        assert!(!descriptor.validate(&json!({"person": "x", "nickname": "y"})));
    }

    #[test]
    fn test_text_description() {
        let descriptor = ToolDescriptor::new(greet()).unwrap();
        assert_eq!(
            descriptor.describe_for_text_prompt(),
            "greet: Greet a person by name. Args: {person (string): Who to greet}"
        );
    }

    #[tokio::test]
    async fn test_invoke_validates_then_calls() {
        let descriptor = ToolDescriptor::new(greet()).unwrap();
        let out = descriptor.invoke(&json!({"person": "Roberto"})).await.unwrap();
        assert_eq!(out, json!("Hello, Roberto!"));

        let err = descriptor.invoke(&json!({"name": "Roberto"})).await.unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn test_invoke_surfaces_runtime_failure() {
        let tool = FnTool::new("explode", |_| async { Err(anyhow::anyhow!("kaboom")) })
            .description("Always fails.");
        let descriptor = ToolDescriptor::new(tool).unwrap();
        let err = descriptor.invoke(&json!({})).await.unwrap_err();
        assert!(matches!(&err, ToolError::Runtime { tool, .. } if tool == "explode"));
        assert!(err.to_string().contains("kaboom"));
    }

    #[test]
    fn test_tool_result_rendering() {
        let text = ToolResult::from_value("get_weather", json!("Virginia: 70F."));
        assert_eq!(text.output, "Virginia: 70F.");

        let data = ToolResult::from_value("calc", json!({"sum": 4})).with_id("call_1");
        assert_eq!(data.output, r#"{"sum":4}"#);
        assert_eq!(data.id.as_deref(), Some("call_1"));
    }
}
