//! Tool Registry
//!
//! Owns the registered [`ToolDescriptor`]s and dispatches named calls to them.
//! Failures are wrapped once in [`AgentError::ToolExecution`] and returned;
//! nothing is retried.

use std::collections::HashMap;

use serde_json::Value;

use crate::error::{AgentError, FieldIssue, Result, ToolError};
use crate::tool::{Tool, ToolCall, ToolDefinition, ToolDescriptor, ToolResult};

/// Registry for available tools
#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, ToolDescriptor>,
    /// Registration order, used for prompt rendering
    order: Vec<String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Describe and register a tool
    pub fn register<T: Tool + 'static>(&mut self, tool: T) -> Result<()> {
        self.register_descriptor(ToolDescriptor::new(tool)?)
    }

    /// Register an already-built descriptor
    pub fn register_descriptor(&mut self, descriptor: ToolDescriptor) -> Result<()> {
        let name = descriptor.name().to_string();
        if self.tools.contains_key(&name) {
            return Err(AgentError::DuplicateTool(name));
        }
        tracing::debug!(tool = %name, "Registered tool");
        self.order.push(name.clone());
        self.tools.insert(name, descriptor);
        Ok(())
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Execute a tool from a serialized argument payload
    pub async fn execute(&self, name: &str, raw_arguments: &str) -> Result<Value> {
        let descriptor = self.lookup(name)?;
        let payload = if raw_arguments.trim().is_empty() {
            Value::Object(serde_json::Map::new())
        } else {
            serde_json::from_str(raw_arguments).map_err(|e| AgentError::ToolExecution {
                tool: name.to_string(),
                source: ToolError::ArgumentValidation {
                    tool: name.to_string(),
                    issues: vec![FieldIssue::new("$", format!("arguments are not valid JSON: {e}"))],
                },
            })?
        };
        Self::dispatch(descriptor, &payload).await
    }

    /// Execute a tool from an already-decoded payload
    pub async fn execute_value(&self, name: &str, arguments: &Value) -> Result<Value> {
        let descriptor = self.lookup(name)?;
        Self::dispatch(descriptor, arguments).await
    }

    /// Execute an LLM tool call, correlating the result with its call ID
    pub async fn execute_call(&self, call: &ToolCall) -> Result<ToolResult> {
        let value = self.execute(&call.name, &call.arguments).await?;
        Ok(ToolResult::from_value(&call.name, value).with_id(&call.id))
    }

    fn lookup(&self, name: &str) -> Result<&ToolDescriptor> {
        self.tools
            .get(name)
            .ok_or_else(|| AgentError::UnknownTool(name.to_string()))
    }

    async fn dispatch(descriptor: &ToolDescriptor, arguments: &Value) -> Result<Value> {
        let wrap = |source: ToolError| AgentError::ToolExecution {
            tool: descriptor.name().to_string(),
            source,
        };

        // Validate first
        let args = descriptor.coerce(arguments).map_err(wrap)?;

        tracing::debug!(tool = %descriptor.name(), "Executing tool");
        descriptor.invoke_validated(args).await.map_err(wrap)
    }

    /// Tool names in registration order
    pub fn list_names(&self) -> Vec<&str> {
        self.order.iter().map(String::as_str).collect()
    }

    /// Structured definitions of every tool, in registration order
    pub fn describe_all(&self) -> Vec<ToolDefinition> {
        self.descriptors()
            .map(ToolDescriptor::describe_for_structured_calling)
            .collect()
    }

    /// One line per tool for the text-prompt protocol
    pub fn describe_all_text(&self) -> String {
        self.descriptors()
            .map(ToolDescriptor::describe_for_text_prompt)
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn descriptors(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.order.iter().filter_map(|name| self.tools.get(name))
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Arguments, ParamType, ParameterSchema};
    use crate::tool::FnTool;
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn weather_tool() -> FnTool {
        FnTool::new("get_weather", |args: Arguments| async move {
            let location = args.str("location").unwrap_or_default().to_string();
            Ok(json!(format!("{location}: 70F.")))
        })
        .description("Get the current weather for a location.")
        .param(ParameterSchema::required("location", ParamType::String).describe("City or region"))
    }

    fn counting_tool(name: &str, calls: Arc<AtomicUsize>) -> FnTool {
        FnTool::new(name, move |_| {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(json!("ok"))
            }
        })
        .description("Counts its invocations.")
    }

    #[test]
    fn test_duplicate_registration_leaves_registry_unchanged() {
        let mut registry = ToolRegistry::new();
        registry.register(weather_tool()).unwrap();

        let replacement = FnTool::new("get_weather", |_| async { Ok(json!("other")) })
            .description("A different tool with the same name.");
        let err = registry.register(replacement).unwrap_err();

        assert!(matches!(err, AgentError::DuplicateTool(name) if name == "get_weather"));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.list_names(), vec!["get_weather"]);
        assert_eq!(
            registry.get("get_weather").unwrap().description(),
            "Get the current weather for a location."
        );
    }

    #[tokio::test]
    async fn test_unknown_tool_has_no_side_effects() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut registry = ToolRegistry::new();
        registry.register(counting_tool("counter", calls.clone())).unwrap();

        let err = registry.execute("missing", "{}").await.unwrap_err();
        assert!(matches!(err, AgentError::UnknownTool(name) if name == "missing"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_execute_weather() {
        let mut registry = ToolRegistry::new();
        registry.register(weather_tool()).unwrap();

        let out = registry
            .execute("get_weather", r#"{"location": "Paris"}"#)
            .await
            .unwrap();
        assert!(out.as_str().unwrap().contains("Paris"));

        let err = registry
            .execute("get_weather", r#"{"loc": "Paris"}"#)
            .await
            .unwrap_err();
        match err {
            AgentError::ToolExecution { tool, source } => {
                assert_eq!(tool, "get_weather");
                assert!(source.is_validation());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_invalid_json_payload_is_a_validation_failure() {
        let mut registry = ToolRegistry::new();
        registry.register(weather_tool()).unwrap();

        let err = registry.execute("get_weather", "{location:").await.unwrap_err();
        assert!(err.tool_error().is_some_and(ToolError::is_validation));
    }

    #[tokio::test]
    async fn test_runtime_failure_is_wrapped() {
        let mut registry = ToolRegistry::new();
        registry
            .register(
                FnTool::new("explode", |_| async { Err(anyhow::anyhow!("kaboom")) })
                    .description("Always fails."),
            )
            .unwrap();

        let err = registry.execute("explode", "").await.unwrap_err();
        assert!(matches!(
            err.tool_error(),
            Some(ToolError::Runtime { tool, .. }) if tool == "explode"
        ));
    }

    #[tokio::test]
    async fn test_execute_call_correlates_id() {
        let mut registry = ToolRegistry::new();
        registry.register(weather_tool()).unwrap();

        let call = ToolCall::new("call_7", "get_weather", r#"{"location":"Virginia"}"#);
        let result = registry.execute_call(&call).await.unwrap();
        assert!(result.success);
        assert_eq!(result.id.as_deref(), Some("call_7"));
        assert_eq!(result.output, "Virginia: 70F.");
    }

    #[test]
    fn test_introspection_keeps_registration_order() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut registry = ToolRegistry::new();
        registry.register(weather_tool()).unwrap();
        registry.register(counting_tool("counter", calls)).unwrap();

        assert_eq!(registry.list_names(), vec!["get_weather", "counter"]);
        let definitions = registry.describe_all();
        assert_eq!(definitions[0].name, "get_weather");
        assert_eq!(definitions[1].name, "counter");

        let text = registry.describe_all_text();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("get_weather: "));
        assert!(lines[1].starts_with("counter: "));
    }
}
