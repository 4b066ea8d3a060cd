//! Error Types
//!
//! Two layers: [`ToolError`] is raised by a single tool descriptor while it
//! validates or runs a call, and [`AgentError`] is what the registry and the
//! orchestrator surface to callers.

use std::fmt;

use thiserror::Error;

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// One rejected argument field
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldIssue {
    /// Offending field (`"$"` when the payload as a whole is wrong)
    pub field: String,

    /// Why it was rejected
    pub reason: String,
}

impl FieldIssue {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

fn join_issues(issues: &[FieldIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Failure raised by a tool descriptor
#[derive(Error, Debug)]
pub enum ToolError {
    /// Arguments did not match the declared schema
    #[error("invalid arguments for '{tool}': {}", join_issues(.issues))]
    ArgumentValidation {
        tool: String,
        issues: Vec<FieldIssue>,
    },

    /// The tool's own logic failed
    #[error("tool '{tool}' failed: {source}")]
    Runtime {
        tool: String,
        #[source]
        source: anyhow::Error,
    },
}

impl ToolError {
    /// Name of the tool that raised the error
    pub fn tool(&self) -> &str {
        match self {
            ToolError::ArgumentValidation { tool, .. } | ToolError::Runtime { tool, .. } => tool,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, ToolError::ArgumentValidation { .. })
    }
}

/// Agent error types
#[derive(Error, Debug)]
pub enum AgentError {
    /// Tool has no human-readable description
    #[error("Tool '{0}' has no description")]
    MissingDocumentation(String),

    /// A tool with this name is already registered
    #[error("Tool already registered: {0}")]
    DuplicateTool(String),

    /// Tool not found in registry
    #[error("Tool not found: {0}")]
    UnknownTool(String),

    /// Registry-level wrapper around a descriptor failure
    #[error("Tool execution error in '{tool}': {source}")]
    ToolExecution {
        tool: String,
        #[source]
        source: ToolError,
    },

    /// Text-prompt action present but unparsable
    #[error("Malformed action: {reason}")]
    MalformedAction { reason: String, raw: String },

    /// Maximum iterations reached in reasoning loop
    #[error("Maximum iterations ({0}) reached")]
    BudgetExhausted(usize),

    /// Prompt template could not be rendered
    #[error("Template error: {0}")]
    Template(String),

    /// LLM provider error
    #[error("Provider error: {0}")]
    Provider(String),

    /// Provider unavailable or not responding
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Rate limited
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other/unknown error
    #[error("{0}")]
    Other(String),
}

impl AgentError {
    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AgentError::ProviderUnavailable(_) | AgentError::RateLimited(_)
        )
    }

    /// The descriptor failure behind a `ToolExecution`, if any
    pub fn tool_error(&self) -> Option<&ToolError> {
        match self {
            AgentError::ToolExecution { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Convert to a user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            AgentError::Provider(msg) => format!("The AI service encountered an error: {msg}"),
            AgentError::ProviderUnavailable(_) => {
                "The AI service is currently unavailable. Please try again.".into()
            }
            AgentError::UnknownTool(name) => format!("The tool '{name}' is not available."),
            AgentError::ToolExecution { tool, source } if source.is_validation() => {
                format!("The tool '{tool}' was called with invalid input.")
            }
            AgentError::ToolExecution { tool, .. } => format!("The tool '{tool}' failed."),
            AgentError::MalformedAction { .. } => {
                "The assistant produced an action that could not be understood.".into()
            }
            AgentError::BudgetExhausted(_) => {
                "The request took too long to process. Please try a simpler query.".into()
            }
            AgentError::RateLimited(_) => "You've made too many requests. Please wait a moment.".into(),
            AgentError::Auth(_) => "Authentication failed. Please check your credentials.".into(),
            _ => "An unexpected error occurred.".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_lists_fields() {
        let err = ToolError::ArgumentValidation {
            tool: "get_weather".into(),
            issues: vec![
                FieldIssue::new("location", "field required"),
                FieldIssue::new("loc", "unexpected field"),
            ],
        };
        let text = err.to_string();
        assert!(text.contains("location: field required"));
        assert!(text.contains("loc: unexpected field"));
        assert_eq!(err.tool(), "get_weather");
    }

    #[test]
    fn test_tool_execution_exposes_source() {
        let err = AgentError::ToolExecution {
            tool: "greet".into(),
            source: ToolError::Runtime {
                tool: "greet".into(),
                source: anyhow::anyhow!("boom"),
            },
        };
        assert!(matches!(err.tool_error(), Some(ToolError::Runtime { .. })));
        assert!(!err.is_retryable());
        assert_eq!(err.user_message(), "The tool 'greet' failed.");
    }
}
