//! Conversation Turns
//!
//! Standard turn format used across the agent system.

use serde::{Deserialize, Serialize};

use crate::tool::{ToolCall, ToolResult};

/// Role of a message sender
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System prompt/instructions
    System,
    /// User input
    User,
    /// Assistant (LLM) response
    Assistant,
    /// Tool result (injected as context)
    Tool,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
            Role::Tool => write!(f, "tool"),
        }
    }
}

/// An assistant reply: text, requested tool calls, or both
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AssistantTurn {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
}

impl AssistantTurn {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            tool_calls: Vec::new(),
        }
    }

    pub fn tool_calls(calls: Vec<ToolCall>) -> Self {
        Self {
            content: None,
            tool_calls: calls,
        }
    }

    pub fn requests_tools(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    /// Text content, empty when absent
    pub fn text_or_empty(&self) -> &str {
        self.content.as_deref().unwrap_or_default()
    }
}

/// Output of one tool call, fed back to the LLM
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolResultTurn {
    /// Tool that produced this result
    pub name: String,

    /// ID of the call this answers, when the protocol has one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_id: Option<String>,

    /// Serialized result or error text
    pub content: String,

    #[serde(default)]
    pub is_error: bool,
}

impl From<ToolResult> for ToolResultTurn {
    fn from(result: ToolResult) -> Self {
        Self {
            name: result.name,
            call_id: result.id,
            content: result.output,
            is_error: !result.success,
        }
    }
}

/// A single message in a conversation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Turn {
    System { content: String },
    User { content: String },
    Assistant(AssistantTurn),
    ToolResult(ToolResultTurn),
}

impl Turn {
    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Turn::System {
            content: content.into(),
        }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Turn::User {
            content: content.into(),
        }
    }

    /// Create a plain-text assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Turn::Assistant(AssistantTurn::text(content))
    }

    /// Create a tool result message
    pub fn tool_result(
        name: impl Into<String>,
        call_id: Option<String>,
        content: impl Into<String>,
    ) -> Self {
        Turn::ToolResult(ToolResultTurn {
            name: name.into(),
            call_id,
            content: content.into(),
            is_error: false,
        })
    }

    pub fn role(&self) -> Role {
        match self {
            Turn::System { .. } => Role::System,
            Turn::User { .. } => Role::User,
            Turn::Assistant(_) => Role::Assistant,
            Turn::ToolResult(_) => Role::Tool,
        }
    }

    /// Text body of the turn (tool calls are not rendered)
    pub fn content(&self) -> &str {
        match self {
            Turn::System { content } | Turn::User { content } => content,
            Turn::Assistant(turn) => turn.text_or_empty(),
            Turn::ToolResult(result) => &result.content,
        }
    }
}
