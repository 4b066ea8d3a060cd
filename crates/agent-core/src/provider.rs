//! LLM Provider Strategy Pattern
//!
//! Defines a common interface for all LLM backends (OpenAI-compatible APIs,
//! Ollama, test doubles) so the agent works with any of them unchanged.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agent_core::provider::{GenerationOptions, LlmProvider};
//!
//! let completion = provider
//!     .generate(&turns, Some(&tool_definitions), &GenerationOptions::default())
//!     .await?;
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{AgentError, Result};
use crate::message::{AssistantTurn, Turn};
use crate::tool::ToolDefinition;

/// Configuration for LLM generation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Model identifier (e.g., "llama3.2", "gpt-4")
    pub model: String,

    /// Temperature for sampling (0.0 = deterministic, 1.0 = creative)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Top-p nucleus sampling
    #[serde(default = "default_top_p")]
    pub top_p: f32,

    /// Stop sequences
    #[serde(default)]
    pub stop_sequences: Vec<String>,
}

fn default_temperature() -> f32 { 0.7 }
fn default_max_tokens() -> u32 { 2048 }
fn default_top_p() -> f32 { 0.9 }

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            model: "llama3.2".into(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            top_p: default_top_p(),
            stop_sequences: Vec::new(),
        }
    }
}

impl GenerationOptions {
    /// Copy with an extra stop sequence, skipping duplicates
    pub fn with_stop(&self, stop: &str) -> Self {
        let mut options = self.clone();
        if !options.stop_sequences.iter().any(|s| s == stop) {
            options.stop_sequences.push(stop.to_string());
        }
        options
    }
}

/// Response from an LLM completion
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Completion {
    /// The generated assistant turn
    pub turn: AssistantTurn,

    /// Model that generated this response
    pub model: String,

    /// Token usage statistics (if available)
    pub usage: Option<TokenUsage>,

    /// Finish reason
    pub finish_reason: Option<FinishReason>,
}

impl Completion {
    pub fn new(turn: AssistantTurn, model: impl Into<String>) -> Self {
        Self {
            turn,
            model: model.into(),
            usage: None,
            finish_reason: None,
        }
    }
}

/// Token usage statistics
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Reason for completion finishing
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ToolUse,
    ContentFilter,
    Error,
}

impl FinishReason {
    /// Map the wire spelling used by chat-completion style APIs
    pub fn from_wire(reason: &str) -> Self {
        match reason {
            "stop" => FinishReason::Stop,
            "length" => FinishReason::Length,
            "tool_calls" | "function_call" | "tool_use" => FinishReason::ToolUse,
            "content_filter" => FinishReason::ContentFilter,
            _ => FinishReason::Error,
        }
    }
}

/// Provider metadata
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProviderInfo {
    /// Provider name (e.g., "Ollama", "OpenAI")
    pub name: String,

    /// Whether tool/function calling is supported
    pub supports_tools: bool,
}

/// Strategy trait for LLM providers
///
/// Implement this trait to add support for new LLM backends.
/// The agent works exclusively through this interface.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Get provider information and capabilities
    fn info(&self) -> ProviderInfo;

    /// Check if the provider is available and configured correctly
    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    /// Generate one assistant turn.
    ///
    /// `tools` is only passed for the structured protocol; stop strings
    /// travel in `options.stop_sequences`.
    async fn generate(
        &self,
        turns: &[Turn],
        tools: Option<&[ToolDefinition]>,
        options: &GenerationOptions,
    ) -> Result<Completion>;
}

/// Reject a structured request on a backend that cannot honour it
pub fn ensure_tools_supported(info: &ProviderInfo, tools: Option<&[ToolDefinition]>) -> Result<()> {
    match tools {
        Some(tools) if !tools.is_empty() && !info.supports_tools => Err(AgentError::Config(format!(
            "{} does not support structured tool calling; use the text-prompt protocol",
            info.name
        ))),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_generation_options_defaults() {
        let opts = GenerationOptions::default();
        assert!((opts.temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(opts.max_tokens, 2048);
        assert_eq!(opts.model, "llama3.2");
        assert!(opts.stop_sequences.is_empty());
    }

    #[test]
    fn test_with_stop_deduplicates() {
        let opts = GenerationOptions::default().with_stop("Observation:");
        let opts = opts.with_stop("Observation:");
        assert_eq!(opts.stop_sequences, vec!["Observation:".to_string()]);
    }

    #[test]
    fn test_finish_reason_mapping() {
        assert_eq!(FinishReason::from_wire("tool_calls"), FinishReason::ToolUse);
        assert_eq!(FinishReason::from_wire("stop"), FinishReason::Stop);
        assert_eq!(FinishReason::from_wire("weird"), FinishReason::Error);
    }

    #[test]
    fn test_ensure_tools_supported() {
        let info = ProviderInfo { name: "Ollama".into(), supports_tools: false };
        let tools = vec![ToolDefinition {
            name: "t".into(),
            description: "d".into(),
            parameters: json!({"type": "object"}),
        }];
        assert!(ensure_tools_supported(&info, None).is_ok());
        assert!(ensure_tools_supported(&info, Some(&[])).is_ok());
        assert!(matches!(
            ensure_tools_supported(&info, Some(&tools)),
            Err(AgentError::Config(_))
        ));
    }
}
