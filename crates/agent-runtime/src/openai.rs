//! OpenAI-compatible Provider
//!
//! Chat-completions client for any endpoint speaking the OpenAI wire format
//! (OpenAI itself, Ollama's `/v1`, vLLM, ...). Supports structured tool
//! calling, so it pairs with the native protocol.

use std::time::Duration;

use agent_core::{
    error::{AgentError, Result},
    message::{AssistantTurn, Turn},
    provider::{Completion, FinishReason, GenerationOptions, LlmProvider, ProviderInfo, TokenUsage},
    tool::{ToolCall, ToolDefinition},
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Upper bound the API places on stop sequences
const MAX_STOP_SEQUENCES: usize = 4;

/// Model used when none is configured
pub const DEFAULT_MODEL: &str = "gpt-4";

/// OpenAI provider configuration
#[derive(Clone, Debug)]
pub struct OpenAiConfig {
    /// API key; optional for local endpoints
    pub api_key: Option<String>,

    /// Base URL, without the `/chat/completions` suffix
    pub base_url: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".into(),
            timeout_secs: 120,
        }
    }
}

impl OpenAiConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_key: std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty()),
            base_url: std::env::var("OPENAI_BASE_URL").unwrap_or(defaults.base_url),
            timeout_secs: std::env::var("OPENAI_TIMEOUT_SECS")
                .ok()
                .and_then(|t| t.parse().ok())
                .unwrap_or(defaults.timeout_secs),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

/// OpenAI-compatible LLM provider
pub struct OpenAiProvider {
    client: reqwest::Client,
    config: OpenAiConfig,
}

impl OpenAiProvider {
    pub fn from_config(config: OpenAiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AgentError::Config(format!("HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_config(OpenAiConfig::from_env())
    }

    fn build_request<'a>(
        turns: &'a [Turn],
        tools: Option<&'a [ToolDefinition]>,
        options: &'a GenerationOptions,
    ) -> ChatRequest<'a> {
        let stop: Vec<&str> = options
            .stop_sequences
            .iter()
            .take(MAX_STOP_SEQUENCES)
            .map(String::as_str)
            .collect();

        ChatRequest {
            model: &options.model,
            messages: turns.iter().map(WireMessage::from_turn).collect(),
            tools: tools
                .filter(|t| !t.is_empty())
                .map(|t| t.iter().map(WireTool::from_definition).collect()),
            temperature: options.temperature,
            top_p: options.top_p,
            max_tokens: options.max_tokens,
            stop: (!stop.is_empty()).then_some(stop),
        }
    }

    fn parse_completion(body: &str, model: &str) -> Result<Completion> {
        let response: ChatResponse = serde_json::from_str(body)?;
        Self::convert_completion(response, model)
    }

    fn convert_completion(response: ChatResponse, model: &str) -> Result<Completion> {
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AgentError::Provider("response has no choices".into()))?;

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|c| ToolCall::new(c.id.unwrap_or_default(), c.function.name, c.function.arguments))
            .collect();

        Ok(Completion {
            turn: AssistantTurn {
                content: choice.message.content.filter(|c| !c.is_empty()),
                tool_calls,
            },
            model: response.model.unwrap_or_else(|| model.to_string()),
            usage: response.usage,
            finish_reason: choice.finish_reason.as_deref().map(FinishReason::from_wire),
        })
    }

    fn map_status(status: reqwest::StatusCode, body: String) -> AgentError {
        match status.as_u16() {
            401 | 403 => AgentError::Auth(body),
            429 => AgentError::RateLimited(body),
            s if s >= 500 => AgentError::ProviderUnavailable(format!("{status}: {body}")),
            _ => AgentError::Provider(format!("{status}: {body}")),
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            name: "OpenAI".into(),
            supports_tools: true,
        }
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/models", self.config.base_url.trim_end_matches('/'));
        let mut request = self.client.get(url);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }
        match request.send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(e) => {
                tracing::warn!("OpenAI health check failed: {}", e);
                Ok(false)
            }
        }
    }

    async fn generate(
        &self,
        turns: &[Turn],
        tools: Option<&[ToolDefinition]>,
        options: &GenerationOptions,
    ) -> Result<Completion> {
        let body = Self::build_request(turns, tools, options);

        let mut request = self.client.post(self.config.endpoint()).json(&body);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AgentError::ProviderUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Self::map_status(status, text));
        }

        let text = response
            .text()
            .await
            .map_err(|e| AgentError::ProviderUnavailable(e.to_string()))?;

        tracing::debug!(model = %options.model, bytes = text.len(), "OpenAI completion received");
        Self::parse_completion(&text, &options.model)
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<WireTool<'a>>>,
    temperature: f32,
    top_p: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<Vec<&'a str>>,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCallOut<'a>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<&'a str>,
}

impl<'a> WireMessage<'a> {
    fn from_turn(turn: &'a Turn) -> Self {
        match turn {
            Turn::System { content } => Self::plain("system", content),
            Turn::User { content } => Self::plain("user", content),
            Turn::Assistant(reply) => Self {
                role: "assistant",
                content: reply.content.as_deref(),
                tool_calls: reply.requests_tools().then(|| {
                    reply
                        .tool_calls
                        .iter()
                        .map(|c| WireToolCallOut {
                            id: &c.id,
                            kind: "function",
                            function: WireFunctionCall {
                                name: &c.name,
                                arguments: &c.arguments,
                            },
                        })
                        .collect()
                }),
                tool_call_id: None,
            },
            Turn::ToolResult(result) => Self {
                role: "tool",
                content: Some(&result.content),
                tool_calls: None,
                tool_call_id: result.call_id.as_deref(),
            },
        }
    }

    fn plain(role: &'static str, content: &'a str) -> Self {
        Self {
            role,
            content: Some(content),
            tool_calls: None,
            tool_call_id: None,
        }
    }
}

#[derive(Serialize)]
struct WireToolCallOut<'a> {
    id: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    function: WireFunctionCall<'a>,
}

#[derive(Serialize)]
struct WireFunctionCall<'a> {
    name: &'a str,
    arguments: &'a str,
}

#[derive(Serialize)]
struct WireTool<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    function: &'a ToolDefinition,
}

impl<'a> WireTool<'a> {
    fn from_definition(definition: &'a ToolDefinition) -> Self {
        Self {
            kind: "function",
            function: definition,
        }
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<TokenUsage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ResponseToolCall>>,
}

#[derive(Deserialize)]
struct ResponseToolCall {
    #[serde(default)]
    id: Option<String>,
    function: ResponseFunction,
}

#[derive(Deserialize)]
struct ResponseFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}
