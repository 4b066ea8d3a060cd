//! Ollama LLM Provider
//!
//! Implementation of `LlmProvider` for local Ollama inference. ollama-rs has
//! no structured tool calling here, so this backend is driven through the
//! text-prompt protocol and honours its stop sequences.

use agent_core::{
    error::{AgentError, Result},
    message::{AssistantTurn, Turn},
    provider::{
        ensure_tools_supported, Completion, FinishReason, GenerationOptions, LlmProvider,
        ProviderInfo, TokenUsage,
    },
    tool::ToolDefinition,
};
use async_trait::async_trait;
use ollama_rs::{
    generation::{
        chat::{ChatMessage, ChatMessageResponse, MessageRole, request::ChatMessageRequest},
        options::GenerationOptions as OllamaOptions,
    },
    Ollama,
};

/// Ollama provider configuration
#[derive(Clone, Debug)]
pub struct OllamaConfig {
    /// Ollama host URL
    pub host: String,

    /// Ollama port
    pub port: u16,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: "http://localhost".into(),
            port: 11434,
        }
    }
}

impl OllamaConfig {
    pub fn from_env() -> Self {
        let host = std::env::var("OLLAMA_HOST")
            .unwrap_or_else(|_| "http://localhost".into());
        let port = std::env::var("OLLAMA_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(11434);

        Self { host, port }
    }
}

/// Ollama LLM provider
pub struct OllamaProvider {
    client: Ollama,
}

impl OllamaProvider {
    /// Create a new Ollama provider with custom host/port
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self::from_config(OllamaConfig {
            host: host.into(),
            port,
        })
    }

    pub fn from_config(config: OllamaConfig) -> Self {
        Self {
            client: Ollama::new(config.host, config.port),
        }
    }

    /// Create from environment variables
    pub fn from_env() -> Self {
        Self::from_config(OllamaConfig::from_env())
    }

    /// Convert conversation turns to Ollama chat messages.
    ///
    /// Tool results are replayed as user context labelled with the tool name.
    fn convert_turns(turns: &[Turn]) -> Vec<ChatMessage> {
        turns
            .iter()
            .filter_map(|turn| match turn {
                Turn::System { content } => Some(ChatMessage::new(MessageRole::System, content.clone())),
                Turn::User { content } => Some(ChatMessage::new(MessageRole::User, content.clone())),
                Turn::Assistant(reply) => reply
                    .content
                    .as_ref()
                    .map(|c| ChatMessage::new(MessageRole::Assistant, c.clone())),
                Turn::ToolResult(result) => Some(ChatMessage::new(
                    MessageRole::User,
                    format!("Tool {} returned: {}", result.name, result.content),
                )),
            })
            .collect()
    }

    fn convert_completion(response: ChatMessageResponse, model: &str) -> Completion {
        let content = response.message.content;
        Completion {
            turn: if content.is_empty() {
                AssistantTurn::default()
            } else {
                AssistantTurn::text(content)
            },
            model: model.to_string(),
            usage: response
                .final_data
                .as_ref()
                .map(|d| token_usage(d.prompt_eval_count, d.eval_count)),
            finish_reason: Some(FinishReason::Stop),
        }
    }

    fn build_options(opts: &GenerationOptions) -> OllamaOptions {
        let options = OllamaOptions::default()
            .temperature(opts.temperature)
            .top_p(opts.top_p)
            .num_predict(i32::try_from(opts.max_tokens).unwrap_or(i32::MAX));

        if opts.stop_sequences.is_empty() {
            options
        } else {
            options.stop(opts.stop_sequences.clone())
        }
    }
}

/// Usage from raw eval counts, clamped to `u32`
fn token_usage<N: TryInto<u32>>(prompt: N, completion: N) -> TokenUsage {
    let prompt = prompt.try_into().unwrap_or(u32::MAX);
    let completion = completion.try_into().unwrap_or(u32::MAX);
    TokenUsage {
        prompt_tokens: prompt,
        completion_tokens: completion,
        total_tokens: prompt.saturating_add(completion),
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            name: "Ollama".into(),
            supports_tools: false,
        }
    }

    async fn health_check(&self) -> Result<bool> {
        match self.client.list_local_models().await {
            Ok(_) => Ok(true),
            Err(e) => {
                tracing::warn!("Ollama health check failed: {}", e);
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
        ensure_tools_supported(&self.info(), tools)?;

        let request = ChatMessageRequest::new(options.model.clone(), Self::convert_turns(turns))
            .options(Self::build_options(options));

        let response = self
            .client
            .send_chat_messages(request)
            .await
            .map_err(|e| AgentError::Provider(e.to_string()))?;

        tracing::debug!(model = %options.model, "Ollama completion received");
        Ok(Self::convert_completion(response, &options.model))
    }
}
