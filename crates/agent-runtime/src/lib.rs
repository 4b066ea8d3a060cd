//! # agent-runtime
//!
//! LLM backends for the tool orchestration engine.
//!
//! ## Providers
//!
//! - **OpenAI-compatible**: chat-completions over HTTP with structured tool calling
//! - **Ollama** (default feature): local inference, driven by the text-prompt protocol
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agent_runtime::OpenAiProvider;
//!
//! let provider = OpenAiProvider::from_env()?;
//! let agent = Agent::builder()
//!     .provider(Arc::new(provider))
//!     .tool(weather_tool)
//!     .build()?;
//! ```

pub mod openai;

#[cfg(feature = "ollama")]
pub mod ollama;

pub use openai::{OpenAiConfig, OpenAiProvider};

#[cfg(feature = "ollama")]
pub use ollama::{OllamaConfig, OllamaProvider};

// Re-export core types for convenience
pub use agent_core::{
    Agent, AgentConfig, AgentError, LlmProvider, Result, RunOutcome, Tool, ToolProtocol,
    ToolRegistry,
};
