//! # agent-core
//!
//! Tool invocation and orchestration engine: describes tools to an LLM,
//! reads its replies, runs the requested tools and loops until a final
//! answer or the iteration budget.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          Agent                               │
//! │  ┌─────────────┐  ┌──────────────┐  ┌─────────────────────┐  │
//! │  │  Reasoning  │  │ ToolRegistry │  │   LlmProvider       │  │
//! │  │    Loop     │──│ (Descriptors)│──│   (Strategy)        │  │
//! │  └──────┬──────┘  └──────────────┘  └─────────────────────┘  │
//! │         │                                                    │
//! │  ┌──────┴──────┐  ┌──────────────┐  ┌─────────────────────┐  │
//! │  │ Interpreter │  │ Conversation │  │     EventSink       │  │
//! │  │ (JSON/ReAct)│  │    Memory    │  │  (observability)    │  │
//! │  └─────────────┘  └──────────────┘  └─────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The `LlmProvider` trait enables swapping between OpenAI-compatible APIs,
//! Ollama, or a scripted test double without changing agent logic.

pub mod error;
pub mod events;
pub mod interpreter;
pub mod memory;
pub mod message;
pub mod provider;
pub mod reasoning;
pub mod registry;
pub mod schema;
pub mod template;
pub mod tool;

pub use error::{AgentError, FieldIssue, Result, ToolError};
pub use events::{AgentEvent, EventSink, TracingSink};
pub use interpreter::{ActionParser, Interpretation, TextDecision};
pub use memory::ConversationMemory;
pub use message::{AssistantTurn, Role, ToolResultTurn, Turn};
pub use provider::{Completion, GenerationOptions, LlmProvider, ProviderInfo};
pub use reasoning::{Agent, AgentBuilder, AgentConfig, RunOutcome, ToolProtocol};
pub use registry::ToolRegistry;
pub use schema::{ArgumentSchema, Arguments, ParamType, ParameterSchema};
pub use template::PromptTemplate;
pub use tool::{FnTool, Tool, ToolCall, ToolDefinition, ToolDescriptor, ToolResult, ToolSpec};
