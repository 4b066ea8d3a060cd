//! Reasoning Loop
//!
//! Implements the ReAct (Reason + Act) pattern for agent behavior.
//! Each request alternates LLM calls and tool executions until the model
//! gives a final answer or the iteration budget runs out.
//!
//! Two protocols are supported. [`ToolProtocol::Native`] passes tool
//! definitions to the backend and reads structured calls back.
//! [`ToolProtocol::TextPrompt`] renders a ReAct prompt and parses a JSON
//! action out of the reply text.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::{AgentError, Result};
use crate::events::{AgentEvent, EventSink, TracingSink};
use crate::interpreter::{
    ActionParser, Interpretation, TextDecision, FINAL_ANSWER_MARKER, OBSERVATION_MARKER,
    interpret_structured,
};
use crate::memory::ConversationMemory;
use crate::message::{AssistantTurn, Turn};
use crate::provider::{GenerationOptions, LlmProvider, ProviderInfo};
use crate::registry::ToolRegistry;
use crate::template::PromptTemplate;
use crate::tool::{Tool, ToolDescriptor, ToolResult};

const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant. \
Use the available tools when they help answer the question, \
then reply to the user with a concise, accurate answer.";

/// How tool requests travel between the agent and the backend
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ToolProtocol {
    /// Backend receives tool definitions and returns structured calls
    #[default]
    Native,
    /// Tools are described in the prompt; calls come back as JSON in text
    TextPrompt,
}

impl ToolProtocol {
    /// Native when the backend supports it, text otherwise
    pub fn for_provider(info: &ProviderInfo) -> Self {
        if info.supports_tools {
            ToolProtocol::Native
        } else {
            ToolProtocol::TextPrompt
        }
    }
}

impl FromStr for ToolProtocol {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "native" | "structured" => Ok(ToolProtocol::Native),
            "text" | "text-prompt" | "react" => Ok(ToolProtocol::TextPrompt),
            other => Err(AgentError::Config(format!("unknown tool protocol: {other}"))),
        }
    }
}

/// Agent configuration
#[derive(Clone, Debug)]
pub struct AgentConfig {
    /// System prompt / persona
    pub system_prompt: String,

    /// Maximum reasoning iterations before giving up
    pub max_iterations: usize,

    pub protocol: ToolProtocol,

    /// Generation options
    pub generation: GenerationOptions,

    /// Prompt used by the text protocol
    pub template: PromptTemplate,

    pub final_answer_marker: String,

    /// Stop marker for the text protocol; the model must not write observations
    pub observation_marker: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.into(),
            max_iterations: 10,
            protocol: ToolProtocol::default(),
            generation: GenerationOptions::default(),
            template: PromptTemplate::react(),
            final_answer_marker: FINAL_ANSWER_MARKER.into(),
            observation_marker: OBSERVATION_MARKER.into(),
        }
    }
}

impl AgentConfig {
    /// Defaults overridden by `AGENT_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(prompt) = lookup("AGENT_SYSTEM_PROMPT") {
            config.system_prompt = prompt;
        }
        if let Some(max) = lookup("AGENT_MAX_ITERATIONS") {
            config.max_iterations = max
                .trim()
                .parse()
                .map_err(|_| AgentError::Config(format!("AGENT_MAX_ITERATIONS is not a number: {max}")))?;
        }
        if let Some(protocol) = lookup("AGENT_PROTOCOL") {
            config.protocol = protocol.parse()?;
        }
        if let Some(model) = lookup("AGENT_MODEL") {
            config.generation.model = model;
        }
        if let Some(temperature) = lookup("AGENT_TEMPERATURE") {
            config.generation.temperature = temperature
                .trim()
                .parse()
                .map_err(|_| AgentError::Config(format!("AGENT_TEMPERATURE is not a number: {temperature}")))?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(AgentError::Config("max_iterations must be at least 1".into()));
        }
        Ok(())
    }
}

/// How a request ended, when it did not fail
#[derive(Clone, Debug, PartialEq)]
pub enum RunOutcome {
    /// The model produced an answer
    Final { answer: String, iterations: usize },

    /// Every iteration requested tools; `transcript` holds the discarded steps
    BudgetExhausted { iterations: usize, transcript: Vec<Turn> },
}

impl RunOutcome {
    pub fn answer(&self) -> Option<&str> {
        match self {
            RunOutcome::Final { answer, .. } => Some(answer),
            RunOutcome::BudgetExhausted { .. } => None,
        }
    }

    pub fn iterations(&self) -> usize {
        match self {
            RunOutcome::Final { iterations, .. } | RunOutcome::BudgetExhausted { iterations, .. } => {
                *iterations
            }
        }
    }
}

/// The main Agent struct
///
/// Owns its tools and memory; run one agent per conversation.
pub struct Agent {
    provider: Arc<dyn LlmProvider>,
    tools: ToolRegistry,
    memory: ConversationMemory,
    config: AgentConfig,
    events: Arc<dyn EventSink>,
}

impl Agent {
    /// Create a new agent
    pub fn new(provider: Arc<dyn LlmProvider>, tools: ToolRegistry, config: AgentConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            provider,
            tools,
            memory: ConversationMemory::new(),
            config,
            events: Arc::new(TracingSink),
        })
    }

    pub fn builder() -> AgentBuilder {
        AgentBuilder::new()
    }

    /// Handle one user request
    pub async fn run(&mut self, input: impl Into<String>) -> Result<RunOutcome> {
        let input = input.into();
        self.emit(AgentEvent::RequestStarted {
            input: input.clone(),
            max_iterations: self.config.max_iterations,
        });
        self.memory.append(Turn::user(&input));

        match self.config.protocol {
            ToolProtocol::Native => self.run_native().await,
            ToolProtocol::TextPrompt => self.run_text_prompt(&input).await,
        }
    }

    /// Like [`run`](Self::run), but budget exhaustion becomes an error
    pub async fn ask(&mut self, input: impl Into<String>) -> Result<String> {
        match self.run(input).await? {
            RunOutcome::Final { answer, .. } => Ok(answer),
            RunOutcome::BudgetExhausted { iterations, .. } => Err(AgentError::BudgetExhausted(iterations)),
        }
    }

    async fn run_native(&mut self) -> Result<RunOutcome> {
        let definitions = self.tools.describe_all();
        let tools = (!definitions.is_empty()).then_some(definitions.as_slice());
        // turns of this request; flushed to memory only with the final answer
        let mut pending: Vec<Turn> = Vec::new();

        for iteration in 1..=self.config.max_iterations {
            self.emit(AgentEvent::IterationStarted { iteration });

            let mut turns = Vec::with_capacity(self.memory.len() + pending.len() + 1);
            if !self.config.system_prompt.is_empty() {
                turns.push(Turn::system(&self.config.system_prompt));
            }
            turns.extend(self.memory.snapshot());
            turns.extend(pending.iter().cloned());

            let completion = self
                .provider
                .generate(&turns, tools, &self.config.generation)
                .await?;

            let calls = match interpret_structured(&completion.turn) {
                Interpretation::Final(answer) => {
                    self.memory.append_many(pending.drain(..));
                    return Ok(self.finish(answer, iteration));
                }
                Interpretation::ToolCalls(calls) => calls,
            };

            pending.push(Turn::Assistant(AssistantTurn {
                content: completion.turn.content.clone(),
                tool_calls: calls.clone(),
            }));

            // in order; the first failure aborts the rest
            for call in &calls {
                self.emit(AgentEvent::ToolRequested {
                    iteration,
                    tool: call.name.clone(),
                    call_id: Some(call.id.clone()),
                    arguments: call.arguments.clone(),
                });
                let result = self
                    .tools
                    .execute_call(call)
                    .await
                    .inspect_err(|e| self.tool_failed(iteration, &call.name, e))?;
                self.emit(AgentEvent::ToolCompleted {
                    iteration,
                    tool: call.name.clone(),
                    call_id: Some(call.id.clone()),
                    output: result.output.clone(),
                });
                pending.push(Turn::ToolResult(result.into()));
            }
        }

        Ok(self.exhausted(pending))
    }

    async fn run_text_prompt(&mut self, input: &str) -> Result<RunOutcome> {
        let parser = ActionParser::new()
            .final_answer_marker(&self.config.final_answer_marker)
            .stop_marker(&self.config.observation_marker);
        let options = if self.config.observation_marker.is_empty() {
            self.config.generation.clone()
        } else {
            self.config.generation.with_stop(&self.config.observation_marker)
        };

        // history before this request's user turn
        let chat_history = self.memory.render_transcript(self.memory.len().saturating_sub(1));
        let mut values: HashMap<&str, String> = HashMap::from([
            ("system_message", self.config.system_prompt.clone()),
            ("tool_details", self.tools.describe_all_text()),
            ("tool_names", self.tools.list_names().join(", ")),
            ("chat_history", chat_history),
            ("user_input", input.to_string()),
            ("react_loop", String::new()),
        ]);
        // Thought/Action/Observation steps, cleared with the final answer
        let mut scratchpad = String::new();
        let mut transcript: Vec<Turn> = Vec::new();

        for iteration in 1..=self.config.max_iterations {
            self.emit(AgentEvent::IterationStarted { iteration });

            values.insert("react_loop", scratchpad.clone());
            let prompt = self.config.template.render(&values)?;
            let completion = self
                .provider
                .generate(&[Turn::user(prompt)], None, &options)
                .await?;
            let reply = completion.turn.text_or_empty();

            let action = match parser.parse(reply)? {
                TextDecision::Final(answer) => return Ok(self.finish(answer, iteration)),
                TextDecision::Action(action) => action,
            };

            let arguments = action.arguments.to_string();
            self.emit(AgentEvent::ToolRequested {
                iteration,
                tool: action.name.clone(),
                call_id: None,
                arguments,
            });
            let value = self
                .tools
                .execute_value(&action.name, &action.arguments)
                .await
                .inspect_err(|e| self.tool_failed(iteration, &action.name, e))?;
            let observation = ToolResult::from_value(&action.name, value).output;
            self.emit(AgentEvent::ToolCompleted {
                iteration,
                tool: action.name.clone(),
                call_id: None,
                output: observation.clone(),
            });

            // the template already ends with "Thought: "
            let step = parser.truncate(reply).trim();
            let step = step.strip_prefix("Thought:").map_or(step, str::trim_start);
            scratchpad.push_str(step);
            scratchpad.push_str(&format!(
                "\n{} {}\nThought: ",
                self.config.observation_marker, observation
            ));
            transcript.push(Turn::assistant(step));
            transcript.push(Turn::tool_result(&action.name, None, observation));
        }

        Ok(self.exhausted(transcript))
    }

    fn finish(&mut self, answer: String, iteration: usize) -> RunOutcome {
        self.memory.append(Turn::assistant(&answer));
        self.emit(AgentEvent::FinalAnswer {
            iteration,
            answer: answer.clone(),
        });
        RunOutcome::Final {
            answer,
            iterations: iteration,
        }
    }

    fn exhausted(&self, transcript: Vec<Turn>) -> RunOutcome {
        let iterations = self.config.max_iterations;
        self.emit(AgentEvent::BudgetExhausted { iterations });
        RunOutcome::BudgetExhausted { iterations, transcript }
    }

    fn tool_failed(&self, iteration: usize, tool: &str, error: &AgentError) {
        self.emit(AgentEvent::ToolFailed {
            iteration,
            tool: tool.to_string(),
            error: error.to_string(),
        });
    }

    fn emit(&self, event: AgentEvent) {
        self.events.emit(&event);
    }

    /// Conversation so far
    pub fn memory(&self) -> &ConversationMemory {
        &self.memory
    }

    /// Forget the conversation
    pub fn reset_memory(&mut self) {
        self.memory.reset();
    }

    /// Get the tool registry
    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Get configuration
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }
}

/// Builder for Agent configuration
pub struct AgentBuilder {
    provider: Option<Arc<dyn LlmProvider>>,
    tools: ToolRegistry,
    pending_tools: Vec<Arc<dyn Tool>>,
    config: AgentConfig,
    events: Option<Arc<dyn EventSink>>,
}

impl Default for AgentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentBuilder {
    pub fn new() -> Self {
        Self {
            provider: None,
            tools: ToolRegistry::new(),
            pending_tools: Vec::new(),
            config: AgentConfig::default(),
            events: None,
        }
    }

    pub fn provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Queue a tool; it is described and registered in [`build`](Self::build)
    pub fn tool<T: Tool + 'static>(mut self, tool: T) -> Self {
        self.pending_tools.push(Arc::new(tool));
        self
    }

    pub fn tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    pub fn config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = prompt.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.generation.model = model.into();
        self
    }

    pub fn temperature(mut self, temp: f32) -> Self {
        self.config.generation.temperature = temp;
        self
    }

    pub fn max_iterations(mut self, max: usize) -> Self {
        self.config.max_iterations = max;
        self
    }

    pub fn protocol(mut self, protocol: ToolProtocol) -> Self {
        self.config.protocol = protocol;
        self
    }

    pub fn template(mut self, template: PromptTemplate) -> Self {
        self.config.template = template;
        self
    }

    pub fn event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.events = Some(sink);
        self
    }

    pub fn build(self) -> Result<Agent> {
        let provider = self
            .provider
            .ok_or_else(|| AgentError::Config("Provider is required".into()))?;

        let mut tools = self.tools;
        for tool in self.pending_tools {
            tools.register_descriptor(ToolDescriptor::from_arc(tool)?)?;
        }

        let mut agent = Agent::new(provider, tools, self.config)?;
        if let Some(events) = self.events {
            agent.events = events;
        }
        Ok(agent)
    }
}
