//! Agent Events
//!
//! The orchestrator reports progress as [`AgentEvent`]s sent to an
//! [`EventSink`] instead of logging from inside the control flow. The default
//! sink forwards to `tracing`.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Events emitted while an agent handles one request
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// A user request was accepted
    RequestStarted { input: String, max_iterations: usize },

    /// About to call the LLM
    IterationStarted { iteration: usize },

    /// The LLM asked for a tool
    ToolRequested {
        iteration: usize,
        tool: String,
        call_id: Option<String>,
        arguments: String,
    },

    /// A tool returned
    ToolCompleted {
        iteration: usize,
        tool: String,
        call_id: Option<String>,
        output: String,
    },

    /// A tool failed; the request ends with this error
    ToolFailed {
        iteration: usize,
        tool: String,
        error: String,
    },

    /// The request finished with an answer
    FinalAnswer { iteration: usize, answer: String },

    /// The iteration budget ran out
    BudgetExhausted { iterations: usize },
}

/// Receiver of agent events
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &AgentEvent);
}

/// Forwards events to `tracing`
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &AgentEvent) {
        match event {
            AgentEvent::RequestStarted { max_iterations, .. } => {
                tracing::info!(max_iterations, "Agent request started");
            }
            AgentEvent::IterationStarted { iteration } => {
                tracing::debug!(iteration, "Calling provider");
            }
            AgentEvent::ToolRequested { iteration, tool, call_id, .. } => {
                tracing::debug!(iteration, tool = %tool, call_id = ?call_id, "Tool requested");
            }
            AgentEvent::ToolCompleted { iteration, tool, output, .. } => {
                tracing::debug!(iteration, tool = %tool, bytes = output.len(), "Tool completed");
            }
            AgentEvent::ToolFailed { iteration, tool, error } => {
                tracing::warn!(iteration, tool = %tool, error = %error, "Tool failed");
            }
            AgentEvent::FinalAnswer { iteration, .. } => {
                tracing::info!(iteration, "Final answer produced");
            }
            AgentEvent::BudgetExhausted { iterations } => {
                tracing::warn!(iterations, "Iteration budget exhausted");
            }
        }
    }
}

/// Sends events over a tokio channel; dropped silently once the receiver is gone
#[derive(Clone, Debug)]
pub struct ChannelSink {
    sender: mpsc::UnboundedSender<AgentEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<AgentEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: &AgentEvent) {
        let _ = self.sender.send(event.clone());
    }
}

/// Keeps every event in memory
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<AgentEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AgentEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: &AgentEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_sink() {
        let sink = RecordingSink::new();
        sink.emit(&AgentEvent::IterationStarted { iteration: 1 });
        sink.emit(&AgentEvent::BudgetExhausted { iterations: 1 });
        assert_eq!(sink.events().len(), 2);
    }

    #[tokio::test]
    async fn test_channel_sink() {
        let (sink, mut rx) = ChannelSink::new();
        sink.emit(&AgentEvent::FinalAnswer { iteration: 2, answer: "done".into() });
        assert_eq!(
            rx.recv().await,
            Some(AgentEvent::FinalAnswer { iteration: 2, answer: "done".into() })
        );

        drop(rx);
        sink.emit(&AgentEvent::IterationStarted { iteration: 3 });
    }

    #[test]
    fn test_event_serialization() {
        let value = serde_json::to_value(AgentEvent::IterationStarted { iteration: 1 }).unwrap();
        assert_eq!(value["type"], "iteration_started");
    }
}
