//! Conversation Memory
//!
//! Append-only log of turns owned by one agent. It does not check turn
//! content; the orchestrator is responsible for well-formed sequences.

use serde::{Deserialize, Serialize};

use crate::message::Turn;

/// Conversation history with utility methods
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ConversationMemory {
    turns: Vec<Turn>,
}

impl ConversationMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a turn
    pub fn append(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn append_many(&mut self, turns: impl IntoIterator<Item = Turn>) {
        self.turns.extend(turns);
    }

    /// Owned copy of the history; changing it does not touch memory
    pub fn snapshot(&self) -> Vec<Turn> {
        self.turns.clone()
    }

    /// Read-only view of the history
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Get the last turn
    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// Drop every turn
    pub fn reset(&mut self) {
        self.turns.clear();
    }

    /// Plain-text transcript of the first `upto` turns, one `Role: text` line each.
    ///
    /// Assistant turns that only requested tools are skipped.
    pub fn render_transcript(&self, upto: usize) -> String {
        self.turns
            .iter()
            .take(upto)
            .filter_map(|turn| match turn {
                Turn::System { content } => Some(format!("System: {content}")),
                Turn::User { content } => Some(format!("User: {content}")),
                Turn::Assistant(reply) => reply.content.as_ref().map(|c| format!("Assistant: {c}")),
                Turn::ToolResult(result) => Some(format!("Tool ({}): {}", result.name, result.content)),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Number of turns
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
