//! Prompt Templates
//!
//! `{name}` placeholders are substituted at render time; `{{` and `}}` stand
//! for literal braces, which is how the JSON example inside the ReAct prompt
//! survives substitution.

use std::collections::HashMap;

use crate::error::{AgentError, Result};

/// Default ReAct prompt for backends without structured tool calling
pub const REACT_TEMPLATE: &str = r#"{system_message}

You can use the following tools:

{tool_details}

When a tool is needed, reply with a single JSON object that has a "name" key
(the tool to run) and an "arguments" key (its input). Valid names: {tool_names}

Give exactly ONE action per reply, like this:
```
{{
    "name": "<tool name>",
    "arguments": <input>
}}
```

Use this format:

Question: the question to answer
Thought: what to do next, given what you know so far
Action:
```
<the JSON object>
```
Observation: the tool's result
... (Thought/Action/Observation can repeat)
Thought: I can now answer
Final Answer: the answer for the user

Answer directly when no tool is needed.

Previous conversation:
{chat_history}

Question: {user_input}
Thought: {react_loop}"#;

/// A parsed prompt template
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PromptTemplate {
    source: String,
    segments: Vec<Segment>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Segment {
    Text(String),
    Var(String),
}

impl PromptTemplate {
    /// Parse a template, failing on unbalanced braces or empty placeholders
    pub fn parse(source: impl Into<String>) -> Result<Self> {
        let source = source.into();
        let mut segments = Vec::new();
        let mut text = String::new();
        let mut chars = source.char_indices().peekable();

        while let Some((at, c)) = chars.next() {
            match c {
                '{' if chars.peek().map(|(_, n)| *n) == Some('{') => {
                    chars.next();
                    text.push('{');
                }
                '}' if chars.peek().map(|(_, n)| *n) == Some('}') => {
                    chars.next();
                    text.push('}');
                }
                '{' => {
                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some((_, '}')) => break,
                            Some((_, '{')) | None => {
                                return Err(AgentError::Template(format!(
                                    "unclosed placeholder at byte {at}"
                                )));
                            }
                            Some((_, ch)) => name.push(ch),
                        }
                    }
                    let name = name.trim().to_string();
                    if name.is_empty() {
                        return Err(AgentError::Template(format!("empty placeholder at byte {at}")));
                    }
                    if !text.is_empty() {
                        segments.push(Segment::Text(std::mem::take(&mut text)));
                    }
                    segments.push(Segment::Var(name));
                }
                '}' => {
                    return Err(AgentError::Template(format!("unmatched '}}' at byte {at}")));
                }
                _ => text.push(c),
            }
        }
        if !text.is_empty() {
            segments.push(Segment::Text(text));
        }

        Ok(Self { source, segments })
    }

    /// The built-in ReAct template
    pub fn react() -> Self {
        match Self::parse(REACT_TEMPLATE) {
            Ok(template) => template,
            Err(err) => unreachable!("built-in template is valid: {err}"),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Placeholder names, in order of first appearance
    pub fn placeholders(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for segment in &self.segments {
            if let Segment::Var(name) = segment {
                if !names.contains(&name.as_str()) {
                    names.push(name);
                }
            }
        }
        names
    }

    /// Substitute every placeholder; each must have a value
    pub fn render(&self, values: &HashMap<&str, String>) -> Result<String> {
        let mut out = String::with_capacity(self.source.len());
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Var(name) => {
                    let value = values
                        .get(name.as_str())
                        .ok_or_else(|| AgentError::Template(format!("no value for placeholder '{name}'")))?;
                    out.push_str(value);
                }
            }
        }
        Ok(out)
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::react()
    }
}
