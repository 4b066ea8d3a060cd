//! Response Interpreter
//!
//! Decides whether an assistant turn is a final answer or a request to run
//! tools. Structured backends report calls in a dedicated field; for text
//! backends the action is a JSON object embedded somewhere in the reply.

use serde_json::Value;

use crate::error::{AgentError, Result};
use crate::message::AssistantTurn;
use crate::tool::ToolCall;

/// Marker that ends a ReAct exchange
pub const FINAL_ANSWER_MARKER: &str = "Final Answer:";

/// Marker that precedes an injected tool observation
pub const OBSERVATION_MARKER: &str = "Observation:";

/// Outcome of a structured-protocol assistant turn
#[derive(Clone, Debug, PartialEq)]
pub enum Interpretation {
    Final(String),
    ToolCalls(Vec<ToolCall>),
}

/// Read a structured turn; calls without an ID are given one
pub fn interpret_structured(turn: &AssistantTurn) -> Interpretation {
    if !turn.requests_tools() {
        return Interpretation::Final(turn.text_or_empty().to_string());
    }

    let calls = turn
        .tool_calls
        .iter()
        .cloned()
        .map(|mut call| {
            if call.id.trim().is_empty() {
                call.id = format!("call_{}", uuid::Uuid::new_v4().simple());
            }
            call
        })
        .collect();
    Interpretation::ToolCalls(calls)
}

/// A single action parsed from text
#[derive(Clone, Debug, PartialEq)]
pub struct ActionRequest {
    pub name: String,

    /// Object, string, or `null` when the model gave no arguments
    pub arguments: Value,

    /// Text before the JSON object, typically the model's reasoning
    pub thought: String,
}

/// Outcome of a text-protocol assistant turn
#[derive(Clone, Debug, PartialEq)]
pub enum TextDecision {
    Action(ActionRequest),
    Final(String),
}

/// Parser for JSON actions embedded in free text
#[derive(Clone, Debug, Default)]
pub struct ActionParser {
    final_answer_marker: Option<String>,
    stop_marker: Option<String>,
}

impl ActionParser {
    /// Plain JSON extraction, no ReAct markers
    pub fn new() -> Self {
        Self::default()
    }

    /// Recognise `Final Answer:` and cut at `Observation:`
    pub fn react() -> Self {
        Self::new()
            .final_answer_marker(FINAL_ANSWER_MARKER)
            .stop_marker(OBSERVATION_MARKER)
    }

    pub fn final_answer_marker(mut self, marker: impl Into<String>) -> Self {
        self.final_answer_marker = Some(marker.into()).filter(|m: &String| !m.is_empty());
        self
    }

    pub fn stop_marker(mut self, marker: impl Into<String>) -> Self {
        self.stop_marker = Some(marker.into()).filter(|m: &String| !m.is_empty());
        self
    }

    /// `text` up to the stop marker, if one is configured and present
    pub fn truncate<'a>(&self, text: &'a str) -> &'a str {
        match &self.stop_marker {
            Some(marker) => text.find(marker.as_str()).map_or(text, |at| &text[..at]),
            None => text,
        }
    }

    pub fn parse(&self, text: &str) -> Result<TextDecision> {
        let text = self.truncate(text);

        if let Some(marker) = &self.final_answer_marker {
            if let Some(at) = text.find(marker.as_str()) {
                let answer = text[at + marker.len()..].trim();
                return Ok(TextDecision::Final(answer.to_string()));
            }
        }

        let mut first_error = None;
        for candidate in candidates(text) {
            let Some((start, span)) = find_balanced_object(&candidate) else {
                continue;
            };
            let before = &candidate[..start];
            let parsed = parse_action(before, span)
                .or_else(|_| parse_action(before, &normalize_escapes(span)));
            match parsed {
                Ok(decision) => return Ok(decision),
                Err(err) => {
                    first_error.get_or_insert(err);
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(TextDecision::Final(text.trim().to_string())),
        }
    }
}

/// Readings of `text` to scan, most specific first.
///
/// `{{` never occurs in bare JSON, so its presence means the doubled-brace
/// convention is in use. The escape-normalized reading catches objects whose
/// quotes were escaped, which hides their closing brace from the scanner.
fn candidates(text: &str) -> Vec<String> {
    let mut readings = Vec::with_capacity(3);
    if text.contains("{{") {
        readings.push(collapse_doubled_braces(text));
    }
    readings.push(text.to_string());

    let unescaped = normalize_escapes(&readings[0]);
    if !readings.contains(&unescaped) {
        readings.push(unescaped);
    }
    readings
}

fn parse_action(before: &str, span: &str) -> Result<TextDecision> {
    let malformed = |reason: String| AgentError::MalformedAction {
        reason,
        raw: span.to_string(),
    };

    let value: Value = serde_json::from_str(span).map_err(|e| malformed(e.to_string()))?;
    let Value::Object(mut object) = value else {
        return Err(malformed("action is not a JSON object".into()));
    };

    let name = match object.remove("name") {
        Some(Value::String(name)) if !name.trim().is_empty() => name.trim().to_string(),
        Some(_) => return Err(malformed("`name` must be a non-empty string".into())),
        None => return Err(malformed("action has no `name`".into())),
    };

    let arguments = match object.remove("arguments") {
        None | Some(Value::Null) => Value::Null,
        Some(args @ (Value::Object(_) | Value::String(_))) => args,
        Some(_) => return Err(malformed("`arguments` must be an object or a string".into())),
    };

    Ok(TextDecision::Action(ActionRequest {
        name,
        arguments,
        thought: clean_thought(before),
    }))
}

fn clean_thought(before: &str) -> String {
    let thought = before.trim();
    let thought = thought.strip_suffix("```json").unwrap_or(thought);
    let thought = thought.strip_suffix("```").unwrap_or(thought);
    let thought = thought.trim_end();
    let thought = thought.strip_suffix("Action:").unwrap_or(thought);
    thought.trim().to_string()
}

/// Undo one level of escaping: `\\` → `\`, `\n` → newline, `\"` → `"`.
pub fn normalize_escapes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.peek() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('"') => out.push('"'),
            _ => {
                out.push('\\');
                continue;
            }
        }
        chars.next();
    }
    out
}

/// Reduce the template escape `{{` / `}}` to single braces
pub fn collapse_doubled_braces(text: &str) -> String {
    text.replace("{{", "{").replace("}}", "}")
}

/// First balanced `{...}` span, returned with its byte offset.
///
/// Depth-counting scan; braces inside JSON string literals are ignored.
pub fn find_balanced_object(text: &str) -> Option<(usize, &str)> {
    let mut search_from = 0;

    while let Some(offset) = text[search_from..].find('{') {
        let start = search_from + offset;
        let mut depth = 0usize;
        let mut in_string = false;
        let mut escape_next = false;

        for (i, c) in text[start..].char_indices() {
            if escape_next {
                escape_next = false;
                continue;
            }
            match c {
                '\\' if in_string => escape_next = true,
                '"' => in_string = !in_string,
                '{' if !in_string => depth += 1,
                '}' if !in_string => {
                    depth -= 1;
                    if depth == 0 {
                        return Some((start, &text[start..=start + i]));
                    }
                }
                _ => {}
            }
        }

        // unbalanced from here; an unmatched quote may have hidden the close
        search_from = start + 1;
    }

    None
}
