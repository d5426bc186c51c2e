use anyhow::{anyhow, Result};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{json, Value};
use std::collections::BTreeMap;

use super::base::Usage;
use crate::models::content::MediaContent;
use crate::models::event::StreamEvent;
use crate::models::message::{Message, MessageContent};
use crate::models::tool::Tool;

lazy_static! {
    static ref INVALID_FUNCTION_CHARS: Regex = Regex::new(r"[^a-zA-Z0-9_-]").unwrap();
}

/// Convert internal Message format to the openai chat completions message specification
///
/// Parts are carried over in order. A tool response closes the message built so far
/// and becomes its own `tool` role message, so text after it lands in a new message
/// of the original role.
pub fn messages_to_openai_spec(messages: &[Message]) -> Vec<Value> {
    let mut messages_spec = Vec::new();

    for message in messages {
        let mut segment = Segment::default();

        for content in &message.content {
            match content {
                MessageContent::Text(text) => {
                    segment
                        .parts
                        .push(json!({"type": "text", "text": text.text}));
                }
                MessageContent::Media(media) => segment.parts.push(convert_media(media)),
                MessageContent::ToolRequest(request) => {
                    segment.tool_calls.push(json!({
                        "id": request.id,
                        "type": "function",
                        "function": {
                            "name": sanitize_function_name(&request.tool_call.name),
                            "arguments": request.tool_call.arguments.to_string(),
                        }
                    }));
                }
                MessageContent::ToolResponse(response) => {
                    messages_spec.extend(std::mem::take(&mut segment).into_message(message));
                    messages_spec.push(json!({
                        "role": "tool",
                        "content": response.result.to_string(),
                        "tool_call_id": response.id
                    }));
                }
            }
        }
        messages_spec.extend(segment.into_message(message));
    }

    messages_spec
}

// Content gathered for one upstream message
#[derive(Default)]
struct Segment {
    parts: Vec<Value>,
    tool_calls: Vec<Value>,
}

impl Segment {
    fn into_message(self, message: &Message) -> Option<Value> {
        if self.parts.is_empty() && self.tool_calls.is_empty() {
            return None;
        }

        let mut converted = json!({ "role": message.role.as_str() });
        // A lone text part uses the string form, anything else keeps the part list
        match self.parts.as_slice() {
            [] => {}
            [single] if single["type"] == "text" => {
                converted["content"] = single["text"].clone();
            }
            _ => converted["content"] = json!(self.parts),
        }
        if !self.tool_calls.is_empty() {
            converted["tool_calls"] = json!(self.tool_calls);
        }
        Some(converted)
    }
}

fn convert_media(media: &MediaContent) -> Value {
    if media.is_image() {
        json!({
            "type": "image_url",
            "image_url": { "url": media.url }
        })
    } else {
        json!({
            "type": "text",
            "text": format!("[attachment {} ({})]", media.url, media.media_type)
        })
    }
}

/// Convert internal Tool format to the openai tool specification
pub fn tools_to_openai_spec(tools: &[Tool]) -> Result<Vec<Value>> {
    let mut tool_names = std::collections::HashSet::new();
    let mut result = Vec::new();

    for tool in tools {
        if !tool_names.insert(&tool.name) {
            return Err(anyhow!("Duplicate tool name: {}", tool.name));
        }

        result.push(json!({
            "type": "function",
            "function": {
                "name": sanitize_function_name(&tool.name),
                "description": tool.description,
                "parameters": tool.parameters,
            }
        }));
    }

    Ok(result)
}

/// Extract the generated text of a non-streamed chat completion
pub fn openai_response_to_text(response: &Value) -> Result<String> {
    let message = response
        .get("choices")
        .and_then(|choices| choices.get(0))
        .and_then(|choice| choice.get("message"))
        .ok_or_else(|| anyhow!("No choices in response"))?;

    Ok(message
        .get("content")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string())
}

pub fn get_usage(data: &Value) -> Option<Usage> {
    let usage = data.get("usage").filter(|usage| usage.is_object())?;

    let input_tokens = usage
        .get("prompt_tokens")
        .and_then(|v| v.as_i64())
        .map(|v| v as i32);

    let output_tokens = usage
        .get("completion_tokens")
        .and_then(|v| v.as_i64())
        .map(|v| v as i32);

    let total_tokens = usage
        .get("total_tokens")
        .and_then(|v| v.as_i64())
        .map(|v| v as i32)
        .or_else(|| match (input_tokens, output_tokens) {
            (Some(input), Some(output)) => Some(input + output),
            _ => None,
        });

    Some(Usage::new(input_tokens, output_tokens, total_tokens))
}

/// The message of an `{"error": ...}` body, if the payload is one
pub fn openai_error_message(data: &Value) -> Option<String> {
    let error = data.get("error").filter(|error| !error.is_null())?;
    Some(
        error
            .get("message")
            .and_then(Value::as_str)
            .map(String::from)
            .unwrap_or_else(|| error.to_string()),
    )
}

/// Whether a name can be sent upstream as a function name without rewriting
pub fn is_valid_function_name(name: &str) -> bool {
    !name.is_empty() && !INVALID_FUNCTION_CHARS.is_match(name)
}

fn sanitize_function_name(name: &str) -> String {
    INVALID_FUNCTION_CHARS.replace_all(name, "_").to_string()
}

#[derive(Debug, Default)]
struct PartialToolCall {
    id: String,
    name: String,
    arguments: String,
}

/// Collects streamed tool call fragments, keyed by their `index`, into complete tool calls.
#[derive(Debug, Default)]
pub struct ToolCallAssembler {
    calls: BTreeMap<u64, PartialToolCall>,
}

impl ToolCallAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one entry of a chunk's `delta.tool_calls`
    pub fn on_delta(&mut self, delta: &Value) {
        let index = delta.get("index").and_then(Value::as_u64).unwrap_or(0);
        let call = self.calls.entry(index).or_default();

        if let Some(id) = delta.get("id").and_then(Value::as_str) {
            call.id = id.to_string();
        }
        if let Some(function) = delta.get("function") {
            if let Some(name) = function.get("name").and_then(Value::as_str) {
                call.name.push_str(name);
            }
            if let Some(arguments) = function.get("arguments").and_then(Value::as_str) {
                call.arguments.push_str(arguments);
            }
        }
    }

    /// Emit every collected call in index order. Arguments that are not valid json are
    /// kept as the raw string so nothing the model produced is lost.
    pub fn drain(&mut self) -> Vec<StreamEvent> {
        std::mem::take(&mut self.calls)
            .into_values()
            .map(|call| {
                let trimmed = call.arguments.trim();
                let arguments = if trimmed.is_empty() {
                    json!({})
                } else {
                    serde_json::from_str(trimmed).unwrap_or(Value::String(call.arguments))
                };
                StreamEvent::ToolCall {
                    id: call.id,
                    name: call.name,
                    arguments,
                }
            })
            .collect()
    }
}
