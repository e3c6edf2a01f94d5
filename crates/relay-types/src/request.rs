//! Inbound request: a message plus an ordered list of tool invocations.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Message used when the request carries none (or an empty one).
pub const DEFAULT_MESSAGE: &str = "hi";

/// Tool name recorded for an invocation that names none.
const MISSING_TOOL_NAME: &str = "undefined";

/// A single request, delivered once and in full before processing begins.
///
/// Shape is never an error: fields of the wrong type fall back to their
/// defaults, so every problem surfaces later as a tool-level failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Request {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Executed in exactly this order.
    pub tools: Vec<ToolInvocation>,
}

/// One requested tool call. `params` is validated only by the handler
/// that consumes it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolInvocation {
    pub name: String,
    pub params: Map<String, Value>,
}

impl ToolInvocation {
    pub fn new(name: impl Into<String>, params: Value) -> Self {
        let params = match params {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            name: name.into(),
            params,
        }
    }
}

/// Text of a scalar field: strings as-is, anything else as its JSON.
fn field_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

impl From<Value> for ToolInvocation {
    fn from(value: Value) -> Self {
        let Value::Object(mut map) = value else {
            return Self::new(MISSING_TOOL_NAME, Value::Null);
        };
        let name = map
            .get("name")
            .and_then(field_text)
            .unwrap_or_else(|| MISSING_TOOL_NAME.to_string());
        Self::new(name, map.remove("params").unwrap_or(Value::Null))
    }
}

impl From<Value> for Request {
    /// Only an object carries a request. Any other JSON value is an empty
    /// request, and a non-array `tools` means no tools.
    fn from(value: Value) -> Self {
        let Value::Object(mut map) = value else {
            return Self::default();
        };
        let message = map.get("message").and_then(field_text);
        let tools = match map.remove("tools") {
            Some(Value::Array(items)) => items.into_iter().map(ToolInvocation::from).collect(),
            _ => Vec::new(),
        };
        Self { message, tools }
    }
}

impl<'de> Deserialize<'de> for Request {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Self::from)
    }
}

impl<'de> Deserialize<'de> for ToolInvocation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Self::from)
    }
}

impl Request {
    /// Wrap free text as a request with no tools.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            message: Some(text.into()),
            tools: Vec::new(),
        }
    }

    /// Parse raw input. Text that is not JSON becomes the message of a
    /// tool-less request; JSON goes through [`Request::from`].
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        match serde_json::from_str::<Value>(trimmed) {
            Ok(value) => Self::from(value),
            Err(_) => Self::from_text(trimmed),
        }
    }

    /// The message to answer, falling back to [`DEFAULT_MESSAGE`].
    pub fn message(&self) -> &str {
        match self.message.as_deref() {
            Some(m) if !m.is_empty() => m,
            _ => DEFAULT_MESSAGE,
        }
    }
}
