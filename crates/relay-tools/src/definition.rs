//! Core tool abstraction: the [`ToolDefinition`] trait, [`ToolOutput`], and [`ToolError`].
//!
//! Every tool a request can name implements [`ToolDefinition`]. The trait is
//! `Send + Sync` so handlers can live in the shared registry as
//! `Arc<dyn ToolDefinition>`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::ToolContext;

/// A tool that a request can invoke.
#[async_trait::async_trait]
pub trait ToolDefinition: Send + Sync {
    /// Unique name (alphanumeric + underscores, max 64 chars).
    fn name(&self) -> &str;

    /// Short description of what the tool does.
    fn description(&self) -> &str;

    /// JSON Schema describing the params accepted by [`Self::execute`].
    fn input_schema(&self) -> Value;

    /// Short human-readable title for an invocation. Must not fail, even
    /// when `params` is missing fields.
    fn title(&self, params: &Value) -> String;

    /// Run the tool once and return its structured result.
    async fn execute(&self, ctx: &ToolContext, params: Value) -> Result<ToolOutput, ToolError>;
}

/// Why a tool invocation failed.
///
/// The `Display` form is what ends up in the `error.message` field of the
/// event stream.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("invalid params for {tool}: {reason}")]
    InvalidParams { tool: String, reason: String },

    #[error("{0} not implemented")]
    NotImplemented(String),

    /// Execution failure; the anyhow chain is rendered inline.
    #[error("{0:#}")]
    Failed(#[from] anyhow::Error),
}

/// Structured output returned by a tool execution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolOutput {
    /// The serialized per-tool result (e.g. `{stdout, stderr, code}` for bash).
    pub result: Value,
    /// Execution metadata for logging.
    pub metadata: ToolOutputMetadata,
}

/// Execution metadata attached to every [`ToolOutput`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolOutputMetadata {
    /// Wall-clock execution time in milliseconds. Filled in by the registry.
    pub latency_ms: u64,
    /// Bytes read or written, if applicable.
    pub bytes_transferred: Option<u64>,
}

impl ToolOutput {
    /// Serialize a typed result into an output with empty metadata.
    pub fn from_result<T: Serialize>(result: &T) -> Result<Self, ToolError> {
        let result = serde_json::to_value(result)
            .map_err(|e| anyhow::anyhow!("cannot serialize tool result: {e}"))?;
        Ok(Self {
            result,
            metadata: ToolOutputMetadata::default(),
        })
    }

    #[must_use]
    pub fn with_bytes(mut self, bytes: u64) -> Self {
        self.metadata.bytes_transferred = Some(bytes);
        self
    }

    /// Collapse the result into the single `output` string of a `tool_use`
    /// event: a non-empty string `stdout`, else a non-empty string
    /// `content`, else the JSON serialization of the whole result.
    pub fn flatten(&self) -> String {
        let non_empty = |key: &str| {
            self.result
                .get(key)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
        };
        match non_empty("stdout").or_else(|| non_empty("content")) {
            Some(s) => s.to_string(),
            None => self.result.to_string(),
        }
    }
}

/// Summary information about a registered tool.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// Deserialize a tool's params into its typed parameter struct.
pub fn parse_params<T: DeserializeOwned>(tool: &str, params: Value) -> Result<T, ToolError> {
    serde_json::from_value(params).map_err(|e| ToolError::InvalidParams {
        tool: tool.to_string(),
        reason: e.to_string(),
    })
}

/// Read a string field for title rendering, `"undefined"` when absent.
pub(crate) fn title_field<'a>(params: &'a Value, key: &str) -> &'a str {
    params
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or("undefined")
}

/// Maximum allowed length for a tool name.
const MAX_TOOL_NAME_LEN: usize = 64;

/// Validate that a tool name contains only alphanumeric characters and
/// underscores, is non-empty, and does not exceed [`MAX_TOOL_NAME_LEN`].
pub fn validate_tool_name(name: &str) -> anyhow::Result<()> {
    if name.is_empty() {
        anyhow::bail!("tool name must not be empty");
    }
    if name.len() > MAX_TOOL_NAME_LEN {
        anyhow::bail!(
            "tool name exceeds maximum length of {MAX_TOOL_NAME_LEN} characters: {name}"
        );
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        anyhow::bail!(
            "tool name must contain only alphanumeric characters and underscores: {name}"
        );
    }
    Ok(())
}

/// Validate that an input schema is a JSON object with a `"type"` field.
pub fn validate_input_schema(schema: &Value) -> anyhow::Result<()> {
    let obj = schema
        .as_object()
        .ok_or_else(|| anyhow::anyhow!("input schema must be a JSON object"))?;
    if !obj.contains_key("type") {
        anyhow::bail!("input schema must contain a \"type\" field");
    }
    Ok(())
}
