//! Closed tool registry.
//!
//! [`ToolRegistry`] is built once at startup and then only read. Lookups
//! hand out `Arc<dyn ToolDefinition>` so a handler can run without
//! borrowing the registry.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use anyhow::bail;
use serde_json::Value;

use crate::builtin;
use crate::context::ToolContext;
use crate::definition::{
    validate_input_schema, validate_tool_name, ToolDefinition, ToolError, ToolInfo, ToolOutput,
};

/// Name-to-handler mapping.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn ToolDefinition>>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in handler.
    pub fn with_builtins() -> anyhow::Result<Self> {
        let mut registry = Self::new();
        builtin::register_builtins(&mut registry)?;
        Ok(registry)
    }

    /// Register a tool. Rejects duplicate names, invalid names, and
    /// invalid input schemas.
    pub fn register(&mut self, tool: impl ToolDefinition + 'static) -> anyhow::Result<()> {
        let name = tool.name().to_string();
        validate_tool_name(&name)?;
        validate_input_schema(&tool.input_schema())?;

        if self.tools.contains_key(&name) {
            bail!("tool already registered: {name}");
        }

        self.tools.insert(name, Arc::new(tool));
        Ok(())
    }

    /// Look up a tool by name.
    pub fn get_tool(&self, name: &str) -> Option<Arc<dyn ToolDefinition>> {
        self.tools.get(name).cloned()
    }

    /// List all registered tools (sorted by name for deterministic output).
    pub fn list_tools(&self) -> Vec<ToolInfo> {
        let mut infos: Vec<ToolInfo> = self
            .tools
            .values()
            .map(|t| ToolInfo {
                name: t.name().to_string(),
                description: t.description().to_string(),
                input_schema: t.input_schema(),
            })
            .collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        infos
    }

    /// Number of registered tools.
    pub fn tool_count(&self) -> usize {
        self.tools.len()
    }

    /// Title for an invocation. Unknown tools get `"<name> <JSON params>"`.
    pub fn title(&self, name: &str, params: &Value) -> String {
        match self.tools.get(name) {
            Some(tool) => tool.title(params),
            None => format!("{name} {params}"),
        }
    }

    /// Run the named tool once.
    pub async fn execute(
        &self,
        ctx: &ToolContext,
        name: &str,
        params: Value,
    ) -> Result<ToolOutput, ToolError> {
        let tool = self
            .get_tool(name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;

        let start = Instant::now();
        let result = tool.execute(ctx, params).await;
        let latency_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(mut output) => {
                output.metadata.latency_ms = latency_ms;
                tracing::debug!(
                    tool = %name,
                    latency_ms,
                    bytes = ?output.metadata.bytes_transferred,
                    "tool completed"
                );
                Ok(output)
            }
            Err(e) => {
                tracing::debug!(tool = %name, latency_ms, error = %e, "tool failed");
                Err(e)
            }
        }
    }
}
