use serde_json::Value;

use crate::definition::{title_field, ToolDefinition, ToolError, ToolOutput};
use crate::ToolContext;

/// Registered so that its title renders, but every invocation fails.
pub struct WebFetchTool;

#[async_trait::async_trait]
impl ToolDefinition for WebFetchTool {
    fn name(&self) -> &str {
        "webfetch"
    }

    fn description(&self) -> &str {
        "Fetch a URL (not available)"
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "url": { "type": "string" },
                "format": { "type": "string" }
            },
            "required": ["url"]
        })
    }

    fn title(&self, params: &Value) -> String {
        format!("webfetch {}", title_field(params, "url"))
    }

    async fn execute(&self, _ctx: &ToolContext, _params: Value) -> Result<ToolOutput, ToolError> {
        Err(ToolError::NotImplemented(self.name().to_string()))
    }
}
