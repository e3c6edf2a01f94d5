use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::TodoItem;
use crate::definition::{parse_params, title_field, ToolDefinition, ToolError, ToolOutput};
use crate::ToolContext;

#[derive(Debug, Serialize)]
struct TodoResult {
    todos: Vec<TodoItem>,
}

fn todo_item_schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "content": { "type": "string" },
            "status": { "type": "string" },
            "priority": { "type": "string" },
            "id": { "type": "string" }
        },
        "required": ["content", "status", "priority", "id"]
    })
}

// ---------------------------------------------------------------------------
// TodoWriteTool
// ---------------------------------------------------------------------------

/// Replace the session's todo list.
pub struct TodoWriteTool;

#[derive(Debug, Deserialize)]
struct TodoWriteParams {
    todos: Vec<TodoItem>,
}

#[async_trait::async_trait]
impl ToolDefinition for TodoWriteTool {
    fn name(&self) -> &str {
        "todowrite"
    }

    fn description(&self) -> &str {
        "Replace the session's todo list"
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "todos": {
                    "type": "array",
                    "items": todo_item_schema()
                }
            },
            "required": ["todos"]
        })
    }

    fn title(&self, params: &Value) -> String {
        let count = params
            .get("todos")
            .and_then(Value::as_array)
            .map_or(0, Vec::len);
        format!("todowrite {count} todos")
    }

    async fn execute(&self, ctx: &ToolContext, params: Value) -> Result<ToolOutput, ToolError> {
        let params: TodoWriteParams = parse_params(self.name(), params)?;
        ctx.replace_todos(params.todos.clone()).await;
        ToolOutput::from_result(&TodoResult {
            todos: params.todos,
        })
    }
}

// ---------------------------------------------------------------------------
// TodoReadTool
// ---------------------------------------------------------------------------

/// Return the session's todo list.
pub struct TodoReadTool;

#[async_trait::async_trait]
impl ToolDefinition for TodoReadTool {
    fn name(&self) -> &str {
        "todoread"
    }

    fn description(&self) -> &str {
        "Read the session's todo list"
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({ "type": "object", "properties": {} })
    }

    fn title(&self, _params: &Value) -> String {
        "todoread".to_string()
    }

    async fn execute(&self, ctx: &ToolContext, _params: Value) -> Result<ToolOutput, ToolError> {
        ToolOutput::from_result(&TodoResult {
            todos: ctx.todos().await,
        })
    }
}

// ---------------------------------------------------------------------------
// TaskTool
// ---------------------------------------------------------------------------

/// Describe the work a subagent would take on. No subagent is launched.
pub struct TaskTool;

#[derive(Debug, Deserialize)]
struct TaskParams {
    description: String,
    prompt: String,
    subagent_type: String,
}

#[derive(Debug, Serialize)]
struct TaskResult {
    content: String,
}

#[async_trait::async_trait]
impl ToolDefinition for TaskTool {
    fn name(&self) -> &str {
        "task"
    }

    fn description(&self) -> &str {
        "Hand a prompt to a subagent of the given type"
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "description": {
                    "type": "string",
                    "description": "Short description of the task"
                },
                "prompt": {
                    "type": "string",
                    "description": "Instructions for the subagent"
                },
                "subagent_type": {
                    "type": "string",
                    "description": "Kind of subagent, e.g. \"general\""
                }
            },
            "required": ["description", "prompt", "subagent_type"]
        })
    }

    fn title(&self, params: &Value) -> String {
        format!("task {}", title_field(params, "description"))
    }

    async fn execute(&self, _ctx: &ToolContext, params: Value) -> Result<ToolOutput, ToolError> {
        let params: TaskParams = parse_params(self.name(), params)?;
        tracing::debug!(description = %params.description, subagent = %params.subagent_type, "task requested");
        ToolOutput::from_result(&TaskResult {
            content: format!(
                "Subagent {} would process: {}",
                params.subagent_type, params.prompt
            ),
        })
    }
}
