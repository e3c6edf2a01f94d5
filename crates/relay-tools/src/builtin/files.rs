use anyhow::{anyhow, Context};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::definition::{parse_params, title_field, ToolDefinition, ToolError, ToolOutput};
use crate::ToolContext;

#[derive(Debug, Serialize)]
struct SuccessResult {
    success: bool,
}

const SUCCESS: SuccessResult = SuccessResult { success: true };

// ---------------------------------------------------------------------------
// ReadTool
// ---------------------------------------------------------------------------

/// Read a whole file as UTF-8 text.
pub struct ReadTool;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReadParams {
    file_path: String,
}

#[derive(Debug, Serialize)]
struct ReadResult {
    content: String,
}

#[async_trait::async_trait]
impl ToolDefinition for ReadTool {
    fn name(&self) -> &str {
        "read"
    }

    fn description(&self) -> &str {
        "Read the contents of a file"
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "filePath": {
                    "type": "string",
                    "description": "Path to the file, absolute or relative to the working directory"
                }
            },
            "required": ["filePath"]
        })
    }

    fn title(&self, params: &Value) -> String {
        format!("read {}", title_field(params, "filePath"))
    }

    async fn execute(&self, ctx: &ToolContext, params: Value) -> Result<ToolOutput, ToolError> {
        let params: ReadParams = parse_params(self.name(), params)?;

        let content = tokio::fs::read_to_string(ctx.resolve(&params.file_path))
            .await
            .with_context(|| format!("Failed to read file {}", params.file_path))?;

        let bytes = content.len() as u64;
        Ok(ToolOutput::from_result(&ReadResult { content })?.with_bytes(bytes))
    }
}

// ---------------------------------------------------------------------------
// WriteTool
// ---------------------------------------------------------------------------

/// Write a file, creating parent directories as needed.
pub struct WriteTool;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WriteParams {
    file_path: String,
    content: String,
}

#[async_trait::async_trait]
impl ToolDefinition for WriteTool {
    fn name(&self) -> &str {
        "write"
    }

    fn description(&self) -> &str {
        "Write content to a file, creating parent directories if needed"
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "filePath": {
                    "type": "string",
                    "description": "Path to the file to write"
                },
                "content": {
                    "type": "string",
                    "description": "Content to write to the file"
                }
            },
            "required": ["filePath", "content"]
        })
    }

    fn title(&self, params: &Value) -> String {
        format!("write {}", title_field(params, "filePath"))
    }

    async fn execute(&self, ctx: &ToolContext, params: Value) -> Result<ToolOutput, ToolError> {
        let params: WriteParams = parse_params(self.name(), params)?;
        let path = ctx.resolve(&params.file_path);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to write file {}", params.file_path))?;
        }
        tokio::fs::write(&path, &params.content)
            .await
            .with_context(|| format!("Failed to write file {}", params.file_path))?;

        Ok(ToolOutput::from_result(&SUCCESS)?.with_bytes(params.content.len() as u64))
    }
}

// ---------------------------------------------------------------------------
// EditTool
// ---------------------------------------------------------------------------

/// Replace the first occurrence of `oldString`, or the whole file when
/// `oldString` is absent or empty.
pub struct EditTool;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EditParams {
    file_path: String,
    #[serde(default)]
    old_string: Option<String>,
    #[serde(default)]
    new_string: Option<String>,
}

#[async_trait::async_trait]
impl ToolDefinition for EditTool {
    fn name(&self) -> &str {
        "edit"
    }

    fn description(&self) -> &str {
        "Replace the first occurrence of oldString with newString in a file, or replace the whole file"
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "filePath": {
                    "type": "string",
                    "description": "Path to the file to edit"
                },
                "oldString": {
                    "type": "string",
                    "description": "Exact text to replace; omit to replace the whole file"
                },
                "newString": {
                    "type": "string",
                    "description": "Replacement text"
                }
            },
            "required": ["filePath", "newString"]
        })
    }

    fn title(&self, params: &Value) -> String {
        format!("edit {}", title_field(params, "filePath"))
    }

    async fn execute(&self, ctx: &ToolContext, params: Value) -> Result<ToolOutput, ToolError> {
        let params: EditParams = parse_params(self.name(), params)?;
        let new_string = params.new_string.ok_or_else(|| ToolError::InvalidParams {
            tool: self.name().to_string(),
            reason: "missing field `newString`".to_string(),
        })?;
        let path = ctx.resolve(&params.file_path);
        let failed = || format!("Failed to edit file {}", params.file_path);

        let content = tokio::fs::read_to_string(&path)
            .await
            .with_context(failed)?;

        let updated = match params.old_string.as_deref() {
            Some(old) if !old.is_empty() => {
                if !content.contains(old) {
                    return Err(anyhow!("oldString not found in file").context(failed()).into());
                }
                content.replacen(old, &new_string, 1)
            }
            _ => new_string,
        };

        tokio::fs::write(&path, &updated)
            .await
            .with_context(failed)?;

        Ok(ToolOutput::from_result(&SUCCESS)?.with_bytes(updated.len() as u64))
    }
}

// ---------------------------------------------------------------------------
// ListTool
// ---------------------------------------------------------------------------

/// List the entries of one directory with their type, size and mtime.
pub struct ListTool;

#[derive(Debug, Deserialize)]
struct ListParams {
    #[serde(default)]
    path: Option<String>,
}

#[derive(Debug, Serialize)]
struct ListResult {
    items: Vec<ListItem>,
}

#[derive(Debug, Serialize)]
struct ListItem {
    name: String,
    #[serde(rename = "type")]
    kind: EntryKind,
    size: u64,
    /// RFC 3339 with millisecond precision, UTC.
    modified: String,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
enum EntryKind {
    File,
    Directory,
}

#[async_trait::async_trait]
impl ToolDefinition for ListTool {
    fn name(&self) -> &str {
        "list"
    }

    fn description(&self) -> &str {
        "List directory entries with type, size, and modification time"
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Directory to list (defaults to the working directory)"
                }
            }
        })
    }

    fn title(&self, params: &Value) -> String {
        let path = params
            .get("path")
            .and_then(Value::as_str)
            .filter(|p| !p.is_empty())
            .unwrap_or(".");
        format!("list {path}")
    }

    async fn execute(&self, ctx: &ToolContext, params: Value) -> Result<ToolOutput, ToolError> {
        let params: ListParams = parse_params(self.name(), params)?;
        let shown = params
            .path
            .as_deref()
            .filter(|p| !p.is_empty())
            .unwrap_or(".");
        let dir = ctx.resolve(shown);
        let failed = || format!("Failed to list directory {shown}");

        let mut entries = tokio::fs::read_dir(&dir).await.with_context(failed)?;
        let mut items = Vec::new();
        while let Some(entry) = entries.next_entry().await.with_context(failed)? {
            let name = entry.file_name().to_string_lossy().into_owned();
            // Follows symlinks; a dangling link fails the whole listing.
            let metadata = tokio::fs::metadata(entry.path())
                .await
                .with_context(|| format!("cannot stat {name}"))
                .with_context(failed)?;
            let modified: DateTime<Utc> = metadata
                .modified()
                .with_context(|| format!("cannot read modification time of {name}"))
                .with_context(failed)?
                .into();

            items.push(ListItem {
                name,
                kind: if metadata.is_dir() {
                    EntryKind::Directory
                } else {
                    EntryKind::File
                },
                size: metadata.len(),
                modified: modified.to_rfc3339_opts(SecondsFormat::Millis, true),
            });
        }
        items.sort_by(|a, b| a.name.cmp(&b.name));

        ToolOutput::from_result(&ListResult { items })
    }
}
