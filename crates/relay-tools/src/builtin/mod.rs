//! Built-in tool handlers.
//!
//! Each handler deserializes its params into a typed struct, does its work
//! through `tokio` (processes, file I/O, or the blocking pool for directory
//! walks), and returns a typed result serialized into a [`ToolOutput`].
//!
//! [`ToolOutput`]: crate::ToolOutput

mod files;
mod planning;
mod search;
mod shell;
mod web;

pub use files::{EditTool, ListTool, ReadTool, WriteTool};
pub use planning::{TaskTool, TodoReadTool, TodoWriteTool};
pub use search::{GlobTool, GrepTool};
pub use shell::BashTool;
pub use web::WebFetchTool;

use crate::ToolRegistry;

/// Register every built-in handler.
pub fn register_builtins(registry: &mut ToolRegistry) -> anyhow::Result<()> {
    registry.register(BashTool)?;
    registry.register(ReadTool)?;
    registry.register(WriteTool)?;
    registry.register(EditTool)?;
    registry.register(ListTool)?;
    registry.register(GlobTool)?;
    registry.register(GrepTool)?;
    registry.register(TodoWriteTool)?;
    registry.register(TodoReadTool)?;
    registry.register(TaskTool)?;
    registry.register(WebFetchTool)?;
    Ok(())
}
