//! Tool definitions, registry, and built-in handlers for the relay driver.
//!
//! - [`ToolDefinition`] -- the trait every tool implements
//! - [`ToolOutput`] / [`ToolError`] -- execution results and typed failures
//! - [`ToolContext`] -- per-request state passed to each handler
//! - [`ToolRegistry`] -- name lookup, titles, and dispatch

pub mod builtin;
pub mod context;
pub mod definition;
pub mod registry;

pub use context::{TodoItem, ToolContext};
pub use definition::{ToolDefinition, ToolError, ToolInfo, ToolOutput, ToolOutputMetadata};
pub use registry::ToolRegistry;
