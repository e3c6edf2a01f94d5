//! Event-sourced execution pipeline for the relay driver.
//!
//! [`ExecutionPipeline`] runs a request's tools in order through the
//! [`relay_tools::ToolRegistry`] and reports every step as an [`Event`]
//! through an [`EventSink`].
//!
//! [`Event`]: relay_types::Event

pub mod emitter;
pub mod pipeline;

pub use emitter::{EventEmitter, EventSink, MemorySink, NdjsonWriter};
pub use pipeline::{
    respond_to, tool_step, ExecutionPipeline, RequestSummary, STEP_GENERATE_RESPONSE,
    STEP_PROCESS_REQUEST,
};
