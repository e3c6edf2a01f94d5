//! Core types shared across all relay crates.
//!
//! Defines the session identity, the inbound request shape, the outbound
//! event schema, layered configuration, and the request-level error type
//! used by the tool registry, the execution pipeline, and the CLI.

pub mod config;
pub mod config_loader;
pub mod error;
pub mod event;
pub mod ids;
pub mod request;
pub mod session;

pub use config::{LogConfig, RelayConfig, CONFIG_DIR, CONFIG_FILENAME};
pub use config_loader::{ConfigLoader, ConfigOverrides, ConfigSource, EffectiveConfig};
pub use error::RelayError;
pub use event::{
    now_millis, ErrorInfo, Event, EventPayload, FinishReason, PartKind, StepPart, TextPart,
    TimeWindow, ToolPart, ToolState, ToolStatus, TOOL_EXECUTION_ERROR,
};
pub use ids::SessionId;
pub use request::{Request, ToolInvocation, DEFAULT_MESSAGE};
pub use session::{Session, DEFAULT_MODEL};
