//! Wire schema of the event stream.
//!
//! Every line of output is one [`Event`]: a `type` discriminator, a
//! millisecond `timestamp`, the `sessionID`, and a type-specific payload.
//! Field names follow `opencode run --format json` output,
//! so consumers written against it can read this stream unchanged.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::SessionId;

/// `error.name` reported for every tool-level failure.
pub const TOOL_EXECUTION_ERROR: &str = "ToolExecutionError";

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// One line of the event stream.
///
/// Serializes as `type`, `timestamp`, `sessionID`, then `part` or `error`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Event {
    #[serde(flatten)]
    pub payload: EventPayload,
    pub timestamp: i64,
    #[serde(rename = "sessionID")]
    pub session_id: SessionId,
}

impl Serialize for Event {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(4))?;
        map.serialize_entry("type", self.kind())?;
        map.serialize_entry("timestamp", &self.timestamp)?;
        map.serialize_entry("sessionID", &self.session_id)?;
        match &self.payload {
            EventPayload::StepStart { part } | EventPayload::StepFinish { part } => {
                map.serialize_entry("part", part)?
            }
            EventPayload::ToolUse { part } => map.serialize_entry("part", part)?,
            EventPayload::Text { part } => map.serialize_entry("part", part)?,
            EventPayload::Error { error } => map.serialize_entry("error", error)?,
        }
        map.end()
    }
}

impl Event {
    /// The `type` discriminator as it appears on the wire.
    pub fn kind(&self) -> &'static str {
        self.payload.kind()
    }

    /// Step name for `step_start` / `step_finish` events.
    pub fn step(&self) -> Option<&str> {
        match &self.payload {
            EventPayload::StepStart { part } | EventPayload::StepFinish { part } => {
                Some(&part.step)
            }
            _ => None,
        }
    }
}

/// Type-specific body of an [`Event`], tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    StepStart { part: StepPart },
    StepFinish { part: StepPart },
    ToolUse { part: ToolPart },
    Text { part: TextPart },
    Error { error: ErrorInfo },
}

impl EventPayload {
    pub fn kind(&self) -> &'static str {
        match self {
            EventPayload::StepStart { .. } => "step_start",
            EventPayload::StepFinish { .. } => "step_finish",
            EventPayload::ToolUse { .. } => "tool_use",
            EventPayload::Text { .. } => "text",
            EventPayload::Error { .. } => "error",
        }
    }

    pub fn step_start(session_id: &SessionId, step: impl Into<String>) -> Self {
        EventPayload::StepStart {
            part: StepPart {
                session_id: session_id.clone(),
                kind: PartKind::StepStart,
                step: step.into(),
                reason: None,
            },
        }
    }

    pub fn step_finish(
        session_id: &SessionId,
        step: impl Into<String>,
        reason: FinishReason,
    ) -> Self {
        EventPayload::StepFinish {
            part: StepPart {
                session_id: session_id.clone(),
                kind: PartKind::StepFinish,
                step: step.into(),
                reason: Some(reason),
            },
        }
    }

    /// A completed tool call.
    pub fn tool_use(
        session_id: &SessionId,
        tool: impl Into<String>,
        title: impl Into<String>,
        input: Value,
        output: impl Into<String>,
        time: TimeWindow,
    ) -> Self {
        EventPayload::ToolUse {
            part: ToolPart {
                session_id: session_id.clone(),
                kind: PartKind::Tool,
                tool: tool.into(),
                state: ToolState {
                    status: ToolStatus::Completed,
                    title: title.into(),
                    input,
                    output: output.into(),
                },
                time,
            },
        }
    }

    pub fn text(session_id: &SessionId, text: impl Into<String>, time: TimeWindow) -> Self {
        EventPayload::Text {
            part: TextPart {
                session_id: session_id.clone(),
                kind: PartKind::Text,
                text: text.into(),
                time,
            },
        }
    }

    /// A tool-level failure, named [`TOOL_EXECUTION_ERROR`].
    pub fn tool_error(message: impl Into<String>) -> Self {
        EventPayload::Error {
            error: ErrorInfo {
                name: TOOL_EXECUTION_ERROR.to_string(),
                message: message.into(),
            },
        }
    }
}

/// `part.type` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PartKind {
    StepStart,
    StepFinish,
    Tool,
    Text,
}

/// Why a step finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FinishReason {
    /// A tool step completed successfully.
    ToolCalls,
    /// A tool step failed.
    Error,
    /// Response generation or the whole request finished.
    Stop,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepPart {
    #[serde(rename = "sessionID")]
    pub session_id: SessionId,
    #[serde(rename = "type")]
    pub kind: PartKind,
    pub step: String,
    /// Present on `step-finish` parts only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<FinishReason>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolPart {
    #[serde(rename = "sessionID")]
    pub session_id: SessionId,
    #[serde(rename = "type")]
    pub kind: PartKind,
    pub tool: String,
    pub state: ToolState,
    pub time: TimeWindow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolStatus {
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolState {
    pub status: ToolStatus,
    pub title: String,
    /// The invocation's params, echoed verbatim.
    pub input: Value,
    /// Flattened result: `stdout`, else `content`, else the serialized result.
    pub output: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextPart {
    #[serde(rename = "sessionID")]
    pub session_id: SessionId,
    #[serde(rename = "type")]
    pub kind: PartKind,
    pub text: String,
    pub time: TimeWindow,
}

/// Wall-clock window in milliseconds since the epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: i64,
    pub end: i64,
}

impl TimeWindow {
    /// A zero-length window at `at`.
    pub fn instant(at: i64) -> Self {
        Self { start: at, end: at }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub name: String,
    pub message: String,
}
