//! The request state machine.
//!
//! One pass per request:
//!
//! ```text
//! step_start(process_request)
//!   for each tool, in order:
//!     step_start(execute_<name>)
//!     tool_use                      | error
//!     step_finish(tool-calls)       | step_finish(error)
//!   step_start(generate_response)
//!   text
//!   step_finish(generate_response, stop)
//! step_finish(process_request, stop)
//! ```
//!
//! A failing tool never stops later tools or the response phase. Only a
//! failure to write the stream aborts the request.

use relay_tools::{ToolContext, ToolRegistry};
use relay_types::{
    now_millis, EventPayload, FinishReason, RelayError, Request, SessionId, TimeWindow,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::emitter::{EventEmitter, EventSink};

/// Step bracketing the whole request.
pub const STEP_PROCESS_REQUEST: &str = "process_request";

/// Step bracketing the response text.
pub const STEP_GENERATE_RESPONSE: &str = "generate_response";

/// Step name for one tool invocation.
pub fn tool_step(name: &str) -> String {
    format!("execute_{name}")
}

/// The fixed response for a message.
pub fn respond_to(message: &str) -> String {
    format!("Hello! You said: \"{message}\"")
}

/// Returned to synchronous callers once the stream is complete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestSummary {
    pub response: String,
    pub model: String,
    pub timestamp: i64,
    #[serde(rename = "sessionID")]
    pub session_id: SessionId,
}

/// Drives tool execution and event emission for one session.
pub struct ExecutionPipeline {
    registry: ToolRegistry,
    ctx: ToolContext,
}

impl ExecutionPipeline {
    pub fn new(registry: ToolRegistry, ctx: ToolContext) -> Self {
        Self { registry, ctx }
    }

    pub fn context(&self) -> &ToolContext {
        &self.ctx
    }

    /// Process one request, writing every event to `sink` before returning.
    pub async fn process<S: EventSink>(
        &self,
        request: &Request,
        sink: S,
    ) -> Result<RequestSummary, RelayError> {
        let session = self.ctx.session();
        let sid = session.id();
        let mut emitter = EventEmitter::new(sink, sid.clone());

        tracing::info!(session = %sid, tools = request.tools.len(), "processing request");

        emitter.emit(EventPayload::step_start(sid, STEP_PROCESS_REQUEST))?;

        let mut failures = 0usize;
        for invocation in &request.tools {
            let ok = self
                .run_tool(&mut emitter, &invocation.name, &invocation.params)
                .await?;
            if !ok {
                failures += 1;
            }
        }

        emitter.emit(EventPayload::step_start(sid, STEP_GENERATE_RESPONSE))?;
        let response = respond_to(request.message());
        emitter.emit(EventPayload::text(
            sid,
            response.clone(),
            TimeWindow::instant(now_millis()),
        ))?;
        emitter.emit(EventPayload::step_finish(
            sid,
            STEP_GENERATE_RESPONSE,
            FinishReason::Stop,
        ))?;

        emitter.emit(EventPayload::step_finish(
            sid,
            STEP_PROCESS_REQUEST,
            FinishReason::Stop,
        ))?;

        tracing::info!(
            session = %sid,
            events = emitter.emitted(),
            failures,
            "request complete"
        );

        Ok(RequestSummary {
            response,
            model: session.model().to_string(),
            timestamp: now_millis(),
            session_id: sid.clone(),
        })
    }

    /// Run one tool step. Returns whether the tool succeeded; `Err` only for
    /// stream failures.
    async fn run_tool<S: EventSink>(
        &self,
        emitter: &mut EventEmitter<S>,
        name: &str,
        params: &serde_json::Map<String, Value>,
    ) -> Result<bool, RelayError> {
        let sid = emitter.session_id().clone();
        let step = tool_step(name);
        emitter.emit(EventPayload::step_start(&sid, step.as_str()))?;

        let input = Value::Object(params.clone());
        let start = now_millis();
        let result = self.registry.execute(&self.ctx, name, input.clone()).await;
        let end = now_millis();

        match result {
            Ok(output) => {
                let title = self.registry.title(name, &input);
                emitter.emit(EventPayload::tool_use(
                    &sid,
                    name,
                    title,
                    input,
                    output.flatten(),
                    TimeWindow { start, end },
                ))?;
                emitter.emit(EventPayload::step_finish(&sid, step, FinishReason::ToolCalls))?;
                Ok(true)
            }
            Err(e) => {
                tracing::info!(tool = %name, error = %e, "tool execution failed");
                emitter.emit(EventPayload::tool_error(e.to_string()))?;
                emitter.emit(EventPayload::step_finish(&sid, step, FinishReason::Error))?;
                Ok(false)
            }
        }
    }
}
