//! Event emission: stamping payloads and writing them out one line at a time.
//!
//! - [`EventSink`] is the seam between the pipeline and wherever events go.
//! - [`NdjsonWriter`] serializes each event to one JSON line and flushes
//!   immediately, so a consumer reading the stream sees every event as soon
//!   as it is emitted.
//! - [`MemorySink`] keeps events in memory for embedders and tests.
//! - [`EventEmitter`] adds the timestamp and session id to each payload.

use std::io::Write;
use std::sync::{Arc, Mutex};

use relay_types::{now_millis, Event, EventPayload, RelayError, SessionId};

/// Destination for emitted events.
pub trait EventSink {
    /// Append one event. Must not return before the event is written out.
    fn append(&mut self, event: &Event) -> std::io::Result<()>;
}

impl<S: EventSink + ?Sized> EventSink for &mut S {
    fn append(&mut self, event: &Event) -> std::io::Result<()> {
        (**self).append(event)
    }
}

/// Writes each event as a single JSON line and flushes after every write.
pub struct NdjsonWriter<W: Write> {
    writer: W,
}

impl<W: Write> NdjsonWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Serialize `value` as one JSON line and flush.
    pub fn append_value<T: serde::Serialize>(&mut self, value: &T) -> std::io::Result<()> {
        serde_json::to_writer(&mut self.writer, value).map_err(std::io::Error::other)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> EventSink for NdjsonWriter<W> {
    fn append(&mut self, event: &Event) -> std::io::Result<()> {
        self.append_value(event)
    }
}

/// Collects events in memory. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    events: Arc<Mutex<Vec<Event>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything appended so far, in order.
    pub fn events(&self) -> Vec<Event> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl EventSink for MemorySink {
    fn append(&mut self, event: &Event) -> std::io::Result<()> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event.clone());
        Ok(())
    }
}

/// Stamps payloads with the current time and the session id, then hands
/// them to the sink.
pub struct EventEmitter<S: EventSink> {
    sink: S,
    session_id: SessionId,
    emitted: usize,
}

impl<S: EventSink> EventEmitter<S> {
    pub fn new(sink: S, session_id: SessionId) -> Self {
        Self {
            sink,
            session_id,
            emitted: 0,
        }
    }

    /// Emit one event. A write failure is fatal to the request.
    pub fn emit(&mut self, payload: EventPayload) -> Result<(), RelayError> {
        let event = Event {
            payload,
            timestamp: now_millis(),
            session_id: self.session_id.clone(),
        };
        self.sink.append(&event)?;
        self.emitted += 1;
        tracing::trace!(kind = event.kind(), step = ?event.step(), "event emitted");
        Ok(())
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Number of events written so far.
    pub fn emitted(&self) -> usize {
        self.emitted
    }

    pub fn into_sink(self) -> S {
        self.sink
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_types::{FinishReason, TimeWindow};

    fn sid() -> SessionId {
        SessionId::new("session-1-test")
    }

    #[test]
    fn ndjson_writer_writes_one_line_per_event() {
        let mut emitter = EventEmitter::new(NdjsonWriter::new(Vec::new()), sid());
        emitter
            .emit(EventPayload::step_start(&sid(), "process_request"))
            .unwrap();
        emitter
            .emit(EventPayload::text(&sid(), "multi\nline", TimeWindow::instant(1)))
            .unwrap();
        emitter
            .emit(EventPayload::step_finish(
                &sid(),
                "process_request",
                FinishReason::Stop,
            ))
            .unwrap();
        assert_eq!(emitter.emitted(), 3);

        let bytes = emitter.into_sink().into_inner();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        for line in &lines {
            let event: Event = serde_json::from_str(line).unwrap();
            assert_eq!(event.session_id, sid());
            assert!(event.timestamp > 0);
        }
        let text_event: Event = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(text_event.kind(), "text");
    }

    #[test]
    fn memory_sink_clones_share_events() {
        let sink = MemorySink::new();
        let mut emitter = EventEmitter::new(sink.clone(), sid());
        emitter
            .emit(EventPayload::tool_error("Unknown tool: nope"))
            .unwrap();
        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind(), "error");
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn write_failure_is_a_stream_error() {
        let mut emitter = EventEmitter::new(NdjsonWriter::new(BrokenPipe), sid());
        let err = emitter
            .emit(EventPayload::step_start(&sid(), "process_request"))
            .unwrap_err();
        assert!(matches!(err, RelayError::StreamError(_)));
        assert_eq!(emitter.emitted(), 0);
    }
}
