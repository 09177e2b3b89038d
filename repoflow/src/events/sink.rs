//! Event sinks.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, info, Level};

/// Receives pipeline lifecycle events.
///
/// Sinks are called inline by the controller, so `try_emit` must return
/// quickly and must not panic.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Records an event without waiting.
    fn try_emit(&self, kind: &str, data: Option<Value>);

    /// Records an event, waiting for the sink if it needs to.
    async fn emit(&self, kind: &str, data: Option<Value>) {
        self.try_emit(kind, data);
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

impl EventSink for NoOpEventSink {
    fn try_emit(&self, _kind: &str, _data: Option<Value>) {}
}

/// Writes events to `tracing` with the payload's item fields lifted out.
#[derive(Debug, Clone)]
pub struct LoggingEventSink {
    level: Level,
}

impl Default for LoggingEventSink {
    fn default() -> Self {
        Self { level: Level::INFO }
    }
}

impl LoggingEventSink {
    /// Logs at `level`; anything other than `DEBUG` logs at `INFO`.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Logs at `DEBUG`.
    #[must_use]
    pub fn debug() -> Self {
        Self::new(Level::DEBUG)
    }
}

fn str_field<'a>(data: Option<&'a Value>, key: &str) -> Option<&'a str> {
    data.and_then(|d| d.get(key)).and_then(Value::as_str)
}

impl EventSink for LoggingEventSink {
    fn try_emit(&self, kind: &str, data: Option<Value>) {
        let data = data.as_ref();
        let repository = str_field(data, "repository").unwrap_or("-");
        let stage = str_field(data, "stage").unwrap_or("-");
        let index = data.and_then(|d| d.get("index")).and_then(Value::as_u64);

        if self.level == Level::DEBUG {
            debug!(event = kind, repository, stage, index, data = ?data, "Pipeline event");
        } else {
            info!(event = kind, repository, stage, index, data = ?data, "Pipeline event");
        }
    }
}

/// One event captured by [`CollectingEventSink`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedEvent {
    /// Event kind, e.g. `stage.failed`.
    pub kind: String,
    /// Payload, if any.
    pub data: Option<Value>,
}

impl RecordedEvent {
    /// Looks up a top-level payload field.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.data.as_ref().and_then(|d| d.get(key))
    }
}

/// Keeps every event in memory, in emission order. Meant for tests.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: Mutex<Vec<RecordedEvent>>,
}

impl CollectingEventSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All events so far.
    #[must_use]
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events.lock().clone()
    }

    /// Number of events so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Returns true if nothing was emitted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Event kinds in emission order.
    #[must_use]
    pub fn event_types(&self) -> Vec<String> {
        self.events.lock().iter().map(|e| e.kind.clone()).collect()
    }

    /// Events whose kind starts with `prefix` (`"stage."` matches every stage event).
    #[must_use]
    pub fn events_of_type(&self, prefix: &str) -> Vec<RecordedEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.kind.starts_with(prefix))
            .cloned()
            .collect()
    }
}

impl EventSink for CollectingEventSink {
    fn try_emit(&self, kind: &str, data: Option<Value>) {
        self.events.lock().push(RecordedEvent {
            kind: kind.to_string(),
            data,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_emit_defaults_to_try_emit() {
        let sink = CollectingEventSink::new();
        sink.emit("pipeline.started", Some(json!({"items": 2}))).await;

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].field("items"), Some(&json!(2)));
    }

    #[test]
    fn test_logging_sink_tolerates_any_payload() {
        let sink = LoggingEventSink::debug();
        sink.try_emit(
            "item.started",
            Some(json!({"index": 0, "repository": "https://github.com/acme/a"})),
        );
        sink.try_emit("stage.failed", Some(json!(["not", "an", "object"])));
        sink.try_emit("pipeline.completed", None);
        NoOpEventSink.try_emit("pipeline.completed", None);
    }

    #[test]
    fn test_prefix_filter() {
        let sink = CollectingEventSink::new();
        assert!(sink.is_empty());

        sink.try_emit("stage.succeeded", None);
        sink.try_emit("stage.failed", Some(json!({"stage": "merge"})));
        sink.try_emit("item.failed", None);

        assert_eq!(sink.len(), 3);
        let stage_events = sink.events_of_type("stage.");
        assert_eq!(stage_events.len(), 2);
        assert_eq!(stage_events[1].field("stage"), Some(&json!("merge")));
        assert_eq!(
            sink.event_types(),
            vec!["stage.succeeded", "stage.failed", "item.failed"]
        );
    }
}
