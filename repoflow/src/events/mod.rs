//! Event sink system for pipeline observability.
//!
//! The controller reports lifecycle events through an [`EventSink`]:
//! `pipeline.started`, `pipeline.rejected`, `item.started`,
//! `stage.succeeded`, `stage.failed`, `item.succeeded`, `item.failed`,
//! `item.cancelled` and `pipeline.completed`.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink, RecordedEvent};

/// Event type names.
pub mod kinds {
    /// A run passed its prerequisite check.
    pub const PIPELINE_STARTED: &str = "pipeline.started";
    /// A run failed its prerequisite check.
    pub const PIPELINE_REJECTED: &str = "pipeline.rejected";
    /// A run produced its consolidated result.
    pub const PIPELINE_COMPLETED: &str = "pipeline.completed";
    /// A reference chain started.
    pub const ITEM_STARTED: &str = "item.started";
    /// A reference chain reached `DONE`.
    pub const ITEM_SUCCEEDED: &str = "item.succeeded";
    /// A reference chain reached `FAILED`.
    pub const ITEM_FAILED: &str = "item.failed";
    /// A reference chain stopped at a stage boundary after cancellation.
    pub const ITEM_CANCELLED: &str = "item.cancelled";
    /// A stage invocation succeeded.
    pub const STAGE_SUCCEEDED: &str = "stage.succeeded";
    /// A stage invocation failed.
    pub const STAGE_FAILED: &str = "stage.failed";
}
