//! Pipeline control: prerequisite gate, chain state machine, controller and results.

mod controller;
mod prerequisites;
mod result;
mod state;

pub use controller::PipelineController;
pub use prerequisites::{PrerequisiteChecker, PrerequisiteReport};
pub use result::{ConsolidatedResult, ItemResult};
pub use state::{ChainEvent, ChainState};
