//! Concrete collaborators behind the stage ports.
//!
//! - [`GitRepositoryAnalyzer`]: shallow clone plus file inventory
//! - [`HeuristicBaseExtractor`]: rule-based base layer
//! - [`NoOpEnricher`] and, with the `llm` feature, [`OpenAiCompatibleEnricher`]
//! - [`MarkdownRenderer`]: markdown documentation

mod enricher;
mod git;
mod heuristic;
mod markdown;

pub use enricher::NoOpEnricher;
#[cfg(feature = "llm")]
pub use enricher::OpenAiCompatibleEnricher;
pub use git::{scan_checkout, GitRepositoryAnalyzer, Inventory};
pub use heuristic::{language_for, HeuristicBaseExtractor};
pub use markdown::MarkdownRenderer;
