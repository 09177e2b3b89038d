//! # Repoflow
//!
//! Runs a list of source repositories through a fixed four-stage chain and
//! reports one consolidated result.
//!
//! Every repository reference goes through:
//!
//! - **Analysis**: clone the repository and store its raw layer as a new document
//! - **Base extraction**: derive a baseline summary and AI enrichment from the document
//! - **Merge**: write both layers back under optimistic versioning
//! - **Doc-gen**: render the enriched document to a Markdown report
//!
//! A failure stops only its own chain. The run is `Completed` when at least
//! one reference reaches the end, `Failed` otherwise.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use repoflow::prelude::*;
//! use std::sync::Arc;
//!
//! let config = PipelineConfig::from_env()?;
//! let store = Arc::new(InMemoryDocumentStore::new());
//! let controller = PipelineController::from_config(config, store)?;
//!
//! let references = vec![RepositoryReference::public("https://github.com/acme/widgets")?];
//! let result = controller.run(&references).await;
//! println!("{result}");
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cancellation;
pub mod collaborators;
pub mod config;
pub mod core;
pub mod errors;
pub mod events;
pub mod pipeline;
pub mod references;
pub mod stages;
pub mod store;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancellation::CancellationToken;
    pub use crate::config::{AiConfig, AnalysisConfig, Credentials, PipelineConfig};
    pub use crate::core::{
        Document, DocumentId, FailureCause, FailureStage, ItemStatus, ProcessState, RawLayer,
        RepositoryReference, StageFailure, StageName, StageOutcome, Visibility,
    };
    pub use crate::errors::{
        CollaboratorError, ReferenceError, RepoflowError, Result, StoreError,
    };
    pub use crate::events::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::pipeline::{ConsolidatedResult, ItemResult, PipelineController};
    pub use crate::references::ReferenceList;
    pub use crate::stages::{
        AnalysisStage, BaseExtractionStage, DocGenStage, MergeStage, StageSet,
    };
    pub use crate::store::{DocumentStore, InMemoryDocumentStore};
}
