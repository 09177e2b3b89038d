//! Stage traits and their store-backed adapters.
//!
//! Every stage answers with a [`StageOutcome`]; no stage returns a bare
//! error to the controller. The adapters in this module wrap the
//! collaborator [`ports`] and the [`DocumentStore`](crate::store::DocumentStore).

mod analysis;
mod base_extraction;
mod doc_gen;
mod merge;
pub mod ports;

pub use analysis::StoreAnalysisStage;
pub use base_extraction::StoreBaseExtractionStage;
pub use doc_gen::FileDocGenStage;
pub use merge::StoreMergeStage;
pub use ports::{BaseExtractor, DocumentRenderer, Enricher, RepositoryAnalyzer};

use crate::core::{
    BaseExtraction, DocumentId, FailureCause, RepositoryReference, StageFailure, StageName,
    StageOutcome,
};
use async_trait::async_trait;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt::Debug;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

/// Per-item context handed to every stage invocation.
#[derive(Debug, Clone)]
pub struct ItemContext {
    /// Position of the reference in the input list.
    pub index: usize,
    /// The reference being processed.
    pub reference: RepositoryReference,
    /// Identifier of the run this item belongs to.
    pub run_id: Uuid,
}

impl ItemContext {
    /// Creates a new item context.
    #[must_use]
    pub fn new(index: usize, reference: RepositoryReference, run_id: Uuid) -> Self {
        Self {
            index,
            reference,
            run_id,
        }
    }
}

/// Payload of a successful analysis.
///
/// The identifier is kept raw: the controller validates it before any
/// downstream stage sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisOutput {
    /// Identifier of the created document, as reported by the stage.
    pub document_id: String,
}

impl AnalysisOutput {
    /// Creates an analysis payload.
    #[must_use]
    pub fn new(document_id: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
        }
    }
}

/// Payload of a successful merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeConfirmation {
    /// The merged document.
    pub document_id: DocumentId,
    /// Document version after the merge.
    pub version: u64,
    /// Per-file insights written.
    pub merged_insights: usize,
    /// Per-file insights dropped because their path is not in the raw layer.
    pub dropped_insights: usize,
}

/// Creates the document for one reference.
#[async_trait]
pub trait AnalysisStage: Send + Sync + Debug {
    /// Runs analysis for the item's reference.
    async fn analyze(&self, ctx: &ItemContext) -> StageOutcome<AnalysisOutput>;
}

/// Derives the base summary and enrichment data without writing to the store.
#[async_trait]
pub trait BaseExtractionStage: Send + Sync + Debug {
    /// Reads the document and derives its base and enrichment layers.
    async fn extract(&self, ctx: &ItemContext, id: &DocumentId) -> StageOutcome<BaseExtraction>;
}

/// Writes the derived layers back into the store.
#[async_trait]
pub trait MergeStage: Send + Sync + Debug {
    /// Merges the extraction into the document.
    async fn merge(
        &self,
        ctx: &ItemContext,
        id: &DocumentId,
        extraction: BaseExtraction,
    ) -> StageOutcome<MergeConfirmation>;
}

/// Renders the enriched document to an artifact.
#[async_trait]
pub trait DocGenStage: Send + Sync + Debug {
    /// Generates the artifact and returns its location.
    async fn generate(&self, ctx: &ItemContext, id: &DocumentId) -> StageOutcome<PathBuf>;
}

/// The four stages a controller drives, in execution order.
#[derive(Debug, Clone)]
pub struct StageSet {
    /// Analysis stage.
    pub analysis: Arc<dyn AnalysisStage>,
    /// Base-extraction stage.
    pub base_extraction: Arc<dyn BaseExtractionStage>,
    /// Merge stage.
    pub merge: Arc<dyn MergeStage>,
    /// Documentation-generation stage.
    pub doc_gen: Arc<dyn DocGenStage>,
}

impl StageSet {
    /// Creates a stage set.
    #[must_use]
    pub fn new(
        analysis: Arc<dyn AnalysisStage>,
        base_extraction: Arc<dyn BaseExtractionStage>,
        merge: Arc<dyn MergeStage>,
        doc_gen: Arc<dyn DocGenStage>,
    ) -> Self {
        Self {
            analysis,
            base_extraction,
            merge,
            doc_gen,
        }
    }
}

/// Awaits a stage invocation, turning a panic into an `internal_error` failure.
pub async fn contain_panics<T, F>(
    stage: StageName,
    reference: &RepositoryReference,
    invocation: F,
) -> StageOutcome<T>
where
    F: Future<Output = StageOutcome<T>>,
{
    match AssertUnwindSafe(invocation).catch_unwind().await {
        Ok(outcome) => outcome,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            tracing::error!(
                stage = %stage,
                repository = %reference.url(),
                panic = %message,
                "Stage panicked"
            );
            StageOutcome::failure(
                stage,
                reference,
                StageFailure::new(FailureCause::Internal, format!("stage panicked: {message}")),
            )
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
