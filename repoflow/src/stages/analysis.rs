//! Analysis stage adapter.

use super::{AnalysisOutput, AnalysisStage, ItemContext, RepositoryAnalyzer};
use crate::core::{RepositoryReference, StageName, StageOutcome};
use crate::errors::CollaboratorError;
use crate::store::DocumentStore;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

/// Runs the repository analyzer and stores the raw layer as a new document.
#[derive(Debug, Clone)]
pub struct StoreAnalysisStage {
    analyzer: Arc<dyn RepositoryAnalyzer>,
    store: Arc<dyn DocumentStore>,
}

impl StoreAnalysisStage {
    /// Creates the adapter.
    #[must_use]
    pub fn new(analyzer: Arc<dyn RepositoryAnalyzer>, store: Arc<dyn DocumentStore>) -> Self {
        Self { analyzer, store }
    }

    async fn run(
        &self,
        reference: &RepositoryReference,
    ) -> Result<AnalysisOutput, CollaboratorError> {
        let raw = self.analyzer.analyze(reference).await?;
        if raw.files.is_empty() {
            return Err(CollaboratorError::Malformed(format!(
                "no readable files in {}",
                reference.url()
            )));
        }
        debug!(
            repository = %reference.url(),
            files = raw.files.len(),
            "Raw layer ready"
        );

        let id = self.store.create(raw).await?;
        info!(repository = %reference.url(), document_id = %id, "Document created");
        Ok(AnalysisOutput::new(id))
    }
}

#[async_trait]
impl AnalysisStage for StoreAnalysisStage {
    async fn analyze(&self, ctx: &ItemContext) -> StageOutcome<AnalysisOutput> {
        let result = self.run(&ctx.reference).await;
        StageOutcome::from_result(StageName::Analysis, &ctx.reference, result)
    }
}
