//! Base-extraction stage adapter.

use super::{BaseExtractionStage, BaseExtractor, Enricher, ItemContext};
use crate::core::{BaseExtraction, DocumentId, StageName, StageOutcome};
use crate::errors::CollaboratorError;
use crate::store::DocumentStore;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Reads the document, derives its base summary and enrichment data.
///
/// Nothing is written back: the merge stage persists both layers together.
#[derive(Debug, Clone)]
pub struct StoreBaseExtractionStage {
    store: Arc<dyn DocumentStore>,
    extractor: Arc<dyn BaseExtractor>,
    enricher: Arc<dyn Enricher>,
}

impl StoreBaseExtractionStage {
    /// Creates the adapter.
    #[must_use]
    pub fn new(
        store: Arc<dyn DocumentStore>,
        extractor: Arc<dyn BaseExtractor>,
        enricher: Arc<dyn Enricher>,
    ) -> Self {
        Self {
            store,
            extractor,
            enricher,
        }
    }

    async fn run(&self, id: &DocumentId) -> Result<BaseExtraction, CollaboratorError> {
        let document = self.store.get(id).await?;
        let base = self.extractor.extract_base(&document).await?;
        let enrichment = self.enricher.enrich(&document, &base).await?;
        debug!(
            document_id = %id,
            files = base.total_files,
            insights = enrichment.files.len(),
            "Base layer derived"
        );

        Ok(BaseExtraction {
            base,
            enrichment,
            source_version: document.version,
        })
    }
}

#[async_trait]
impl BaseExtractionStage for StoreBaseExtractionStage {
    async fn extract(&self, ctx: &ItemContext, id: &DocumentId) -> StageOutcome<BaseExtraction> {
        let result = self.run(id).await;
        StageOutcome::from_result(StageName::BaseExtraction, &ctx.reference, result)
    }
}
