//! Merge stage adapter.

use super::{ItemContext, MergeConfirmation, MergeStage};
use crate::core::{BaseExtraction, DocumentId, EnrichmentData, RawLayer, StageName, StageOutcome};
use crate::errors::StoreError;
use crate::store::{DocumentPatch, DocumentStore};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

/// Writes the base and enrichment layers in a single conditional update.
///
/// The update is conditioned on the version the extraction was read from,
/// so a concurrent writer makes this merge fail with `conflict` instead of
/// silently interleaving.
#[derive(Debug, Clone)]
pub struct StoreMergeStage {
    store: Arc<dyn DocumentStore>,
}

impl StoreMergeStage {
    /// Creates the adapter.
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    async fn run(
        &self,
        id: &DocumentId,
        extraction: BaseExtraction,
    ) -> Result<MergeConfirmation, StoreError> {
        let document = self.store.get(id).await?;
        let BaseExtraction {
            base,
            enrichment,
            source_version,
        } = extraction;
        let (enrichment, dropped) = retain_known_files(&document.raw, enrichment);
        if dropped > 0 {
            warn!(document_id = %id, dropped, "Dropped insights for unknown paths");
        }
        let merged = enrichment.files.len();

        let patch = DocumentPatch::new()
            .with_base(base)
            .with_enrichment(enrichment)
            .expecting_version(source_version);
        let ack = self.store.update(id, patch).await?;
        info!(document_id = %id, version = ack.version, merged, "Document merged");

        Ok(MergeConfirmation {
            document_id: id.clone(),
            version: ack.version,
            merged_insights: merged,
            dropped_insights: dropped,
        })
    }
}

/// Keeps only insights whose path exists in the raw layer.
fn retain_known_files(raw: &RawLayer, mut enrichment: EnrichmentData) -> (EnrichmentData, usize) {
    let before = enrichment.files.len();
    enrichment.files.retain(|insight| raw.file(&insight.path).is_some());
    let dropped = before - enrichment.files.len();
    (enrichment, dropped)
}

#[async_trait]
impl MergeStage for StoreMergeStage {
    async fn merge(
        &self,
        ctx: &ItemContext,
        id: &DocumentId,
        extraction: BaseExtraction,
    ) -> StageOutcome<MergeConfirmation> {
        let result = self.run(id, extraction).await;
        StageOutcome::from_result(StageName::Merge, &ctx.reference, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{BaseSummary, FailureCause, FileInsight, RepositoryReference};
    use crate::store::InMemoryDocumentStore;
    use crate::testing::sample_raw_layer;
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    fn ctx() -> ItemContext {
        let reference = RepositoryReference::public("https://github.com/acme/widgets").unwrap();
        ItemContext::new(0, reference, Uuid::new_v4())
    }

    fn extraction(paths: &[&str], source_version: u64) -> BaseExtraction {
        BaseExtraction {
            base: BaseSummary {
                total_files: 2,
                ..BaseSummary::default()
            },
            enrichment: EnrichmentData {
                summary: Some("Widgets".to_string()),
                producer: None,
                files: paths
                    .iter()
                    .map(|p| FileInsight {
                        path: (*p).to_string(),
                        summary: Some("does things".to_string()),
                        ..FileInsight::default()
                    })
                    .collect(),
            },
            source_version,
        }
    }

    #[tokio::test]
    async fn test_merge_writes_both_layers() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let id = store.create(sample_raw_layer("widgets")).await.unwrap();
        let stage = StoreMergeStage::new(store.clone());

        let confirmation = stage
            .merge(&ctx(), &id, extraction(&["src/main.rs", "ghost.rs"], 1))
            .await
            .into_result()
            .unwrap();

        assert_eq!(confirmation.version, 2);
        assert_eq!(confirmation.merged_insights, 1);
        assert_eq!(confirmation.dropped_insights, 1);

        let stored = store.get(&id).await.unwrap();
        assert!(stored.is_enriched());
        let files: Vec<_> = stored
            .enrichment
            .unwrap()
            .files
            .into_iter()
            .map(|f| f.path)
            .collect();
        assert_eq!(files, vec!["src/main.rs".to_string()]);
    }

    #[tokio::test]
    async fn test_stale_extraction_conflicts() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let id = store.create(sample_raw_layer("widgets")).await.unwrap();
        let stage = StoreMergeStage::new(store.clone());

        stage
            .merge(&ctx(), &id, extraction(&[], 1))
            .await
            .into_result()
            .unwrap();
        let outcome = stage.merge(&ctx(), &id, extraction(&[], 1)).await;

        assert_eq!(outcome.failure_ref().unwrap().cause, FailureCause::Conflict);
        assert_eq!(store.get(&id).await.unwrap().version, 2);
    }

    #[tokio::test]
    async fn test_unknown_document_is_not_found() {
        let stage = StoreMergeStage::new(Arc::new(InMemoryDocumentStore::new()));
        let id = DocumentId::parse("nope").unwrap();

        let outcome = stage.merge(&ctx(), &id, extraction(&[], 1)).await;

        assert!(outcome
            .failure_ref()
            .unwrap()
            .reason()
            .starts_with("not_found: "));
    }
}
