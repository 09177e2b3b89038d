//! In-memory document store.

use super::{DocumentPatch, DocumentStore, UpdateAck};
use crate::core::{Document, DocumentId, RawLayer};
use crate::errors::StoreError;
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;
use uuid::Uuid;

/// A [`DocumentStore`] backed by a concurrent hash map.
///
/// Ids are random UUIDs, so re-analysing the same repository always yields
/// a fresh document. Each update holds the entry's shard lock for the whole
/// read-check-write, which makes it atomic per document.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    documents: DashMap<DocumentId, Document>,
    offline: AtomicBool,
}

impl InMemoryDocumentStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Ids of all stored documents.
    #[must_use]
    pub fn ids(&self) -> Vec<DocumentId> {
        self.documents.iter().map(|e| e.key().clone()).collect()
    }

    /// Makes every operation fail with `Unavailable` until switched back.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn ensure_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("store is offline".to_string()))
        } else {
            Ok(())
        }
    }

    fn next_id() -> Result<DocumentId, StoreError> {
        DocumentId::parse(Uuid::new_v4().to_string())
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn create(&self, raw: RawLayer) -> Result<DocumentId, StoreError> {
        self.ensure_online()?;
        let id = Self::next_id()?;
        let now = Utc::now();
        self.documents.insert(
            id.clone(),
            Document {
                id: id.clone(),
                version: 1,
                raw,
                base: None,
                enrichment: None,
                created_at: now,
                updated_at: now,
            },
        );
        debug!(document_id = %id, "Document created");
        Ok(id)
    }

    async fn get(&self, id: &DocumentId) -> Result<Document, StoreError> {
        self.ensure_online()?;
        self.documents
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    async fn update(&self, id: &DocumentId, patch: DocumentPatch) -> Result<UpdateAck, StoreError> {
        self.ensure_online()?;
        let mut entry = self
            .documents
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        let document = entry.value_mut();

        if let Some(expected) = patch.expected_version {
            if expected != document.version {
                return Err(StoreError::Conflict {
                    id: id.clone(),
                    expected,
                    actual: document.version,
                });
            }
        }

        if let Some(base) = patch.base {
            document.base = Some(base);
        }
        if let Some(enrichment) = patch.enrichment {
            document.enrichment = Some(enrichment);
        }
        document.version += 1;
        document.updated_at = Utc::now();

        debug!(document_id = %id, version = document.version, "Document updated");
        Ok(UpdateAck {
            version: document.version,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{BaseSummary, EnrichmentData, RepoFile, Visibility};
    use std::collections::HashSet;
    use std::sync::Arc;
    use tokio_test::{assert_err, assert_ok};

    fn raw(name: &str) -> RawLayer {
        RawLayer {
            repository_url: format!("https://github.com/acme/{name}"),
            repository_name: name.to_string(),
            visibility: Visibility::Public,
            directory_structure: "README.md".to_string(),
            files: vec![RepoFile::new("README.md", "# hello")],
            analyzed_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let store = InMemoryDocumentStore::new();
        let id = store.create(raw("widgets")).await.unwrap();

        let doc = store.get(&id).await.unwrap();
        assert_eq!(doc.id, id);
        assert_eq!(doc.version, 1);
        assert_eq!(doc.raw.repository_name, "widgets");
        assert!(!doc.is_enriched());
    }

    #[tokio::test]
    async fn test_same_raw_gets_distinct_ids() {
        let store = InMemoryDocumentStore::new();
        let a = store.create(raw("widgets")).await.unwrap();
        let b = store.create(raw("widgets")).await.unwrap();
        assert_ne!(a, b);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_update_missing_document() {
        let store = InMemoryDocumentStore::new();
        let id = DocumentId::parse("missing").unwrap();

        let err = store.update(&id, DocumentPatch::new()).await.unwrap_err();
        assert_eq!(err, StoreError::NotFound(id.clone()));
        assert_err!(store.get(&id).await);
    }

    #[tokio::test]
    async fn test_update_writes_layers_and_bumps_version() {
        let store = InMemoryDocumentStore::new();
        let id = store.create(raw("widgets")).await.unwrap();

        let patch = DocumentPatch::new()
            .with_base(BaseSummary { total_files: 1, ..BaseSummary::default() })
            .with_enrichment(EnrichmentData::default())
            .expecting_version(1);
        let ack = assert_ok!(store.update(&id, patch).await);
        assert_eq!(ack.version, 2);

        let doc = store.get(&id).await.unwrap();
        assert!(doc.is_enriched());
        assert_eq!(doc.base.unwrap().total_files, 1);
        assert!(doc.updated_at >= doc.created_at);
    }

    #[tokio::test]
    async fn test_stale_version_conflicts() {
        let store = InMemoryDocumentStore::new();
        let id = store.create(raw("widgets")).await.unwrap();
        store.update(&id, DocumentPatch::new().expecting_version(1)).await.unwrap();

        let err = store
            .update(
                &id,
                DocumentPatch::new()
                    .with_base(BaseSummary::default())
                    .expecting_version(1),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict { expected: 1, actual: 2, .. }));
        assert!(store.get(&id).await.unwrap().base.is_none());
    }

    #[tokio::test]
    async fn test_offline_store() {
        let store = InMemoryDocumentStore::new();
        store.set_offline(true);
        assert!(matches!(store.create(raw("x")).await, Err(StoreError::Unavailable(_))));

        store.set_offline(false);
        assert!(store.create(raw("x")).await.is_ok());
    }

    #[tokio::test]
    async fn test_concurrent_conditional_updates_are_not_torn() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let id = store.create(raw("widgets")).await.unwrap();

        let mut handles = Vec::new();
        for writer in 0..16_usize {
            let store = store.clone();
            let id = id.clone();
            handles.push(tokio::spawn(async move {
                let base = BaseSummary {
                    total_files: writer,
                    total_chars: writer,
                    ..BaseSummary::default()
                };
                store
                    .update(&id, DocumentPatch::new().with_base(base).expecting_version(1))
                    .await
            }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);

        let doc = store.get(&id).await.unwrap();
        let base = doc.base.unwrap();
        assert_eq!(base.total_files, base.total_chars);
        assert_eq!(doc.version, 2);
    }

    #[tokio::test]
    async fn test_ids_lists_everything() {
        let store = InMemoryDocumentStore::new();
        let a = store.create(raw("a")).await.unwrap();
        let b = store.create(raw("b")).await.unwrap();

        let ids: HashSet<DocumentId> = store.ids().into_iter().collect();
        assert!(ids.contains(&a) && ids.contains(&b));
    }
}
