//! Document store contract.
//!
//! The pipeline needs exactly three operations from a store: create a
//! document from its raw layer, read it back by id, and apply an atomic
//! patch to it. Updates to one id never interleave; updates to different
//! ids are independent.

mod memory;

pub use memory::InMemoryDocumentStore;

use crate::core::{BaseSummary, Document, DocumentId, EnrichmentData, RawLayer};
use crate::errors::StoreError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A set of layer writes applied atomically to one document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentPatch {
    /// Replaces the base layer when set.
    pub base: Option<BaseSummary>,
    /// Replaces the enrichment layer when set.
    pub enrichment: Option<EnrichmentData>,
    /// Reject the patch unless the stored version matches.
    pub expected_version: Option<u64>,
}

impl DocumentPatch {
    /// Creates an empty patch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the base layer.
    #[must_use]
    pub fn with_base(mut self, base: BaseSummary) -> Self {
        self.base = Some(base);
        self
    }

    /// Sets the enrichment layer.
    #[must_use]
    pub fn with_enrichment(mut self, enrichment: EnrichmentData) -> Self {
        self.enrichment = Some(enrichment);
        self
    }

    /// Makes the patch conditional on a version.
    #[must_use]
    pub fn expecting_version(mut self, version: u64) -> Self {
        self.expected_version = Some(version);
        self
    }

    /// Returns true if the patch writes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.base.is_none() && self.enrichment.is_none()
    }
}

/// Acknowledgement of an applied update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateAck {
    /// Version after the update.
    pub version: u64,
}

/// Async key-addressed document storage.
#[async_trait]
pub trait DocumentStore: Send + Sync + std::fmt::Debug {
    /// Stores a new document and returns its store-assigned id.
    async fn create(&self, raw: RawLayer) -> Result<DocumentId, StoreError>;

    /// Reads a document.
    async fn get(&self, id: &DocumentId) -> Result<Document, StoreError>;

    /// Applies a patch atomically.
    async fn update(&self, id: &DocumentId, patch: DocumentPatch) -> Result<UpdateAck, StoreError>;
}
