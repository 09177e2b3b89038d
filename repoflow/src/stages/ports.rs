//! Collaborator ports - the external capabilities stage adapters call out to.
//!
//! Each port is a narrow contract. Implementations live in
//! [`crate::collaborators`]; tests inject their own.

use crate::core::{BaseSummary, Document, EnrichmentData, RawLayer, RepositoryReference};
use crate::errors::CollaboratorError;
use async_trait::async_trait;
use std::fmt::Debug;

/// Clones/extracts a repository into a raw document layer.
#[async_trait]
pub trait RepositoryAnalyzer: Send + Sync + Debug {
    /// Produces the raw layer for one reference.
    async fn analyze(&self, reference: &RepositoryReference) -> Result<RawLayer, CollaboratorError>;
}

/// Derives the baseline summary from a stored document.
#[async_trait]
pub trait BaseExtractor: Send + Sync + Debug {
    /// Computes the base layer. Must not write to the store.
    async fn extract_base(&self, document: &Document) -> Result<BaseSummary, CollaboratorError>;
}

/// Produces AI-derived insights for a document.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Enricher: Send + Sync + Debug {
    /// Computes the enrichment layer. Must not write to the store.
    async fn enrich(
        &self,
        document: &Document,
        base: &BaseSummary,
    ) -> Result<EnrichmentData, CollaboratorError>;
}

/// Renders an enriched document.
pub trait DocumentRenderer: Send + Sync + Debug {
    /// Renders the document to text.
    fn render(&self, document: &Document) -> Result<String, CollaboratorError>;

    /// File extension of the rendered artifact, without the dot.
    fn extension(&self) -> &'static str {
        "md"
    }
}
