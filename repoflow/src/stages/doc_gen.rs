//! Documentation-generation stage adapter.

use super::{DocGenStage, DocumentRenderer, ItemContext};
use crate::core::{DocumentId, RepositoryReference, StageName, StageOutcome};
use crate::errors::CollaboratorError;
use crate::store::DocumentStore;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Renders the enriched document and writes it under the reports directory.
///
/// The artifact is named after the repository owner and name, uppercased:
/// `https://github.com/acme/widgets` becomes `<reports_dir>/ACME_WIDGETS.md`.
/// Two references sharing a repository name under different owners get
/// separate files.
#[derive(Debug, Clone)]
pub struct FileDocGenStage {
    store: Arc<dyn DocumentStore>,
    renderer: Arc<dyn DocumentRenderer>,
    reports_dir: PathBuf,
}

impl FileDocGenStage {
    /// Creates the adapter.
    #[must_use]
    pub fn new(
        store: Arc<dyn DocumentStore>,
        renderer: Arc<dyn DocumentRenderer>,
        reports_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store,
            renderer,
            reports_dir: reports_dir.into(),
        }
    }

    /// Returns the directory artifacts are written to.
    #[must_use]
    pub fn reports_dir(&self) -> &std::path::Path {
        &self.reports_dir
    }

    async fn run(
        &self,
        reference: &RepositoryReference,
        id: &DocumentId,
    ) -> Result<PathBuf, CollaboratorError> {
        let document = self.store.get(id).await?;
        if !document.is_enriched() {
            return Err(CollaboratorError::InvalidInput(format!(
                "document {id} has not been merged"
            )));
        }

        let markdown = self.renderer.render(&document)?;
        tokio::fs::create_dir_all(&self.reports_dir).await?;
        let file_name = format!("{}.{}", report_stem(reference), self.renderer.extension());
        let path = self.reports_dir.join(file_name);
        tokio::fs::write(&path, markdown).await?;

        info!(document_id = %id, path = %path.display(), "Documentation written");
        Ok(path)
    }
}

/// `OWNER_NAME` with anything outside `[A-Z0-9._-]` replaced by `_`.
fn report_stem(reference: &RepositoryReference) -> String {
    reference
        .slug()
        .to_uppercase()
        .chars()
        .map(|c| match c {
            'A'..='Z' | '0'..='9' | '.' | '-' | '_' => c,
            _ => '_',
        })
        .collect()
}

#[async_trait]
impl DocGenStage for FileDocGenStage {
    async fn generate(&self, ctx: &ItemContext, id: &DocumentId) -> StageOutcome<PathBuf> {
        let result = self.run(&ctx.reference, id).await;
        StageOutcome::from_result(StageName::DocGen, &ctx.reference, result)
    }
}
