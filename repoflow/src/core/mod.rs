//! Core domain model types for repoflow.
//!
//! This module contains the fundamental types used throughout the crate:
//! - Repository references and visibility
//! - Documents, their identity and their layers
//! - Stage names, outcomes and failure classes
//! - Item and process states

mod document;
mod layers;
mod outcome;
mod reference;
mod status;

pub use document::{
    approximate_tokens, rank_files, Document, DocumentId, FileRank, InvalidDocumentId, RawLayer,
    RepoFile, MAX_DOCUMENT_ID_LEN,
};
pub use layers::{
    ApiEndpoint, ApiInfo, BaseExtraction, BaseSummary, DbInfo, DbTable, EnrichmentData,
    EnvVarInfo, EnvVarUsage, FileInsight,
};
pub use outcome::{FailureCause, StageFailure, StageOutcome};
pub use reference::{RepositoryReference, Visibility};
pub use status::{FailureStage, ItemStatus, ProcessState, StageName};
