//! Error types for the repoflow pipeline.
//!
//! Errors in this module never cross a stage boundary: stage adapters turn
//! them into [`StageFailure`](crate::core::StageFailure) values, and the
//! controller only ever sees stage outcomes.

use crate::core::{DocumentId, FailureCause};
use thiserror::Error;

/// The main error type for repoflow library operations.
#[derive(Debug, Error)]
pub enum RepoflowError {
    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A repository reference could not be accepted.
    #[error("{0}")]
    Reference(#[from] ReferenceError),

    /// The document store rejected an operation.
    #[error("{0}")]
    Store(#[from] StoreError),

    /// A collaborator failed.
    #[error("{0}")]
    Collaborator(#[from] CollaboratorError),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while accepting repository references.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReferenceError {
    /// The URL was empty after trimming.
    #[error("Repository URL is empty")]
    Empty,

    /// The URL does not look like a code-host repository URL.
    #[error("Invalid repository URL format: {url}")]
    Malformed {
        /// The rejected URL.
        url: String,
    },

    /// The reference list file could not be read.
    #[error("Cannot read reference list {path}: {reason}")]
    Unreadable {
        /// Path of the list file.
        path: String,
        /// Underlying IO error message.
        reason: String,
    },
}

/// Errors returned by a [`DocumentStore`](crate::store::DocumentStore).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// No document exists under the id.
    #[error("Document not found: {0}")]
    NotFound(DocumentId),

    /// The update was based on a stale version of the document.
    #[error("Update conflict on document {id}: expected version {expected}, found {actual}")]
    Conflict {
        /// Document id.
        id: DocumentId,
        /// Version the writer based its patch on.
        expected: u64,
        /// Version currently stored.
        actual: u64,
    },

    /// The store cannot serve requests.
    #[error("Document store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Returns the failure cause a stage reports for this error.
    #[must_use]
    pub fn cause(&self) -> FailureCause {
        match self {
            Self::NotFound(_) => FailureCause::NotFound,
            Self::Conflict { .. } => FailureCause::Conflict,
            Self::Unavailable(_) => FailureCause::StoreUnavailable,
        }
    }
}

/// Errors returned by the external collaborators behind each stage.
#[derive(Debug, Error)]
pub enum CollaboratorError {
    /// The remote side did not answer in time.
    #[error("Timed out after {seconds}s: {operation}")]
    Timeout {
        /// What was being attempted.
        operation: String,
        /// The timeout that elapsed.
        seconds: f64,
    },

    /// The remote side answered with an error.
    #[error("Remote error: {0}")]
    Remote(String),

    /// The remote side answered with something unusable.
    #[error("Malformed response: {0}")]
    Malformed(String),

    /// The input handed to the collaborator was unusable.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A store operation failed inside the collaborator.
    #[error("{0}")]
    Store(#[from] StoreError),

    /// Local IO failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CollaboratorError {
    /// Returns the failure cause a stage reports for this error.
    #[must_use]
    pub fn cause(&self) -> FailureCause {
        match self {
            Self::Timeout { .. } => FailureCause::Timeout,
            Self::Remote(_) => FailureCause::RemoteError,
            Self::Malformed(_) => FailureCause::MalformedResponse,
            Self::InvalidInput(_) => FailureCause::InvalidInput,
            Self::Store(err) => err.cause(),
            Self::Io(_) => FailureCause::IoError,
        }
    }
}

impl From<serde_json::Error> for CollaboratorError {
    fn from(err: serde_json::Error) -> Self {
        Self::Malformed(err.to_string())
    }
}

/// Result alias for repoflow library operations.
pub type Result<T, E = RepoflowError> = std::result::Result<T, E>;
