//! Documents and document identity.

use super::{BaseSummary, EnrichmentData, Visibility};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Longest identifier accepted at a stage boundary.
pub const MAX_DOCUMENT_ID_LEN: usize = 128;

/// Why a value was rejected as a document id.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Invalid document id {value:?}: {reason}")]
pub struct InvalidDocumentId {
    /// The rejected value.
    pub value: String,
    /// What was wrong with it.
    pub reason: &'static str,
}

/// Opaque, store-assigned document identifier.
///
/// Only presence and shape are validated: non-empty, at most
/// [`MAX_DOCUMENT_ID_LEN`] bytes, and made of ASCII letters, digits,
/// `-`, `_`, `.` or `:`. Nothing else about the value is interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocumentId(String);

impl DocumentId {
    /// Validates a raw identifier.
    pub fn parse(value: impl Into<String>) -> Result<Self, InvalidDocumentId> {
        let value = value.into();
        let reason = if value.is_empty() {
            Some("empty")
        } else if value.trim().is_empty() {
            Some("blank")
        } else if value.len() > MAX_DOCUMENT_ID_LEN {
            Some("too long")
        } else if !value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':'))
        {
            Some("contains characters outside [A-Za-z0-9-_.:]")
        } else {
            None
        };

        match reason {
            Some(reason) => Err(InvalidDocumentId { value, reason }),
            None => Ok(Self(value)),
        }
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for DocumentId {
    type Error = InvalidDocumentId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<DocumentId> for String {
    fn from(id: DocumentId) -> Self {
        id.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One file captured from the repository checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoFile {
    /// Path relative to the repository root, `/`-separated.
    pub path: String,
    /// UTF-8 file content.
    pub content: String,
    /// Character count.
    pub chars: usize,
    /// Approximate token count.
    pub tokens: usize,
}

impl RepoFile {
    /// Creates a file entry, computing its size metrics.
    #[must_use]
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        let content = content.into();
        let chars = content.chars().count();
        Self {
            path: path.into(),
            tokens: approximate_tokens(chars),
            chars,
            content,
        }
    }

    /// Lowercased extension, or an empty string.
    #[must_use]
    pub fn extension(&self) -> String {
        let file_name = self.path.rsplit('/').next().unwrap_or(&self.path);
        match file_name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => ext.to_ascii_lowercase(),
            _ => String::new(),
        }
    }
}

/// Rough token estimate used across the pipeline: four characters per token.
#[must_use]
pub fn approximate_tokens(chars: usize) -> usize {
    chars.div_ceil(4)
}

/// A file ranked by size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRank {
    /// 1-based rank.
    pub rank: usize,
    /// File path.
    pub path: String,
    /// Character count.
    pub chars: usize,
    /// Approximate token count.
    pub tokens: usize,
}

/// Ranks the largest files, biggest first.
#[must_use]
pub fn rank_files(files: &[RepoFile], limit: usize) -> Vec<FileRank> {
    let mut sorted: Vec<&RepoFile> = files.iter().collect();
    sorted.sort_by(|a, b| b.chars.cmp(&a.chars).then_with(|| a.path.cmp(&b.path)));
    sorted
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(i, f)| FileRank {
            rank: i + 1,
            path: f.path.clone(),
            chars: f.chars,
            tokens: f.tokens,
        })
        .collect()
}

/// Content inventory and metadata produced by the analysis stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawLayer {
    /// Repository URL.
    pub repository_url: String,
    /// Repository name derived from the URL.
    pub repository_name: String,
    /// Visibility of the source repository.
    pub visibility: Visibility,
    /// ASCII tree of the checkout.
    pub directory_structure: String,
    /// Captured files.
    pub files: Vec<RepoFile>,
    /// When the analysis ran.
    pub analyzed_at: DateTime<Utc>,
}

impl RawLayer {
    /// Looks up a file by path.
    #[must_use]
    pub fn file(&self, path: &str) -> Option<&RepoFile> {
        self.files.iter().find(|f| f.path == path)
    }
}

/// A persisted, progressively enriched document.
///
/// The raw layer is always present. Base and enrichment layers are only
/// ever written together by the merge stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Store-assigned identifier.
    pub id: DocumentId,
    /// Incremented by the store on every update.
    pub version: u64,
    /// Analysis output.
    pub raw: RawLayer,
    /// Derived facts, present once merged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<BaseSummary>,
    /// AI-derived insights, present once merged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enrichment: Option<EnrichmentData>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// Returns true once the merge stage has written both layers.
    #[must_use]
    pub fn is_enriched(&self) -> bool {
        self.base.is_some() && self.enrichment.is_some()
    }
}
