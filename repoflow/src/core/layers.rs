//! Base and enrichment layers of a document.

use super::FileRank;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An environment variable referenced somewhere in the code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVarUsage {
    /// Variable name.
    pub name: String,
    /// Files referencing it, sorted.
    pub files: Vec<String>,
}

/// Facts derived directly from the raw layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseSummary {
    /// Number of captured files.
    pub total_files: usize,
    /// Sum of characters over all files.
    pub total_chars: usize,
    /// Sum of approximate tokens over all files.
    pub total_tokens: usize,
    /// Files per detected language.
    pub languages: BTreeMap<String, usize>,
    /// Environment variables found in the code.
    pub env_vars: Vec<EnvVarUsage>,
    /// Largest files.
    pub top_files: Vec<FileRank>,
}

impl BaseSummary {
    /// Language with the most files, if any.
    #[must_use]
    pub fn primary_language(&self) -> Option<&str> {
        self.languages
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
            .map(|(lang, _)| lang.as_str())
    }
}

/// Description of an environment variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVarInfo {
    /// Variable name.
    pub name: String,
    /// What it is used for.
    #[serde(default)]
    pub description: String,
    /// Where it is defined or read.
    #[serde(default)]
    pub context: String,
}

/// A database table and how it is used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbTable {
    /// Table name.
    pub name: String,
    /// Operations performed (read, write, ...).
    #[serde(default)]
    pub operations: Vec<String>,
    /// Usage notes.
    #[serde(default)]
    pub context: String,
}

/// A database the code talks to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbInfo {
    /// Database name.
    pub name: String,
    /// Tables used.
    #[serde(default)]
    pub tables: Vec<DbTable>,
    /// Usage notes.
    #[serde(default)]
    pub context: String,
}

/// A single API endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiEndpoint {
    /// Endpoint name or path.
    pub name: String,
    /// What it does.
    #[serde(default)]
    pub description: String,
    /// Implementation notes.
    #[serde(default)]
    pub context: String,
}

/// A group of endpoints under one host or base path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiInfo {
    /// Host or base path.
    pub host: String,
    /// Group description.
    #[serde(default)]
    pub context: String,
    /// Endpoints in the group.
    #[serde(default)]
    pub endpoints: Vec<ApiEndpoint>,
}

/// AI-derived insights for one file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInsight {
    /// Path of the file the insight belongs to.
    pub path: String,
    /// Short description of the file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Environment variables explained.
    #[serde(default)]
    pub env_vars: Vec<EnvVarInfo>,
    /// Databases used.
    #[serde(default)]
    pub db: Vec<DbInfo>,
    /// APIs exposed or consumed.
    #[serde(default)]
    pub api: Vec<ApiInfo>,
}

impl FileInsight {
    /// Returns true if the insight carries nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.summary.is_none()
            && self.env_vars.is_empty()
            && self.db.is_empty()
            && self.api.is_empty()
    }
}

/// AI-derived insights for a whole repository.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichmentData {
    /// Repository-level summary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Model or tool that produced the insights.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub producer: Option<String>,
    /// Per-file insights.
    #[serde(default)]
    pub files: Vec<FileInsight>,
}

impl EnrichmentData {
    /// Looks up the insight for a file.
    #[must_use]
    pub fn file(&self, path: &str) -> Option<&FileInsight> {
        self.files.iter().find(|f| f.path == path)
    }
}

/// Output of the base-extraction stage, consumed by the merge stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseExtraction {
    /// Derived facts.
    pub base: BaseSummary,
    /// Insights produced alongside.
    pub enrichment: EnrichmentData,
    /// Document version the extraction was computed from.
    pub source_version: u64,
}
