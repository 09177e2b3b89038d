//! Stage names, failure classes and run states.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the four stages every repository reference goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageName {
    /// Clones/extracts the repository and creates its document.
    Analysis,
    /// Derives the baseline summary and enrichment data from the document.
    BaseExtraction,
    /// Writes the base and enrichment layers back into the store.
    Merge,
    /// Renders the enriched document to a documentation artifact.
    DocGen,
}

impl StageName {
    /// All stages in execution order.
    pub const ALL: [Self; 4] = [Self::Analysis, Self::BaseExtraction, Self::Merge, Self::DocGen];

    /// Returns the failure class recorded when this stage fails.
    #[must_use]
    pub fn failure_stage(self) -> FailureStage {
        match self {
            Self::Analysis => FailureStage::AnalysisFailed,
            Self::BaseExtraction => FailureStage::BaseExtractionFailed,
            Self::Merge => FailureStage::MergeFailed,
            Self::DocGen => FailureStage::DocGenFailed,
        }
    }

    /// Returns the stable snake_case name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Analysis => "analysis",
            Self::BaseExtraction => "base_extraction",
            Self::Merge => "merge",
            Self::DocGen => "doc_gen",
        }
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification of a failed item (or of a rejected run).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    /// Process-level: the run was rejected before any item started.
    PrerequisiteUnmet,
    /// The analysis stage reported a failure.
    AnalysisFailed,
    /// Analysis succeeded but returned an unusable document id.
    InvalidDocumentId,
    /// The base-extraction stage reported a failure.
    BaseExtractionFailed,
    /// The merge stage reported a failure.
    MergeFailed,
    /// The documentation-generation stage reported a failure.
    DocGenFailed,
    /// The run was cancelled before this item reached `DONE`.
    Cancelled,
}

impl FailureStage {
    /// Returns the stable snake_case name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PrerequisiteUnmet => "prerequisite_unmet",
            Self::AnalysisFailed => "analysis_failed",
            Self::InvalidDocumentId => "invalid_document_id",
            Self::BaseExtractionFailed => "base_extraction_failed",
            Self::MergeFailed => "merge_failed",
            Self::DocGenFailed => "doc_gen_failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal status of one repository reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    /// All four stages succeeded.
    Succeeded,
    /// The chain stopped at some stage.
    Failed,
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Terminal state of a whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProcessState {
    /// At least one item succeeded.
    Completed,
    /// No item succeeded, or the run was rejected.
    Failed,
}

impl ProcessState {
    /// Best-effort batch policy: one success is enough.
    #[must_use]
    pub fn from_statuses<I>(statuses: I) -> Self
    where
        I: IntoIterator<Item = ItemStatus>,
    {
        if statuses.into_iter().any(|s| s == ItemStatus::Succeeded) {
            Self::Completed
        } else {
            Self::Failed
        }
    }

    /// Returns true for `Completed`.
    #[must_use]
    pub fn is_completed(self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => write!(f, "Completed"),
            Self::Failed => write!(f, "Failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_failure_mapping() {
        assert_eq!(StageName::Analysis.failure_stage(), FailureStage::AnalysisFailed);
        assert_eq!(StageName::BaseExtraction.failure_stage(), FailureStage::BaseExtractionFailed);
        assert_eq!(StageName::Merge.failure_stage(), FailureStage::MergeFailed);
        assert_eq!(StageName::DocGen.failure_stage(), FailureStage::DocGenFailed);
    }

    #[test]
    fn test_failure_stage_serialize() {
        let json = serde_json::to_string(&FailureStage::InvalidDocumentId).unwrap();
        assert_eq!(json, r#""invalid_document_id""#);

        let back: FailureStage = serde_json::from_str(r#""doc_gen_failed""#).unwrap();
        assert_eq!(back, FailureStage::DocGenFailed);
    }

    #[test]
    fn test_display_matches_serde() {
        for stage in StageName::ALL {
            let json = serde_json::to_string(&stage).unwrap();
            assert_eq!(json, format!("\"{stage}\""));
        }
    }

    #[test]
    fn test_process_state_best_effort() {
        use ItemStatus::{Failed, Succeeded};

        assert_eq!(
            ProcessState::from_statuses([Failed, Succeeded, Failed]),
            ProcessState::Completed
        );
        assert_eq!(ProcessState::from_statuses([Failed, Failed]), ProcessState::Failed);
        assert_eq!(ProcessState::from_statuses([]), ProcessState::Failed);
    }
}
