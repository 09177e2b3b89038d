//! Item and consolidated run results.

use super::state::ChainState;
use crate::core::{
    DocumentId, FailureStage, ItemStatus, ProcessState, RepositoryReference, StageName,
};
use crate::errors::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

/// Terminal record for one repository reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemResult {
    /// Position of the reference in the input list.
    pub index: usize,
    /// The reference.
    pub reference: RepositoryReference,
    /// Final status.
    pub status: ItemStatus,
    /// Artifact location, on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_path: Option<PathBuf>,
    /// Failure class, on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_stage: Option<FailureStage>,
    /// Stage that failed or was about to start, on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<StageName>,
    /// Failure reason, prefixed with a stable code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Document created for this reference, if analysis got that far.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_id: Option<DocumentId>,
    /// Wall time spent on this reference.
    pub duration_ms: f64,
}

impl ItemResult {
    /// Builds the record from a terminal chain state.
    ///
    /// A non-terminal state is recorded as an internal failure.
    #[must_use]
    pub fn from_state(
        index: usize,
        reference: RepositoryReference,
        state: ChainState,
        duration_ms: f64,
    ) -> Self {
        let mut item = Self {
            index,
            reference,
            status: ItemStatus::Failed,
            artifact_path: None,
            failure_stage: None,
            stage: None,
            reason: None,
            document_id: state.document_id().cloned(),
            duration_ms,
        };

        match state {
            ChainState::Done { artifact_path, .. } => {
                item.status = ItemStatus::Succeeded;
                item.artifact_path = Some(artifact_path);
            }
            ChainState::Failed {
                failure_stage,
                stage,
                reason,
                ..
            } => {
                item.failure_stage = Some(failure_stage);
                item.stage = stage;
                item.reason = Some(reason);
            }
            other => {
                let stage = other.next_stage().unwrap_or(StageName::DocGen);
                item.failure_stage = Some(stage.failure_stage());
                item.stage = Some(stage);
                item.reason = Some(format!("internal_error: chain stopped in state {other}"));
            }
        }
        item
    }

    /// Returns true if the item succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == ItemStatus::Succeeded
    }
}

impl fmt::Display for ItemResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.artifact_path, self.failure_stage) {
            (Some(path), _) if self.is_success() => {
                write!(
                    f,
                    "[{}] ok     {} -> {}",
                    self.index + 1,
                    self.reference.url(),
                    path.display()
                )
            }
            (_, Some(failure_stage)) => write!(
                f,
                "[{}] FAILED {} ({failure_stage}): {}",
                self.index + 1,
                self.reference.url(),
                self.reason.as_deref().unwrap_or("")
            ),
            _ => write!(f, "[{}] {} {}", self.index + 1, self.status, self.reference.url()),
        }
    }
}

/// Ordered item results plus the derived process state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsolidatedResult {
    /// Run identifier.
    pub run_id: Uuid,
    /// One result per input reference, in input order.
    pub items: Vec<ItemResult>,
    /// Derived terminal state.
    pub state: ProcessState,
    /// Set when the run was rejected before any item started.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prerequisite_failure: Option<String>,
    /// Wall time of the run.
    pub duration_ms: f64,
}

impl ConsolidatedResult {
    /// Builds the result from collected items, ordering them by input position.
    #[must_use]
    pub fn from_items(run_id: Uuid, mut items: Vec<ItemResult>, duration_ms: f64) -> Self {
        items.sort_by_key(|item| item.index);
        let state = ProcessState::from_statuses(items.iter().map(|item| item.status));
        Self {
            run_id,
            items,
            state,
            prerequisite_failure: None,
            duration_ms,
        }
    }

    /// A run rejected by the prerequisite check: no items, state `Failed`.
    #[must_use]
    pub fn prerequisite_unmet(run_id: Uuid, reason: impl Into<String>) -> Self {
        Self {
            run_id,
            items: Vec::new(),
            state: ProcessState::Failed,
            prerequisite_failure: Some(format!(
                "{}: {}",
                FailureStage::PrerequisiteUnmet,
                reason.into()
            )),
            duration_ms: 0.0,
        }
    }

    /// Number of succeeded items.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.items.iter().filter(|item| item.is_success()).count()
    }

    /// Number of failed items.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.items.len() - self.succeeded()
    }

    /// Failed item counts per failure class.
    #[must_use]
    pub fn failures_by_stage(&self) -> BTreeMap<FailureStage, usize> {
        let mut counts = BTreeMap::new();
        for stage in self.items.iter().filter_map(|item| item.failure_stage) {
            *counts.entry(stage).or_insert(0) += 1;
        }
        counts
    }

    /// Returns true if the run was rejected before any item started.
    #[must_use]
    pub fn is_rejected(&self) -> bool {
        self.prerequisite_failure.is_some()
    }

    /// Serializes the result as pretty-printed JSON.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl fmt::Display for ConsolidatedResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(reason) = &self.prerequisite_failure {
            return write!(f, "Run rejected: {reason}\nProcess state: {}", self.state);
        }
        for item in &self.items {
            writeln!(f, "{item}")?;
        }
        write!(
            f,
            "Process state: {} ({} succeeded, {} failed, {:.1}s)",
            self.state,
            self.succeeded(),
            self.failed(),
            self.duration_ms / 1000.0
        )
    }
}
