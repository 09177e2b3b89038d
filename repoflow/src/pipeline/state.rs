//! Per-reference chain state machine.
//!
//! `START -> ANALYZED -> BASE_EXTRACTED -> MERGED -> DOCUMENTED -> DONE`,
//! with an absorbing `FAILED` reachable from every non-terminal state.
//! [`ChainState::advance`] is a pure function of the current state and one
//! event; the controller only decides which stage to invoke next.

use crate::core::{
    BaseExtraction, DocumentId, FailureCause, FailureStage, StageFailure, StageName, StageOutcome,
};
use crate::stages::{AnalysisOutput, MergeConfirmation};
use std::fmt;
use std::path::PathBuf;

/// State of one reference's chain.
#[derive(Debug, Clone, PartialEq)]
pub enum ChainState {
    /// Nothing has run yet.
    Start,
    /// A document exists under a validated id.
    Analyzed {
        /// The validated id.
        document_id: DocumentId,
    },
    /// Base and enrichment layers are derived but not yet persisted.
    BaseExtracted {
        /// Document id.
        document_id: DocumentId,
        /// Layers to merge.
        extraction: BaseExtraction,
    },
    /// Layers are persisted.
    Merged {
        /// Document id.
        document_id: DocumentId,
        /// Merge confirmation.
        confirmation: MergeConfirmation,
    },
    /// The artifact is written but not yet recorded.
    Documented {
        /// Document id.
        document_id: DocumentId,
        /// Artifact location.
        artifact_path: PathBuf,
    },
    /// Success recorded.
    Done {
        /// Document id.
        document_id: DocumentId,
        /// Artifact location.
        artifact_path: PathBuf,
    },
    /// Absorbing failure state.
    Failed {
        /// Failure class.
        failure_stage: FailureStage,
        /// The stage that failed, or that was about to start.
        stage: Option<StageName>,
        /// Reason, prefixed with a stable code.
        reason: String,
        /// Document id, if analysis got that far.
        document_id: Option<DocumentId>,
    },
}

/// One input to [`ChainState::advance`].
#[derive(Debug, Clone)]
pub enum ChainEvent {
    /// Analysis finished.
    Analysis(StageOutcome<AnalysisOutput>),
    /// Base extraction finished.
    BaseExtraction(StageOutcome<BaseExtraction>),
    /// Merge finished.
    Merge(StageOutcome<MergeConfirmation>),
    /// Documentation generation finished.
    DocGen(StageOutcome<PathBuf>),
    /// The documented item was recorded.
    Recorded,
    /// Cancellation was observed at a stage boundary.
    Cancelled {
        /// Cancellation reason.
        reason: String,
    },
}

impl ChainEvent {
    /// The stage failure carried by the event, if any.
    #[must_use]
    pub fn stage_failure(&self) -> Option<&StageFailure> {
        match self {
            Self::Analysis(outcome) => outcome.failure_ref(),
            Self::BaseExtraction(outcome) => outcome.failure_ref(),
            Self::Merge(outcome) => outcome.failure_ref(),
            Self::DocGen(outcome) => outcome.failure_ref(),
            Self::Recorded | Self::Cancelled { .. } => None,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Analysis(_) => "analysis",
            Self::BaseExtraction(_) => "base_extraction",
            Self::Merge(_) => "merge",
            Self::DocGen(_) => "doc_gen",
            Self::Recorded => "recorded",
            Self::Cancelled { .. } => "cancelled",
        }
    }
}

impl ChainState {
    /// The stage to invoke next, if any.
    #[must_use]
    pub fn next_stage(&self) -> Option<StageName> {
        match self {
            Self::Start => Some(StageName::Analysis),
            Self::Analyzed { .. } => Some(StageName::BaseExtraction),
            Self::BaseExtracted { .. } => Some(StageName::Merge),
            Self::Merged { .. } => Some(StageName::DocGen),
            Self::Documented { .. } | Self::Done { .. } | Self::Failed { .. } => None,
        }
    }

    /// Returns true for `DONE` and `FAILED`.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done { .. } | Self::Failed { .. })
    }

    /// Document id carried by the state, if any.
    #[must_use]
    pub fn document_id(&self) -> Option<&DocumentId> {
        match self {
            Self::Start => None,
            Self::Analyzed { document_id }
            | Self::BaseExtracted { document_id, .. }
            | Self::Merged { document_id, .. }
            | Self::Documented { document_id, .. }
            | Self::Done { document_id, .. } => Some(document_id),
            Self::Failed { document_id, .. } => document_id.as_ref(),
        }
    }

    /// Stable state label.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Start => "START",
            Self::Analyzed { .. } => "ANALYZED",
            Self::BaseExtracted { .. } => "BASE_EXTRACTED",
            Self::Merged { .. } => "MERGED",
            Self::Documented { .. } => "DOCUMENTED",
            Self::Done { .. } => "DONE",
            Self::Failed { .. } => "FAILED",
        }
    }

    /// Applies one event.
    #[must_use]
    pub fn advance(self, event: ChainEvent) -> Self {
        if let Self::Done { .. } | Self::Failed { .. } = self {
            return self;
        }
        if let ChainEvent::Cancelled { reason } = event {
            return Self::Failed {
                failure_stage: FailureStage::Cancelled,
                stage: self.next_stage(),
                reason: format!("{}: {reason}", FailureCause::Cancelled.code()),
                document_id: self.document_id().cloned(),
            };
        }

        match (self, event) {
            (Self::Start, ChainEvent::Analysis(outcome)) => match outcome.into_result() {
                Ok(output) => match DocumentId::parse(output.document_id) {
                    Ok(document_id) => Self::Analyzed { document_id },
                    Err(invalid) => Self::Failed {
                        failure_stage: FailureStage::InvalidDocumentId,
                        stage: Some(StageName::Analysis),
                        reason: format!("{}: {invalid}", FailureStage::InvalidDocumentId),
                        document_id: None,
                    },
                },
                Err(failure) => failed(StageName::Analysis, &failure, None),
            },
            (Self::Analyzed { document_id }, ChainEvent::BaseExtraction(outcome)) => {
                match outcome.into_result() {
                    Ok(extraction) => Self::BaseExtracted {
                        document_id,
                        extraction,
                    },
                    Err(failure) => failed(StageName::BaseExtraction, &failure, Some(document_id)),
                }
            }
            (Self::BaseExtracted { document_id, .. }, ChainEvent::Merge(outcome)) => {
                match outcome.into_result() {
                    Ok(confirmation) => Self::Merged {
                        document_id,
                        confirmation,
                    },
                    Err(failure) => failed(StageName::Merge, &failure, Some(document_id)),
                }
            }
            (Self::Merged { document_id, .. }, ChainEvent::DocGen(outcome)) => {
                match outcome.into_result() {
                    Ok(path) if path.as_os_str().is_empty() => failed(
                        StageName::DocGen,
                        &StageFailure::new(
                            FailureCause::MalformedResponse,
                            "stage reported an empty artifact path",
                        ),
                        Some(document_id),
                    ),
                    Ok(artifact_path) => Self::Documented {
                        document_id,
                        artifact_path,
                    },
                    Err(failure) => failed(StageName::DocGen, &failure, Some(document_id)),
                }
            }
            (
                Self::Documented {
                    document_id,
                    artifact_path,
                },
                ChainEvent::Recorded,
            ) => Self::Done {
                document_id,
                artifact_path,
            },
            (state, event) => {
                let failure = StageFailure::new(
                    FailureCause::Internal,
                    format!("unexpected {} event in state {}", event.name(), state.label()),
                );
                Self::Failed {
                    failure_stage: state
                        .next_stage()
                        .map_or(FailureStage::DocGenFailed, StageName::failure_stage),
                    stage: state.next_stage(),
                    reason: failure.reason(),
                    document_id: state.document_id().cloned(),
                }
            }
        }
    }
}

fn failed(stage: StageName, failure: &StageFailure, document_id: Option<DocumentId>) -> ChainState {
    ChainState::Failed {
        failure_stage: stage.failure_stage(),
        stage: Some(stage),
        reason: failure.reason(),
        document_id,
    }
}

impl fmt::Display for ChainState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed { failure_stage, .. } => write!(f, "FAILED({failure_stage})"),
            other => f.write_str(other.label()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{BaseSummary, EnrichmentData, RepositoryReference};
    use pretty_assertions::assert_eq;

    fn reference() -> RepositoryReference {
        RepositoryReference::public("https://github.com/acme/widgets").unwrap()
    }

    fn id() -> DocumentId {
        DocumentId::parse("doc-1").unwrap()
    }

    fn extraction() -> BaseExtraction {
        BaseExtraction {
            base: BaseSummary::default(),
            enrichment: EnrichmentData::default(),
            source_version: 1,
        }
    }

    fn confirmation() -> MergeConfirmation {
        MergeConfirmation {
            document_id: id(),
            version: 2,
            merged_insights: 0,
            dropped_insights: 0,
        }
    }

    fn analysis_ok(raw_id: &str) -> ChainEvent {
        ChainEvent::Analysis(StageOutcome::success(
            StageName::Analysis,
            &reference(),
            AnalysisOutput::new(raw_id),
        ))
    }

    fn failure<T>(stage: StageName) -> StageOutcome<T> {
        StageOutcome::failure(
            stage,
            &reference(),
            StageFailure::new(FailureCause::RemoteError, "HTTP 502"),
        )
    }

    #[test]
    fn test_happy_path() {
        let r = reference();
        let state = ChainState::Start
            .advance(analysis_ok("doc-1"))
            .advance(ChainEvent::BaseExtraction(StageOutcome::success(
                StageName::BaseExtraction,
                &r,
                extraction(),
            )))
            .advance(ChainEvent::Merge(StageOutcome::success(StageName::Merge, &r, confirmation())))
            .advance(ChainEvent::DocGen(StageOutcome::success(
                StageName::DocGen,
                &r,
                PathBuf::from("reports/WIDGETS.md"),
            )));
        assert_eq!(state.label(), "DOCUMENTED");
        assert_eq!(state.next_stage(), None);

        let state = state.advance(ChainEvent::Recorded);
        assert_eq!(
            state,
            ChainState::Done {
                document_id: id(),
                artifact_path: PathBuf::from("reports/WIDGETS.md"),
            }
        );
        assert!(state.is_terminal());
    }

    #[test]
    fn test_invalid_document_id_is_its_own_class() {
        let too_long = "x".repeat(200);
        for raw in ["", "   ", "has space", too_long.as_str()] {
            let state = ChainState::Start.advance(analysis_ok(raw));
            match state {
                ChainState::Failed {
                    failure_stage,
                    stage,
                    reason,
                    document_id,
                } => {
                    assert_eq!(failure_stage, FailureStage::InvalidDocumentId);
                    assert_eq!(stage, Some(StageName::Analysis));
                    assert!(reason.starts_with("invalid_document_id: "), "{reason}");
                    assert!(document_id.is_none());
                }
                other => panic!("expected FAILED, got {other}"),
            }
        }
    }

    #[test]
    fn test_stage_failures_map_to_their_class() {
        let failed = ChainState::Start.advance(ChainEvent::Analysis(failure(StageName::Analysis)));
        assert_eq!(failed.to_string(), "FAILED(analysis_failed)");

        let failed = ChainState::Analyzed { document_id: id() }
            .advance(ChainEvent::BaseExtraction(failure(StageName::BaseExtraction)));
        assert_eq!(failed.to_string(), "FAILED(base_extraction_failed)");
        assert_eq!(failed.document_id(), Some(&id()));

        let failed = ChainState::BaseExtracted {
            document_id: id(),
            extraction: extraction(),
        }
        .advance(ChainEvent::Merge(failure(StageName::Merge)));
        assert_eq!(failed.to_string(), "FAILED(merge_failed)");

        let failed = ChainState::Merged {
            document_id: id(),
            confirmation: confirmation(),
        }
        .advance(ChainEvent::DocGen(failure(StageName::DocGen)));
        assert_eq!(failed.to_string(), "FAILED(doc_gen_failed)");
        if let ChainState::Failed { reason, .. } = failed {
            assert_eq!(reason, "remote_error: HTTP 502");
        }
    }

    #[test]
    fn test_empty_artifact_path_fails_doc_gen() {
        let state = ChainState::Merged {
            document_id: id(),
            confirmation: confirmation(),
        }
        .advance(ChainEvent::DocGen(StageOutcome::success(
            StageName::DocGen,
            &reference(),
            PathBuf::new(),
        )));
        assert_eq!(state.to_string(), "FAILED(doc_gen_failed)");
    }

    #[test]
    fn test_cancellation_records_pending_stage() {
        let state = ChainState::Analyzed { document_id: id() }.advance(ChainEvent::Cancelled {
            reason: "Ctrl-C".to_string(),
        });
        assert_eq!(
            state,
            ChainState::Failed {
                failure_stage: FailureStage::Cancelled,
                stage: Some(StageName::BaseExtraction),
                reason: "cancelled: Ctrl-C".to_string(),
                document_id: Some(id()),
            }
        );
    }

    #[test]
    fn test_terminal_states_absorb_events() {
        let failed = ChainState::Start.advance(ChainEvent::Analysis(failure(StageName::Analysis)));
        let again = failed.clone().advance(analysis_ok("doc-2"));
        assert_eq!(again, failed);
    }

    #[test]
    fn test_out_of_order_event_is_internal_failure() {
        let state = ChainState::Start.advance(ChainEvent::Recorded);
        match state {
            ChainState::Failed { reason, stage, .. } => {
                assert!(reason.starts_with("internal_error: "));
                assert_eq!(stage, Some(StageName::Analysis));
            }
            other => panic!("expected FAILED, got {other}"),
        }
    }
}
