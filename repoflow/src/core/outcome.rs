//! Stage outcome types.

use super::{RepositoryReference, StageName};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable classification of why a stage failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCause {
    /// A remote call timed out.
    Timeout,
    /// A remote call answered with an error.
    RemoteError,
    /// A remote call answered with unusable data.
    MalformedResponse,
    /// The store could not be reached.
    StoreUnavailable,
    /// The document does not exist.
    NotFound,
    /// A concurrent writer won.
    Conflict,
    /// Local IO failed.
    IoError,
    /// The stage input was unusable.
    InvalidInput,
    /// The stage was aborted by cancellation.
    Cancelled,
    /// The stage implementation panicked.
    Internal,
}

impl FailureCause {
    /// Returns the stable code used as reason prefix.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::RemoteError => "remote_error",
            Self::MalformedResponse => "malformed_response",
            Self::StoreUnavailable => "store_unavailable",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::IoError => "io_error",
            Self::InvalidInput => "invalid_input",
            Self::Cancelled => "cancelled",
            Self::Internal => "internal_error",
        }
    }
}

impl fmt::Display for FailureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A classified stage failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageFailure {
    /// Failure class.
    pub cause: FailureCause,
    /// Human-readable detail.
    pub message: String,
}

impl StageFailure {
    /// Creates a new stage failure.
    #[must_use]
    pub fn new(cause: FailureCause, message: impl Into<String>) -> Self {
        Self {
            cause,
            message: message.into(),
        }
    }

    /// Returns the reason string, always prefixed with the cause code.
    #[must_use]
    pub fn reason(&self) -> String {
        format!("{}: {}", self.cause.code(), self.message)
    }
}

impl fmt::Display for StageFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.cause.code(), self.message)
    }
}

impl From<crate::errors::CollaboratorError> for StageFailure {
    fn from(err: crate::errors::CollaboratorError) -> Self {
        Self::new(err.cause(), err.to_string())
    }
}

impl From<crate::errors::StoreError> for StageFailure {
    fn from(err: crate::errors::StoreError) -> Self {
        Self::new(err.cause(), err.to_string())
    }
}

/// The outcome of one stage invocation for one reference.
#[derive(Debug, Clone)]
pub struct StageOutcome<T> {
    /// The stage that produced this outcome.
    pub stage: StageName,
    /// The reference the stage ran for.
    pub reference: RepositoryReference,
    /// Payload or classified failure.
    pub result: Result<T, StageFailure>,
}

impl<T> StageOutcome<T> {
    /// Creates a successful outcome.
    #[must_use]
    pub fn success(stage: StageName, reference: &RepositoryReference, payload: T) -> Self {
        Self {
            stage,
            reference: reference.clone(),
            result: Ok(payload),
        }
    }

    /// Creates a failed outcome.
    #[must_use]
    pub fn failure(
        stage: StageName,
        reference: &RepositoryReference,
        failure: StageFailure,
    ) -> Self {
        Self {
            stage,
            reference: reference.clone(),
            result: Err(failure),
        }
    }

    /// Builds an outcome from a fallible collaborator result.
    pub fn from_result<E>(
        stage: StageName,
        reference: &RepositoryReference,
        result: Result<T, E>,
    ) -> Self
    where
        E: Into<StageFailure>,
    {
        Self {
            stage,
            reference: reference.clone(),
            result: result.map_err(Into::into),
        }
    }

    /// Returns true if the stage succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// Returns the failure, if any.
    #[must_use]
    pub fn failure_ref(&self) -> Option<&StageFailure> {
        self.result.as_ref().err()
    }

    /// Consumes the outcome and returns the payload or failure.
    pub fn into_result(self) -> Result<T, StageFailure> {
        self.result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{CollaboratorError, StoreError};

    fn reference() -> RepositoryReference {
        RepositoryReference::public("https://github.com/acme/widgets").unwrap()
    }

    #[test]
    fn test_reason_is_prefixed_with_code() {
        let failure = StageFailure::new(FailureCause::Timeout, "clone took too long");
        assert_eq!(failure.reason(), "timeout: clone took too long");
        assert_eq!(failure.to_string(), failure.reason());
    }

    #[test]
    fn test_from_collaborator_error() {
        let failure = StageFailure::from(CollaboratorError::Remote("502".to_string()));
        assert_eq!(failure.cause, FailureCause::RemoteError);
        assert!(failure.reason().starts_with("remote_error: "));
    }

    #[test]
    fn test_outcome_from_result() {
        let ok: StageOutcome<u32> =
            StageOutcome::from_result::<StoreError>(StageName::Merge, &reference(), Ok(7));
        assert!(ok.is_success());
        assert_eq!(ok.into_result().unwrap(), 7);

        let err: StageOutcome<u32> = StageOutcome::from_result(
            StageName::Merge,
            &reference(),
            Err(StoreError::Unavailable("offline".to_string())),
        );
        assert!(!err.is_success());
        assert_eq!(err.failure_ref().unwrap().cause, FailureCause::StoreUnavailable);
        assert_eq!(err.stage, StageName::Merge);
        assert_eq!(err.reference.url(), "https://github.com/acme/widgets");
    }
}
