//! Process-level gate checked before any stage runs.

use crate::config::PipelineConfig;
use crate::core::RepositoryReference;
use serde::{Deserialize, Serialize};

/// Result of a prerequisite check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrerequisiteReport {
    /// Whether the run may start.
    pub can_run: bool,
    /// Why it may not, when `can_run` is false.
    pub reason: Option<String>,
}

impl PrerequisiteReport {
    /// A passing report.
    #[must_use]
    pub fn ok() -> Self {
        Self {
            can_run: true,
            reason: None,
        }
    }

    /// A failing report.
    #[must_use]
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            can_run: false,
            reason: Some(reason.into()),
        }
    }
}

/// Validates the run input against an explicit configuration value.
///
/// The checker never reads process state, so the same references and the
/// same configuration always give the same report.
#[derive(Debug, Clone)]
pub struct PrerequisiteChecker {
    config: PipelineConfig,
}

impl PrerequisiteChecker {
    /// Creates a checker for a configuration.
    #[must_use]
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Checks whether a run over `references` may start.
    #[must_use]
    pub fn check(&self, references: &[RepositoryReference]) -> PrerequisiteReport {
        if references.is_empty() {
            return PrerequisiteReport::rejected("no repository references were provided");
        }

        let private = references.iter().filter(|r| r.is_private()).count();
        if private > 0 && !self.config.credentials.has_code_host_token() {
            return PrerequisiteReport::rejected(format!(
                "{private} private repository reference(s) need a code-host token (GITHUB_TOKEN)"
            ));
        }

        if self.config.require_ai_credentials && !self.config.credentials.has_ai_api_key() {
            return PrerequisiteReport::rejected(
                "AI credentials are required but no API key is configured (OPENROUTER_API_KEY)",
            );
        }

        PrerequisiteReport::ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn public() -> RepositoryReference {
        RepositoryReference::public("https://github.com/acme/widgets").unwrap()
    }

    fn private() -> RepositoryReference {
        RepositoryReference::private("https://github.com/acme/vault").unwrap()
    }

    #[test]
    fn test_empty_list_is_rejected() {
        let report = PrerequisiteChecker::new(PipelineConfig::new()).check(&[]);
        assert!(!report.can_run);
        assert!(report.reason.unwrap().contains("no repository references"));
    }

    #[test]
    fn test_public_list_passes_without_credentials() {
        let report = PrerequisiteChecker::new(PipelineConfig::new()).check(&[public()]);
        assert_eq!(report, PrerequisiteReport::ok());
    }

    #[test]
    fn test_private_needs_token() {
        let checker = PrerequisiteChecker::new(PipelineConfig::new());
        let report = checker.check(&[public(), private()]);
        assert!(!report.can_run);
        assert!(report.reason.unwrap().starts_with("1 private"));

        let checker = PrerequisiteChecker::new(PipelineConfig::new().with_code_host_token("ghp_x"));
        assert!(checker.check(&[private()]).can_run);
    }

    #[test]
    fn test_required_ai_key() {
        let config = PipelineConfig::new().with_required_ai_credentials(true);
        let report = PrerequisiteChecker::new(config.clone()).check(&[public()]);
        assert!(!report.can_run);

        let report = PrerequisiteChecker::new(config.with_ai_api_key("sk-x")).check(&[public()]);
        assert!(report.can_run);
    }

    #[test]
    fn test_check_is_repeatable() {
        let checker = PrerequisiteChecker::new(PipelineConfig::new());
        let references = [private()];
        assert_eq!(checker.check(&references), checker.check(&references));
    }
}
