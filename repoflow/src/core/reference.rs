//! Repository references.

use crate::errors::ReferenceError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// Whether a repository needs a code-host credential to be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Readable anonymously.
    #[default]
    Public,
    /// Requires a code-host access token.
    Private,
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Public => write!(f, "public"),
            Self::Private => write!(f, "private"),
        }
    }
}

// https://<host>[:port]/<owner>/<repo>[.git][/]
static REPOSITORY_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https://[A-Za-z0-9.-]+(?::\d+)?/[\w.-]+/[\w.-]+?(?:\.git)?/?$")
        .expect("repository URL pattern compiles")
});

/// A repository URL plus its visibility. Immutable once accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepositoryReference {
    url: String,
    visibility: Visibility,
}

impl RepositoryReference {
    /// Accepts a reference after validating the URL shape.
    pub fn new(url: impl AsRef<str>, visibility: Visibility) -> Result<Self, ReferenceError> {
        let url = url.as_ref().trim();
        if url.is_empty() {
            return Err(ReferenceError::Empty);
        }
        if !REPOSITORY_URL.is_match(url) {
            return Err(ReferenceError::Malformed { url: url.to_string() });
        }
        Ok(Self {
            url: url.trim_end_matches('/').to_string(),
            visibility,
        })
    }

    /// Accepts a public reference.
    pub fn public(url: impl AsRef<str>) -> Result<Self, ReferenceError> {
        Self::new(url, Visibility::Public)
    }

    /// Accepts a private reference.
    pub fn private(url: impl AsRef<str>) -> Result<Self, ReferenceError> {
        Self::new(url, Visibility::Private)
    }

    /// Returns the repository URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the visibility flag.
    #[must_use]
    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    /// Returns true if the repository needs a credential.
    #[must_use]
    pub fn is_private(&self) -> bool {
        self.visibility == Visibility::Private
    }

    /// Returns a copy of this reference marked private.
    #[must_use]
    pub fn into_private(self) -> Self {
        Self {
            visibility: Visibility::Private,
            ..self
        }
    }

    /// Last path segment without a trailing `.git`.
    #[must_use]
    pub fn repository_name(&self) -> String {
        let last = self.url.rsplit('/').next().unwrap_or_default();
        last.strip_suffix(".git").unwrap_or(last).to_string()
    }

    /// `owner/name` part of the URL.
    #[must_use]
    pub fn slug(&self) -> String {
        let mut parts = self.url.rsplit('/');
        let name = parts.next().unwrap_or_default();
        let owner = parts.next().unwrap_or_default();
        format!("{owner}/{}", name.strip_suffix(".git").unwrap_or(name))
    }
}

impl fmt::Display for RepositoryReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.url, self.visibility)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_repository_urls() {
        for url in [
            "https://github.com/acme/widgets",
            "https://github.com/acme/widgets.git",
            "https://gitlab.example.org/team-a/service.api/",
            "https://git.internal:8443/ops/tools",
        ] {
            assert!(RepositoryReference::public(url).is_ok(), "{url}");
        }
    }

    #[test]
    fn test_rejects_malformed_urls() {
        assert_eq!(RepositoryReference::public("   "), Err(ReferenceError::Empty));

        for url in [
            "http://github.com/acme/widgets",
            "https://github.com/acme",
            "github.com/acme/widgets",
            "https://github.com/acme/widgets/tree/main",
        ] {
            assert!(
                matches!(RepositoryReference::public(url), Err(ReferenceError::Malformed { .. })),
                "{url}"
            );
        }
    }

    #[test]
    fn test_repository_name_and_slug() {
        let reference =
            RepositoryReference::private("https://github.com/acme/widgets.git").unwrap();
        assert_eq!(reference.repository_name(), "widgets");
        assert_eq!(reference.slug(), "acme/widgets");
        assert!(reference.is_private());
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let reference = RepositoryReference::public("https://github.com/acme/widgets/").unwrap();
        assert_eq!(reference.url(), "https://github.com/acme/widgets");
        assert_eq!(reference.repository_name(), "widgets");
    }

    #[test]
    fn test_into_private() {
        let reference = RepositoryReference::public("https://github.com/acme/widgets").unwrap();
        assert_eq!(reference.clone().into_private().visibility(), Visibility::Private);
        assert_eq!(reference.visibility(), Visibility::Public);
    }
}
