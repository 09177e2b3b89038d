//! Loading repository references from literal lists and URL files.

use crate::core::{RepositoryReference, Visibility};
use crate::errors::ReferenceError;
use std::path::Path;
use tracing::warn;

/// An input entry that was not accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedReference {
    /// Where the entry came from (`"--urls"` or the file path).
    pub origin: String,
    /// 1-based line number for file entries.
    pub line: Option<usize>,
    /// The raw entry.
    pub input: String,
    /// Why it was rejected.
    pub error: ReferenceError,
}

/// Accepted references in input order plus everything that was rejected.
#[derive(Debug, Clone, Default)]
pub struct ReferenceList {
    accepted: Vec<RepositoryReference>,
    rejected: Vec<RejectedReference>,
}

impl ReferenceList {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds literal URLs.
    pub fn extend_urls<I, S>(&mut self, urls: I, visibility: Visibility)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for url in urls {
            let url = url.as_ref();
            match RepositoryReference::new(url, visibility) {
                Ok(reference) => self.accepted.push(reference),
                Err(error) => self.reject("--urls", None, url, error),
            }
        }
    }

    /// Adds newline-separated URLs from text.
    ///
    /// Lines are trimmed and trailing commas removed; blank lines and
    /// lines starting with `#` are skipped.
    pub fn extend_from_text(&mut self, origin: &str, text: &str, visibility: Visibility) {
        for (index, line) in text.lines().enumerate() {
            let entry = line.trim().trim_end_matches(',').trim();
            if entry.is_empty() || entry.starts_with('#') {
                continue;
            }
            match RepositoryReference::new(entry, visibility) {
                Ok(reference) => self.accepted.push(reference),
                Err(error) => self.reject(origin, Some(index + 1), entry, error),
            }
        }
    }

    /// Adds URLs read from a file.
    pub fn extend_from_file(
        &mut self,
        path: impl AsRef<Path>,
        visibility: Visibility,
    ) -> Result<(), ReferenceError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ReferenceError::Unreadable {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        self.extend_from_text(&path.display().to_string(), &text, visibility);
        Ok(())
    }

    fn reject(&mut self, origin: &str, line: Option<usize>, input: &str, error: ReferenceError) {
        warn!(origin, line, input, %error, "Skipping repository reference");
        self.rejected.push(RejectedReference {
            origin: origin.to_string(),
            line,
            input: input.to_string(),
            error,
        });
    }

    /// Accepted references in input order.
    #[must_use]
    pub fn accepted(&self) -> &[RepositoryReference] {
        &self.accepted
    }

    /// Rejected entries in input order.
    #[must_use]
    pub fn rejected(&self) -> &[RejectedReference] {
        &self.rejected
    }

    /// Consumes the list and returns the accepted references.
    #[must_use]
    pub fn into_references(self) -> Vec<RepositoryReference> {
        self.accepted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_literal_urls_keep_order_and_duplicates() {
        let mut list = ReferenceList::new();
        list.extend_urls(
            [
                "https://github.com/acme/b",
                "https://github.com/acme/a",
                "https://github.com/acme/b",
            ],
            Visibility::Public,
        );

        let urls: Vec<&str> = list.accepted().iter().map(RepositoryReference::url).collect();
        assert_eq!(urls, vec![
            "https://github.com/acme/b",
            "https://github.com/acme/a",
            "https://github.com/acme/b",
        ]);
        assert!(list.rejected().is_empty());
    }

    #[test]
    fn test_text_parsing_rules() {
        let text = "\
# repositories to document
https://github.com/acme/one,

  https://github.com/acme/two.git
not-a-url
";
        let mut list = ReferenceList::new();
        list.extend_from_text("repos.txt", text, Visibility::Private);

        assert_eq!(list.accepted().len(), 2);
        assert!(list.accepted().iter().all(RepositoryReference::is_private));
        assert_eq!(list.rejected().len(), 1);

        let rejected = &list.rejected()[0];
        assert_eq!(rejected.line, Some(5));
        assert_eq!(rejected.input, "not-a-url");
        assert_eq!(rejected.origin, "repos.txt");
    }

    #[test]
    fn test_extend_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "https://github.com/acme/one").unwrap();
        writeln!(file, "https://github.com/acme/two").unwrap();

        let mut list = ReferenceList::new();
        list.extend_from_file(file.path(), Visibility::Public).unwrap();
        assert_eq!(list.into_references().len(), 2);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let mut list = ReferenceList::new();
        let err = list
            .extend_from_file("/definitely/not/here.txt", Visibility::Public)
            .unwrap_err();
        assert!(matches!(err, ReferenceError::Unreadable { .. }));
    }
}
