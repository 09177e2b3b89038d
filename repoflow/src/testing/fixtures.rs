//! Sample data and collaborator fakes.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::fmt;

use crate::core::{RawLayer, RepoFile, RepositoryReference, Visibility};
use crate::errors::CollaboratorError;
use crate::stages::RepositoryAnalyzer;

/// A small public repository with a Rust entry point and a README.
#[must_use]
pub fn sample_raw_layer(name: &str) -> RawLayer {
    RawLayer {
        repository_url: format!("https://github.com/acme/{name}"),
        repository_name: name.to_string(),
        visibility: Visibility::Public,
        directory_structure: format!(
            "{name}/\n    Cargo.toml\n    README.md\n    src/\n        main.rs\n"
        ),
        files: vec![
            RepoFile::new(
                "Cargo.toml",
                format!("[package]\nname = \"{name}\"\nversion = \"0.1.0\"\n"),
            ),
            RepoFile::new("README.md", format!("# {name}\n\nServes widgets over HTTP.\n")),
            RepoFile::new(
                "src/main.rs",
                concat!(
                    "fn main() {\n",
                    "    let url = std::env::var(\"DATABASE_URL\").unwrap();\n",
                    "    println!(\"{url}\");\n",
                    "}\n",
                ),
            ),
        ],
        analyzed_at: Utc::now(),
    }
}

type ErrorFactory = Box<dyn Fn() -> CollaboratorError + Send + Sync>;

/// Analyzer returning a fixed layer, relabelled for each reference.
pub struct StaticAnalyzer {
    layer: Option<RawLayer>,
    error: Option<ErrorFactory>,
    calls: Mutex<Vec<String>>,
}

impl StaticAnalyzer {
    /// Answers every reference with `layer`.
    #[must_use]
    pub fn new(layer: RawLayer) -> Self {
        Self {
            layer: Some(layer),
            error: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Fails every reference with the error built by `error`.
    #[must_use]
    pub fn failing(error: impl Fn() -> CollaboratorError + Send + Sync + 'static) -> Self {
        Self {
            layer: None,
            error: Some(Box::new(error)),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// URLs analyzed so far.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

impl fmt::Debug for StaticAnalyzer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticAnalyzer")
            .field("layer", &self.layer.as_ref().map(|l| &l.repository_name))
            .field("failing", &self.error.is_some())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl RepositoryAnalyzer for StaticAnalyzer {
    async fn analyze(
        &self,
        reference: &RepositoryReference,
    ) -> Result<RawLayer, CollaboratorError> {
        self.calls.lock().push(reference.url().to_string());
        if let Some(error) = &self.error {
            return Err(error());
        }
        let mut layer = self
            .layer
            .clone()
            .ok_or_else(|| CollaboratorError::InvalidInput("no layer configured".to_string()))?;
        layer.repository_url = reference.url().to_string();
        layer.repository_name = reference.repository_name();
        layer.visibility = reference.visibility();
        Ok(layer)
    }
}
