//! Rule-based base-layer extraction.

use crate::core::{rank_files, BaseSummary, Document, EnvVarUsage, RawLayer};
use crate::errors::CollaboratorError;
use crate::stages::BaseExtractor;
use async_trait::async_trait;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// Common ways code reads an environment variable. Group 1 is the name.
static ENV_VAR_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r#"os\.environ(?:\.get)?\s*[\[(]\s*["']([A-Za-z_][A-Za-z0-9_]*)["']"#,
        r#"os\.getenv\(\s*["']([A-Za-z_][A-Za-z0-9_]*)["']"#,
        r"process\.env\.([A-Za-z_][A-Za-z0-9_]*)",
        r#"process\.env\[\s*["']([A-Za-z_][A-Za-z0-9_]*)["']\s*\]"#,
        r#"env::var(?:_os)?\(\s*"([A-Za-z_][A-Za-z0-9_]*)""#,
        r#"\bgetenv\(\s*["']([A-Za-z_][A-Za-z0-9_]*)["']"#,
        r#"ENV\[\s*["']([A-Za-z_][A-Za-z0-9_]*)["']\s*\]"#,
        r"\$\{([A-Z_][A-Z0-9_]*)\}",
    ]
    .into_iter()
    .map(|p| Regex::new(p).expect("env var pattern compiles"))
    .collect()
});

/// Derives the base layer from the raw layer without any remote calls.
#[derive(Debug, Clone)]
pub struct HeuristicBaseExtractor {
    top_files: usize,
}

impl Default for HeuristicBaseExtractor {
    fn default() -> Self {
        Self { top_files: 5 }
    }
}

impl HeuristicBaseExtractor {
    /// Creates an extractor ranking the five largest files.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets how many files are ranked.
    #[must_use]
    pub fn with_top_files(mut self, top_files: usize) -> Self {
        self.top_files = top_files;
        self
    }

    /// Computes the summary for a raw layer.
    #[must_use]
    pub fn summarize(&self, raw: &RawLayer) -> BaseSummary {
        let mut languages: BTreeMap<String, usize> = BTreeMap::new();
        for file in &raw.files {
            if let Some(language) = language_for(&file.extension()) {
                *languages.entry(language.to_string()).or_default() += 1;
            }
        }

        BaseSummary {
            total_files: raw.files.len(),
            total_chars: raw.files.iter().map(|f| f.chars).sum(),
            total_tokens: raw.files.iter().map(|f| f.tokens).sum(),
            languages,
            env_vars: env_var_usages(raw),
            top_files: rank_files(&raw.files, self.top_files),
        }
    }
}

#[async_trait]
impl BaseExtractor for HeuristicBaseExtractor {
    async fn extract_base(&self, document: &Document) -> Result<BaseSummary, CollaboratorError> {
        Ok(self.summarize(&document.raw))
    }
}

fn env_var_usages(raw: &RawLayer) -> Vec<EnvVarUsage> {
    let mut usages: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for file in &raw.files {
        for pattern in ENV_VAR_PATTERNS.iter() {
            for caps in pattern.captures_iter(&file.content) {
                let files = usages.entry(caps[1].to_string()).or_default();
                if !files.contains(&file.path) {
                    files.push(file.path.clone());
                }
            }
        }
    }
    usages
        .into_iter()
        .map(|(name, files)| EnvVarUsage { name, files })
        .collect()
}

/// Maps a lowercased file extension to a language name.
#[must_use]
pub fn language_for(extension: &str) -> Option<&'static str> {
    let language = match extension {
        "rs" => "Rust",
        "py" | "pyi" => "Python",
        "js" | "mjs" | "cjs" | "jsx" => "JavaScript",
        "ts" | "tsx" => "TypeScript",
        "go" => "Go",
        "java" => "Java",
        "kt" | "kts" => "Kotlin",
        "rb" => "Ruby",
        "php" => "PHP",
        "cs" => "C#",
        "c" | "h" => "C",
        "cc" | "cpp" | "cxx" | "hpp" => "C++",
        "swift" => "Swift",
        "scala" => "Scala",
        "sh" | "bash" => "Shell",
        "sql" => "SQL",
        "html" | "htm" => "HTML",
        "css" | "scss" => "CSS",
        "md" => "Markdown",
        "json" => "JSON",
        "yaml" | "yml" => "YAML",
        "toml" => "TOML",
        _ => return None,
    };
    Some(language)
}
