//! Configuration types for a pipeline run.

use crate::errors::{RepoflowError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Credentials the stages may need.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct Credentials {
    /// Code-host access token, needed for private repositories.
    #[serde(default)]
    pub code_host_token: Option<String>,
    /// API key for the AI provider.
    #[serde(default)]
    pub ai_api_key: Option<String>,
}

impl Credentials {
    /// Returns true if a non-blank code-host token is present.
    #[must_use]
    pub fn has_code_host_token(&self) -> bool {
        present(self.code_host_token.as_deref())
    }

    /// Returns true if a non-blank AI API key is present.
    #[must_use]
    pub fn has_ai_api_key(&self) -> bool {
        present(self.ai_api_key.as_deref())
    }
}

fn present(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.trim().is_empty())
}

// Secrets never reach logs.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("code_host_token", &self.code_host_token.as_ref().map(|_| "***"))
            .field("ai_api_key", &self.ai_api_key.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Settings for the AI enrichment collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    /// Base URL of an OpenAI-compatible API.
    #[serde(default = "default_ai_base_url")]
    pub base_url: String,
    /// Model name.
    #[serde(default = "default_model")]
    pub model: String,
    /// Request timeout in seconds.
    #[serde(default = "default_ai_timeout")]
    pub timeout_seconds: f64,
    /// Retries on 429/5xx and network errors.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Character budget per request.
    #[serde(default = "default_max_batch_chars")]
    pub max_batch_chars: usize,
}

fn default_ai_base_url() -> String {
    "https://openrouter.ai/api/v1".to_string()
}

fn default_model() -> String {
    "openai/gpt-4o-mini".to_string()
}

fn default_ai_timeout() -> f64 {
    60.0
}

fn default_max_retries() -> u32 {
    3
}

fn default_max_batch_chars() -> usize {
    48_000
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            base_url: default_ai_base_url(),
            model: default_model(),
            timeout_seconds: default_ai_timeout(),
            max_retries: default_max_retries(),
            max_batch_chars: default_max_batch_chars(),
        }
    }
}

impl AiConfig {
    /// Gets timeout as Duration.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout_seconds)
    }
}

/// Settings for the repository analysis collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// The git executable.
    #[serde(default = "default_git_binary")]
    pub git_binary: String,
    /// `--depth` passed to `git clone`.
    #[serde(default = "default_clone_depth")]
    pub clone_depth: u32,
    /// Clone timeout in seconds.
    #[serde(default = "default_clone_timeout")]
    pub clone_timeout_seconds: f64,
    /// Files larger than this are skipped.
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,
    /// Directory names never descended into.
    #[serde(default = "default_ignore_dirs")]
    pub ignore_dirs: Vec<String>,
    /// Number of files kept in the size ranking.
    #[serde(default = "default_top_files")]
    pub top_files: usize,
}

fn default_git_binary() -> String {
    "git".to_string()
}

fn default_clone_depth() -> u32 {
    1
}

fn default_clone_timeout() -> f64 {
    300.0
}

fn default_max_file_bytes() -> u64 {
    512 * 1024 // 512KB
}

fn default_ignore_dirs() -> Vec<String> {
    [".git", "node_modules", "target", "dist", "build", "vendor", ".venv", "__pycache__"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_top_files() -> usize {
    5
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            git_binary: default_git_binary(),
            clone_depth: default_clone_depth(),
            clone_timeout_seconds: default_clone_timeout(),
            max_file_bytes: default_max_file_bytes(),
            ignore_dirs: default_ignore_dirs(),
            top_files: default_top_files(),
        }
    }
}

impl AnalysisConfig {
    /// Gets the clone timeout as Duration.
    #[must_use]
    pub fn clone_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.clone_timeout_seconds)
    }
}

/// Configuration for a whole pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Credentials handed to the prerequisite checker and collaborators.
    #[serde(default)]
    pub credentials: Credentials,
    /// Refuse to run without an AI API key.
    #[serde(default)]
    pub require_ai_credentials: bool,
    /// Number of reference chains driven at once.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    /// Where rendered documentation is written.
    #[serde(default = "default_reports_dir")]
    pub reports_dir: PathBuf,
    /// AI collaborator settings.
    #[serde(default)]
    pub ai: AiConfig,
    /// Analysis collaborator settings.
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

fn default_max_concurrency() -> usize {
    1
}

fn default_reports_dir() -> PathBuf {
    PathBuf::from("reports")
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            credentials: Credentials::default(),
            require_ai_credentials: false,
            max_concurrency: default_max_concurrency(),
            reports_dir: default_reports_dir(),
            ai: AiConfig::default(),
            analysis: AnalysisConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a configuration from environment variables.
    ///
    /// Reads `GITHUB_TOKEN`, `OPENROUTER_API_KEY`, `OPENROUTER_BASE_URL`,
    /// `REPOFLOW_MODEL`, `REPOFLOW_REPORTS_DIR` and `MAX_WORKERS`. Unset or
    /// empty values keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`RepoflowError::Config`] if `MAX_WORKERS` is not a positive
    /// integer.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// See [`from_env`](Self::from_env).
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        config.credentials.code_host_token = lookup("GITHUB_TOKEN").filter(|v| !v.is_empty());
        config.credentials.ai_api_key = lookup("OPENROUTER_API_KEY").filter(|v| !v.is_empty());
        if let Some(url) = lookup("OPENROUTER_BASE_URL").filter(|v| !v.is_empty()) {
            config.ai.base_url = url;
        }
        if let Some(model) = lookup("REPOFLOW_MODEL").filter(|v| !v.is_empty()) {
            config.ai.model = model;
        }
        if let Some(dir) = lookup("REPOFLOW_REPORTS_DIR").filter(|v| !v.is_empty()) {
            config.reports_dir = PathBuf::from(dir);
        }
        if let Some(workers) = lookup("MAX_WORKERS").filter(|v| !v.trim().is_empty()) {
            config.max_concurrency = match workers.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(RepoflowError::Config(format!(
                        "MAX_WORKERS must be a positive integer, got {workers:?}"
                    )))
                }
            };
        }
        Ok(config)
    }

    /// Sets the code-host token.
    #[must_use]
    pub fn with_code_host_token(mut self, token: impl Into<String>) -> Self {
        self.credentials.code_host_token = Some(token.into());
        self
    }

    /// Sets the AI API key.
    #[must_use]
    pub fn with_ai_api_key(mut self, key: impl Into<String>) -> Self {
        self.credentials.ai_api_key = Some(key.into());
        self
    }

    /// Requires AI credentials before running.
    #[must_use]
    pub fn with_required_ai_credentials(mut self, required: bool) -> Self {
        self.require_ai_credentials = required;
        self
    }

    /// Sets the number of chains driven at once (minimum 1).
    #[must_use]
    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = max.max(1);
        self
    }

    /// Sets the reports directory.
    #[must_use]
    pub fn with_reports_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.reports_dir = dir.into();
        self
    }
}
