//! # Repoflow CLI
//!
//! Runs every given repository through analysis, base extraction, merge and
//! documentation generation, then prints the consolidated result.
//!
//! ```bash
//! # Two public repositories, two at a time
//! repoflow --concurrency 2 \
//!     --urls https://github.com/acme/widgets \
//!     --urls https://github.com/acme/gadgets
//!
//! # Private repositories listed in a file
//! GITHUB_TOKEN=... repoflow --urls-file repos.txt --private --output json
//! ```
//!
//! Exits with status 0 when at least one repository was documented and 1
//! otherwise.

use anyhow::Context;
use clap::{Parser, ValueEnum};
use repoflow::prelude::*;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// One line per repository plus a summary line
    Text,
    /// The consolidated result as JSON
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    /// Human-readable log lines
    Text,
    /// One JSON object per log line
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "repoflow")]
#[command(about = "Analyze, enrich and document source repositories", long_about = None)]
#[command(version)]
struct Cli {
    /// Repository URL (repeatable)
    #[arg(long = "urls", value_name = "URL")]
    urls: Vec<String>,

    /// File with one repository URL per line
    #[arg(long, value_name = "PATH")]
    urls_file: Option<PathBuf>,

    /// Treat every repository as private
    #[arg(long)]
    private: bool,

    /// Number of repositories processed at once [default: $MAX_WORKERS or 1]
    #[arg(long)]
    concurrency: Option<usize>,

    /// Directory the reports are written to
    #[arg(long, env = "REPOFLOW_REPORTS_DIR")]
    reports_dir: Option<PathBuf>,

    /// Refuse to run without an AI API key
    #[arg(long)]
    require_ai: bool,

    /// Model used for enrichment
    #[arg(long, env = "REPOFLOW_MODEL")]
    model: Option<String>,

    /// Result format
    #[arg(long, value_enum, default_value = "text")]
    output: OutputFormat,

    /// Log format
    #[arg(long, value_enum, default_value = "text")]
    log_format: LogFormat,

    /// Cancel the run after this many seconds
    #[arg(long)]
    timeout_seconds: Option<u64>,
}

impl Cli {
    fn pipeline_config(&self) -> anyhow::Result<PipelineConfig> {
        let mut config = PipelineConfig::from_env()
            .context("invalid environment configuration")?
            .with_required_ai_credentials(self.require_ai);
        if let Some(concurrency) = self.concurrency {
            config = config.with_max_concurrency(concurrency);
        }
        if let Some(dir) = &self.reports_dir {
            config = config.with_reports_dir(dir);
        }
        if let Some(model) = &self.model {
            config.ai.model.clone_from(model);
        }
        Ok(config)
    }

    fn references(&self) -> anyhow::Result<ReferenceList> {
        let visibility = if self.private {
            Visibility::Private
        } else {
            Visibility::Public
        };
        let mut list = ReferenceList::new();
        list.extend_urls(&self.urls, visibility);
        if let Some(path) = &self.urls_file {
            list.extend_from_file(path, visibility)
                .with_context(|| format!("failed to load repository list {}", path.display()))?;
        }
        Ok(list)
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let list = cli.references()?;
    for rejected in list.rejected() {
        let location = rejected
            .line
            .map_or_else(|| rejected.origin.clone(), |line| format!("{}:{line}", rejected.origin));
        eprintln!("skipped {location}: {}", rejected.error);
    }
    let references = list.into_references();

    let config = cli.pipeline_config()?;
    let store = Arc::new(InMemoryDocumentStore::new());
    let controller = PipelineController::from_config(config, store)
        .context("failed to set up the pipeline")?
        .with_event_sink(Arc::new(LoggingEventSink::debug()));

    let token = CancellationToken::new();
    {
        let token = token.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received; finishing in-flight stages");
                token.cancel("interrupted");
            }
        });
    }
    if let Some(seconds) = cli.timeout_seconds {
        token.cancel_after(Duration::from_secs(seconds));
    }

    let result = controller.run_with_cancellation(&references, &token).await;
    info!(run_id = %result.run_id, state = %result.state, "Done");

    match cli.output {
        OutputFormat::Text => println!("{result}"),
        OutputFormat::Json => println!("{}", result.to_json_pretty()?),
    }

    Ok(match result.state {
        ProcessState::Completed => ExitCode::SUCCESS,
        ProcessState::Failed => ExitCode::FAILURE,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::parse_from([
            "repoflow",
            "--urls",
            "https://github.com/acme/widgets",
            "--concurrency",
            "4",
            "--model",
            "local/test-model",
            "--require-ai",
        ]);
        let config = cli.pipeline_config().unwrap();

        assert_eq!(config.max_concurrency, 4);
        assert_eq!(config.ai.model, "local/test-model");
        assert!(config.require_ai_credentials);
    }

    #[test]
    fn test_private_flag_marks_every_reference() {
        let cli = Cli::parse_from([
            "repoflow",
            "--private",
            "--urls",
            "https://github.com/acme/widgets",
            "--urls",
            "not a url",
        ]);
        let list = cli.references().unwrap();

        assert_eq!(list.accepted().len(), 1);
        assert!(list.accepted()[0].is_private());
        assert_eq!(list.rejected().len(), 1);
    }
}
