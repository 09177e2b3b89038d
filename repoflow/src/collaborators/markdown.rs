//! Markdown rendering of enriched documents.

use crate::core::{BaseSummary, Document, EnrichmentData, FileInsight};
use crate::errors::CollaboratorError;
use crate::stages::DocumentRenderer;
use chrono::Utc;
use std::collections::BTreeSet;
use std::fmt::Write as _;

/// Renders a document to GitHub-flavoured markdown.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownRenderer;

impl MarkdownRenderer {
    /// Creates a renderer.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl DocumentRenderer for MarkdownRenderer {
    fn render(&self, document: &Document) -> Result<String, CollaboratorError> {
        let (Some(base), Some(enrichment)) = (&document.base, &document.enrichment) else {
            return Err(CollaboratorError::InvalidInput(format!(
                "document {} has no base or enrichment layer",
                document.id
            )));
        };

        let sections = [
            header(document),
            executive_summary(document, base, enrichment),
            overview(base),
            environment_section(base, enrichment),
            database_section(enrichment),
            api_section(enrichment),
            directory_section(document),
            files_section(enrichment),
        ];
        Ok(sections
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("\n"))
    }
}

fn header(document: &Document) -> String {
    format!(
        "# {}\n\n> Repository: {}\n> Generated: {}\n\n---\n",
        document.raw.repository_name,
        document.raw.repository_url,
        Utc::now().format("%B %d, %Y at %H:%M:%S UTC"),
    )
}

fn executive_summary(
    document: &Document,
    base: &BaseSummary,
    enrichment: &EnrichmentData,
) -> String {
    let mut out = String::from("## Executive Summary\n\n");
    if let Some(summary) = enrichment.summary.as_deref().filter(|s| !s.trim().is_empty()) {
        let _ = writeln!(out, "{summary}\n");
    }

    let databases: BTreeSet<&str> = enrichment
        .files
        .iter()
        .flat_map(|f| f.db.iter().map(|d| d.name.as_str()))
        .collect();
    let hosts: BTreeSet<&str> = enrichment
        .files
        .iter()
        .flat_map(|f| f.api.iter().map(|a| a.host.as_str()))
        .collect();

    let _ = writeln!(out, "| Metric | Value |\n|---|---|");
    let _ = writeln!(out, "| Visibility | {} |", document.raw.visibility);
    let _ = writeln!(out, "| Files | {} |", base.total_files);
    let _ = writeln!(out, "| Primary language | {} |", base.primary_language().unwrap_or("n/a"));
    let _ = writeln!(out, "| Environment variables | {} |", base.env_vars.len());
    let _ = writeln!(out, "| Databases | {} |", databases.len());
    let _ = writeln!(out, "| API hosts | {} |", hosts.len());
    out
}

fn overview(base: &BaseSummary) -> String {
    let mut out = String::from("## Overview\n\n");
    let _ = writeln!(
        out,
        "{} files, {} characters, about {} tokens.\n",
        base.total_files, base.total_chars, base.total_tokens
    );

    if !base.languages.is_empty() {
        let _ = writeln!(out, "| Language | Files |\n|---|---|");
        for (language, count) in &base.languages {
            let _ = writeln!(out, "| {language} | {count} |");
        }
        out.push('\n');
    }

    if !base.top_files.is_empty() {
        let _ = writeln!(
            out,
            "### Top files\n\n| # | Path | Characters | Tokens |\n|---|---|---|---|"
        );
        for file in &base.top_files {
            let _ = writeln!(
                out,
                "| {} | `{}` | {} | {} |",
                file.rank, file.path, file.chars, file.tokens
            );
        }
    }
    out
}

fn environment_section(base: &BaseSummary, enrichment: &EnrichmentData) -> String {
    if base.env_vars.is_empty() && enrichment.files.iter().all(|f| f.env_vars.is_empty()) {
        return String::new();
    }
    let mut out =
        String::from("## Environment Variables\n\n| Name | Description | Files |\n|---|---|---|\n");

    let mut seen = BTreeSet::new();
    for usage in &base.env_vars {
        let description = enrichment
            .files
            .iter()
            .flat_map(|f| &f.env_vars)
            .find(|e| e.name == usage.name)
            .map_or("", |e| e.description.as_str());
        let _ = writeln!(
            out,
            "| `{}` | {} | {} |",
            usage.name,
            escape_cell(description),
            usage.files.join(", ")
        );
        seen.insert(usage.name.as_str());
    }
    for insight in &enrichment.files {
        for env in &insight.env_vars {
            if seen.insert(env.name.as_str()) {
                let _ = writeln!(
                    out,
                    "| `{}` | {} | {} |",
                    env.name,
                    escape_cell(&env.description),
                    insight.path
                );
            }
        }
    }
    out
}

fn database_section(enrichment: &EnrichmentData) -> String {
    let mut out = String::new();
    for insight in &enrichment.files {
        for db in &insight.db {
            let _ = writeln!(out, "### {} (`{}`)\n", db.name, insight.path);
            if !db.context.is_empty() {
                let _ = writeln!(out, "{}\n", db.context);
            }
            for table in &db.tables {
                let _ = writeln!(out, "- `{}`: {}", table.name, table.operations.join(", "));
            }
            out.push('\n');
        }
    }
    if out.is_empty() {
        out
    } else {
        format!("## Databases\n\n{out}")
    }
}

fn api_section(enrichment: &EnrichmentData) -> String {
    let mut out = String::new();
    for insight in &enrichment.files {
        for api in &insight.api {
            let _ = writeln!(out, "### {} (`{}`)\n", api.host, insight.path);
            if !api.context.is_empty() {
                let _ = writeln!(out, "{}\n", api.context);
            }
            for endpoint in &api.endpoints {
                let _ = writeln!(out, "- `{}`: {}", endpoint.name, endpoint.description);
            }
            out.push('\n');
        }
    }
    if out.is_empty() {
        out
    } else {
        format!("## APIs\n\n{out}")
    }
}

fn directory_section(document: &Document) -> String {
    if document.raw.directory_structure.trim().is_empty() {
        return String::new();
    }
    format!(
        "## Directory Structure\n\n```\n{}\n```\n",
        document.raw.directory_structure.trim_end()
    )
}

fn files_section(enrichment: &EnrichmentData) -> String {
    let described: Vec<&FileInsight> = enrichment.files.iter().filter(|f| !f.is_empty()).collect();
    if described.is_empty() {
        return String::new();
    }
    let mut out = String::from("## Files\n\n");
    for insight in described {
        let _ = writeln!(out, "<details>\n<summary><code>{}</code></summary>\n", insight.path);
        if let Some(summary) = &insight.summary {
            let _ = writeln!(out, "{summary}\n");
        }
        for env in &insight.env_vars {
            let _ = writeln!(out, "- env `{}`: {}", env.name, env.description);
        }
        for db in &insight.db {
            let _ = writeln!(out, "- db `{}` ({} tables)", db.name, db.tables.len());
        }
        for api in &insight.api {
            let _ = writeln!(out, "- api `{}` ({} endpoints)", api.host, api.endpoints.len());
        }
        out.push_str("\n</details>\n\n");
    }
    out
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}
