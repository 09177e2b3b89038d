//! AI enrichment collaborators.
//!
//! - [`NoOpEnricher`] produces an empty enrichment layer (no network).
//! - [`OpenAiCompatibleEnricher`] (feature `llm`) calls an OpenAI-compatible
//!   chat-completions endpoint per batch of files.
//!
//! Retry strategy of the remote enricher:
//! - HTTP 429 or 5xx: retry with exponential backoff
//! - other HTTP errors: fail immediately
//! - network errors: retry

use crate::core::{BaseSummary, Document, EnrichmentData};
use crate::errors::CollaboratorError;
use crate::stages::Enricher;
use async_trait::async_trait;

/// Enricher that returns an empty enrichment layer.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEnricher;

impl NoOpEnricher {
    /// Creates the enricher.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Enricher for NoOpEnricher {
    async fn enrich(
        &self,
        _document: &Document,
        _base: &BaseSummary,
    ) -> Result<EnrichmentData, CollaboratorError> {
        Ok(EnrichmentData {
            summary: None,
            producer: Some("none".to_string()),
            files: Vec::new(),
        })
    }
}

#[cfg(feature = "llm")]
pub use remote::OpenAiCompatibleEnricher;

#[cfg(feature = "llm")]
mod remote {
    use super::{BaseSummary, CollaboratorError, Document, EnrichmentData, Enricher};
    use crate::config::AiConfig;
    use crate::core::{FileInsight, RepoFile};
    use async_trait::async_trait;
    use serde::Deserialize;
    use std::fmt;
    use std::time::Duration;
    use tracing::{debug, warn};

    const SYSTEM_PROMPT: &str = "You are a code analysis assistant. You document codebases \
        for the engineers who maintain them. Only make claims the code supports. \
        Answer with a single JSON object and nothing else.";

    const INSTRUCTIONS: &str = r#"For every file below, extract:
1. Environment variables: name, what it is used for, where it is read.
2. Databases: database name, tables and the operations performed on each.
3. APIs: host or base path, endpoints and what they do.
Also write a one-sentence summary per file and a short summary of the repository.

Reply with JSON of this shape:
{"summary": "...", "files": [{"path": "...", "summary": "...",
  "env_vars": [{"name": "...", "description": "...", "context": "..."}],
  "db": [{"name": "...", "tables": [{"name": "...", "operations": ["read"], "context": "..."}], "context": "..."}],
  "api": [{"host": "...", "context": "...", "endpoints": [{"name": "...", "description": "...", "context": "..."}]}]}]}
Use the file paths exactly as given. Omit empty lists."#;

    #[derive(Debug, Deserialize)]
    struct BatchReply {
        #[serde(default)]
        summary: Option<String>,
        #[serde(default)]
        files: Vec<FileInsight>,
    }

    /// Enricher backed by an OpenAI-compatible chat-completions API.
    #[derive(Clone)]
    pub struct OpenAiCompatibleEnricher {
        client: reqwest::Client,
        config: AiConfig,
        api_key: String,
        retry_base_delay: Duration,
    }

    impl OpenAiCompatibleEnricher {
        /// Creates an enricher for the configured endpoint.
        pub fn new(
            config: AiConfig,
            api_key: impl Into<String>,
        ) -> Result<Self, CollaboratorError> {
            let client = reqwest::Client::builder()
                .timeout(config.timeout())
                .build()
                .map_err(|e| CollaboratorError::InvalidInput(format!("HTTP client: {e}")))?;
            Ok(Self {
                client,
                config,
                api_key: api_key.into(),
                retry_base_delay: Duration::from_secs(1),
            })
        }

        /// Sets the first backoff delay; later attempts double it.
        #[must_use]
        pub fn with_retry_base_delay(mut self, delay: Duration) -> Self {
            self.retry_base_delay = delay;
            self
        }

        fn endpoint(&self) -> String {
            format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
        }

        async fn complete(&self, prompt: String) -> Result<String, CollaboratorError> {
            let body = serde_json::json!({
                "model": self.config.model,
                "temperature": 0,
                "response_format": {"type": "json_object"},
                "messages": [
                    {"role": "system", "content": SYSTEM_PROMPT},
                    {"role": "user", "content": prompt},
                ],
            });

            let mut last_err = None;
            for attempt in 0..=self.config.max_retries {
                if attempt > 0 {
                    // 1x, 2x, 4x, ... the base delay
                    let delay = self.retry_base_delay * (1_u32 << (attempt - 1).min(5));
                    tokio::time::sleep(delay).await;
                }

                let response = self
                    .client
                    .post(self.endpoint())
                    .bearer_auth(&self.api_key)
                    .json(&body)
                    .send()
                    .await;

                match response {
                    Ok(response) => {
                        let status = response.status();
                        if status.is_success() {
                            let json: serde_json::Value = response
                                .json()
                                .await
                                .map_err(|e| CollaboratorError::Malformed(e.to_string()))?;
                            return message_content(&json);
                        }

                        let text = response.text().await.unwrap_or_default();
                        let err =
                            CollaboratorError::Remote(format!("HTTP {status}: {}", text.trim()));
                        if status.as_u16() == 429 || status.is_server_error() {
                            warn!(attempt, status = %status, "Enrichment request failed, retrying");
                            last_err = Some(err);
                            continue;
                        }
                        return Err(err);
                    }
                    Err(e) if e.is_timeout() => {
                        warn!(attempt, "Enrichment request timed out");
                        last_err = Some(CollaboratorError::Timeout {
                            operation: "chat completion".to_string(),
                            seconds: self.config.timeout_seconds,
                        });
                    }
                    Err(e) => {
                        warn!(attempt, error = %e, "Enrichment request failed");
                        last_err = Some(CollaboratorError::Remote(e.to_string()));
                    }
                }
            }

            Err(last_err.unwrap_or_else(|| {
                CollaboratorError::Remote("enrichment failed after retries".to_string())
            }))
        }
    }

    impl fmt::Debug for OpenAiCompatibleEnricher {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.debug_struct("OpenAiCompatibleEnricher")
                .field("config", &self.config)
                .field("api_key", &"***")
                .finish_non_exhaustive()
        }
    }

    #[async_trait]
    impl Enricher for OpenAiCompatibleEnricher {
        async fn enrich(
            &self,
            document: &Document,
            base: &BaseSummary,
        ) -> Result<EnrichmentData, CollaboratorError> {
            let batches = batch_files(&document.raw.files, self.config.max_batch_chars);
            let mut enrichment = EnrichmentData {
                summary: None,
                producer: Some(self.config.model.clone()),
                files: Vec::new(),
            };

            for (i, batch) in batches.iter().enumerate() {
                debug!(
                    document_id = %document.id,
                    batch = i + 1,
                    of = batches.len(),
                    files = batch.len(),
                    "Requesting enrichment"
                );
                let prompt = build_prompt(
                    &document.raw.repository_name,
                    base,
                    batch,
                    self.config.max_batch_chars,
                );
                let reply = parse_reply(&self.complete(prompt).await?)?;
                if enrichment.summary.is_none() {
                    enrichment.summary = reply.summary.filter(|s| !s.trim().is_empty());
                }
                enrichment.files.extend(reply.files);
            }
            Ok(enrichment)
        }
    }

    /// Groups files so each batch stays under `max_chars` where possible.
    ///
    /// A file larger than the cap gets a batch of its own and is truncated
    /// when the prompt is built.
    fn batch_files(files: &[RepoFile], max_chars: usize) -> Vec<Vec<&RepoFile>> {
        let mut batches: Vec<Vec<&RepoFile>> = Vec::new();
        let mut current: Vec<&RepoFile> = Vec::new();
        let mut current_chars = 0;

        for file in files.iter().filter(|f| !f.content.trim().is_empty()) {
            if !current.is_empty() && current_chars + file.chars > max_chars {
                batches.push(std::mem::take(&mut current));
                current_chars = 0;
            }
            current_chars += file.chars;
            current.push(file);
        }
        if !current.is_empty() {
            batches.push(current);
        }
        batches
    }

    fn build_prompt(
        repository: &str,
        base: &BaseSummary,
        files: &[&RepoFile],
        max_chars: usize,
    ) -> String {
        let mut prompt = format!(
            "{INSTRUCTIONS}\n\nRepository: {repository}\nPrimary language: {}\n",
            base.primary_language().unwrap_or("unknown")
        );
        for file in files {
            let content: String = file.content.chars().take(max_chars).collect();
            prompt.push_str("\n--- file_path: ");
            prompt.push_str(&file.path);
            prompt.push_str(" ---\n");
            prompt.push_str(&content);
            prompt.push('\n');
        }
        prompt
    }

    fn message_content(json: &serde_json::Value) -> Result<String, CollaboratorError> {
        json.pointer("/choices/0/message/content")
            .and_then(serde_json::Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                CollaboratorError::Malformed("missing choices[0].message.content".to_string())
            })
    }

    /// Parses the model reply, tolerating a fenced code block around the JSON.
    fn parse_reply(content: &str) -> Result<BatchReply, CollaboratorError> {
        let trimmed = content.trim();
        let unfenced = trimmed
            .strip_prefix("```json")
            .or_else(|| trimmed.strip_prefix("```"))
            .and_then(|rest| rest.trim_end().strip_suffix("```"))
            .unwrap_or(trimmed);
        Ok(serde_json::from_str(unfenced.trim())?)
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::core::{DocumentId, RawLayer, Visibility};
        use chrono::Utc;
        use serde_json::json;
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::TcpListener;

        fn document() -> Document {
            let now = Utc::now();
            Document {
                id: DocumentId::parse("doc-1").unwrap(),
                version: 1,
                raw: RawLayer {
                    repository_url: "https://github.com/acme/widgets".to_string(),
                    repository_name: "widgets".to_string(),
                    visibility: Visibility::Public,
                    directory_structure: String::new(),
                    files: vec![RepoFile::new("src/db.py", "conn = connect(os.environ['DB_URL'])")],
                    analyzed_at: now,
                },
                base: None,
                enrichment: None,
                created_at: now,
                updated_at: now,
            }
        }

        fn chat_reply(content: &str) -> String {
            serde_json::json!({"choices": [{"message": {"role": "assistant", "content": content}}]})
                .to_string()
        }

        /// Serves one canned HTTP response per connection, in order.
        async fn serve(responses: Vec<(u16, String)>) -> (String, Arc<AtomicUsize>) {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            let hits = Arc::new(AtomicUsize::new(0));
            let counter = hits.clone();

            tokio::spawn(async move {
                for (status, body) in responses {
                    let (mut socket, _) = listener.accept().await.unwrap();
                    counter.fetch_add(1, Ordering::SeqCst);
                    read_request(&mut socket).await;
                    let response = format!(
                        concat!(
                            "HTTP/1.1 {} X\r\ncontent-type: application/json\r\n",
                            "content-length: {}\r\nconnection: close\r\n\r\n{}",
                        ),
                        status,
                        body.len(),
                        body
                    );
                    socket.write_all(response.as_bytes()).await.unwrap();
                    socket.shutdown().await.unwrap();
                }
            });
            (format!("http://{addr}/v1"), hits)
        }

        async fn read_request(socket: &mut tokio::net::TcpStream) {
            let mut buf = Vec::new();
            let mut chunk = [0_u8; 4096];
            loop {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    return;
                }
                buf.extend_from_slice(&chunk[..n]);
                let text = String::from_utf8_lossy(&buf);
                if let Some(header_end) = text.find("\r\n\r\n") {
                    let length = text[..header_end]
                        .lines()
                        .find_map(|l| {
                            let (name, value) = l.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if buf.len() >= header_end + 4 + length {
                        return;
                    }
                }
            }
        }

        fn enricher(base_url: String) -> OpenAiCompatibleEnricher {
            let config = AiConfig {
                base_url,
                max_retries: 2,
                ..AiConfig::default()
            };
            OpenAiCompatibleEnricher::new(config, "sk-test")
                .unwrap()
                .with_retry_base_delay(Duration::from_millis(5))
        }

        #[test]
        fn test_batches_respect_char_budget() {
            let files = vec![
                RepoFile::new("a", "x".repeat(40)),
                RepoFile::new("b", "x".repeat(40)),
                RepoFile::new("empty", "  "),
                RepoFile::new("c", "x".repeat(100)),
                RepoFile::new("d", "x".repeat(10)),
            ];
            let batches = batch_files(&files, 90);
            let paths: Vec<Vec<&str>> = batches
                .iter()
                .map(|b| b.iter().map(|f| f.path.as_str()).collect())
                .collect();
            assert_eq!(paths, vec![vec!["a", "b"], vec!["c"], vec!["d"]]);
        }

        #[test]
        fn test_prompt_truncates_oversized_files() {
            let file = RepoFile::new("big.txt", "y".repeat(50));
            let prompt = build_prompt("widgets", &BaseSummary::default(), &[&file], 10);
            assert!(prompt.contains("--- file_path: big.txt ---\nyyyyyyyyyy\n"));
            assert!(!prompt.contains(&"y".repeat(11)));
        }

        #[test]
        fn test_parse_reply_accepts_fenced_json() {
            let fenced = "```json\n{\"summary\": \"s\", \"files\": [{\"path\": \"a.py\"}]}\n```";
            let reply = parse_reply(fenced).unwrap();
            assert_eq!(reply.summary.as_deref(), Some("s"));
            assert_eq!(reply.files[0].path, "a.py");

            let err = parse_reply("Sure! Here you go").unwrap_err();
            assert!(matches!(err, CollaboratorError::Malformed(_)));
        }

        #[tokio::test]
        async fn test_retries_server_errors() {
            let content = json!({
                "summary": "Widget DB access",
                "files": [{
                    "path": "src/db.py",
                    "env_vars": [{"name": "DB_URL", "description": "Database DSN"}]
                }]
            })
            .to_string();
            let (url, hits) = serve(vec![
                (503, "{}".to_string()),
                (429, "{}".to_string()),
                (200, chat_reply(&content)),
            ])
            .await;

            let enrichment = enricher(url)
                .enrich(&document(), &BaseSummary::default())
                .await
                .unwrap();

            assert_eq!(hits.load(Ordering::SeqCst), 3);
            assert_eq!(enrichment.summary.as_deref(), Some("Widget DB access"));
            assert_eq!(enrichment.file("src/db.py").unwrap().env_vars[0].name, "DB_URL");
        }

        #[tokio::test]
        async fn test_client_error_is_not_retried() {
            let (url, hits) = serve(vec![(401, "{\"error\": \"bad key\"}".to_string())]).await;

            let err = enricher(url)
                .enrich(&document(), &BaseSummary::default())
                .await
                .unwrap_err();

            assert!(matches!(err, CollaboratorError::Remote(ref m) if m.contains("401")), "{err}");
            assert_eq!(hits.load(Ordering::SeqCst), 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DocumentId;
    use crate::testing::sample_raw_layer;
    use chrono::Utc;

    #[tokio::test]
    async fn test_noop_enricher_is_empty() {
        let now = Utc::now();
        let document = Document {
            id: DocumentId::parse("doc-1").unwrap(),
            version: 1,
            raw: sample_raw_layer("widgets"),
            base: None,
            enrichment: None,
            created_at: now,
            updated_at: now,
        };

        let enrichment = NoOpEnricher::new()
            .enrich(&document, &BaseSummary::default())
            .await
            .unwrap();

        assert!(enrichment.files.is_empty());
        assert_eq!(enrichment.producer.as_deref(), Some("none"));
    }
}
