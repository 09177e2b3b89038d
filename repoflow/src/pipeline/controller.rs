//! The pipeline controller.
//!
//! Drives every reference through analysis, base extraction, merge and
//! documentation generation. A failure stops only its own chain; the run
//! always visits every reference exactly once and reports results in
//! input order.

use super::prerequisites::PrerequisiteChecker;
use super::result::{ConsolidatedResult, ItemResult};
use super::state::{ChainEvent, ChainState};
use crate::cancellation::CancellationToken;
use crate::collaborators::{GitRepositoryAnalyzer, HeuristicBaseExtractor, MarkdownRenderer};
use crate::config::PipelineConfig;
use crate::core::{FailureStage, RepositoryReference, StageName};
use crate::errors::Result;
use crate::events::{kinds, EventSink, NoOpEventSink};
use crate::stages::{
    contain_panics, Enricher, FileDocGenStage, ItemContext, StageSet, StoreAnalysisStage,
    StoreBaseExtractionStage, StoreMergeStage,
};
use crate::store::DocumentStore;
use futures::stream::{self, StreamExt};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Sequences the four stages per reference and aggregates the outcomes.
#[derive(Clone)]
pub struct PipelineController {
    config: PipelineConfig,
    stages: StageSet,
    event_sink: Arc<dyn EventSink>,
}

impl PipelineController {
    /// Creates a controller over an explicit stage set.
    #[must_use]
    pub fn new(config: PipelineConfig, stages: StageSet) -> Self {
        Self {
            config,
            stages,
            event_sink: Arc::new(NoOpEventSink),
        }
    }

    /// Wires the standard collaborators around a document store.
    ///
    /// The remote enricher is used when an AI key is configured and the
    /// `llm` feature is enabled; otherwise enrichment is empty.
    pub fn from_config(config: PipelineConfig, store: Arc<dyn DocumentStore>) -> Result<Self> {
        let analyzer = Arc::new(
            GitRepositoryAnalyzer::new(config.analysis.clone())
                .with_token(config.credentials.code_host_token.clone()),
        );
        let extractor =
            Arc::new(HeuristicBaseExtractor::new().with_top_files(config.analysis.top_files));
        let enricher = build_enricher(&config)?;
        let renderer = Arc::new(MarkdownRenderer::new());

        let stages = StageSet::new(
            Arc::new(StoreAnalysisStage::new(analyzer, store.clone())),
            Arc::new(StoreBaseExtractionStage::new(store.clone(), extractor, enricher)),
            Arc::new(StoreMergeStage::new(store.clone())),
            Arc::new(FileDocGenStage::new(store, renderer, config.reports_dir.clone())),
        );
        Ok(Self::new(config, stages))
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = sink;
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Runs the pipeline without cancellation.
    pub async fn run(&self, references: &[RepositoryReference]) -> ConsolidatedResult {
        self.run_with_cancellation(references, &CancellationToken::new())
            .await
    }

    /// Runs the pipeline, polling `token` before every stage invocation.
    pub async fn run_with_cancellation(
        &self,
        references: &[RepositoryReference],
        token: &CancellationToken,
    ) -> ConsolidatedResult {
        let run_id = Uuid::now_v7();
        let report = PrerequisiteChecker::new(self.config.clone()).check(references);
        if !report.can_run {
            let reason = report
                .reason
                .unwrap_or_else(|| "prerequisites not met".to_string());
            warn!(run_id = %run_id, reason = %reason, "Run rejected");
            self.event_sink.try_emit(
                kinds::PIPELINE_REJECTED,
                Some(json!({ "run_id": run_id, "reason": reason })),
            );
            return ConsolidatedResult::prerequisite_unmet(run_id, reason);
        }

        let started = Instant::now();
        let concurrency = self.config.max_concurrency.max(1);
        info!(run_id = %run_id, items = references.len(), concurrency, "Run started");
        self.event_sink.try_emit(
            kinds::PIPELINE_STARTED,
            Some(json!({
                "run_id": run_id,
                "items": references.len(),
                "max_concurrency": concurrency,
            })),
        );

        let items = if concurrency == 1 {
            let mut items = Vec::with_capacity(references.len());
            for (index, reference) in references.iter().enumerate() {
                items.push(self.run_chain(run_id, index, reference, token).await);
            }
            items
        } else {
            // Completion order is arbitrary; each result lands in its input slot.
            let mut slots: Vec<Option<ItemResult>> = vec![None; references.len()];
            let mut chains = stream::iter(references.iter().enumerate())
                .map(|(index, reference)| self.run_chain(run_id, index, reference, token))
                .buffer_unordered(concurrency);
            while let Some(item) = chains.next().await {
                let index = item.index;
                if let Some(slot) = slots.get_mut(index) {
                    *slot = Some(item);
                }
            }
            slots.into_iter().flatten().collect()
        };

        let result = ConsolidatedResult::from_items(
            run_id,
            items,
            started.elapsed().as_secs_f64() * 1000.0,
        );
        info!(
            run_id = %run_id,
            state = %result.state,
            succeeded = result.succeeded(),
            failed = result.failed(),
            "Run finished"
        );
        self.event_sink.try_emit(
            kinds::PIPELINE_COMPLETED,
            Some(json!({
                "run_id": run_id,
                "state": result.state,
                "succeeded": result.succeeded(),
                "failed": result.failed(),
                "duration_ms": result.duration_ms,
            })),
        );
        result
    }

    async fn run_chain(
        &self,
        run_id: Uuid,
        index: usize,
        reference: &RepositoryReference,
        token: &CancellationToken,
    ) -> ItemResult {
        let started = Instant::now();
        let ctx = ItemContext::new(index, reference.clone(), run_id);
        self.event_sink.try_emit(
            kinds::ITEM_STARTED,
            Some(json!({ "run_id": run_id, "index": index, "repository": reference.url() })),
        );

        let mut state = ChainState::Start;
        while let Some(stage) = state.next_stage() {
            if token.is_cancelled() {
                let reason = token
                    .reason()
                    .unwrap_or_else(|| "run cancelled".to_string());
                state = state.advance(ChainEvent::Cancelled { reason });
                break;
            }

            let stage_started = Instant::now();
            let event = self.invoke(&ctx, &state).await;
            self.report_stage(&ctx, stage, &event, stage_started.elapsed().as_secs_f64() * 1000.0);
            state = state.advance(event);
        }
        if let ChainState::Documented { .. } = state {
            state = state.advance(ChainEvent::Recorded);
        }

        let item = ItemResult::from_state(
            index,
            reference.clone(),
            state,
            started.elapsed().as_secs_f64() * 1000.0,
        );
        self.report_item(run_id, &item);
        item
    }

    /// Invokes the stage that follows `state`.
    async fn invoke(&self, ctx: &ItemContext, state: &ChainState) -> ChainEvent {
        let reference = &ctx.reference;
        match state {
            ChainState::Start => ChainEvent::Analysis(
                contain_panics(StageName::Analysis, reference, self.stages.analysis.analyze(ctx))
                    .await,
            ),
            ChainState::Analyzed { document_id } => ChainEvent::BaseExtraction(
                contain_panics(
                    StageName::BaseExtraction,
                    reference,
                    self.stages.base_extraction.extract(ctx, document_id),
                )
                .await,
            ),
            ChainState::BaseExtracted {
                document_id,
                extraction,
            } => ChainEvent::Merge(
                contain_panics(
                    StageName::Merge,
                    reference,
                    self.stages.merge.merge(ctx, document_id, extraction.clone()),
                )
                .await,
            ),
            ChainState::Merged { document_id, .. } => ChainEvent::DocGen(
                contain_panics(
                    StageName::DocGen,
                    reference,
                    self.stages.doc_gen.generate(ctx, document_id),
                )
                .await,
            ),
            ChainState::Documented { .. } | ChainState::Done { .. } | ChainState::Failed { .. } => {
                ChainEvent::Recorded
            }
        }
    }

    fn report_stage(
        &self,
        ctx: &ItemContext,
        stage: StageName,
        event: &ChainEvent,
        duration_ms: f64,
    ) {
        match event.stage_failure() {
            None => {
                debug!(
                    index = ctx.index,
                    repository = %ctx.reference.url(),
                    stage = %stage,
                    duration_ms,
                    "Stage succeeded"
                );
                self.event_sink.try_emit(
                    kinds::STAGE_SUCCEEDED,
                    Some(json!({
                        "run_id": ctx.run_id,
                        "index": ctx.index,
                        "repository": ctx.reference.url(),
                        "stage": stage,
                        "duration_ms": duration_ms,
                    })),
                );
            }
            Some(failure) => {
                warn!(
                    index = ctx.index,
                    repository = %ctx.reference.url(),
                    stage = %stage,
                    reason = %failure,
                    "Stage failed"
                );
                self.event_sink.try_emit(
                    kinds::STAGE_FAILED,
                    Some(json!({
                        "run_id": ctx.run_id,
                        "index": ctx.index,
                        "repository": ctx.reference.url(),
                        "stage": stage,
                        "cause": failure.cause,
                        "reason": failure.reason(),
                        "duration_ms": duration_ms,
                    })),
                );
            }
        }
    }

    fn report_item(&self, run_id: Uuid, item: &ItemResult) {
        let data = json!({
            "run_id": run_id,
            "index": item.index,
            "repository": item.reference.url(),
            "document_id": item.document_id,
            "artifact_path": item.artifact_path,
            "failure_stage": item.failure_stage,
            "stage": item.stage,
            "reason": item.reason,
            "duration_ms": item.duration_ms,
        });

        if item.is_success() {
            info!(
                index = item.index,
                repository = %item.reference.url(),
                document_id = ?item.document_id,
                "Item succeeded"
            );
            self.event_sink.try_emit(kinds::ITEM_SUCCEEDED, Some(data));
        } else if item.failure_stage == Some(FailureStage::Cancelled) {
            info!(index = item.index, repository = %item.reference.url(), "Item cancelled");
            self.event_sink.try_emit(kinds::ITEM_CANCELLED, Some(data));
        } else {
            warn!(
                index = item.index,
                repository = %item.reference.url(),
                failure_stage = ?item.failure_stage,
                reason = ?item.reason,
                "Item failed"
            );
            self.event_sink.try_emit(kinds::ITEM_FAILED, Some(data));
        }
    }
}

impl std::fmt::Debug for PipelineController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineController")
            .field("config", &self.config)
            .field("stages", &self.stages)
            .finish_non_exhaustive()
    }
}

#[cfg(feature = "llm")]
fn build_enricher(config: &PipelineConfig) -> Result<Arc<dyn Enricher>> {
    use crate::collaborators::{NoOpEnricher, OpenAiCompatibleEnricher};

    match config.credentials.ai_api_key.as_deref() {
        Some(key) if config.credentials.has_ai_api_key() => {
            let enricher = OpenAiCompatibleEnricher::new(config.ai.clone(), key)?;
            info!(model = %config.ai.model, "AI enrichment enabled");
            Ok(Arc::new(enricher))
        }
        _ => {
            info!("No AI key configured; enrichment disabled");
            Ok(Arc::new(NoOpEnricher::new()))
        }
    }
}

#[cfg(not(feature = "llm"))]
fn build_enricher(_config: &PipelineConfig) -> Result<Arc<dyn Enricher>> {
    info!("Built without the llm feature; enrichment disabled");
    Ok(Arc::new(crate::collaborators::NoOpEnricher::new()))
}
