//! Scripted stage fakes for testing the controller.
//!
//! Every fake succeeds by default. Per repository URL it can be told to
//! delay, fail with a classified cause, or panic. Calls are recorded in
//! the order they happen.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::config::PipelineConfig;
use crate::core::{
    BaseExtraction, BaseSummary, DocumentId, EnrichmentData, FailureCause, StageFailure,
    StageName, StageOutcome,
};
use crate::pipeline::PipelineController;
use crate::stages::{
    AnalysisOutput, AnalysisStage, BaseExtractionStage, DocGenStage, ItemContext,
    MergeConfirmation, MergeStage, StageSet,
};

#[derive(Debug, Clone)]
enum Behavior {
    Fail(StageFailure),
    Panic,
}

#[derive(Debug, Default)]
struct Book {
    delays: HashMap<String, Duration>,
    behaviors: HashMap<String, Behavior>,
    calls: Vec<String>,
}

/// Per-URL script and call log shared by the fakes.
#[derive(Debug, Default)]
struct Script {
    book: Mutex<Book>,
}

impl Script {
    fn delay_for(&self, url: &str, delay: Duration) {
        self.book.lock().delays.insert(url.to_string(), delay);
    }

    fn fail_for(&self, url: &str, failure: StageFailure) {
        self.book
            .lock()
            .behaviors
            .insert(url.to_string(), Behavior::Fail(failure));
    }

    fn panic_for(&self, url: &str) {
        self.book.lock().behaviors.insert(url.to_string(), Behavior::Panic);
    }

    /// Records the call, waits out any delay, then returns the scripted failure.
    async fn enter(&self, stage: StageName, url: &str) -> Option<StageFailure> {
        let (delay, behavior) = {
            let mut book = self.book.lock();
            book.calls.push(url.to_string());
            (book.delays.get(url).copied(), book.behaviors.get(url).cloned())
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match behavior {
            Some(Behavior::Fail(failure)) => Some(failure),
            Some(Behavior::Panic) => panic!("scripted {stage} panic for {url}"),
            None => None,
        }
    }

    fn calls(&self) -> Vec<String> {
        self.book.lock().calls.clone()
    }

    fn calls_for(&self, url: &str) -> usize {
        self.book.lock().calls.iter().filter(|c| *c == url).count()
    }
}

macro_rules! scripted_common {
    ($ty:ident) => {
        impl $ty {
            /// Adds a delay before answering for `url`.
            #[must_use]
            pub fn delay_for(self, url: &str, delay: Duration) -> Self {
                self.script.delay_for(url, delay);
                self
            }

            /// Fails every call for `url` with `cause`.
            #[must_use]
            pub fn fail_for(self, url: &str, cause: FailureCause, message: &str) -> Self {
                self.script.fail_for(url, StageFailure::new(cause, message));
                self
            }

            /// Panics on every call for `url`.
            #[must_use]
            pub fn panic_for(self, url: &str) -> Self {
                self.script.panic_for(url);
                self
            }

            /// URLs this stage was invoked for, in call order.
            #[must_use]
            pub fn calls(&self) -> Vec<String> {
                self.script.calls()
            }

            /// Total number of invocations.
            #[must_use]
            pub fn call_count(&self) -> usize {
                self.script.calls().len()
            }

            /// Number of invocations for one URL.
            #[must_use]
            pub fn calls_for(&self, url: &str) -> usize {
                self.script.calls_for(url)
            }
        }
    };
}

/// Analysis fake handing out `doc-1`, `doc-2`, ... unless told otherwise.
#[derive(Debug, Default)]
pub struct ScriptedAnalysis {
    script: Script,
    next_id: AtomicUsize,
    ids: Mutex<HashMap<String, String>>,
    issued: Mutex<Vec<String>>,
}

impl ScriptedAnalysis {
    /// Creates a fake that always succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reports success for `url` but with `id` as the document id.
    #[must_use]
    pub fn return_id_for(self, url: &str, id: &str) -> Self {
        self.ids.lock().insert(url.to_string(), id.to_string());
        self
    }

    /// Every document id returned so far.
    #[must_use]
    pub fn issued_ids(&self) -> Vec<String> {
        self.issued.lock().clone()
    }
}

scripted_common!(ScriptedAnalysis);

#[async_trait]
impl AnalysisStage for ScriptedAnalysis {
    async fn analyze(&self, ctx: &ItemContext) -> StageOutcome<AnalysisOutput> {
        let url = ctx.reference.url();
        if let Some(failure) = self.script.enter(StageName::Analysis, url).await {
            return StageOutcome::failure(StageName::Analysis, &ctx.reference, failure);
        }
        let id = self.ids.lock().get(url).cloned().unwrap_or_else(|| {
            format!("doc-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
        });
        self.issued.lock().push(id.clone());
        StageOutcome::success(StageName::Analysis, &ctx.reference, AnalysisOutput::new(id))
    }
}

/// Base-extraction fake returning an empty extraction.
#[derive(Debug, Default)]
pub struct ScriptedBaseExtraction {
    script: Script,
    seen_ids: Mutex<Vec<DocumentId>>,
}

impl ScriptedBaseExtraction {
    /// Creates a fake that always succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Document ids this stage received.
    #[must_use]
    pub fn seen_ids(&self) -> Vec<DocumentId> {
        self.seen_ids.lock().clone()
    }
}

scripted_common!(ScriptedBaseExtraction);

#[async_trait]
impl BaseExtractionStage for ScriptedBaseExtraction {
    async fn extract(&self, ctx: &ItemContext, id: &DocumentId) -> StageOutcome<BaseExtraction> {
        self.seen_ids.lock().push(id.clone());
        let failure = self
            .script
            .enter(StageName::BaseExtraction, ctx.reference.url())
            .await;
        if let Some(failure) = failure {
            return StageOutcome::failure(StageName::BaseExtraction, &ctx.reference, failure);
        }
        StageOutcome::success(
            StageName::BaseExtraction,
            &ctx.reference,
            BaseExtraction {
                base: BaseSummary::default(),
                enrichment: EnrichmentData::default(),
                source_version: 1,
            },
        )
    }
}

/// Merge fake confirming version 2.
#[derive(Debug, Default)]
pub struct ScriptedMerge {
    script: Script,
}

impl ScriptedMerge {
    /// Creates a fake that always succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

scripted_common!(ScriptedMerge);

#[async_trait]
impl MergeStage for ScriptedMerge {
    async fn merge(
        &self,
        ctx: &ItemContext,
        id: &DocumentId,
        extraction: BaseExtraction,
    ) -> StageOutcome<MergeConfirmation> {
        if let Some(failure) = self.script.enter(StageName::Merge, ctx.reference.url()).await {
            return StageOutcome::failure(StageName::Merge, &ctx.reference, failure);
        }
        StageOutcome::success(
            StageName::Merge,
            &ctx.reference,
            MergeConfirmation {
                document_id: id.clone(),
                version: extraction.source_version + 1,
                merged_insights: extraction.enrichment.files.len(),
                dropped_insights: 0,
            },
        )
    }
}

/// Doc-gen fake returning `reports/<NAME>.md` without touching the disk.
#[derive(Debug, Default)]
pub struct ScriptedDocGen {
    script: Script,
    empty_paths: Mutex<Vec<String>>,
}

impl ScriptedDocGen {
    /// Creates a fake that always succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reports success for `url` with an empty artifact path.
    #[must_use]
    pub fn empty_path_for(self, url: &str) -> Self {
        self.empty_paths.lock().push(url.to_string());
        self
    }
}

scripted_common!(ScriptedDocGen);

#[async_trait]
impl DocGenStage for ScriptedDocGen {
    async fn generate(&self, ctx: &ItemContext, _id: &DocumentId) -> StageOutcome<PathBuf> {
        let url = ctx.reference.url();
        if let Some(failure) = self.script.enter(StageName::DocGen, url).await {
            return StageOutcome::failure(StageName::DocGen, &ctx.reference, failure);
        }
        let path = if self.empty_paths.lock().iter().any(|u| u == url) {
            PathBuf::new()
        } else {
            PathBuf::from("reports").join(format!(
                "{}.md",
                ctx.reference.repository_name().to_uppercase()
            ))
        };
        StageOutcome::success(StageName::DocGen, &ctx.reference, path)
    }
}

/// The four scripted fakes, kept as handles for assertions.
#[derive(Debug, Clone)]
pub struct ScriptedStages {
    /// Analysis fake.
    pub analysis: Arc<ScriptedAnalysis>,
    /// Base-extraction fake.
    pub base_extraction: Arc<ScriptedBaseExtraction>,
    /// Merge fake.
    pub merge: Arc<ScriptedMerge>,
    /// Doc-gen fake.
    pub doc_gen: Arc<ScriptedDocGen>,
}

impl Default for ScriptedStages {
    fn default() -> Self {
        Self::new(
            ScriptedAnalysis::new(),
            ScriptedBaseExtraction::new(),
            ScriptedMerge::new(),
            ScriptedDocGen::new(),
        )
    }
}

impl ScriptedStages {
    /// Bundles configured fakes.
    #[must_use]
    pub fn new(
        analysis: ScriptedAnalysis,
        base_extraction: ScriptedBaseExtraction,
        merge: ScriptedMerge,
        doc_gen: ScriptedDocGen,
    ) -> Self {
        Self {
            analysis: Arc::new(analysis),
            base_extraction: Arc::new(base_extraction),
            merge: Arc::new(merge),
            doc_gen: Arc::new(doc_gen),
        }
    }

    /// The fakes as a stage set.
    #[must_use]
    pub fn stage_set(&self) -> StageSet {
        StageSet::new(
            self.analysis.clone(),
            self.base_extraction.clone(),
            self.merge.clone(),
            self.doc_gen.clone(),
        )
    }

    /// A controller driving the fakes.
    #[must_use]
    pub fn controller(&self, config: PipelineConfig) -> PipelineController {
        PipelineController::new(config, self.stage_set())
    }

    /// Total invocations across all four fakes.
    #[must_use]
    pub fn total_calls(&self) -> usize {
        self.analysis.call_count()
            + self.base_extraction.call_count()
            + self.merge.call_count()
            + self.doc_gen.call_count()
    }
}
