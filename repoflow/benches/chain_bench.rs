//! Benchmarks for the per-reference chain state machine.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use repoflow::core::{
    BaseExtraction, DocumentId, FailureCause, RepositoryReference, StageFailure, StageName,
    StageOutcome,
};
use repoflow::pipeline::{ChainEvent, ChainState, ConsolidatedResult, ItemResult};
use repoflow::stages::{AnalysisOutput, MergeConfirmation};
use std::path::PathBuf;
use uuid::Uuid;

fn happy_path(reference: &RepositoryReference) -> ChainState {
    let id = DocumentId::parse("doc-1").unwrap();
    let extraction = BaseExtraction {
        base: Default::default(),
        enrichment: Default::default(),
        source_version: 1,
    };
    ChainState::Start
        .advance(ChainEvent::Analysis(StageOutcome::success(
            StageName::Analysis,
            reference,
            AnalysisOutput::new("doc-1"),
        )))
        .advance(ChainEvent::BaseExtraction(StageOutcome::success(
            StageName::BaseExtraction,
            reference,
            extraction,
        )))
        .advance(ChainEvent::Merge(StageOutcome::success(
            StageName::Merge,
            reference,
            MergeConfirmation {
                document_id: id,
                version: 2,
                merged_insights: 0,
                dropped_insights: 0,
            },
        )))
        .advance(ChainEvent::DocGen(StageOutcome::success(
            StageName::DocGen,
            reference,
            PathBuf::from("reports/WIDGETS.md"),
        )))
        .advance(ChainEvent::Recorded)
}

fn chain_benchmark(c: &mut Criterion) {
    let reference = RepositoryReference::public("https://github.com/acme/widgets").unwrap();

    c.bench_function("chain_happy_path", |b| {
        b.iter(|| black_box(happy_path(black_box(&reference))));
    });

    c.bench_function("chain_analysis_failure", |b| {
        b.iter(|| {
            black_box(ChainState::Start.advance(ChainEvent::Analysis(StageOutcome::<
                AnalysisOutput,
            >::failure(
                StageName::Analysis,
                &reference,
                StageFailure::new(FailureCause::Timeout, "clone took too long"),
            ))))
        });
    });

    c.bench_function("consolidate_1000_items", |b| {
        let items: Vec<ItemResult> = (0..1000)
            .rev()
            .map(|index| {
                ItemResult::from_state(index, reference.clone(), happy_path(&reference), 1.0)
            })
            .collect();
        b.iter(|| {
            black_box(ConsolidatedResult::from_items(
                Uuid::new_v4(),
                items.clone(),
                1.0,
            ))
        });
    });
}

criterion_group!(benches, chain_benchmark);
criterion_main!(benches);
