//! Testing utilities for repoflow pipelines.
//!
//! This module provides:
//! - Sample raw layers and a fixed-answer repository analyzer
//! - Scripted stage fakes with per-repository failures, delays and panics

mod fixtures;
mod mocks;

pub use fixtures::{sample_raw_layer, StaticAnalyzer};
pub use mocks::{
    ScriptedAnalysis, ScriptedBaseExtraction, ScriptedDocGen, ScriptedMerge,
    ScriptedStages,
};
