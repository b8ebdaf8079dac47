//! Consolidation: run strategies, then fold their candidates into concepts

mod merger;
mod orchestrator;

pub use merger::{ConceptMerger, MatchMode};
pub use orchestrator::{ConceptOrchestrator, Consolidation, StrategyOutcome};
