//! Provenance data types for pipeline run reports.

use crate::model::{ConceptId, PaperId, StrategyKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How a run ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "reason")]
pub enum RunOutcome {
    /// Every valid paper was processed
    Complete,
    /// Cancelled; the graph holds whatever was consolidated before that
    Partial,
    /// No valid input; the graph is empty
    InputError(String),
}

/// Category of a diagnostic entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    InputError,
    StrategyFailure,
    ProviderUnavailable,
    CycleDetected,
    NonConvergence,
    Cancelled,
    NoStrategySucceeded,
}

impl std::fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::InputError => "input_error",
            Self::StrategyFailure => "strategy_failure",
            Self::ProviderUnavailable => "provider_unavailable",
            Self::CycleDetected => "cycle_detected",
            Self::NonConvergence => "non_convergence",
            Self::Cancelled => "cancelled",
            Self::NoStrategySucceeded => "no_strategy_succeeded",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
}

/// A component that ran in a reduced mode
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Degradation {
    /// e.g. `embedding_strategy`, `consolidation`, `hierarchy`
    pub component: String,
    pub reason: String,
}

impl Degradation {
    pub fn new(component: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            reason: reason.into(),
        }
    }
}

/// Result of one strategy on one paper
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyStatus {
    Succeeded,
    Degraded,
    Failed,
    InputTooShort,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyRun {
    pub strategy: StrategyKind,
    pub paper_id: PaperId,
    pub status: StrategyStatus,
    pub candidates: usize,
    pub elapsed_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// A paper excluded before extraction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedPaper {
    pub paper_id: PaperId,
    pub reason: String,
}

/// Where a proposed is_a edge came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeOrigin {
    Hearst,
    Clustering,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// Adding the edge would close an is_a cycle
    Cycle,
    /// Parent and child are the same concept after resolution
    SelfLoop,
    /// The parent still reaches the child through a longer is_a path
    LevelSkip,
    /// No level assignment keeps parent and child exactly one level apart
    LevelConflict,
}

/// A hierarchy edge that was proposed but not kept
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedEdge {
    pub parent: ConceptId,
    pub child: ConceptId,
    pub origin: EdgeOrigin,
    pub reason: RejectReason,
}

/// Convergence of the importance ranking computed at validation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankingSummary {
    pub iterations: usize,
    pub delta: f64,
    pub converged: bool,
}

/// Everything a run did, degraded, rejected or dropped
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvenanceReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    pub papers_total: usize,
    pub papers_processed: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped_papers: Vec<SkippedPaper>,
    pub strategies: Vec<StrategyKind>,
    pub strategy_runs: Vec<StrategyRun>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub degradations: Vec<Degradation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rejected_edges: Vec<RejectedEdge>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dropped_ungrounded: Vec<ConceptId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ranking: Option<RankingSummary>,
    pub concepts: usize,
    pub outcome: RunOutcome,
}
