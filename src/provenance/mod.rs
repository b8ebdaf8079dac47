//! Provenance: the per-run report of what ran, degraded and was rejected.

mod report;
pub mod types;

pub use types::{
    Degradation, Diagnostic, DiagnosticKind, EdgeOrigin, ProvenanceReport, RankingSummary,
    RejectReason, RejectedEdge, RunOutcome, SkippedPaper, StrategyRun, StrategyStatus,
};
