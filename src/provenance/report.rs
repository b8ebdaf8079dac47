use super::types::{
    Degradation, Diagnostic, DiagnosticKind, ProvenanceReport, RankingSummary, RejectedEdge,
    RunOutcome, SkippedPaper, StrategyRun, StrategyStatus,
};
use crate::model::{ConceptId, PaperId, StrategyKind};
use chrono::Utc;
use std::collections::BTreeSet;
use uuid::Uuid;

impl ProvenanceReport {
    /// Start a report for a run over `papers_total` papers.
    pub fn new(papers_total: usize, strategies: Vec<StrategyKind>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: None,
            papers_total,
            papers_processed: 0,
            skipped_papers: Vec::new(),
            strategies,
            strategy_runs: Vec::new(),
            degradations: Vec::new(),
            diagnostics: Vec::new(),
            rejected_edges: Vec::new(),
            dropped_ungrounded: Vec::new(),
            ranking: None,
            concepts: 0,
            outcome: RunOutcome::Complete,
        }
    }

    pub fn skip_paper(&mut self, paper_id: PaperId, reason: impl Into<String>) {
        let reason = reason.into();
        self.diagnose(
            DiagnosticKind::InputError,
            format!("paper {} skipped: {}", paper_id, reason),
        );
        self.skipped_papers.push(SkippedPaper { paper_id, reason });
    }

    pub fn record_run(&mut self, run: StrategyRun) {
        self.strategy_runs.push(run);
    }

    /// Record a degradation once; repeats of the same component and reason
    /// are ignored.
    pub fn degrade(&mut self, degradation: Degradation) {
        if !self.degradations.contains(&degradation) {
            self.degradations.push(degradation);
        }
    }

    pub fn diagnose(&mut self, kind: DiagnosticKind, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            kind,
            message: message.into(),
        });
    }

    pub fn reject_edges(&mut self, edges: impl IntoIterator<Item = RejectedEdge>) {
        self.rejected_edges.extend(edges);
    }

    pub fn drop_ungrounded(&mut self, ids: impl IntoIterator<Item = ConceptId>) {
        self.dropped_ungrounded.extend(ids);
    }

    pub fn set_ranking(&mut self, ranking: RankingSummary) {
        if !ranking.converged {
            self.diagnose(
                DiagnosticKind::NonConvergence,
                format!(
                    "importance ranking did not converge after {} iterations (delta {:.2e})",
                    ranking.iterations, ranking.delta
                ),
            );
        }
        self.ranking = Some(ranking);
    }

    /// Stamp the finish time and outcome.
    pub fn finish(&mut self, outcome: RunOutcome) {
        self.outcome = outcome;
        self.finished_at = Some(Utc::now());
    }

    /// Strategies with at least one run that was not a failure
    pub fn strategies_succeeded(&self) -> BTreeSet<StrategyKind> {
        self.strategy_runs
            .iter()
            .filter(|r| r.status != StrategyStatus::Failed)
            .map(|r| r.strategy)
            .collect()
    }

    pub fn is_degraded(&self, component: &str) -> bool {
        self.degradations.iter().any(|d| d.component == component)
    }

    pub fn diagnostics_of(&self, kind: DiagnosticKind) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(move |d| d.kind == kind)
    }

    pub fn is_partial(&self) -> bool {
        self.outcome == RunOutcome::Partial
    }
}
