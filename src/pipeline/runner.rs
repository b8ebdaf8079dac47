use super::{ConceptPipeline, PipelineError, PipelineOutput};
use crate::cancel::CancellationToken;
use crate::consolidation::{ConceptOrchestrator, StrategyOutcome};
use crate::evidence::{index_sentences, EvidenceLinker};
use crate::extraction::{check_length, ExtractionError};
use crate::graph::{ConceptGraph, EdgeKind};
use crate::hierarchy::{Hierarchy, HierarchyBuilder};
use crate::model::{Paper, StrategyKind};
use crate::provenance::{
    Degradation, DiagnosticKind, ProvenanceReport, RejectReason, RunOutcome, StrategyRun,
    StrategyStatus,
};
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use tracing::{info, warn};

impl ConceptPipeline {
    /// Run over a batch of papers.
    pub async fn run(&self, papers: Vec<Paper>) -> Result<PipelineOutput, PipelineError> {
        self.run_with_cancellation(papers, &CancellationToken::new()).await
    }

    /// Run over a batch, polling `cancel` between papers.
    ///
    /// On cancellation the papers already extracted are consolidated and
    /// returned with `RunOutcome::Partial`.
    pub async fn run_with_cancellation(
        &self,
        papers: Vec<Paper>,
        cancel: &CancellationToken,
    ) -> Result<PipelineOutput, PipelineError> {
        let orchestrator = ConceptOrchestrator::new(Arc::clone(&self.config), self.pool.clone());
        let mut report = ProvenanceReport::new(papers.len(), orchestrator.strategies());
        info!(run_id = %report.run_id, papers = papers.len(), "pipeline run started");

        let valid = self.admit(papers, &mut report);
        if valid.is_empty() {
            report.finish(RunOutcome::InputError("no valid papers in batch".into()));
            return self.empty_output(report);
        }

        let corpus = Arc::new(orchestrator.prepare_corpus(&valid).await);
        if let Some(reason) = &corpus.document_clustering_degraded {
            report.degrade(Degradation::new("document_clustering", reason.clone()));
        }

        let mut outcomes = Vec::new();
        let mut processed = Vec::new();
        let mut failed = BTreeSet::new();
        let mut cancelled = false;
        for paper in valid {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }
            let batch = orchestrator
                .extract_paper(Arc::new(paper.clone()), Arc::clone(&corpus))
                .await;
            record_outcomes(&batch, &mut report, &mut failed);
            outcomes.extend(batch);
            processed.push(paper);
        }
        report.papers_processed = processed.len();
        if cancelled {
            warn!(processed = processed.len(), "run cancelled; keeping partial results");
            report.diagnose(
                DiagnosticKind::Cancelled,
                format!("cancelled after {} papers", processed.len()),
            );
        }

        let consolidation = orchestrator.consolidate(&outcomes).await;
        for degradation in consolidation.degradations.iter().cloned() {
            report.degrade(degradation);
        }
        if let Some(reason) = &consolidation.diagnostic {
            report.diagnose(DiagnosticKind::NoStrategySucceeded, reason.clone());
        }

        let sentences = index_sentences(&processed);
        let linker = EvidenceLinker::new(self.config.evidence.clone());
        let (concepts, linked) = linker.link(consolidation.concepts, &sentences);
        report.drop_ungrounded(linked.dropped);

        if concepts.is_empty() {
            if cancelled {
                report.finish(RunOutcome::Partial);
                return self.empty_output(report);
            }
            report.finish(RunOutcome::Complete);
            warn!(papers = processed.len(), "no concepts survived consolidation and evidence linking");
            return Err(PipelineError::NoConcepts {
                papers: processed.len(),
                report: Box::new(report),
            });
        }

        let builder = HierarchyBuilder::new(self.config.hierarchy.clone(), self.config.evidence.max_sentences);
        let hierarchy = builder.build(concepts, &consolidation.hypernyms);
        self.record_hierarchy(&hierarchy, &mut report);

        let graph = self.assemble(hierarchy, &mut report)?;
        report.concepts = graph.node_count();
        report.finish(if cancelled {
            RunOutcome::Partial
        } else {
            RunOutcome::Complete
        });
        info!(
            run_id = %report.run_id,
            concepts = report.concepts,
            edges = graph.edges().len(),
            degradations = report.degradations.len(),
            "pipeline run finished"
        );
        Ok(PipelineOutput { graph, report })
    }

    /// Drop empty, too-short and duplicate papers, recording each.
    fn admit(&self, papers: Vec<Paper>, report: &mut ProvenanceReport) -> Vec<Paper> {
        let mut seen = HashSet::new();
        let mut valid = Vec::with_capacity(papers.len());
        for paper in papers {
            if let Err(e) = check_length(&paper, self.config.min_text_length) {
                report.skip_paper(paper.id.clone(), e.to_string());
                continue;
            }
            if !seen.insert(paper.id.clone()) {
                report.skip_paper(paper.id.clone(), "duplicate paper id");
                continue;
            }
            valid.push(paper);
        }
        valid
    }

    fn record_hierarchy(&self, hierarchy: &Hierarchy, report: &mut ProvenanceReport) {
        for rejected in hierarchy.rejected.iter().filter(|r| r.reason == RejectReason::Cycle) {
            report.diagnose(
                DiagnosticKind::CycleDetected,
                format!("rejected is_a {} -> {}: would close a cycle", rejected.parent, rejected.child),
            );
        }
        report.reject_edges(hierarchy.rejected.iter().cloned());

        if let Some(reason) = &hierarchy.inference_skipped {
            if self.pool.is_some() && self.config.hierarchy.infer_from_embeddings {
                report.degrade(Degradation::new("hierarchy_inference", reason.clone()));
            }
        }
    }

    /// Populate, validate and publish the graph.
    fn assemble(&self, hierarchy: Hierarchy, report: &mut ProvenanceReport) -> Result<ConceptGraph, PipelineError> {
        let mut graph = ConceptGraph::new(self.config.graph.clone());
        for concept in hierarchy.concepts {
            graph.add_node(concept)?;
        }
        for edge in &hierarchy.edges {
            graph.add_edge(&edge.parent, &edge.child, EdgeKind::IsA, edge.weight)?;
        }
        graph.derive_relations()?;
        let summary = graph.validate()?.summary();
        report.set_ranking(summary);
        graph.publish()?;
        Ok(graph)
    }

    fn empty_output(&self, report: ProvenanceReport) -> Result<PipelineOutput, PipelineError> {
        let mut graph = ConceptGraph::new(self.config.graph.clone());
        graph.validate()?;
        graph.publish()?;
        Ok(PipelineOutput { graph, report })
    }
}

/// Add one paper's strategy outcomes to the report. Failures are
/// diagnosed once per strategy; every run is listed.
fn record_outcomes(outcomes: &[StrategyOutcome], report: &mut ProvenanceReport, failed: &mut BTreeSet<StrategyKind>) {
    for outcome in outcomes {
        let component = format!("{}_strategy", outcome.strategy);
        let run = match &outcome.result {
            Ok(result) => {
                let status = if result.metadata.input_too_short {
                    StrategyStatus::InputTooShort
                } else if let Some(reason) = &result.metadata.degraded {
                    report.degrade(Degradation::new(component.as_str(), reason.clone()));
                    StrategyStatus::Degraded
                } else {
                    StrategyStatus::Succeeded
                };
                StrategyRun {
                    strategy: outcome.strategy,
                    paper_id: outcome.paper_id.clone(),
                    status,
                    candidates: result.candidates.len(),
                    elapsed_ms: result.metadata.elapsed_ms,
                    message: result.metadata.degraded.clone(),
                }
            }
            Err(e) => {
                report.degrade(Degradation::new(component.as_str(), e.to_string()));
                if failed.insert(outcome.strategy) {
                    let kind = match e {
                        ExtractionError::ProviderUnavailable(_) => DiagnosticKind::ProviderUnavailable,
                        ExtractionError::InputTooShort { .. } => DiagnosticKind::InputError,
                        ExtractionError::Execution(_) => DiagnosticKind::StrategyFailure,
                    };
                    report.diagnose(kind, format!("{} failed: {}", outcome.strategy, e));
                }
                StrategyRun {
                    strategy: outcome.strategy,
                    paper_id: outcome.paper_id.clone(),
                    status: StrategyStatus::Failed,
                    candidates: 0,
                    elapsed_ms: 0,
                    message: Some(e.to_string()),
                }
            }
        };
        report.record_run(run);
    }
}
