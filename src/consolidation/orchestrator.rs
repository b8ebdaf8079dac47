//! Multi-strategy orchestrator
//!
//! Runs the configured strategies concurrently (one task per strategy per
//! paper), then reduces their outputs single-threaded through the merger.

use super::merger::{ConceptMerger, MatchMode};
use crate::config::PipelineConfig;
use crate::embedding::EmbeddingPool;
use crate::extraction::{
    build_corpus_context, CorpusContext, ExtractionError, ExtractionResult, ExtractionStrategy,
    HypernymPair,
};
use crate::model::{Concept, Paper, PaperId, StrategyKind};
use crate::provenance::Degradation;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// What one strategy did with one paper
#[derive(Debug, Clone)]
pub struct StrategyOutcome {
    pub strategy: StrategyKind,
    pub paper_id: PaperId,
    pub result: Result<ExtractionResult, ExtractionError>,
}

/// Output of the reduction step
#[derive(Debug, Clone)]
pub struct Consolidation {
    /// Ranked, truncated concepts
    pub concepts: Vec<Concept>,
    /// Explicit is_a pairs from every successful result, deduplicated
    pub hypernyms: Vec<HypernymPair>,
    pub mode: MatchMode,
    pub degradations: Vec<Degradation>,
    /// Set when every strategy run failed
    pub diagnostic: Option<String>,
}

/// Coordinates extraction strategies and consolidation
pub struct ConceptOrchestrator {
    strategies: Vec<ExtractionStrategy>,
    config: Arc<PipelineConfig>,
    merger: ConceptMerger,
    pool: Option<EmbeddingPool>,
}

impl ConceptOrchestrator {
    pub fn new(config: Arc<PipelineConfig>, pool: Option<EmbeddingPool>) -> Self {
        Self {
            strategies: ExtractionStrategy::from_config(&config, pool.clone()),
            merger: ConceptMerger::new(config.consolidation.clone(), config.weights.clone()),
            config,
            pool,
        }
    }

    /// Enabled strategies, in execution order
    pub fn strategies(&self) -> Vec<StrategyKind> {
        self.strategies.iter().map(ExtractionStrategy::kind).collect()
    }

    fn position(&self, kind: StrategyKind) -> usize {
        self.strategies
            .iter()
            .position(|s| s.kind() == kind)
            .unwrap_or(usize::MAX)
    }

    /// Compute corpus-wide statistics once per run.
    ///
    /// Document clustering needs the provider; if it fails the context
    /// carries the reason and extraction continues without clusters.
    pub async fn prepare_corpus(&self, papers: &[Paper]) -> CorpusContext {
        let mut context = build_corpus_context(
            papers,
            &self.config.statistical,
            self.config.rule_based.max_phrase_words,
            self.config.seed,
            self.config.is_enabled(StrategyKind::Statistical),
        );

        let embedding = self.strategies.iter().find_map(|s| match s {
            ExtractionStrategy::Embedding(e) => Some(e),
            _ => None,
        });
        if let (Some(strategy), Some(_)) = (embedding, &self.pool) {
            match strategy.cluster_documents(papers).await {
                Ok(clusters) => {
                    debug!(groups = clusters.len(), "document clusters ready");
                    context.document_clusters = clusters;
                }
                Err(e) => {
                    warn!(error = %e, "document clustering failed; continuing without clusters");
                    context.document_clustering_degraded =
                        Some(format!("document clustering unavailable: {}", e));
                }
            }
        }
        context
    }

    /// Run every enabled strategy on one paper concurrently.
    ///
    /// Failures are captured per strategy; the returned outcomes follow the
    /// configured strategy order.
    pub async fn extract_paper(&self, paper: Arc<Paper>, corpus: Arc<CorpusContext>) -> Vec<StrategyOutcome> {
        let min_text_length = self.config.min_text_length;
        let mut tasks = JoinSet::new();
        for strategy in self.strategies.iter().cloned() {
            let paper = Arc::clone(&paper);
            let corpus = Arc::clone(&corpus);
            tasks.spawn(async move {
                let kind = strategy.kind();
                let result = strategy.extract(&paper, &corpus, min_text_length).await;
                (kind, result)
            });
        }

        let mut outcomes = Vec::with_capacity(self.strategies.len());
        let mut join_failure: Option<String> = None;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((strategy, result)) => {
                    if let Err(e) = &result {
                        warn!(strategy = %strategy, paper = %paper.id, error = %e, "strategy failed");
                    }
                    outcomes.push(StrategyOutcome {
                        strategy,
                        paper_id: paper.id.clone(),
                        result,
                    });
                }
                Err(e) => {
                    join_failure.get_or_insert_with(|| e.to_string());
                }
            }
        }

        // A task that panicked reports no kind; attribute the failure to
        // whichever strategies are missing.
        if let Some(reason) = join_failure {
            let seen: BTreeSet<StrategyKind> = outcomes.iter().map(|o| o.strategy).collect();
            for kind in self.strategies().into_iter().filter(|k| !seen.contains(k)) {
                warn!(strategy = %kind, paper = %paper.id, error = %reason, "strategy task aborted");
                outcomes.push(StrategyOutcome {
                    strategy: kind,
                    paper_id: paper.id.clone(),
                    result: Err(ExtractionError::Execution(reason.clone())),
                });
            }
        }

        outcomes.sort_by_key(|o| self.position(o.strategy));
        outcomes
    }

    /// Merge successful results into ranked concepts.
    pub async fn consolidate(&self, outcomes: &[StrategyOutcome]) -> Consolidation {
        let results: Vec<ExtractionResult> = outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok().cloned())
            .collect();
        let mut degradations = Vec::new();

        if !outcomes.is_empty() && results.is_empty() {
            warn!(runs = outcomes.len(), "every strategy failed");
            return Consolidation {
                concepts: Vec::new(),
                hypernyms: Vec::new(),
                mode: MatchMode::Lexical,
                degradations,
                diagnostic: Some(format!(
                    "all {} strategy runs failed; no candidates to consolidate",
                    outcomes.len()
                )),
            };
        }

        let keys = ConceptMerger::keys(&results);
        let embeddings = match &self.pool {
            Some(pool) if !keys.is_empty() => match pool.embed(&keys).await {
                Ok(vectors) => Some(keys.iter().cloned().zip(vectors).collect::<HashMap<_, _>>()),
                Err(e) => {
                    warn!(error = %e, "embedding consolidated keys failed; using lexical matching");
                    degradations.push(Degradation::new(
                        "consolidation",
                        format!("semantic merge unavailable, lexical fallback used: {}", e),
                    ));
                    None
                }
            },
            _ => None,
        };

        let (concepts, mode) = self.merger.merge(&results, embeddings.as_ref());
        let hypernyms = dedupe_hypernyms(&results);
        info!(
            candidates = results.iter().map(|r| r.candidates.len()).sum::<usize>(),
            keys = keys.len(),
            concepts = concepts.len(),
            hypernyms = hypernyms.len(),
            mode = ?mode,
            "consolidation finished"
        );

        Consolidation {
            concepts,
            hypernyms,
            mode,
            degradations,
            diagnostic: None,
        }
    }
}

/// First occurrence of each (parent, child) key pair wins.
fn dedupe_hypernyms(results: &[ExtractionResult]) -> Vec<HypernymPair> {
    let mut seen = BTreeSet::new();
    results
        .iter()
        .flat_map(|r| r.hypernyms.iter())
        .filter(|h| seen.insert((h.parent.clone(), h.child.clone())))
        .cloned()
        .collect()
}
