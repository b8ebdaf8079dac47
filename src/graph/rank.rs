//! Importance ranking over associative edges

use super::engine::ConceptGraph;
use crate::centrality::PageRank;
use crate::model::ConceptId;
use crate::provenance::RankingSummary;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Centrality of every node; scores sum to 1 when the graph is non-empty
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportanceRanking {
    pub scores: BTreeMap<ConceptId, f64>,
    pub iterations: usize,
    pub delta: f64,
    /// False when the iteration cap was hit; scores are the last iterate
    pub converged: bool,
}

impl ImportanceRanking {
    pub fn score(&self, id: &ConceptId) -> f64 {
        self.scores.get(id).copied().unwrap_or(0.0)
    }

    pub fn total(&self) -> f64 {
        self.scores.values().sum()
    }

    pub fn summary(&self) -> RankingSummary {
        RankingSummary {
            iterations: self.iterations,
            delta: self.delta,
            converged: self.converged,
        }
    }
}

/// A concept with its rank, as exposed to downstream consumers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedConcept {
    pub id: ConceptId,
    pub text: String,
    pub importance: f64,
    pub relevance: f64,
    pub level: u32,
    pub synthetic: bool,
}

/// PageRank over related_to and co_occurs_with edges. Nodes without such
/// edges still receive the teleport share.
pub(crate) fn importance_rank(graph: &ConceptGraph, pagerank: &PageRank) -> ImportanceRanking {
    let ids: Vec<&ConceptId> = graph.nodes().into_iter().map(|c| &c.id).collect();
    let position: HashMap<&ConceptId, usize> = ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();
    let edges: Vec<(usize, usize, f64)> = graph
        .edges()
        .iter()
        .filter(|e| e.kind.is_associative())
        .filter_map(|e| Some((*position.get(&e.source)?, *position.get(&e.target)?, e.weight)))
        .collect();

    let result = pagerank.run(ids.len(), &edges);
    ImportanceRanking {
        scores: ids.into_iter().cloned().zip(result.scores).collect(),
        iterations: result.iterations,
        delta: result.delta,
        converged: result.converged,
    }
}
