//! Concept graph: arena-backed nodes, typed edges, traversal and ranking

mod edge;
mod engine;
mod rank;
mod relations;
mod snapshot;
mod store;
mod traverse;


pub use edge::{ConceptEdge, EdgeKind};
pub use engine::ConceptGraph;
pub use rank::{ImportanceRanking, RankedConcept};
pub use relations::{cooccurrence_pairs, similarity_pairs};
pub use snapshot::GraphSnapshot;
pub use store::ConceptStore;
pub use traverse::{Direction, TraversalResult, TraverseQuery};

use crate::model::ConceptId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle of one graph build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GraphState {
    Empty,
    Populating,
    Validated,
    /// Terminal for a build
    Queryable,
}

impl std::fmt::Display for GraphState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Empty => "EMPTY",
            Self::Populating => "POPULATING",
            Self::Validated => "VALIDATED",
            Self::Queryable => "QUERYABLE",
        };
        f.write_str(s)
    }
}

/// Errors that can occur in graph operations
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("{operation} not allowed in state {state}")]
    InvalidState {
        operation: &'static str,
        state: GraphState,
    },

    #[error("Concept already present: {0}")]
    DuplicateNode(ConceptId),

    #[error("Concept not found: {0}")]
    NodeNotFound(ConceptId),

    #[error("Self-loop on {0}")]
    SelfLoop(ConceptId),

    #[error("Edge weight {0} outside [0, 1]")]
    InvalidWeight(f64),

    #[error("is_a edge {parent} -> {child} would close a cycle")]
    CycleDetected { parent: ConceptId, child: ConceptId },

    #[error("is_a hierarchy contains {} cyclic edges", .0.len())]
    CyclicHierarchy(Vec<(ConceptId, ConceptId)>),

    #[error("level violation on {parent} -> {child}: {parent_level} -> {child_level}")]
    LevelViolation {
        parent: ConceptId,
        child: ConceptId,
        parent_level: u32,
        child_level: u32,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
