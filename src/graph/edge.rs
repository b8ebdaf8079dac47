//! Typed, weighted concept edges

use crate::model::ConceptId;
use serde::{Deserialize, Serialize};

/// Relationship carried by an edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// Hierarchy, parent -> child; acyclic
    IsA,
    /// Semantic similarity; stored in both directions
    RelatedTo,
    /// Shared evidence sentences; stored in both directions
    CoOccursWith,
}

impl EdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IsA => "is_a",
            Self::RelatedTo => "related_to",
            Self::CoOccursWith => "co_occurs_with",
        }
    }

    /// Kinds that feed importance ranking
    pub fn is_associative(&self) -> bool {
        matches!(self, Self::RelatedTo | Self::CoOccursWith)
    }
}

impl std::fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A directed edge between two concepts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptEdge {
    pub source: ConceptId,
    pub target: ConceptId,
    pub kind: EdgeKind,
    /// Strength in [0, 1]
    pub weight: f64,
}

impl ConceptEdge {
    pub fn new(source: ConceptId, target: ConceptId, kind: EdgeKind, weight: f64) -> Self {
        Self {
            source,
            target,
            kind,
            weight,
        }
    }

    /// The endpoint opposite `id`, if `id` is one of them
    pub fn other(&self, id: &ConceptId) -> Option<&ConceptId> {
        if &self.source == id {
            Some(&self.target)
        } else if &self.target == id {
            Some(&self.source)
        } else {
            None
        }
    }
}
