//! Graph traversal operations

use super::edge::{ConceptEdge, EdgeKind};
use super::engine::ConceptGraph;
use crate::model::ConceptId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Direction for edge traversal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Follow outgoing edges (source -> target)
    #[default]
    Outgoing,
    /// Follow incoming edges (target <- source)
    Incoming,
    /// Follow edges in both directions
    Both,
}

/// Result of a traversal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraversalResult {
    pub origin: ConceptId,
    /// Level 0 = origin, level 1 = immediate neighbors, etc.
    pub levels: Vec<Vec<ConceptId>>,
    /// Edges traversed, in discovery order
    pub edges: Vec<ConceptEdge>,
}

impl TraversalResult {
    pub fn new(origin: ConceptId) -> Self {
        Self {
            origin,
            levels: Vec::new(),
            edges: Vec::new(),
        }
    }

    /// All discovered nodes, excluding the origin
    pub fn all_nodes(&self) -> Vec<&ConceptId> {
        self.levels.iter().skip(1).flatten().collect()
    }

    pub fn at_depth(&self, depth: usize) -> &[ConceptId] {
        self.levels.get(depth).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn max_depth(&self) -> usize {
        self.levels.len().saturating_sub(1)
    }
}

/// Breadth-first traversal from a starting concept
#[derive(Debug, Clone)]
pub struct TraverseQuery {
    pub origin: ConceptId,
    /// 0 = origin only, 1 = immediate neighbors, etc.
    pub max_depth: usize,
    pub direction: Direction,
    /// Only follow edges of these kinds; empty follows all
    pub kinds: BTreeSet<EdgeKind>,
    pub min_weight: Option<f64>,
}

impl TraverseQuery {
    pub fn from(origin: impl Into<ConceptId>) -> Self {
        Self {
            origin: origin.into(),
            max_depth: 1,
            direction: Direction::Outgoing,
            kinds: BTreeSet::new(),
            min_weight: None,
        }
    }

    pub fn depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Restrict to an edge kind; may be called repeatedly
    pub fn with_kind(mut self, kind: EdgeKind) -> Self {
        self.kinds.insert(kind);
        self
    }

    pub fn min_weight(mut self, min_weight: f64) -> Self {
        self.min_weight = Some(min_weight);
        self
    }

    pub(crate) fn edge_matches(&self, edge: &ConceptEdge) -> bool {
        if !self.kinds.is_empty() && !self.kinds.contains(&edge.kind) {
            return false;
        }
        self.min_weight.map_or(true, |min| edge.weight >= min)
    }

    /// Edges leaving `id` under this query's direction and filters,
    /// ordered by neighbor id then kind.
    pub(crate) fn step<'g>(&self, graph: &'g ConceptGraph, id: &ConceptId) -> Vec<(&'g ConceptId, &'g ConceptEdge)> {
        let mut out: Vec<(&ConceptId, &ConceptEdge)> = Vec::new();
        if matches!(self.direction, Direction::Outgoing | Direction::Both) {
            out.extend(graph.outgoing(id).into_iter().map(|e| (&e.target, e)));
        }
        if matches!(self.direction, Direction::Incoming | Direction::Both) {
            out.extend(graph.incoming(id).into_iter().map(|e| (&e.source, e)));
        }
        out.retain(|(_, e)| self.edge_matches(e));
        out.sort_by(|a, b| a.0.cmp(b.0).then_with(|| a.1.kind.cmp(&b.1.kind)));
        out
    }

    /// Execute against a graph. An unknown origin gives an empty result.
    pub fn execute(&self, graph: &ConceptGraph) -> TraversalResult {
        let mut result = TraversalResult::new(self.origin.clone());
        if graph.node(&self.origin).is_none() {
            return result;
        }

        let mut visited: BTreeSet<ConceptId> = BTreeSet::from([self.origin.clone()]);
        let mut current: Vec<ConceptId> = vec![self.origin.clone()];
        result.levels.push(current.clone());

        for _ in 0..self.max_depth {
            if current.is_empty() {
                break;
            }
            let mut next = Vec::new();
            for id in &current {
                for (neighbor, edge) in self.step(graph, id) {
                    if visited.insert(neighbor.clone()) {
                        next.push(neighbor.clone());
                        result.edges.push(edge.clone());
                    }
                }
            }
            if !next.is_empty() {
                result.levels.push(next.clone());
            }
            current = next;
        }
        result
    }

    /// Depth-first preorder under the same filters, neighbors in id order.
    pub fn execute_depth_first(&self, graph: &ConceptGraph) -> Vec<ConceptId> {
        let mut order = Vec::new();
        if graph.node(&self.origin).is_none() {
            return order;
        }
        let mut visited = BTreeSet::new();
        let mut stack: Vec<(ConceptId, usize)> = vec![(self.origin.clone(), 0)];
        while let Some((id, depth)) = stack.pop() {
            if !visited.insert(id.clone()) {
                continue;
            }
            if depth < self.max_depth {
                let neighbors = self.step(graph, &id);
                for (neighbor, _) in neighbors.into_iter().rev() {
                    if !visited.contains(neighbor) {
                        stack.push((neighbor.clone(), depth + 1));
                    }
                }
            }
            order.push(id);
        }
        order
    }
}
