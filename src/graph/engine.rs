//! ConceptGraph: the queryable result of a pipeline run

use super::edge::{ConceptEdge, EdgeKind};
use super::rank::{importance_rank, ImportanceRanking, RankedConcept};
use super::relations::{cooccurrence_pairs, similarity_pairs};
use super::store::ConceptStore;
use super::traverse::{Direction, TraversalResult, TraverseQuery};
use super::{GraphError, GraphState};
use crate::centrality::PageRank;
use crate::config::GraphConfig;
use crate::model::{Concept, ConceptId};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use tracing::{debug, warn};

/// Concept nodes with typed, weighted edges
///
/// Built single-writer through `EMPTY -> POPULATING -> VALIDATED ->
/// QUERYABLE`. Mutation is only possible while populating; a new build
/// needs a new instance.
#[derive(Debug, Clone)]
pub struct ConceptGraph {
    state: GraphState,
    config: GraphConfig,
    store: ConceptStore,
    edges: Vec<ConceptEdge>,
    edge_index: BTreeMap<(ConceptId, ConceptId, EdgeKind), usize>,
    outgoing: BTreeMap<ConceptId, Vec<usize>>,
    incoming: BTreeMap<ConceptId, Vec<usize>>,
    ranking: Option<ImportanceRanking>,
}

impl Default for ConceptGraph {
    fn default() -> Self {
        Self::new(GraphConfig::default())
    }
}

impl ConceptGraph {
    pub fn new(config: GraphConfig) -> Self {
        Self {
            state: GraphState::Empty,
            config,
            store: ConceptStore::new(),
            edges: Vec::new(),
            edge_index: BTreeMap::new(),
            outgoing: BTreeMap::new(),
            incoming: BTreeMap::new(),
            ranking: None,
        }
    }

    pub fn state(&self) -> GraphState {
        self.state
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    fn require_populating(&mut self, operation: &'static str) -> Result<(), GraphError> {
        match self.state {
            GraphState::Empty => {
                self.state = GraphState::Populating;
                Ok(())
            }
            GraphState::Populating => Ok(()),
            state => Err(GraphError::InvalidState { operation, state }),
        }
    }

    // === Mutation (POPULATING only) ===

    /// Add a concept. Its parent/child sets are rebuilt from is_a edges.
    pub fn add_node(&mut self, mut concept: Concept) -> Result<(), GraphError> {
        self.require_populating("add_node")?;
        if self.store.contains(&concept.id) {
            return Err(GraphError::DuplicateNode(concept.id));
        }
        concept.parents.clear();
        concept.children.clear();
        self.store.insert(concept);
        Ok(())
    }

    /// Add an edge; an existing edge of the same kind between the same
    /// endpoints keeps the larger weight.
    pub fn add_edge(&mut self, source: &ConceptId, target: &ConceptId, kind: EdgeKind, weight: f64) -> Result<(), GraphError> {
        self.require_populating("add_edge")?;
        self.check_edge(source, target, weight)?;
        if kind == EdgeKind::IsA
            && !self.edge_index.contains_key(&(source.clone(), target.clone(), kind))
            && self.is_a_reaches(target, source)
        {
            warn!(parent = %source, child = %target, "is_a edge would close a cycle");
            return Err(GraphError::CycleDetected {
                parent: source.clone(),
                child: target.clone(),
            });
        }
        self.insert_edge(ConceptEdge::new(source.clone(), target.clone(), kind, weight));
        Ok(())
    }

    /// Add an edge in both directions.
    pub fn add_symmetric_edge(&mut self, a: &ConceptId, b: &ConceptId, kind: EdgeKind, weight: f64) -> Result<(), GraphError> {
        self.add_edge(a, b, kind, weight)?;
        self.add_edge(b, a, kind, weight)
    }

    fn check_edge(&self, source: &ConceptId, target: &ConceptId, weight: f64) -> Result<(), GraphError> {
        if source == target {
            return Err(GraphError::SelfLoop(source.clone()));
        }
        for id in [source, target] {
            if !self.store.contains(id) {
                return Err(GraphError::NodeNotFound(id.clone()));
            }
        }
        if !weight.is_finite() || !(0.0..=1.0).contains(&weight) {
            return Err(GraphError::InvalidWeight(weight));
        }
        Ok(())
    }

    /// Insert after validation; no cycle check.
    pub(crate) fn insert_edge(&mut self, edge: ConceptEdge) {
        let key = (edge.source.clone(), edge.target.clone(), edge.kind);
        if let Some(&i) = self.edge_index.get(&key) {
            let existing = &mut self.edges[i];
            existing.weight = existing.weight.max(edge.weight);
            return;
        }
        if edge.kind == EdgeKind::IsA {
            let child = edge.target.clone();
            self.store.update(&edge.source, |c| {
                c.children.insert(child);
            });
            let parent = edge.source.clone();
            self.store.update(&edge.target, |c| {
                c.parents.insert(parent);
            });
        }
        let slot = self.edges.len();
        self.outgoing.entry(edge.source.clone()).or_default().push(slot);
        self.incoming.entry(edge.target.clone()).or_default().push(slot);
        self.edge_index.insert(key, slot);
        self.edges.push(edge);
    }

    /// Insert an edge that skips the cycle check, for loading snapshots that
    /// are validated afterwards.
    pub(crate) fn load_edge(&mut self, edge: ConceptEdge) -> Result<(), GraphError> {
        self.require_populating("load_edge")?;
        self.check_edge(&edge.source, &edge.target, edge.weight)?;
        self.insert_edge(edge);
        Ok(())
    }

    /// Derive related_to and co_occurs_with edges from embeddings and shared
    /// evidence. Returns the number of edges added.
    pub fn derive_relations(&mut self) -> Result<usize, GraphError> {
        self.require_populating("derive_relations")?;
        let linked: BTreeSet<(ConceptId, ConceptId)> = self
            .edges_of_kind(EdgeKind::IsA)
            .into_iter()
            .map(|e| (e.source.clone(), e.target.clone()))
            .collect();
        let nodes = self.nodes();
        let related = similarity_pairs(&nodes, &linked, self.config.related_threshold);
        let cooccurring = cooccurrence_pairs(&nodes, self.config.min_cooccurrence);

        let before = self.edges.len();
        for (a, b, w) in related {
            self.add_symmetric_edge(&a, &b, EdgeKind::RelatedTo, w)?;
        }
        for (a, b, w) in cooccurring {
            self.add_symmetric_edge(&a, &b, EdgeKind::CoOccursWith, w)?;
        }
        let added = self.edges.len() - before;
        debug!(added, "associative edges derived");
        Ok(added)
    }

    // === State transitions ===

    /// Check hierarchy invariants and compute the importance ranking once.
    ///
    /// Allowed from EMPTY or POPULATING; on failure the state is unchanged.
    pub fn validate(&mut self) -> Result<&ImportanceRanking, GraphError> {
        if !matches!(self.state, GraphState::Empty | GraphState::Populating) {
            return Err(GraphError::InvalidState {
                operation: "validate",
                state: self.state,
            });
        }
        let cycles = self.detect_cycles();
        if !cycles.is_empty() {
            return Err(GraphError::CyclicHierarchy(
                cycles.into_iter().map(|e| (e.source, e.target)).collect(),
            ));
        }
        for edge in self.edges_of_kind(EdgeKind::IsA) {
            let level = |id: &ConceptId| self.store.get(id).map_or(0, |c| c.level);
            let (parent_level, child_level) = (level(&edge.source), level(&edge.target));
            if parent_level + 1 != child_level {
                return Err(GraphError::LevelViolation {
                    parent: edge.source.clone(),
                    child: edge.target.clone(),
                    parent_level,
                    child_level,
                });
            }
        }

        let ranking = self.importance_rank();
        if !ranking.converged {
            warn!(
                iterations = ranking.iterations,
                delta = ranking.delta,
                "importance ranking did not converge"
            );
        }
        self.state = GraphState::Validated;
        Ok(self.ranking.insert(ranking))
    }

    /// VALIDATED -> QUERYABLE
    pub fn publish(&mut self) -> Result<(), GraphError> {
        if self.state != GraphState::Validated {
            return Err(GraphError::InvalidState {
                operation: "publish",
                state: self.state,
            });
        }
        self.state = GraphState::Queryable;
        Ok(())
    }

    // === Read-only queries ===

    /// Current version of every concept, in id order
    pub fn nodes(&self) -> Vec<&Concept> {
        self.store.iter().collect()
    }

    pub fn node(&self, id: &ConceptId) -> Option<&Concept> {
        self.store.get(id)
    }

    pub fn node_count(&self) -> usize {
        self.store.len()
    }

    /// Every stored version of a concept, oldest first
    pub fn history(&self, id: &ConceptId) -> Vec<&Concept> {
        self.store.history(id)
    }

    pub fn edges(&self) -> &[ConceptEdge] {
        &self.edges
    }

    pub fn edges_of_kind(&self, kind: EdgeKind) -> Vec<&ConceptEdge> {
        self.edges.iter().filter(|e| e.kind == kind).collect()
    }

    pub(crate) fn outgoing(&self, id: &ConceptId) -> Vec<&ConceptEdge> {
        self.outgoing
            .get(id)
            .map(|slots| slots.iter().map(|&i| &self.edges[i]).collect())
            .unwrap_or_default()
    }

    pub(crate) fn incoming(&self, id: &ConceptId) -> Vec<&ConceptEdge> {
        self.incoming
            .get(id)
            .map(|slots| slots.iter().map(|&i| &self.edges[i]).collect())
            .unwrap_or_default()
    }

    /// Direct is_a children, in id order
    pub fn get_children(&self, id: &ConceptId) -> Vec<&Concept> {
        self.is_a_neighbors(id, Direction::Outgoing)
    }

    /// Direct is_a parents, in id order
    pub fn get_parents(&self, id: &ConceptId) -> Vec<&Concept> {
        self.is_a_neighbors(id, Direction::Incoming)
    }

    fn is_a_neighbors(&self, id: &ConceptId, direction: Direction) -> Vec<&Concept> {
        TraverseQuery::from(id.clone())
            .direction(direction)
            .with_kind(EdgeKind::IsA)
            .step(self, id)
            .into_iter()
            .filter_map(|(n, _)| self.store.get(n))
            .collect()
    }

    /// Breadth-first over outgoing edges of every kind.
    pub fn breadth_first_traversal(&self, from: &ConceptId, max_depth: usize) -> Result<TraversalResult, GraphError> {
        self.require_node(from)?;
        Ok(TraverseQuery::from(from.clone()).depth(max_depth).execute(self))
    }

    /// Depth-first preorder over outgoing edges of every kind.
    pub fn depth_first_traversal(&self, from: &ConceptId, max_depth: usize) -> Result<Vec<ConceptId>, GraphError> {
        self.require_node(from)?;
        Ok(TraverseQuery::from(from.clone())
            .depth(max_depth)
            .execute_depth_first(self))
    }

    /// Run a filtered traversal.
    pub fn traverse(&self, query: &TraverseQuery) -> Result<TraversalResult, GraphError> {
        self.require_node(&query.origin)?;
        Ok(query.execute(self))
    }

    fn require_node(&self, id: &ConceptId) -> Result<(), GraphError> {
        if self.store.contains(id) {
            Ok(())
        } else {
            Err(GraphError::NodeNotFound(id.clone()))
        }
    }

    fn is_a_reaches(&self, from: &ConceptId, target: &ConceptId) -> bool {
        let mut queue = VecDeque::from([from]);
        let mut seen = BTreeSet::from([from]);
        while let Some(id) = queue.pop_front() {
            if id == target {
                return true;
            }
            for edge in self.outgoing(id) {
                if edge.kind == EdgeKind::IsA && seen.insert(&edge.target) {
                    queue.push_back(&edge.target);
                }
            }
        }
        false
    }

    /// is_a edges that lie on a cycle; empty for a valid hierarchy.
    pub fn detect_cycles(&self) -> Vec<ConceptEdge> {
        self.edges_of_kind(EdgeKind::IsA)
            .into_iter()
            .filter(|e| self.is_a_reaches(&e.target, &e.source))
            .cloned()
            .collect()
    }

    /// Components of the graph with edges taken as undirected. Members are
    /// sorted and components ordered by their first member.
    pub fn connected_components(&self) -> Vec<Vec<ConceptId>> {
        let mut seen: BTreeSet<&ConceptId> = BTreeSet::new();
        let mut components = Vec::new();
        for start in self.store.ids() {
            if !seen.insert(start) {
                continue;
            }
            let mut component = vec![start.clone()];
            let mut queue = VecDeque::from([start]);
            while let Some(id) = queue.pop_front() {
                let neighbors = self
                    .outgoing(id)
                    .into_iter()
                    .map(|e| &e.target)
                    .chain(self.incoming(id).into_iter().map(|e| &e.source));
                for n in neighbors {
                    if seen.insert(n) {
                        component.push(n.clone());
                        queue.push_back(n);
                    }
                }
            }
            component.sort();
            components.push(component);
        }
        components
    }

    /// Centrality over related_to and co_occurs_with edges. Non-convergence
    /// is reported in the result, not as an error.
    pub fn importance_rank(&self) -> ImportanceRanking {
        let pagerank = PageRank::new(self.config.damping, self.config.max_iterations, self.config.tolerance);
        importance_rank(self, &pagerank)
    }

    /// Ranking computed at validation
    pub fn ranking(&self) -> Option<&ImportanceRanking> {
        self.ranking.as_ref()
    }

    /// Concepts by importance desc, then relevance desc, then id.
    ///
    /// Only available once validated.
    pub fn ranked_concepts(&self) -> Result<Vec<RankedConcept>, GraphError> {
        let ranking = match (&self.ranking, self.state) {
            (Some(r), GraphState::Validated | GraphState::Queryable) => r,
            (_, state) => {
                return Err(GraphError::InvalidState {
                    operation: "ranked_concepts",
                    state,
                })
            }
        };
        let mut ranked: Vec<RankedConcept> = self
            .store
            .iter()
            .map(|c| RankedConcept {
                id: c.id.clone(),
                text: c.text.clone(),
                importance: ranking.score(&c.id),
                relevance: c.relevance,
                level: c.level,
                synthetic: c.synthetic,
            })
            .collect();
        ranked.sort_by(|a, b| {
            b.importance
                .total_cmp(&a.importance)
                .then_with(|| b.relevance.total_cmp(&a.relevance))
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(ranked)
    }

    pub(crate) fn set_ranking(&mut self, ranking: Option<ImportanceRanking>) {
        self.ranking = ranking;
    }

    pub(crate) fn force_state(&mut self, state: GraphState) {
        self.state = state;
    }
}
