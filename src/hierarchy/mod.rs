//! Hierarchy builder
//!
//! Two signals propose is_a edges: explicit Hearst pairs and bottom-up
//! agglomeration of concept embeddings, which creates synthetic parents one
//! level above their members. Explicit edges are applied first and their
//! children never enter clustering. Every edge passes an ancestor
//! reachability check before insertion.

mod dag;

pub use dag::IsADag;

use crate::config::HierarchyConfig;
use crate::embedding::{agglomerate, centroid, cosine_similarity, most_central};
use crate::extraction::HypernymPair;
use crate::model::{Concept, ConceptId, EvidenceSentence};
use crate::provenance::{EdgeOrigin, RejectReason, RejectedEdge};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::{debug, info, warn};

/// An is_a edge kept in the hierarchy
#[derive(Debug, Clone, PartialEq)]
pub struct HierarchyEdge {
    pub parent: ConceptId,
    pub child: ConceptId,
    pub origin: EdgeOrigin,
    pub weight: f64,
}

/// Concepts with hierarchy positions filled in, plus what was kept and
/// rejected along the way
#[derive(Debug, Clone, Default)]
pub struct Hierarchy {
    /// Input concepts in input order, then synthetic parents in creation order
    pub concepts: Vec<Concept>,
    pub edges: Vec<HierarchyEdge>,
    pub rejected: Vec<RejectedEdge>,
    /// Why embedding-based inference did not run, if it did not
    pub inference_skipped: Option<String>,
}

pub struct HierarchyBuilder {
    config: HierarchyConfig,
    /// Evidence sentences pooled into a synthetic parent
    evidence_limit: usize,
}

/// Mutable state of one build
struct Builder {
    concepts: Vec<Concept>,
    index: HashMap<ConceptId, usize>,
    dag: IsADag,
    weights: BTreeMap<(ConceptId, ConceptId), (EdgeOrigin, f64)>,
    rejected: Vec<RejectedEdge>,
}

impl Builder {
    fn new(concepts: Vec<Concept>) -> Self {
        let index = concepts
            .iter()
            .enumerate()
            .map(|(i, c)| (c.id.clone(), i))
            .collect();
        Self {
            concepts,
            index,
            dag: IsADag::new(),
            weights: BTreeMap::new(),
            rejected: Vec::new(),
        }
    }

    fn push(&mut self, concept: Concept) {
        self.index.insert(concept.id.clone(), self.concepts.len());
        self.concepts.push(concept);
    }

    fn get(&self, id: &ConceptId) -> Option<&Concept> {
        self.index.get(id).map(|&i| &self.concepts[i])
    }

    /// Add `parent -> child` unless it is a self loop or closes a cycle.
    fn propose(&mut self, parent: ConceptId, child: ConceptId, origin: EdgeOrigin, weight: f64) -> bool {
        if self.dag.contains_edge(&parent, &child) {
            return true;
        }
        let reason = if parent == child {
            Some(RejectReason::SelfLoop)
        } else if self.dag.would_cycle(&parent, &child) {
            Some(RejectReason::Cycle)
        } else {
            None
        };
        if let Some(reason) = reason {
            warn!(parent = %parent, child = %child, ?origin, ?reason, "rejected is_a edge");
            self.rejected.push(RejectedEdge {
                parent,
                child,
                origin,
                reason,
            });
            return false;
        }
        self.weights
            .insert((parent.clone(), child.clone()), (origin, weight.clamp(0.0, 1.0)));
        self.dag.insert(parent, child);
        true
    }

    fn origin(&self, parent: &ConceptId, child: &ConceptId) -> (EdgeOrigin, f64) {
        self.weights
            .get(&(parent.clone(), child.clone()))
            .copied()
            .unwrap_or((EdgeOrigin::Hearst, 1.0))
    }
}

impl HierarchyBuilder {
    pub fn new(config: HierarchyConfig, evidence_limit: usize) -> Self {
        Self {
            config,
            evidence_limit,
        }
    }

    pub fn build(&self, concepts: Vec<Concept>, hypernyms: &[HypernymPair]) -> Hierarchy {
        let mut state = Builder::new(concepts);
        let explicit = self.apply_hypernyms(&mut state, hypernyms);

        let inference_skipped = if !self.config.infer_from_embeddings {
            Some("embedding-based inference disabled".to_string())
        } else if !state.concepts.iter().any(|c| c.embedding.is_some()) {
            Some("no concept embeddings available".to_string())
        } else {
            self.cluster(&mut state);
            None
        };

        let mut rejected = std::mem::take(&mut state.rejected);
        let edges = self.assign_levels(&mut state, &mut rejected);
        info!(
            concepts = state.concepts.len(),
            explicit,
            edges = edges.len(),
            rejected = rejected.len(),
            "hierarchy built"
        );

        Hierarchy {
            concepts: state.concepts,
            edges,
            rejected,
            inference_skipped,
        }
    }

    /// Apply explicit pairs; returns how many were kept.
    fn apply_hypernyms(&self, state: &mut Builder, hypernyms: &[HypernymPair]) -> usize {
        let mut resolve: HashMap<&str, ConceptId> = HashMap::new();
        for c in &state.concepts {
            for alias in &c.aliases {
                resolve.entry(alias.as_str()).or_insert_with(|| c.id.clone());
            }
        }
        for c in &state.concepts {
            resolve.insert(c.id.as_str(), c.id.clone());
        }

        let mut pairs = Vec::new();
        for h in hypernyms {
            match (resolve.get(h.parent.as_str()), resolve.get(h.child.as_str())) {
                (Some(p), Some(c)) => pairs.push((p.clone(), c.clone())),
                _ => debug!(parent = %h.parent, child = %h.child, "hypernym endpoints not among concepts"),
            }
        }

        pairs
            .into_iter()
            .filter(|(p, c)| state.propose(p.clone(), c.clone(), EdgeOrigin::Hearst, 1.0))
            .count()
    }

    /// Agglomerate the parentless frontier round by round, creating one
    /// synthetic parent per multi-member group.
    fn cluster(&self, state: &mut Builder) {
        let mut frontier: Vec<ConceptId> = state
            .concepts
            .iter()
            .filter(|c| c.embedding.is_some() && !state.dag.has_parent(&c.id))
            .map(|c| c.id.clone())
            .collect();
        let mut next_cluster_id = 0u32;

        for round in 1..=self.config.max_depth {
            if frontier.len() <= 1 {
                break;
            }
            let distance = self.config.base_distance + (round - 1) as f64 * self.config.distance_step;
            let similarity = (1.0 - distance).clamp(-1.0, 1.0);
            let vectors: Vec<Vec<f32>> = frontier
                .iter()
                .map(|id| state.get(id).and_then(|c| c.embedding.clone()).unwrap_or_default())
                .collect();
            let groups = agglomerate(&vectors, similarity);

            let mut next_frontier = Vec::with_capacity(groups.len());
            for members in groups {
                if members.len() < 2 {
                    next_frontier.extend(members.iter().map(|&i| frontier[i].clone()));
                    continue;
                }
                let member_ids: Vec<ConceptId> = members.iter().map(|&i| frontier[i].clone()).collect();
                if round == 1 {
                    for id in &member_ids {
                        if let Some(&i) = state.index.get(id) {
                            state.concepts[i].cluster_id = Some(next_cluster_id);
                        }
                    }
                    next_cluster_id += 1;
                }

                let Some(rep) = most_central(&members, &vectors) else {
                    continue;
                };
                let center = centroid(&members, &vectors);
                let parent = self.synthetic_parent(state, &frontier[rep], &member_ids, center.clone(), round);
                let parent_id = parent.id.clone();
                debug!(parent = %parent_id, members = member_ids.len(), round, "synthetic parent");
                state.push(parent);

                for (&i, child) in members.iter().zip(&member_ids) {
                    let weight = cosine_similarity(&vectors[i], &center) as f64;
                    state.propose(parent_id.clone(), child.clone(), EdgeOrigin::Clustering, weight);
                }
                next_frontier.push(parent_id);
            }
            frontier = next_frontier;
        }
    }

    fn synthetic_parent(
        &self,
        state: &Builder,
        representative: &ConceptId,
        members: &[ConceptId],
        embedding: Vec<f32>,
        round: usize,
    ) -> Concept {
        let rep_text = state
            .get(representative)
            .map(|c| c.text.clone())
            .unwrap_or_else(|| representative.to_string());
        let mut key = format!("{} (group)", representative);
        let mut attempt = 0;
        while state.index.contains_key(&ConceptId::new(key.as_str())) {
            attempt += 1;
            key = if attempt == 1 {
                format!("{} (group {})", representative, round)
            } else {
                format!("{} (group {}.{})", representative, round, attempt)
            };
        }

        let mut parent = Concept::new(ConceptId::new(key), rep_text).with_embedding(embedding);
        parent.synthetic = true;
        let children: Vec<&Concept> = members.iter().filter_map(|id| state.get(id)).collect();
        let mut evidence: Vec<EvidenceSentence> = Vec::new();
        let mut relevance = 0.0;
        for child in &children {
            parent.frequency += child.frequency;
            relevance += child.relevance;
            parent.source_papers.extend(child.source_papers.iter().cloned());
            parent.methods.extend(child.methods.iter().copied());
            for (method, score) in &child.method_scores {
                let s = parent.method_scores.entry(*method).or_insert(0.0);
                *s = s.max(*score);
            }
            evidence.extend(child.evidence.iter().cloned());
        }
        if !children.is_empty() {
            parent.relevance = (relevance / children.len() as f64).clamp(0.0, 1.0);
        }
        evidence.sort_by(|a, b| {
            b.confidence
                .total_cmp(&a.confidence)
                .then_with(|| a.paper_id.cmp(&b.paper_id))
                .then_with(|| a.position().cmp(&b.position()))
        });
        let mut seen = HashSet::new();
        evidence.retain(|e| seen.insert((e.paper_id.clone(), e.position(), e.text.clone())));
        evidence.truncate(self.evidence_limit);
        parent.grounded = children.iter().any(|c| c.grounded) && !evidence.is_empty();
        parent.evidence = evidence;
        parent
    }

    /// Make every kept edge span exactly one level, starting from
    /// longest-path levels and settling Hearst edges before clustering ones.
    ///
    /// A loose edge is dropped as [`RejectReason::LevelSkip`] when the parent
    /// still reaches the child without it. Otherwise the parent and all its
    /// ancestors sink until the parent sits right above the child, provided
    /// no other edge leaving them would be inverted; when that fails the edge
    /// is dropped as [`RejectReason::LevelConflict`]. A sunk parentless
    /// concept keeps a level above zero. Writes parents, children and levels
    /// back.
    fn assign_levels(&self, state: &mut Builder, rejected: &mut Vec<RejectedEdge>) -> Vec<HierarchyEdge> {
        let ids: Vec<ConceptId> = state.concepts.iter().map(|c| c.id.clone()).collect();
        let mut levels = state.dag.levels(ids.iter());

        let mut order = state.dag.edges();
        order.sort_by_key(|(p, c)| state.origin(p, c).0 == EdgeOrigin::Clustering);

        for (parent, child) in order {
            let level = |id: &ConceptId| levels.get(id).copied().unwrap_or(0);
            let Some(delta) = level(&child).checked_sub(level(&parent) + 1).filter(|d| *d > 0) else {
                continue;
            };
            let (origin, _) = state.origin(&parent, &child);
            state.dag.remove(&parent, &child);

            let reason = if state.dag.reaches(&parent, &child) {
                RejectReason::LevelSkip
            } else if let Some(moved) = sinkable(&state.dag, &levels, &parent, delta) {
                debug!(parent = %parent, child = %child, moved = moved.len(), delta, "sinking parent to keep is_a edge");
                for id in moved {
                    *levels.entry(id).or_insert(0) += delta;
                }
                state.dag.insert(parent, child);
                continue;
            } else {
                RejectReason::LevelConflict
            };

            debug!(parent = %parent, child = %child, ?reason, "removing is_a edge");
            rejected.push(RejectedEdge {
                parent,
                child,
                origin,
                reason,
            });
        }

        let edges = state
            .dag
            .edges()
            .into_iter()
            .map(|(parent, child)| {
                let (origin, weight) = state.origin(&parent, &child);
                HierarchyEdge {
                    parent,
                    child,
                    origin,
                    weight,
                }
            })
            .collect();

        for concept in &mut state.concepts {
            concept.level = levels.get(&concept.id).copied().unwrap_or(0);
            concept.parents = state.dag.parents_of(&concept.id).cloned().collect();
            concept.children = state.dag.children_of(&concept.id).cloned().collect();
        }
        edges
    }
}

/// The nodes that move down by `delta` to put `parent` right above a child
/// `delta` levels too deep: `parent` and its ancestors. `None` when another
/// edge leaving that set would end up with its child at or above its parent.
fn sinkable(
    dag: &IsADag,
    levels: &BTreeMap<ConceptId, u32>,
    parent: &ConceptId,
    delta: u32,
) -> Option<BTreeSet<ConceptId>> {
    let moved = dag.ancestors(parent);
    let level = |id: &ConceptId| levels.get(id).copied().unwrap_or(0);
    let blocked = moved.iter().any(|node| {
        dag.children_of(node)
            .filter(|c| !moved.contains(*c))
            .any(|c| level(c) < level(node) + delta + 1)
    });
    (!blocked).then_some(moved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ExtractionMethod, PaperId};

    fn concept(key: &str) -> Concept {
        Concept::new(ConceptId::new(key), key)
            .with_method(ExtractionMethod::RuleBased, 0.8)
            .with_relevance(0.8)
            .with_frequency(1)
            .with_paper("p")
    }

    fn embedded(key: &str, v: Vec<f32>) -> Concept {
        let mut c = concept(key).with_embedding(v);
        c.evidence = vec![EvidenceSentence::new(
            format!("About {}.", key),
            PaperId::new("p"),
            0.8,
            ExtractionMethod::RuleBased,
        )];
        c
    }

    fn pair(parent: &str, child: &str) -> HypernymPair {
        HypernymPair {
            parent: parent.into(),
            child: child.into(),
            parent_text: parent.into(),
            child_text: child.into(),
            pattern: "such_as".into(),
            paper_id: PaperId::new("p"),
            sentence: String::new(),
        }
    }

    fn builder() -> HierarchyBuilder {
        HierarchyBuilder::new(HierarchyConfig::default(), 5)
    }

    fn find<'a>(h: &'a Hierarchy, key: &str) -> &'a Concept {
        h.concepts.iter().find(|c| c.id.as_str() == key).unwrap()
    }

    #[test]
    fn hearst_pairs_become_edges() {
        let concepts = vec![
            concept("cryptographic primitives"),
            concept("hash functions"),
            concept("digital signatures"),
        ];
        let h = builder().build(
            concepts,
            &[
                pair("cryptographic primitives", "hash functions"),
                pair("cryptographic primitives", "digital signatures"),
            ],
        );
        assert_eq!(h.edges.len(), 2);
        let root = find(&h, "cryptographic primitives");
        assert_eq!(root.level, 0);
        assert_eq!(root.children.len(), 2);
        assert_eq!(find(&h, "hash functions").level, 1);
        assert!(h.inference_skipped.is_some());
    }

    #[test]
    fn aliases_resolve_endpoints() {
        let mut parent = concept("cryptographic primitive");
        parent.aliases.insert("cryptographic primitives".into());
        let h = builder().build(
            vec![parent, concept("hash functions")],
            &[pair("cryptographic primitives", "hash functions")],
        );
        assert_eq!(h.edges[0].parent.as_str(), "cryptographic primitive");
    }

    #[test]
    fn cycles_are_rejected_not_applied() {
        let h = builder().build(
            vec![concept("a"), concept("b")],
            &[pair("a", "b"), pair("b", "a"), pair("a", "a")],
        );
        assert_eq!(h.edges.len(), 1);
        let reasons: Vec<_> = h.rejected.iter().map(|r| r.reason).collect();
        assert_eq!(reasons, vec![RejectReason::Cycle, RejectReason::SelfLoop]);
    }

    #[test]
    fn level_skipping_edges_are_removed() {
        let h = builder().build(
            vec![concept("a"), concept("b"), concept("c")],
            &[pair("a", "b"), pair("b", "c"), pair("a", "c")],
        );
        assert_eq!(h.edges.len(), 2);
        assert_eq!(h.rejected.len(), 1);
        assert_eq!(h.rejected[0].reason, RejectReason::LevelSkip);
        for e in &h.edges {
            assert_eq!(find(&h, e.parent.as_str()).level + 1, find(&h, e.child.as_str()).level);
        }
        assert!(!find(&h, "a").children.contains(&ConceptId::new("c")));
    }

    fn assert_exact_levels(h: &Hierarchy) {
        for e in &h.edges {
            assert_eq!(
                find(h, e.parent.as_str()).level + 1,
                find(h, e.child.as_str()).level,
                "{} -> {}",
                e.parent,
                e.child
            );
        }
    }

    #[test]
    fn unpinned_parent_sinks_instead_of_losing_its_edge() {
        let h = builder().build(
            vec![concept("a"), concept("b"), concept("c"), concept("x")],
            &[pair("a", "b"), pair("b", "c"), pair("x", "c")],
        );
        assert_eq!(h.edges.len(), 3);
        assert!(h.rejected.is_empty());
        let x = find(&h, "x");
        assert_eq!(x.level, 1);
        assert!(x.parents.is_empty());
        assert!(find(&h, "c").parents.contains(&x.id));
        assert_exact_levels(&h);
    }

    #[test]
    fn sinking_parent_carries_its_ancestors() {
        let h = builder().build(
            ["a", "b", "c", "d", "p", "x"].into_iter().map(concept).collect(),
            &[pair("a", "b"), pair("b", "c"), pair("c", "d"), pair("p", "x"), pair("x", "d")],
        );
        assert_eq!(h.edges.len(), 5);
        assert!(h.rejected.is_empty());
        assert_eq!(find(&h, "p").level, 1);
        assert_eq!(find(&h, "x").level, 2);
        assert_eq!(find(&h, "d").level, 3);
        assert_exact_levels(&h);
    }

    #[test]
    fn pinned_parent_rejects_conflicting_edge() {
        let h = builder().build(
            ["x", "b", "f", "g", "e"].into_iter().map(concept).collect(),
            &[pair("x", "b"), pair("f", "g"), pair("g", "e"), pair("x", "e")],
        );
        assert_eq!(h.edges.len(), 3);
        assert_eq!(h.rejected.len(), 1);
        let r = &h.rejected[0];
        assert_eq!((r.parent.as_str(), r.child.as_str()), ("x", "e"));
        assert_eq!(r.reason, RejectReason::LevelConflict);
        assert_eq!(find(&h, "x").level, 0);
        assert_exact_levels(&h);
    }

    #[test]
    fn clustering_creates_synthetic_parents() {
        let concepts = vec![
            embedded("block ciphers", vec![1.0, 0.0, 0.0]),
            embedded("stream ciphers", vec![0.95, 0.05, 0.0]),
            embedded("protein folding", vec![0.0, 0.0, 1.0]),
        ];
        let h = builder().build(concepts, &[]);
        assert!(h.inference_skipped.is_none());

        let synthetic: Vec<_> = h.concepts.iter().filter(|c| c.synthetic).collect();
        assert_eq!(synthetic.len(), 1);
        let parent = synthetic[0];
        assert_eq!(parent.id.as_str(), "block ciphers (group)");
        assert_eq!(parent.children.len(), 2);
        assert_eq!(parent.frequency, 2);
        assert_eq!(parent.evidence.len(), 2);
        assert!(parent.grounded);
        assert_eq!(find(&h, "block ciphers").cluster_id, Some(0));
        assert_eq!(find(&h, "block ciphers").level, 1);
        assert_eq!(find(&h, "protein folding").cluster_id, None);
        assert!(h.edges.iter().all(|e| e.origin == EdgeOrigin::Clustering));
    }

    #[test]
    fn explicit_parent_wins_over_clustering() {
        let concepts = vec![
            embedded("symmetric encryption", vec![0.0, 1.0, 0.0]),
            embedded("block ciphers", vec![1.0, 0.0, 0.0]),
            embedded("stream ciphers", vec![0.95, 0.05, 0.0]),
        ];
        let h = builder().build(concepts, &[pair("symmetric encryption", "stream ciphers")]);
        let stream = find(&h, "stream ciphers");
        assert_eq!(stream.parents.len(), 1);
        assert!(stream.parents.contains(&ConceptId::new("symmetric encryption")));
        assert!(h.concepts.iter().filter(|c| c.synthetic).all(|c| !c.children.contains(&stream.id)));
    }
}
