//! Parent/child adjacency with reachability and longest-path levels

use crate::model::ConceptId;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// Directed acyclic is_a adjacency; edges point parent -> child.
#[derive(Debug, Clone, Default)]
pub struct IsADag {
    children: BTreeMap<ConceptId, BTreeSet<ConceptId>>,
    parents: BTreeMap<ConceptId, BTreeSet<ConceptId>>,
}

impl IsADag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains_edge(&self, parent: &ConceptId, child: &ConceptId) -> bool {
        self.children.get(parent).is_some_and(|c| c.contains(child))
    }

    pub fn has_parent(&self, child: &ConceptId) -> bool {
        self.parents.get(child).is_some_and(|p| !p.is_empty())
    }

    pub fn parents_of(&self, id: &ConceptId) -> impl Iterator<Item = &ConceptId> {
        self.parents.get(id).into_iter().flatten()
    }

    pub fn children_of(&self, id: &ConceptId) -> impl Iterator<Item = &ConceptId> {
        self.children.get(id).into_iter().flatten()
    }

    /// True when `target` can be reached from `from` following child edges.
    pub fn reaches(&self, from: &ConceptId, target: &ConceptId) -> bool {
        let mut queue = VecDeque::from([from]);
        let mut seen = BTreeSet::from([from]);
        while let Some(node) = queue.pop_front() {
            if node == target {
                return true;
            }
            for next in self.children_of(node) {
                if seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        false
    }

    /// `id` and everything above it.
    pub fn ancestors(&self, id: &ConceptId) -> BTreeSet<ConceptId> {
        let mut seen = BTreeSet::from([id.clone()]);
        let mut queue = VecDeque::from([id.clone()]);
        while let Some(node) = queue.pop_front() {
            for parent in self.parents_of(&node) {
                if seen.insert(parent.clone()) {
                    queue.push_back(parent.clone());
                }
            }
        }
        seen
    }

    /// Whether `parent -> child` would close a cycle: the proposed child
    /// already reaches the proposed parent.
    pub fn would_cycle(&self, parent: &ConceptId, child: &ConceptId) -> bool {
        parent == child || self.reaches(child, parent)
    }

    /// Insert without checks; callers run [`IsADag::would_cycle`] first.
    pub fn insert(&mut self, parent: ConceptId, child: ConceptId) {
        self.children.entry(parent.clone()).or_default().insert(child.clone());
        self.parents.entry(child).or_default().insert(parent);
    }

    pub fn remove(&mut self, parent: &ConceptId, child: &ConceptId) {
        if let Some(c) = self.children.get_mut(parent) {
            c.remove(child);
        }
        if let Some(p) = self.parents.get_mut(child) {
            p.remove(parent);
        }
    }

    pub fn edges(&self) -> Vec<(ConceptId, ConceptId)> {
        self.children
            .iter()
            .flat_map(|(p, cs)| cs.iter().map(move |c| (p.clone(), c.clone())))
            .collect()
    }

    /// Longest is_a path from a root to each node in `nodes`; roots are 0.
    pub fn levels<'a>(&self, nodes: impl IntoIterator<Item = &'a ConceptId>) -> BTreeMap<ConceptId, u32> {
        let nodes: Vec<&ConceptId> = nodes.into_iter().collect();
        let mut indegree: BTreeMap<&ConceptId, usize> = nodes
            .iter()
            .map(|&n| (n, self.parents_of(n).count()))
            .collect();
        let mut levels: BTreeMap<ConceptId, u32> = BTreeMap::new();
        let mut queue: VecDeque<&ConceptId> = indegree
            .iter()
            .filter(|(_, d)| **d == 0)
            .map(|(n, _)| *n)
            .collect();
        for n in &queue {
            levels.insert((*n).clone(), 0);
        }

        while let Some(node) = queue.pop_front() {
            let level = levels.get(node).copied().unwrap_or(0);
            for child in self.children_of(node) {
                let entry = levels.entry(child.clone()).or_insert(0);
                *entry = (*entry).max(level + 1);
                if let Some(d) = indegree.get_mut(child) {
                    *d = d.saturating_sub(1);
                    if *d == 0 {
                        queue.push_back(child);
                    }
                }
            }
        }
        levels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> ConceptId {
        ConceptId::new(s)
    }

    #[test]
    fn cycle_check_follows_descendants() {
        let mut dag = IsADag::new();
        dag.insert(id("a"), id("b"));
        dag.insert(id("b"), id("c"));
        assert!(dag.would_cycle(&id("c"), &id("a")));
        assert!(dag.would_cycle(&id("a"), &id("a")));
        assert!(!dag.would_cycle(&id("a"), &id("c")));
    }

    #[test]
    fn ancestors_include_self_and_every_path_up() {
        let mut dag = IsADag::new();
        dag.insert(id("a"), id("b"));
        dag.insert(id("x"), id("b"));
        dag.insert(id("b"), id("c"));
        dag.insert(id("c"), id("d"));
        let up: Vec<_> = dag.ancestors(&id("c")).into_iter().map(|c| c.to_string()).collect();
        assert_eq!(up, vec!["a", "b", "c", "x"]);
        assert_eq!(dag.ancestors(&id("a")).len(), 1);
    }

    #[test]
    fn levels_use_longest_path() {
        let mut dag = IsADag::new();
        dag.insert(id("a"), id("b"));
        dag.insert(id("b"), id("c"));
        dag.insert(id("a"), id("c"));
        let nodes = [id("a"), id("b"), id("c"), id("d")];
        let levels = dag.levels(nodes.iter());
        assert_eq!(levels[&id("a")], 0);
        assert_eq!(levels[&id("b")], 1);
        assert_eq!(levels[&id("c")], 2);
        assert_eq!(levels[&id("d")], 0);
    }
}
