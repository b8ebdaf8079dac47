//! Copy-on-write concept arena
//!
//! Versions are append-only; the index points each id at its latest
//! version. Updating a concept clones it, applies the change and repoints
//! the index, so earlier versions stay readable through `history`.

use crate::model::{Concept, ConceptId};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
pub struct ConceptStore {
    versions: Vec<Concept>,
    index: BTreeMap<ConceptId, usize>,
    lineage: BTreeMap<ConceptId, Vec<usize>>,
}

impl ConceptStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new concept; returns false if the id is taken.
    pub fn insert(&mut self, concept: Concept) -> bool {
        if self.index.contains_key(&concept.id) {
            return false;
        }
        let id = concept.id.clone();
        let slot = self.versions.len();
        self.versions.push(concept);
        self.index.insert(id.clone(), slot);
        self.lineage.insert(id, vec![slot]);
        true
    }

    /// Append a modified copy of the current version. Returns false for an
    /// unknown id.
    pub fn update(&mut self, id: &ConceptId, change: impl FnOnce(&mut Concept)) -> bool {
        let Some(&current) = self.index.get(id) else {
            return false;
        };
        let mut next = self.versions[current].clone();
        change(&mut next);
        next.id = id.clone();
        let slot = self.versions.len();
        self.versions.push(next);
        self.index.insert(id.clone(), slot);
        self.lineage.entry(id.clone()).or_default().push(slot);
        true
    }

    pub fn get(&self, id: &ConceptId) -> Option<&Concept> {
        self.index.get(id).map(|&i| &self.versions[i])
    }

    pub fn contains(&self, id: &ConceptId) -> bool {
        self.index.contains_key(id)
    }

    /// Every version of a concept, oldest first
    pub fn history(&self, id: &ConceptId) -> Vec<&Concept> {
        self.lineage
            .get(id)
            .map(|slots| slots.iter().map(|&i| &self.versions[i]).collect())
            .unwrap_or_default()
    }

    /// Current versions in id order
    pub fn iter(&self) -> impl Iterator<Item = &Concept> {
        self.index.values().map(|&i| &self.versions[i])
    }

    pub fn ids(&self) -> impl Iterator<Item = &ConceptId> {
        self.index.keys()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Total stored versions across all concepts
    pub fn version_count(&self) -> usize {
        self.versions.len()
    }
}
