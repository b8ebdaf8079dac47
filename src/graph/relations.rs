//! Derivation of associative edges from concept content

use crate::embedding::cosine_similarity;
use crate::model::{Concept, ConceptId, PaperId};
use std::collections::{BTreeMap, BTreeSet};

/// Unordered pairs (`a < b`) whose embeddings are at least `threshold`
/// similar, excluding pairs in `linked`.
pub fn similarity_pairs(
    concepts: &[&Concept],
    linked: &BTreeSet<(ConceptId, ConceptId)>,
    threshold: f64,
) -> Vec<(ConceptId, ConceptId, f64)> {
    let embedded: Vec<(&ConceptId, &Vec<f32>)> = concepts
        .iter()
        .filter_map(|c| c.embedding.as_ref().map(|e| (&c.id, e)))
        .collect();
    let mut pairs = Vec::new();
    for (i, (a, va)) in embedded.iter().enumerate() {
        for (b, vb) in &embedded[i + 1..] {
            if linked.contains(&((*a).clone(), (*b).clone())) || linked.contains(&((*b).clone(), (*a).clone())) {
                continue;
            }
            let sim = cosine_similarity(va, vb) as f64;
            if sim >= threshold {
                let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
                pairs.push(((*lo).clone(), (*hi).clone(), sim.clamp(0.0, 1.0)));
            }
        }
    }
    pairs
}

/// Unordered pairs sharing at least `min_shared` evidence sentences, weighted
/// by shared count over the largest shared count. Synthetic concepts pool
/// their members' evidence and are skipped.
pub fn cooccurrence_pairs(concepts: &[&Concept], min_shared: usize) -> Vec<(ConceptId, ConceptId, f64)> {
    let mut by_sentence: BTreeMap<(&PaperId, &str), BTreeSet<&ConceptId>> = BTreeMap::new();
    for c in concepts.iter().filter(|c| !c.synthetic) {
        for e in &c.evidence {
            by_sentence
                .entry((&e.paper_id, e.text.as_str()))
                .or_default()
                .insert(&c.id);
        }
    }

    let mut shared: BTreeMap<(&ConceptId, &ConceptId), usize> = BTreeMap::new();
    for members in by_sentence.values() {
        let members: Vec<&ConceptId> = members.iter().copied().collect();
        for (i, a) in members.iter().enumerate() {
            for b in &members[i + 1..] {
                *shared.entry((*a, *b)).or_insert(0) += 1;
            }
        }
    }

    let min_shared = min_shared.max(1);
    let max = shared.values().copied().filter(|&n| n >= min_shared).max().unwrap_or(0);
    if max == 0 {
        return Vec::new();
    }
    shared
        .into_iter()
        .filter(|(_, n)| *n >= min_shared)
        .map(|((a, b), n)| (a.clone(), b.clone(), n as f64 / max as f64))
        .collect()
}
