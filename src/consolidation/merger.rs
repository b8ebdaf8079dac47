//! Concept merger: folds strategy candidates into consolidated concepts
//!
//! Exact canonical keys are unioned first. Distinct keys are then unioned
//! semantically or, when no embeddings are available, lexically (equal
//! plural-folded signature). Semantic groups use complete linkage: every
//! pair inside a group has cosine at or above the merge threshold, so a
//! chain of near neighbours never pulls two distant keys together.

use crate::config::{ConsolidationConfig, StrategyWeights};
use crate::embedding::cosine_similarity;
use crate::extraction::ExtractionResult;
use crate::model::{Concept, ConceptId, ExtractionMethod, PaperId};
use crate::text::lexical_signature;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// How distinct keys were matched during the merge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    Semantic,
    Lexical,
}

/// Everything known about one canonical key before unioning
#[derive(Debug, Clone, Default)]
struct KeyAggregate {
    /// Per paper, the largest count any strategy observed
    per_paper: BTreeMap<PaperId, u32>,
    method_scores: BTreeMap<ExtractionMethod, f64>,
    /// Surface form -> weight (sum of candidate frequencies)
    surfaces: BTreeMap<String, u32>,
    embedding: Option<Vec<f32>>,
}

impl KeyAggregate {
    fn total_frequency(&self) -> u32 {
        self.per_paper.values().sum()
    }

    fn display_text(&self, key: &str) -> String {
        self.surfaces
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
            .map(|(s, _)| s.clone())
            .unwrap_or_else(|| key.to_string())
    }
}

/// Merges extraction results into ranked concepts
pub struct ConceptMerger {
    config: ConsolidationConfig,
    weights: StrategyWeights,
}

impl ConceptMerger {
    pub fn new(config: ConsolidationConfig, weights: StrategyWeights) -> Self {
        Self { config, weights }
    }

    /// Canonical keys present in the results, sorted.
    pub fn keys(results: &[ExtractionResult]) -> Vec<String> {
        results
            .iter()
            .flat_map(|r| r.candidates.iter().map(|c| c.key.clone()))
            .filter(|k| !k.is_empty())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Merge results into concepts ranked by final score (desc, then key)
    /// and truncated to `top_k`.
    ///
    /// `embeddings` maps canonical keys to vectors; `None` selects the
    /// lexical fallback.
    pub fn merge(
        &self,
        results: &[ExtractionResult],
        embeddings: Option<&HashMap<String, Vec<f32>>>,
    ) -> (Vec<Concept>, MatchMode) {
        let mut aggregates: BTreeMap<String, KeyAggregate> = BTreeMap::new();
        for result in results {
            for c in &result.candidates {
                if c.key.is_empty() {
                    continue;
                }
                let agg = aggregates.entry(c.key.clone()).or_default();
                let seen = agg.per_paper.entry(c.paper_id.clone()).or_insert(0);
                *seen = (*seen).max(c.frequency.max(1));
                let score = agg.method_scores.entry(c.method).or_insert(0.0);
                *score = score.max(c.score);
                *agg.surfaces.entry(c.text.clone()).or_insert(0) += c.frequency.max(1);
                if agg.embedding.is_none() {
                    agg.embedding = c.embedding.clone();
                }
            }
        }

        let keys: Vec<String> = aggregates.keys().cloned().collect();
        if let Some(vectors) = embeddings {
            for key in &keys {
                if let (Some(agg), Some(v)) = (aggregates.get_mut(key), vectors.get(key)) {
                    agg.embedding = Some(v.clone());
                }
            }
        }

        let mode = if embeddings.is_some() {
            MatchMode::Semantic
        } else {
            MatchMode::Lexical
        };
        let groups = self.group(&keys, &aggregates, mode);

        let mut concepts: Vec<Concept> = groups
            .into_iter()
            .map(|members| self.fold(&members, &aggregates))
            .collect();
        concepts.sort_by(|a, b| {
            b.relevance
                .total_cmp(&a.relevance)
                .then_with(|| a.id.cmp(&b.id))
        });
        concepts.truncate(self.config.top_k);
        (concepts, mode)
    }

    /// Partition keys into union groups (members sorted, groups sorted).
    fn group(
        &self,
        keys: &[String],
        aggregates: &BTreeMap<String, KeyAggregate>,
        mode: MatchMode,
    ) -> Vec<Vec<String>> {
        let owner = match mode {
            MatchMode::Semantic => {
                let vectors: Vec<Option<&Vec<f32>>> = keys
                    .iter()
                    .map(|k| aggregates.get(k).and_then(|a| a.embedding.as_ref()))
                    .collect();
                let mut close = Vec::new();
                for i in 0..keys.len() {
                    for j in (i + 1)..keys.len() {
                        if let (Some(a), Some(b)) = (vectors[i], vectors[j]) {
                            let similarity = cosine_similarity(a, b) as f64;
                            if similarity >= self.config.merge_threshold {
                                close.push((similarity, i, j));
                            }
                        }
                    }
                }
                complete_linkage(keys.len(), close)
            }
            MatchMode::Lexical => {
                let mut owner: Vec<usize> = (0..keys.len()).collect();
                let mut by_signature: HashMap<String, usize> = HashMap::new();
                for (i, key) in keys.iter().enumerate() {
                    owner[i] = *by_signature.entry(lexical_signature(key)).or_insert(i);
                }
                owner
            }
        };

        let mut groups: BTreeMap<usize, Vec<String>> = BTreeMap::new();
        for (i, key) in keys.iter().enumerate() {
            groups.entry(owner[i]).or_default().push(key.clone());
        }
        let mut out: Vec<Vec<String>> = groups.into_values().collect();
        out.sort();
        out
    }

    fn fold(&self, members: &[String], aggregates: &BTreeMap<String, KeyAggregate>) -> Concept {
        let empty = KeyAggregate::default();
        let agg = |k: &str| -> &KeyAggregate { aggregates.get(k).unwrap_or(&empty) };

        let representative = members
            .iter()
            .max_by(|a, b| {
                agg(a.as_str())
                    .total_frequency()
                    .cmp(&agg(b.as_str()).total_frequency())
                    .then_with(|| b.len().cmp(&a.len()))
                    .then_with(|| b.cmp(a))
            })
            .cloned()
            .unwrap_or_default();
        let rep = agg(representative.as_str());

        let mut concept = Concept::new(
            ConceptId::new(representative.clone()),
            rep.display_text(&representative),
        );
        let mut per_paper: BTreeMap<PaperId, u32> = BTreeMap::new();
        for key in members {
            let a = agg(key.as_str());
            for (paper, count) in &a.per_paper {
                *per_paper.entry(paper.clone()).or_insert(0) += count;
            }
            for (method, score) in &a.method_scores {
                let s = concept.method_scores.entry(*method).or_insert(0.0);
                *s = s.max(*score);
                concept.methods.insert(*method);
            }
            if key != &representative {
                concept.aliases.insert(key.clone());
            }
        }
        concept.frequency = per_paper.values().sum();
        concept.source_papers = per_paper.into_keys().collect();
        concept.embedding = rep
            .embedding
            .clone()
            .or_else(|| members.iter().find_map(|k| agg(k.as_str()).embedding.clone()));
        concept.relevance = self.final_score(&concept.method_scores);
        concept
    }

    /// Weighted average over the methods that produced the concept.
    pub fn final_score(&self, method_scores: &BTreeMap<ExtractionMethod, f64>) -> f64 {
        let (num, den) = method_scores.iter().fold((0.0, 0.0), |(n, d), (m, s)| {
            let w = self.weights.weight(*m);
            (n + w * s, d + w)
        });
        if den > 0.0 {
            (num / den).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

/// Group owner per index under complete linkage: two groups join only when
/// every cross pair is in `close`. Pairs are tried most similar first, ties
/// by index, and the lower owner index survives a join.
fn complete_linkage(n: usize, mut close: Vec<(f64, usize, usize)>) -> Vec<usize> {
    close.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| (a.1, a.2).cmp(&(b.1, b.2))));
    let linked: HashSet<(usize, usize)> = close.iter().map(|&(_, i, j)| (i, j)).collect();
    let mut owner: Vec<usize> = (0..n).collect();
    let mut members: Vec<Vec<usize>> = (0..n).map(|i| vec![i]).collect();

    for (_, i, j) in close {
        let (a, b) = (owner[i], owner[j]);
        if a == b {
            continue;
        }
        let joinable = members[a]
            .iter()
            .all(|&x| members[b].iter().all(|&y| linked.contains(&(x.min(y), x.max(y)))));
        if !joinable {
            continue;
        }
        let (keep, gone) = (a.min(b), a.max(b));
        let moved = std::mem::take(&mut members[gone]);
        for &x in &moved {
            owner[x] = keep;
        }
        members[keep].extend(moved);
    }
    owner
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::Candidate;
    use crate::model::StrategyKind;

    fn result(strategy: StrategyKind, paper: &str, cands: &[(&str, f64, u32, ExtractionMethod)]) -> ExtractionResult {
        let mut r = ExtractionResult::new(strategy, PaperId::new(paper));
        r.candidates = cands
            .iter()
            .map(|(t, s, f, m)| Candidate::new(*t, *s, *f, *m, PaperId::new(paper)))
            .collect();
        r
    }

    fn merger() -> ConceptMerger {
        ConceptMerger::new(ConsolidationConfig::default(), StrategyWeights::default())
    }

    #[test]
    fn same_key_across_strategies_counts_once_per_paper() {
        let results = vec![
            result(StrategyKind::RuleBased, "a", &[("Quantum cryptography", 0.8, 1, ExtractionMethod::RuleBased)]),
            result(StrategyKind::Statistical, "a", &[("quantum cryptography", 0.6, 1, ExtractionMethod::Tfidf)]),
            result(StrategyKind::RuleBased, "b", &[("quantum cryptography", 0.7, 1, ExtractionMethod::RuleBased)]),
        ];
        let (concepts, mode) = merger().merge(&results, None);
        assert_eq!(mode, MatchMode::Lexical);
        assert_eq!(concepts.len(), 1);
        let c = &concepts[0];
        assert_eq!(c.id.as_str(), "quantum cryptography");
        assert_eq!(c.frequency, 2);
        assert_eq!(c.source_papers.len(), 2);
        assert_eq!(c.method_scores[&ExtractionMethod::RuleBased], 0.8);
        // (1.0 * 0.8 + 0.8 * 0.6) / 1.8
        assert!((c.relevance - (0.8 + 0.48) / 1.8).abs() < 1e-12);
    }

    #[test]
    fn lexical_fallback_folds_plurals() {
        let results = vec![result(
            StrategyKind::RuleBased,
            "a",
            &[
                ("neural networks", 0.9, 3, ExtractionMethod::RuleBased),
                ("neural network", 0.5, 1, ExtractionMethod::RuleBased),
            ],
        )];
        let (concepts, _) = merger().merge(&results, None);
        assert_eq!(concepts.len(), 1);
        assert_eq!(concepts[0].id.as_str(), "neural networks");
        assert!(concepts[0].aliases.contains("neural network"));
        assert_eq!(concepts[0].frequency, 4);
    }

    #[test]
    fn semantic_merge_respects_threshold() {
        let results = vec![result(
            StrategyKind::RuleBased,
            "a",
            &[
                ("ids", 0.9, 1, ExtractionMethod::RuleBased),
                ("intrusion detection", 0.9, 2, ExtractionMethod::RuleBased),
                ("firewall", 0.9, 1, ExtractionMethod::RuleBased),
            ],
        )];
        let mut vectors = HashMap::new();
        vectors.insert("ids".to_string(), vec![1.0, 0.05]);
        vectors.insert("intrusion detection".to_string(), vec![1.0, 0.0]);
        vectors.insert("firewall".to_string(), vec![0.6, 0.8]);
        let (concepts, mode) = merger().merge(&results, Some(&vectors));
        assert_eq!(mode, MatchMode::Semantic);
        assert_eq!(concepts.len(), 2);
        let merged = concepts.iter().find(|c| c.id.as_str() == "intrusion detection").unwrap();
        assert_eq!(merged.frequency, 3);
        assert!(merged.aliases.contains("ids"));
    }

    #[test]
    fn semantic_merge_does_not_chain_through_neighbours() {
        let results = vec![result(
            StrategyKind::RuleBased,
            "a",
            &[
                ("alpha", 0.9, 1, ExtractionMethod::RuleBased),
                ("beta", 0.9, 1, ExtractionMethod::RuleBased),
                ("gamma", 0.9, 1, ExtractionMethod::RuleBased),
            ],
        )];
        // 0, 20 and 40 degrees: neighbours at cos 0.94, the ends at cos 0.77
        let at = |deg: f32| vec![deg.to_radians().cos(), deg.to_radians().sin()];
        let mut vectors = HashMap::new();
        vectors.insert("alpha".to_string(), at(0.0));
        vectors.insert("beta".to_string(), at(20.0));
        vectors.insert("gamma".to_string(), at(40.0));

        let (concepts, _) = merger().merge(&results, Some(&vectors));
        assert_eq!(concepts.len(), 2);
        for c in &concepts {
            let keys: BTreeSet<&str> = std::iter::once(c.id.as_str())
                .chain(c.aliases.iter().map(String::as_str))
                .collect();
            assert!(!(keys.contains("alpha") && keys.contains("gamma")), "{keys:?}");
            for a in &keys {
                for b in &keys {
                    let sim = cosine_similarity(&vectors[*a], &vectors[*b]) as f64;
                    assert!(sim >= ConsolidationConfig::default().merge_threshold, "{a} ~ {b}");
                }
            }
        }
    }

    #[test]
    fn complete_linkage_joins_only_fully_linked_groups() {
        // 0-1, 1-2, 0-2 form a clique; 3 links only to 2
        let close = vec![(0.95, 0, 1), (0.93, 1, 2), (0.92, 0, 2), (0.99, 2, 3)];
        let owner = complete_linkage(4, close);
        assert_eq!(owner[2], owner[3]);
        assert_ne!(owner[0], owner[2]);
        assert_eq!(owner[0], owner[1]);
    }

    #[test]
    fn ranking_is_by_score_then_key_and_truncated() {
        let results = vec![result(
            StrategyKind::RuleBased,
            "a",
            &[
                ("beta", 0.5, 1, ExtractionMethod::RuleBased),
                ("alpha", 0.5, 1, ExtractionMethod::RuleBased),
                ("gamma", 0.9, 1, ExtractionMethod::RuleBased),
            ],
        )];
        let merger = ConceptMerger::new(
            ConsolidationConfig {
                top_k: 2,
                ..Default::default()
            },
            StrategyWeights::default(),
        );
        let (concepts, _) = merger.merge(&results, None);
        let ids: Vec<_> = concepts.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["gamma", "alpha"]);
    }

    #[test]
    fn representative_prefers_frequency_then_shorter_key() {
        let results = vec![result(
            StrategyKind::RuleBased,
            "a",
            &[
                ("hash functions", 0.5, 1, ExtractionMethod::RuleBased),
                ("hash function", 0.5, 1, ExtractionMethod::RuleBased),
            ],
        )];
        let (concepts, _) = merger().merge(&results, None);
        assert_eq!(concepts[0].id.as_str(), "hash function");
    }
}
