//! Concept representation

use super::{EvidenceSentence, PaperId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Canonical identifier of a concept: its normalized text key
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConceptId(String);

impl ConceptId {
    /// Wrap an already-normalized key.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Normalize arbitrary surface text into a canonical id.
    pub fn from_text(text: &str) -> Self {
        Self(crate::text::canonical_key(text))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ConceptId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ConceptId {
    fn from(s: &str) -> Self {
        Self::from_text(s)
    }
}

/// Extraction strategies, selected by configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    RuleBased,
    Statistical,
    Embedding,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::RuleBased => "rule_based",
            StrategyKind::Statistical => "statistical",
            StrategyKind::Embedding => "embedding",
        }
    }

    pub fn all() -> Vec<StrategyKind> {
        vec![
            StrategyKind::RuleBased,
            StrategyKind::Statistical,
            StrategyKind::Embedding,
        ]
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The method that scored a candidate. Statistical sub-methods are tagged
/// separately so they can be weighted independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    RuleBased,
    Tfidf,
    TextRank,
    TopicModel,
    Embedding,
}

impl ExtractionMethod {
    pub fn strategy(&self) -> StrategyKind {
        match self {
            ExtractionMethod::RuleBased => StrategyKind::RuleBased,
            ExtractionMethod::Tfidf | ExtractionMethod::TextRank | ExtractionMethod::TopicModel => {
                StrategyKind::Statistical
            }
            ExtractionMethod::Embedding => StrategyKind::Embedding,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionMethod::RuleBased => "rule_based",
            ExtractionMethod::Tfidf => "tfidf",
            ExtractionMethod::TextRank => "text_rank",
            ExtractionMethod::TopicModel => "topic_model",
            ExtractionMethod::Embedding => "embedding",
        }
    }
}

impl std::fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A consolidated concept
///
/// Created from strategy candidates, folded by canonical key during
/// consolidation, then enriched with evidence and hierarchy position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Concept {
    pub id: ConceptId,
    /// Display form (most frequent surface form)
    pub text: String,
    /// Other canonical keys folded into this concept
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub aliases: BTreeSet<String>,
    pub frequency: u32,
    /// Final consolidated score in [0, 1]
    pub relevance: f64,
    pub methods: BTreeSet<ExtractionMethod>,
    /// Best score per contributing method
    #[serde(default)]
    pub method_scores: BTreeMap<ExtractionMethod, f64>,
    #[serde(default)]
    pub source_papers: BTreeSet<PaperId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_id: Option<u32>,
    /// Hierarchy level, roots are 0
    #[serde(default)]
    pub level: u32,
    #[serde(default)]
    pub parents: BTreeSet<ConceptId>,
    #[serde(default)]
    pub children: BTreeSet<ConceptId>,
    #[serde(default)]
    pub evidence: Vec<EvidenceSentence>,
    /// False when kept without evidence under the keep-ungrounded policy
    #[serde(default = "default_true")]
    pub grounded: bool,
    /// True for parents created by embedding clustering
    #[serde(default)]
    pub synthetic: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

fn default_true() -> bool {
    true
}

impl Concept {
    pub fn new(id: ConceptId, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
            aliases: BTreeSet::new(),
            frequency: 0,
            relevance: 0.0,
            methods: BTreeSet::new(),
            method_scores: BTreeMap::new(),
            source_papers: BTreeSet::new(),
            cluster_id: None,
            level: 0,
            parents: BTreeSet::new(),
            children: BTreeSet::new(),
            evidence: Vec::new(),
            grounded: true,
            synthetic: false,
            embedding: None,
        }
    }

    pub fn with_relevance(mut self, relevance: f64) -> Self {
        self.relevance = relevance.clamp(0.0, 1.0);
        self
    }

    pub fn with_frequency(mut self, frequency: u32) -> Self {
        self.frequency = frequency;
        self
    }

    pub fn with_method(mut self, method: ExtractionMethod, score: f64) -> Self {
        self.methods.insert(method);
        self.method_scores.insert(method, score.clamp(0.0, 1.0));
        self
    }

    pub fn with_paper(mut self, paper: impl Into<PaperId>) -> Self {
        self.source_papers.insert(paper.into());
        self
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    /// The contributing method with the highest score (ties: enum order).
    pub fn best_method(&self) -> Option<(ExtractionMethod, f64)> {
        self.method_scores
            .iter()
            .fold(None, |best: Option<(ExtractionMethod, f64)>, (m, s)| match best {
                Some((_, bs)) if bs >= *s => best,
                _ => Some((*m, *s)),
            })
    }

    /// Surface forms used to locate the concept in text
    pub fn surface_forms(&self) -> Vec<String> {
        let mut forms: BTreeSet<String> = self.aliases.iter().cloned().collect();
        forms.insert(self.id.as_str().to_string());
        forms.insert(self.text.to_lowercase());
        forms.into_iter().filter(|f| !f.trim().is_empty()).collect()
    }

    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concept_id_normalizes_case_and_whitespace() {
        assert_eq!(
            ConceptId::from_text("  Neural   Networks "),
            ConceptId::new("neural networks")
        );
    }

    #[test]
    fn best_method_prefers_highest_score() {
        let concept = Concept::new(ConceptId::new("x"), "x")
            .with_method(ExtractionMethod::Tfidf, 0.4)
            .with_method(ExtractionMethod::RuleBased, 0.9);
        assert_eq!(
            concept.best_method(),
            Some((ExtractionMethod::RuleBased, 0.9))
        );
    }

    #[test]
    fn method_scores_serialize_with_snake_case_keys() {
        let concept = Concept::new(ConceptId::new("x"), "x").with_method(ExtractionMethod::TextRank, 0.5);
        let json = serde_json::to_value(&concept).unwrap();
        assert_eq!(json["method_scores"]["text_rank"], 0.5);
        assert_eq!(json["methods"][0], "text_rank");
    }
}
