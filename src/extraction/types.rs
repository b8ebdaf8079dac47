//! Types shared by the extraction strategies

use crate::embedding::EmbeddingError;
use crate::model::{ExtractionMethod, PaperId, StrategyKind};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// A scored candidate concept from one strategy on one paper
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Canonical key
    pub key: String,
    /// First surface form seen
    pub text: String,
    /// Strategy-local score in [0, 1]
    pub score: f64,
    /// Occurrences in the paper
    pub frequency: u32,
    pub method: ExtractionMethod,
    pub paper_id: PaperId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl Candidate {
    pub fn new(
        text: impl Into<String>,
        score: f64,
        frequency: u32,
        method: ExtractionMethod,
        paper_id: PaperId,
    ) -> Self {
        let text = text.into();
        Self {
            key: crate::text::canonical_key(&text),
            text,
            score: score.clamp(0.0, 1.0),
            frequency,
            method,
            paper_id,
            embedding: None,
        }
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }
}

/// An explicit hypernym relation found by a lexical pattern
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HypernymPair {
    pub parent: String,
    pub child: String,
    pub parent_text: String,
    pub child_text: String,
    /// Pattern name, e.g. `such_as`
    pub pattern: String,
    pub paper_id: PaperId,
    /// Sentence the pattern matched in
    pub sentence: String,
}

/// Execution metadata attached to every result
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionMetadata {
    pub elapsed_ms: u64,
    pub parameters: BTreeMap<String, String>,
    /// Reason the strategy ran in a reduced mode, if it did
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub degraded: Option<String>,
    /// The paper was below the minimum length; the result is empty
    #[serde(default)]
    pub input_too_short: bool,
}

impl ExtractionMetadata {
    pub fn with_parameter(mut self, name: &str, value: impl ToString) -> Self {
        self.parameters.insert(name.to_string(), value.to_string());
        self
    }
}

/// Output of one strategy on one paper; consumed by the orchestrator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub strategy: StrategyKind,
    pub paper_id: PaperId,
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub hypernyms: Vec<HypernymPair>,
    pub metadata: ExtractionMetadata,
}

impl ExtractionResult {
    pub fn new(strategy: StrategyKind, paper_id: PaperId) -> Self {
        Self {
            strategy,
            paper_id,
            candidates: Vec::new(),
            hypernyms: Vec::new(),
            metadata: ExtractionMetadata::default(),
        }
    }

    /// Empty, successful result for a paper below the minimum length
    pub fn too_short(strategy: StrategyKind, paper_id: PaperId) -> Self {
        let mut result = Self::new(strategy, paper_id);
        result.metadata.input_too_short = true;
        result
    }

    pub fn methods(&self) -> BTreeSet<ExtractionMethod> {
        self.candidates.iter().map(|c| c.method).collect()
    }
}

/// Error type for strategy execution
#[derive(Debug, Clone, thiserror::Error)]
pub enum ExtractionError {
    #[error("input too short: {len} chars (min: {min})")]
    InputTooShort { len: usize, min: usize },

    #[error(transparent)]
    ProviderUnavailable(#[from] EmbeddingError),

    #[error("strategy execution failed: {0}")]
    Execution(String),
}

/// Fitted topic model shared by every paper of a run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TopicModel {
    /// Per topic: top terms with weight normalized by the topic's best term
    pub topics: Vec<Vec<(String, f64)>>,
    /// Per paper: share of the paper's tokens assigned to each topic
    pub paper_topics: HashMap<PaperId, Vec<f64>>,
}

/// A group of papers whose whole-document embeddings cluster together
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentCluster {
    pub papers: Vec<PaperId>,
    pub cohesion: f64,
}

/// Corpus-wide statistics computed once before per-paper extraction
#[derive(Debug, Clone, Default)]
pub struct CorpusContext {
    pub documents: usize,
    /// n-gram key -> number of papers containing it
    pub document_frequency: HashMap<String, usize>,
    /// Largest raw TF-IDF of any term in any paper of the batch
    pub max_tfidf: f64,
    /// Chunk phrase keys per paper
    pub paper_phrases: HashMap<PaperId, BTreeSet<String>>,
    pub topics: Option<TopicModel>,
    pub document_clusters: Vec<DocumentCluster>,
    /// Why document clustering was skipped, if it was
    pub document_clustering_degraded: Option<String>,
}

impl CorpusContext {
    /// Smoothed inverse document frequency: `ln((1 + N) / (1 + df)) + 1`.
    pub fn idf(&self, term: &str) -> f64 {
        let df = self.document_frequency.get(term).copied().unwrap_or(0) as f64;
        ((1.0 + self.documents as f64) / (1.0 + df)).ln() + 1.0
    }

    pub fn cluster_of(&self, paper: &PaperId) -> Option<&DocumentCluster> {
        self.document_clusters
            .iter()
            .find(|c| c.papers.len() > 1 && c.papers.contains(paper))
    }
}
