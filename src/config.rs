//! Pipeline configuration
//!
//! One immutable value built up front (defaults, YAML, or builder methods)
//! and handed to the pipeline, which shares it behind an `Arc`.

use crate::model::{ExtractionMethod, StrategyKind};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Error type for configuration loading and validation
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Per-method weights for the final weighted average
///
/// Weights need not sum to 1; the orchestrator normalizes over the methods
/// that actually produced a concept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyWeights {
    pub rule_based: f64,
    pub tfidf: f64,
    pub text_rank: f64,
    pub topic_model: f64,
    pub embedding: f64,
}

impl Default for StrategyWeights {
    fn default() -> Self {
        Self {
            rule_based: 1.0,
            tfidf: 0.8,
            text_rank: 0.8,
            topic_model: 0.6,
            embedding: 0.9,
        }
    }
}

impl StrategyWeights {
    pub fn weight(&self, method: ExtractionMethod) -> f64 {
        match method {
            ExtractionMethod::RuleBased => self.rule_based,
            ExtractionMethod::Tfidf => self.tfidf,
            ExtractionMethod::TextRank => self.text_rank,
            ExtractionMethod::TopicModel => self.topic_model,
            ExtractionMethod::Embedding => self.embedding,
        }
    }

    fn all(&self) -> [f64; 5] {
        [
            self.rule_based,
            self.tfidf,
            self.text_rank,
            self.topic_model,
            self.embedding,
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleBasedConfig {
    /// Longest noun phrase kept by the chunker
    pub max_phrase_words: usize,
    /// Domain terms always surfaced when present (may contain stopwords)
    pub lexicon: Vec<String>,
    /// Score floor for phrases taking part in a Hearst pattern
    pub hearst_score_floor: f64,
}

impl Default for RuleBasedConfig {
    fn default() -> Self {
        Self {
            max_phrase_words: 4,
            lexicon: Vec::new(),
            hearst_score_floor: 0.75,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatisticalConfig {
    pub max_ngram: usize,
    /// Candidates kept per sub-method per paper
    pub max_candidates: usize,
    pub textrank_window: usize,
    pub damping: f64,
    pub tolerance: f64,
    pub max_iterations: usize,
    pub num_topics: usize,
    pub topic_terms: usize,
    pub alpha: f64,
    pub beta: f64,
    pub gibbs_sweeps: usize,
}

impl Default for StatisticalConfig {
    fn default() -> Self {
        Self {
            max_ngram: 3,
            max_candidates: 30,
            textrank_window: 4,
            damping: 0.85,
            tolerance: 1e-6,
            max_iterations: 100,
            num_topics: 5,
            topic_terms: 5,
            alpha: 0.1,
            beta: 0.01,
            gibbs_sweeps: 50,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Cosine similarity for phrase clustering
    pub cluster_threshold: f64,
    /// Cosine similarity for whole-document clustering
    pub document_cluster_threshold: f64,
    /// Distinct phrases embedded per paper
    pub max_candidates: usize,
    /// Texts per provider call
    pub batch_size: usize,
    /// Concurrent provider calls across the whole run
    pub max_concurrency: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            cluster_threshold: 0.75,
            document_cluster_threshold: 0.8,
            max_candidates: 40,
            batch_size: 32,
            max_concurrency: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsolidationConfig {
    /// Cosine similarity at or above which distinct keys are merged
    pub merge_threshold: f64,
    pub top_k: usize,
}

impl Default for ConsolidationConfig {
    fn default() -> Self {
        Self {
            merge_threshold: 0.9,
            top_k: 50,
        }
    }
}

/// What to do with a concept that has no evidence sentence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UngroundedPolicy {
    #[default]
    Drop,
    KeepUngrounded,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvidenceConfig {
    pub max_sentences: usize,
    /// Allowed fraction of unmatched surface-form tokens in a fuzzy match
    pub fuzzy_tolerance: f64,
    pub policy: UngroundedPolicy,
}

impl Default for EvidenceConfig {
    fn default() -> Self {
        Self {
            max_sentences: 5,
            fuzzy_tolerance: 0.2,
            policy: UngroundedPolicy::Drop,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HierarchyConfig {
    /// Clustering rounds above the concept level
    pub max_depth: usize,
    /// Cosine distance of the first clustering round
    pub base_distance: f64,
    /// Distance added per further round
    pub distance_step: f64,
    /// Infer synthetic parents from embeddings
    pub infer_from_embeddings: bool,
}

impl Default for HierarchyConfig {
    fn default() -> Self {
        Self {
            max_depth: 4,
            base_distance: 0.25,
            distance_step: 0.15,
            infer_from_embeddings: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    pub related_threshold: f64,
    /// Shared evidence sentences needed for a co-occurrence edge
    pub min_cooccurrence: usize,
    pub damping: f64,
    pub tolerance: f64,
    pub max_iterations: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            related_threshold: 0.6,
            min_cooccurrence: 1,
            damping: 0.85,
            tolerance: 1e-6,
            max_iterations: 100,
        }
    }
}

/// Complete pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub strategies: Vec<StrategyKind>,
    pub weights: StrategyWeights,
    /// Shorter paper bodies are skipped as input errors
    pub min_text_length: usize,
    /// Seed for every randomized step
    pub seed: u64,
    pub rule_based: RuleBasedConfig,
    pub statistical: StatisticalConfig,
    pub embedding: EmbeddingConfig,
    pub consolidation: ConsolidationConfig,
    pub evidence: EvidenceConfig,
    pub hierarchy: HierarchyConfig,
    pub graph: GraphConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            strategies: StrategyKind::all(),
            weights: StrategyWeights::default(),
            min_text_length: 50,
            seed: 42,
            rule_based: RuleBasedConfig::default(),
            statistical: StatisticalConfig::default(),
            embedding: EmbeddingConfig::default(),
            consolidation: ConsolidationConfig::default(),
            evidence: EvidenceConfig::default(),
            hierarchy: HierarchyConfig::default(),
            graph: GraphConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Config restricted to the strategies that need no embedding provider
    pub fn lexical_only() -> Self {
        Self {
            strategies: vec![StrategyKind::RuleBased, StrategyKind::Statistical],
            ..Self::new()
        }
    }

    pub fn with_strategies(mut self, strategies: Vec<StrategyKind>) -> Self {
        self.strategies = strategies;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.consolidation.top_k = top_k;
        self
    }

    pub fn with_merge_threshold(mut self, threshold: f64) -> Self {
        self.consolidation.merge_threshold = threshold;
        self
    }

    pub fn with_ungrounded_policy(mut self, policy: UngroundedPolicy) -> Self {
        self.evidence.policy = policy;
        self
    }

    pub fn with_lexicon(mut self, terms: Vec<String>) -> Self {
        self.rule_based.lexicon = terms;
        self
    }

    pub fn with_embedding_concurrency(mut self, max_concurrency: usize, batch_size: usize) -> Self {
        self.embedding.max_concurrency = max_concurrency;
        self.embedding.batch_size = batch_size;
        self
    }

    pub fn is_enabled(&self, strategy: StrategyKind) -> bool {
        self.strategies.contains(&strategy)
    }

    /// Parse YAML; missing sections take their defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Reject values no run could honour.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.strategies.is_empty() {
            return Err(invalid("at least one strategy must be enabled"));
        }
        let weights = self.weights.all();
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(invalid("strategy weights must be non-negative"));
        }
        if weights.iter().all(|w| *w == 0.0) {
            return Err(invalid("at least one strategy weight must be positive"));
        }

        let unit = [
            ("embedding.cluster_threshold", self.embedding.cluster_threshold),
            (
                "embedding.document_cluster_threshold",
                self.embedding.document_cluster_threshold,
            ),
            ("consolidation.merge_threshold", self.consolidation.merge_threshold),
            ("evidence.fuzzy_tolerance", self.evidence.fuzzy_tolerance),
            ("rule_based.hearst_score_floor", self.rule_based.hearst_score_floor),
            ("hierarchy.base_distance", self.hierarchy.base_distance),
            ("hierarchy.distance_step", self.hierarchy.distance_step),
            ("graph.related_threshold", self.graph.related_threshold),
            ("statistical.damping", self.statistical.damping),
            ("graph.damping", self.graph.damping),
        ];
        for (name, value) in unit {
            if !(0.0..=1.0).contains(&value) {
                return Err(invalid(&format!("{name} must be within [0, 1], got {value}")));
            }
        }

        let positive = [
            ("rule_based.max_phrase_words", self.rule_based.max_phrase_words),
            ("statistical.max_ngram", self.statistical.max_ngram),
            ("statistical.max_candidates", self.statistical.max_candidates),
            ("statistical.textrank_window", self.statistical.textrank_window),
            ("statistical.num_topics", self.statistical.num_topics),
            ("statistical.topic_terms", self.statistical.topic_terms),
            ("embedding.max_candidates", self.embedding.max_candidates),
            ("embedding.batch_size", self.embedding.batch_size),
            ("embedding.max_concurrency", self.embedding.max_concurrency),
            ("consolidation.top_k", self.consolidation.top_k),
            ("evidence.max_sentences", self.evidence.max_sentences),
            ("graph.max_iterations", self.graph.max_iterations),
            ("statistical.max_iterations", self.statistical.max_iterations),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(invalid(&format!("{name} must be positive")));
            }
        }

        if self.statistical.alpha <= 0.0 || self.statistical.beta <= 0.0 {
            return Err(invalid("statistical.alpha and statistical.beta must be positive"));
        }
        if self.graph.tolerance <= 0.0 || self.statistical.tolerance <= 0.0 {
            return Err(invalid("convergence tolerances must be positive"));
        }
        Ok(())
    }
}

fn invalid(msg: &str) -> ConfigError {
    ConfigError::Invalid(msg.to_string())
}
