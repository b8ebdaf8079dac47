//! End-to-end pipeline: papers in, validated concept graph and provenance
//! report out.

mod runner;

use crate::config::{ConfigError, PipelineConfig};
use crate::embedding::{EmbeddingPool, EmbeddingProvider};
use crate::graph::{ConceptGraph, GraphError, GraphSnapshot};
use crate::provenance::ProvenanceReport;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

/// Errors surfaced to callers of the pipeline
///
/// Everything below batch level (a paper, a strategy, an evidence lookup)
/// is absorbed into the provenance report instead.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no concepts could be extracted from {papers} valid papers")]
    NoConcepts {
        papers: usize,
        report: Box<ProvenanceReport>,
    },

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),
}

impl PipelineError {
    /// The run report, when the failure happened after the run started
    pub fn report(&self) -> Option<&ProvenanceReport> {
        match self {
            Self::NoConcepts { report, .. } => Some(report),
            _ => None,
        }
    }
}

/// Result of a successful run
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// QUERYABLE graph
    pub graph: ConceptGraph,
    pub report: ProvenanceReport,
}

/// Serialized form of a run: `{ "graph": ..., "report": ... }`
#[derive(Debug, Clone, Serialize)]
pub struct RunDocument {
    pub graph: GraphSnapshot,
    pub report: ProvenanceReport,
}

impl PipelineOutput {
    pub fn to_document(&self) -> RunDocument {
        RunDocument {
            graph: self.graph.snapshot(),
            report: self.report.clone(),
        }
    }
}

/// Extraction, consolidation, evidence, hierarchy and graph assembly
///
/// Holds an immutable configuration and an optional embedding pool; a
/// single pipeline can serve many runs.
pub struct ConceptPipeline {
    config: Arc<PipelineConfig>,
    pool: Option<EmbeddingPool>,
}

impl ConceptPipeline {
    /// Create a pipeline; the configuration is validated first.
    pub fn new(config: PipelineConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
            pool: None,
        })
    }

    /// Inject the embedding provider, batched and rate limited per the
    /// embedding configuration.
    pub fn with_embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.pool = Some(EmbeddingPool::new(
            provider,
            self.config.embedding.batch_size,
            self.config.embedding.max_concurrency,
        ));
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn has_embedding_provider(&self) -> bool {
        self.pool.is_some()
    }
}
