//! conceptgraph: concept extraction and concept hierarchies for scientific text
//!
//! Papers go through several extraction strategies in parallel (rule based,
//! statistical, embedding clustering). Their candidates are merged into
//! consolidated concepts, grounded in source sentences, arranged into an
//! `is_a` hierarchy and finally published as a queryable concept graph. Every
//! run produces a provenance report describing what ran, what degraded and
//! what was discarded.
//!
//! # Core Concepts
//!
//! - **Concepts**: merged candidates with relevance, frequency and evidence
//! - **Edges**: `is_a` (acyclic hierarchy), `related_to` and `co_occurs_with`
//! - **Provenance**: per-run record of strategies, degradations and rejections
//!
//! # Example
//!
//! ```no_run
//! use conceptgraph::{ConceptPipeline, Paper, PipelineConfig};
//!
//! # async fn run() -> Result<(), conceptgraph::PipelineError> {
//! let pipeline = ConceptPipeline::new(PipelineConfig::lexical_only())?;
//! let papers = vec![Paper::new("p1", "Title", "Body text of the paper ...")];
//! let output = pipeline.run(papers).await?;
//! for concept in output.graph.ranked_concepts()? {
//!     println!("{} {:.3}", concept.text, concept.importance);
//! }
//! # Ok(())
//! # }
//! ```

pub mod cancel;
pub mod centrality;
pub mod config;
pub mod consolidation;
pub mod embedding;
pub mod evidence;
pub mod extraction;
pub mod graph;
pub mod hierarchy;
pub mod model;
pub mod pipeline;
pub mod provenance;
pub mod text;

pub use cancel::CancellationToken;
pub use config::{ConfigError, PipelineConfig, UngroundedPolicy};
pub use embedding::{EmbeddingError, EmbeddingPool, EmbeddingProvider};
pub use graph::{
    ConceptEdge, ConceptGraph, Direction, EdgeKind, GraphError, GraphSnapshot, GraphState, RankedConcept,
    TraversalResult, TraverseQuery,
};
pub use model::{Concept, ConceptId, EvidenceSentence, ExtractionMethod, Paper, PaperId, StrategyKind};
pub use pipeline::{ConceptPipeline, PipelineError, PipelineOutput, RunDocument};
pub use provenance::{ProvenanceReport, RunOutcome};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
