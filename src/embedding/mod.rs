//! Embedding port and the machinery around it
//!
//! The core only sees [`EmbeddingProvider`], an injected async port. Calls go
//! through [`EmbeddingPool`], which batches, caps concurrency and memoises
//! vectors. Production can plug in `FastEmbedProvider` (feature
//! `embeddings`); tests use deterministic stubs.

mod cluster;
mod pool;

pub use cluster::{agglomerate, centroid, cohesion, most_central};
pub use pool::EmbeddingPool;

use async_trait::async_trait;

/// Error type for embedding operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EmbeddingError {
    #[error("embedding provider unavailable: {0}")]
    Unavailable(String),

    #[error("embedding returned no results")]
    EmptyResult,

    #[error("embedding returned {got} vectors for {expected} texts")]
    CountMismatch { expected: usize, got: usize },

    #[error("embedding dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("embedding model error: {0}")]
    ModelError(String),
}

/// Text embedding backend
///
/// Assumed idempotent and side-effect free: the same text always maps to the
/// same vector, which is what makes caching in the pool transparent.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Identifies the model in logs and provenance.
    fn model_name(&self) -> &str;

    /// Embed a batch of texts, returning one vector per text in order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;
}

/// Cosine similarity; zero vectors are dissimilar to everything.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[cfg(feature = "embeddings")]
mod fastembed_impl {
    use super::{EmbeddingError, EmbeddingProvider};
    use async_trait::async_trait;
    use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
    use std::sync::{Arc, Mutex};

    /// ONNX embedder backed by fastembed
    ///
    /// `TextEmbedding::embed` needs `&mut self` and blocks, so inference runs
    /// on the blocking pool behind a mutex.
    pub struct FastEmbedProvider {
        model: Arc<Mutex<TextEmbedding>>,
        name: String,
    }

    impl FastEmbedProvider {
        pub fn new(model: EmbeddingModel) -> Result<Self, EmbeddingError> {
            let name = format!("{:?}", model);
            let options = InitOptions::new(model).with_show_download_progress(false);
            let embedding = TextEmbedding::try_new(options)
                .map_err(|e| EmbeddingError::Unavailable(e.to_string()))?;
            Ok(Self {
                model: Arc::new(Mutex::new(embedding)),
                name,
            })
        }

        /// all-MiniLM-L6-v2, small and fast enough for phrase embeddings
        pub fn default_model() -> Result<Self, EmbeddingError> {
            Self::new(EmbeddingModel::AllMiniLML6V2)
        }
    }

    #[async_trait]
    impl EmbeddingProvider for FastEmbedProvider {
        fn model_name(&self) -> &str {
            &self.name
        }

        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            if texts.is_empty() {
                return Ok(Vec::new());
            }
            let model = Arc::clone(&self.model);
            let texts = texts.to_vec();
            let embeddings = tokio::task::spawn_blocking(move || {
                let mut model = model
                    .lock()
                    .map_err(|e| EmbeddingError::ModelError(e.to_string()))?;
                model
                    .embed(texts, None)
                    .map_err(|e| EmbeddingError::ModelError(e.to_string()))
            })
            .await
            .map_err(|e| EmbeddingError::ModelError(e.to_string()))??;
            if embeddings.is_empty() {
                return Err(EmbeddingError::EmptyResult);
            }
            Ok(embeddings)
        }
    }
}

#[cfg(feature = "embeddings")]
pub use fastembed_impl::FastEmbedProvider;
