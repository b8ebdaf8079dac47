//! Stub embedding providers

use async_trait::async_trait;
use conceptgraph::{CancellationToken, EmbeddingError, EmbeddingProvider};
use std::sync::atomic::{AtomicUsize, Ordering};

const DIMS: usize = 1024;

/// Bag-of-words embedder: every lowercased word is hashed (FNV-1a, high bits)
/// into one of 1024 buckets, then the vector is L2-normalized. Phrases sharing words
/// are similar; identical texts always map to identical vectors.
#[derive(Default)]
pub struct HashingEmbedder {
    calls: AtomicUsize,
    texts: AtomicUsize,
}

impl HashingEmbedder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider calls so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Texts embedded so far
    pub fn texts(&self) -> usize {
        self.texts.load(Ordering::SeqCst)
    }

    pub fn vector(text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; DIMS];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            v[(fnv1a(&word.to_lowercase()) >> 40) as usize % DIMS] += 1.0;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut v {
                *x /= norm;
            }
        }
        v
    }
}

fn fnv1a(s: &str) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for b in s.bytes() {
        hash ^= b as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

#[async_trait]
impl EmbeddingProvider for HashingEmbedder {
    fn model_name(&self) -> &str {
        "hashing-bow-1024"
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.texts.fetch_add(texts.len(), Ordering::SeqCst);
        Ok(texts.iter().map(|t| Self::vector(t)).collect())
    }
}

/// Provider that is always unreachable
#[derive(Default)]
pub struct FailingEmbedder {
    calls: AtomicUsize,
}

impl FailingEmbedder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for FailingEmbedder {
    fn model_name(&self) -> &str {
        "unreachable"
    }

    async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(EmbeddingError::Unavailable("connection refused".into()))
    }
}

/// Hashing embedder that cancels a token once it is asked to embed `trigger`
pub struct CancellingEmbedder {
    token: CancellationToken,
    trigger: String,
}

impl CancellingEmbedder {
    pub fn new(token: CancellationToken, trigger: &str) -> Self {
        Self {
            token,
            trigger: trigger.to_string(),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for CancellingEmbedder {
    fn model_name(&self) -> &str {
        "hashing-bow-1024"
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.iter().any(|t| *t == self.trigger) {
            self.token.cancel();
        }
        Ok(texts.iter().map(|t| HashingEmbedder::vector(t)).collect())
    }
}
