use super::{EmbeddingError, EmbeddingProvider};
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::debug;

/// Batched, rate-limited and memoised access to an embedding provider
///
/// Cloning shares the provider, the permit pool and the cache, so every
/// task in a run draws from the same concurrency budget.
#[derive(Clone)]
pub struct EmbeddingPool {
    provider: Arc<dyn EmbeddingProvider>,
    semaphore: Arc<Semaphore>,
    batch_size: usize,
    cache: Arc<DashMap<String, Vec<f32>>>,
}

impl EmbeddingPool {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, batch_size: usize, max_concurrency: usize) -> Self {
        Self {
            provider,
            semaphore: Arc::new(Semaphore::new(max_concurrency.max(1))),
            batch_size: batch_size.max(1),
            cache: Arc::new(DashMap::new()),
        }
    }

    pub fn model_name(&self) -> &str {
        self.provider.model_name()
    }

    /// Number of distinct texts embedded so far
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    /// Cached vector for a text, if it has been embedded
    pub fn get(&self, text: &str) -> Option<Vec<f32>> {
        self.cache.get(text).map(|v| v.value().clone())
    }

    /// Embed texts, one vector per input in input order.
    ///
    /// Uncached texts are split into batches that run concurrently, each
    /// holding a semaphore permit for the duration of its provider call.
    pub async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut seen = HashSet::new();
        let missing: Vec<String> = texts
            .iter()
            .filter(|t| !self.cache.contains_key(t.as_str()) && seen.insert(t.as_str()))
            .cloned()
            .collect();

        if !missing.is_empty() {
            debug!(
                model = self.provider.model_name(),
                texts = missing.len(),
                batch_size = self.batch_size,
                "embedding uncached texts"
            );
            self.fill(missing).await?;
        }

        let vectors = texts
            .iter()
            .map(|t| self.get(t).ok_or(EmbeddingError::EmptyResult))
            .collect::<Result<Vec<_>, _>>()?;

        if let Some(first) = vectors.first() {
            if let Some(bad) = vectors.iter().find(|v| v.len() != first.len()) {
                return Err(EmbeddingError::DimensionMismatch {
                    expected: first.len(),
                    got: bad.len(),
                });
            }
        }
        Ok(vectors)
    }

    async fn fill(&self, missing: Vec<String>) -> Result<(), EmbeddingError> {
        let mut tasks = JoinSet::new();
        for (index, batch) in missing.chunks(self.batch_size).enumerate() {
            let batch = batch.to_vec();
            let provider = Arc::clone(&self.provider);
            let semaphore = Arc::clone(&self.semaphore);
            tasks.spawn(async move {
                let result = match semaphore.acquire_owned().await {
                    Ok(_permit) => provider.embed(&batch).await,
                    Err(e) => Err(EmbeddingError::Unavailable(e.to_string())),
                };
                (index, batch, result)
            });
        }

        let mut first_error: Option<(usize, EmbeddingError)> = None;
        while let Some(joined) = tasks.join_next().await {
            let (index, batch, result) = match joined {
                Ok(done) => done,
                Err(e) => {
                    first_error.get_or_insert((usize::MAX, EmbeddingError::ModelError(e.to_string())));
                    continue;
                }
            };
            let outcome = result.and_then(|vectors| {
                if vectors.len() != batch.len() {
                    return Err(EmbeddingError::CountMismatch {
                        expected: batch.len(),
                        got: vectors.len(),
                    });
                }
                Ok(vectors)
            });
            match outcome {
                Ok(vectors) => {
                    for (text, vector) in batch.into_iter().zip(vectors) {
                        self.cache.insert(text, vector);
                    }
                }
                Err(e) => {
                    // lowest batch index wins so the reported error is stable
                    if first_error.as_ref().map_or(true, |(i, _)| index < *i) {
                        first_error = Some((index, e));
                    }
                }
            }
        }

        match first_error {
            Some((_, e)) => Err(e),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Embeds a text as `[len, 1.0]` and records call and concurrency counts.
    struct CountingProvider {
        calls: Arc<AtomicUsize>,
        active: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
    }

    impl CountingProvider {
        fn new() -> Self {
            Self {
                calls: Arc::new(AtomicUsize::new(0)),
                active: Arc::new(AtomicUsize::new(0)),
                peak: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait]
    impl EmbeddingProvider for CountingProvider {
        fn model_name(&self) -> &str {
            "counting"
        }

        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            Ok(texts.iter().map(|t| vec![t.len() as f32, 1.0]).collect())
        }
    }

    struct ShortProvider;

    #[async_trait]
    impl EmbeddingProvider for ShortProvider {
        fn model_name(&self) -> &str {
            "short"
        }

        async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            Ok(vec![vec![1.0]])
        }
    }

    fn texts(n: usize) -> Vec<String> {
        (0..n).map(|i| "x".repeat(i + 1)).collect()
    }

    #[tokio::test]
    async fn preserves_input_order() {
        let pool = EmbeddingPool::new(Arc::new(CountingProvider::new()), 2, 2);
        let input = texts(5);
        let vectors = pool.embed(&input).await.unwrap();
        let lens: Vec<f32> = vectors.iter().map(|v| v[0]).collect();
        assert_eq!(lens, vec![1.0, 2.0, 3.0, 4.0, 5.0]);
    }

    #[tokio::test]
    async fn cache_avoids_repeat_calls() {
        let provider = CountingProvider::new();
        let calls = Arc::clone(&provider.calls);
        let pool = EmbeddingPool::new(Arc::new(provider), 10, 1);
        let input = vec!["alpha".to_string(), "alpha".to_string(), "beta".to_string()];
        pool.embed(&input).await.unwrap();
        pool.embed(&input).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(pool.cached(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrency_never_exceeds_cap() {
        let provider = CountingProvider::new();
        let peak = Arc::clone(&provider.peak);
        let calls = Arc::clone(&provider.calls);
        let pool = EmbeddingPool::new(Arc::new(provider), 1, 2);
        pool.embed(&texts(12)).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 12);
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn count_mismatch_is_an_error() {
        let pool = EmbeddingPool::new(Arc::new(ShortProvider), 4, 1);
        let err = pool.embed(&texts(3)).await.unwrap_err();
        assert_eq!(err, EmbeddingError::CountMismatch { expected: 3, got: 1 });
    }
}
