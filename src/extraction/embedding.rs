//! Embedding-based extraction: phrase clustering and document clustering

use super::types::{Candidate, CorpusContext, DocumentCluster, ExtractionError, ExtractionResult};
use crate::config::EmbeddingConfig;
use crate::embedding::{agglomerate, cohesion, most_central, EmbeddingError, EmbeddingPool};
use crate::model::{ExtractionMethod, Paper, StrategyKind};
use crate::text::{chunk_sentence, count_occurrences, split_sentences};
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Clone)]
pub struct EmbeddingStrategy {
    config: EmbeddingConfig,
    max_phrase_words: usize,
    pool: Option<EmbeddingPool>,
}

struct Phrase {
    key: String,
    surface: String,
    count: u32,
}

impl EmbeddingStrategy {
    pub fn new(config: EmbeddingConfig, max_phrase_words: usize, pool: Option<EmbeddingPool>) -> Self {
        Self {
            config,
            max_phrase_words,
            pool,
        }
    }

    fn pool(&self) -> Result<&EmbeddingPool, EmbeddingError> {
        self.pool
            .as_ref()
            .ok_or_else(|| EmbeddingError::Unavailable("no embedding provider configured".into()))
    }

    /// Distinct chunk phrases of a paper, most frequent first, capped.
    fn phrases(&self, paper: &Paper) -> Vec<Phrase> {
        let mut seen: BTreeMap<String, Phrase> = BTreeMap::new();
        for (_, page) in paper.pages() {
            for sentence in split_sentences(page) {
                for chunk in chunk_sentence(sentence.text, self.max_phrase_words) {
                    seen.entry(chunk.key.clone())
                        .or_insert_with(|| Phrase {
                            key: chunk.key.clone(),
                            surface: chunk.text.clone(),
                            count: 0,
                        })
                        .count += 1;
                }
            }
        }
        let mut phrases: Vec<Phrase> = seen.into_values().collect();
        phrases.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.key.cmp(&b.key)));
        phrases.truncate(self.config.max_candidates);
        phrases
    }

    pub async fn extract(
        &self,
        paper: &Paper,
        corpus: &CorpusContext,
    ) -> Result<ExtractionResult, ExtractionError> {
        let pool = self.pool()?;
        let mut result = ExtractionResult::new(StrategyKind::Embedding, paper.id.clone());
        let phrases = self.phrases(paper);
        if phrases.is_empty() {
            return Ok(result);
        }

        let keys: Vec<String> = phrases.iter().map(|p| p.key.clone()).collect();
        let vectors = pool.embed(&keys).await?;
        let clusters = agglomerate(&vectors, self.config.cluster_threshold);

        let mut scored: BTreeMap<String, Candidate> = BTreeMap::new();
        let mut raw: Vec<(usize, f64)> = Vec::with_capacity(clusters.len());
        for members in &clusters {
            let Some(rep) = most_central(members, &vectors) else {
                continue;
            };
            let c = cohesion(members, &vectors).unwrap_or(self.config.cluster_threshold / 2.0);
            raw.push((rep, c));
        }
        let max = raw.iter().map(|(_, c)| *c).fold(0.0_f64, f64::max);
        for (rep, c) in raw {
            let score = if max > 0.0 { c / max } else { 0.0 };
            let phrase = &phrases[rep];
            let candidate = Candidate::new(
                phrase.surface.clone(),
                score,
                phrase.count,
                ExtractionMethod::Embedding,
                paper.id.clone(),
            )
            .with_embedding(vectors[rep].clone());
            scored.insert(candidate.key.clone(), candidate);
        }

        if let Some(cluster) = corpus.cluster_of(&paper.id) {
            for candidate in self.shared_phrases(paper, cluster, corpus, pool) {
                match scored.get_mut(&candidate.key) {
                    Some(existing) if existing.score >= candidate.score => {}
                    Some(existing) => existing.score = candidate.score,
                    None => {
                        scored.insert(candidate.key.clone(), candidate);
                    }
                }
            }
        }

        result.candidates = scored.into_values().collect();
        result.metadata.degraded = corpus.document_clustering_degraded.clone();
        result.metadata = result
            .metadata
            .with_parameter("model", pool.model_name())
            .with_parameter("cluster_threshold", self.config.cluster_threshold)
            .with_parameter("phrases", phrases.len())
            .with_parameter("clusters", clusters.len());
        debug!(
            paper = %paper.id,
            phrases = phrases.len(),
            clusters = clusters.len(),
            "embedding extraction finished"
        );
        Ok(result)
    }

    /// Phrases of this paper that also occur in another paper of its
    /// document cluster.
    fn shared_phrases(
        &self,
        paper: &Paper,
        cluster: &DocumentCluster,
        corpus: &CorpusContext,
        pool: &EmbeddingPool,
    ) -> Vec<Candidate> {
        let Some(own) = corpus.paper_phrases.get(&paper.id) else {
            return Vec::new();
        };
        let body = paper.body();
        own.iter()
            .filter(|key| {
                cluster.papers.iter().any(|other| {
                    other != &paper.id
                        && corpus
                            .paper_phrases
                            .get(other)
                            .is_some_and(|phrases| phrases.contains(*key))
                })
            })
            .map(|key| {
                let count = count_occurrences(&body, key).max(1) as u32;
                let candidate = Candidate::new(
                    key.clone(),
                    cluster.cohesion,
                    count,
                    ExtractionMethod::Embedding,
                    paper.id.clone(),
                );
                match pool.get(key) {
                    Some(v) => candidate.with_embedding(v),
                    None => candidate,
                }
            })
            .collect()
    }

    /// Cluster whole documents (title and body) to find groups of related
    /// papers. Only groups of two or more are returned.
    pub async fn cluster_documents(&self, papers: &[Paper]) -> Result<Vec<DocumentCluster>, EmbeddingError> {
        let pool = self.pool()?;
        if papers.len() < 2 {
            return Ok(Vec::new());
        }
        let texts: Vec<String> = papers.iter().map(Paper::document_text).collect();
        let vectors = pool.embed(&texts).await?;
        let clusters = agglomerate(&vectors, self.config.document_cluster_threshold)
            .into_iter()
            .filter(|members| members.len() > 1)
            .map(|members| DocumentCluster {
                cohesion: cohesion(&members, &vectors).unwrap_or(0.0).clamp(0.0, 1.0),
                papers: members.iter().map(|&i| papers[i].id.clone()).collect(),
            })
            .collect::<Vec<_>>();
        debug!(papers = papers.len(), groups = clusters.len(), "document clustering finished");
        Ok(clusters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::EmbeddingProvider;
    use crate::model::PaperId;
    use async_trait::async_trait;
    use std::collections::BTreeSet;
    use std::sync::Arc;

    /// Embeds by topic word: security phrases, biology phrases, or other.
    struct TopicEmbedder;

    #[async_trait]
    impl EmbeddingProvider for TopicEmbedder {
        fn model_name(&self) -> &str {
            "topic"
        }

        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            Ok(texts
                .iter()
                .map(|t| {
                    let t = t.to_lowercase();
                    let sec = ["cipher", "encryption", "key"].iter().filter(|w| t.contains(*w)).count() as f32;
                    let bio = ["protein", "enzyme"].iter().filter(|w| t.contains(*w)).count() as f32;
                    vec![sec, bio, 0.1]
                })
                .collect())
        }
    }

    fn strategy(pool: Option<EmbeddingPool>) -> EmbeddingStrategy {
        EmbeddingStrategy::new(EmbeddingConfig::default(), 4, pool)
    }

    fn pool() -> EmbeddingPool {
        EmbeddingPool::new(Arc::new(TopicEmbedder), 8, 2)
    }

    #[tokio::test]
    async fn missing_provider_is_unavailable() {
        let paper = Paper::new("p", "", "Block ciphers and stream ciphers protect data in transit.");
        let err = strategy(None)
            .extract(&paper, &CorpusContext::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ExtractionError::ProviderUnavailable(EmbeddingError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn clusters_collapse_to_representatives() {
        let paper = Paper::new(
            "p",
            "",
            "Block cipher designs. Stream cipher designs. Protein structures. Enzyme kinetics.",
        );
        let result = strategy(Some(pool()))
            .extract(&paper, &CorpusContext::default())
            .await
            .unwrap();
        assert!(result.candidates.len() < 4);
        assert!(result.candidates.iter().all(|c| c.embedding.is_some()));
        assert!(result
            .candidates
            .iter()
            .any(|c| (c.score - 1.0).abs() < 1e-12));
    }

    #[tokio::test]
    async fn document_clusters_surface_shared_phrases() {
        let papers = vec![
            Paper::new("a", "", "Lattice encryption uses a public key scheme for cipher design."),
            Paper::new("b", "", "A public key scheme is applied in cipher suites for encryption."),
            Paper::new("c", "", "Protein enzyme interactions drive enzyme protein folding."),
        ];
        let s = strategy(Some(pool()));
        let clusters = s.cluster_documents(&papers).await.unwrap();
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].papers, vec![PaperId::new("a"), PaperId::new("b")]);

        let mut corpus = CorpusContext {
            documents: 3,
            document_clusters: clusters,
            ..Default::default()
        };
        for p in &papers {
            let keys: BTreeSet<String> = crate::text::split_sentences(&p.body())
                .iter()
                .flat_map(|s| chunk_sentence(s.text, 4))
                .map(|c| c.key)
                .collect();
            corpus.paper_phrases.insert(p.id.clone(), keys);
        }
        let result = s.extract(&papers[0], &corpus).await.unwrap();
        assert!(result.candidates.iter().any(|c| c.key == "public key scheme"));
    }
}
