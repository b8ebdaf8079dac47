//! Statistical extraction: corpus TF-IDF, TextRank and an LDA topic model
//!
//! The three sub-methods run together but tag their candidates separately,
//! so the orchestrator can weight them independently.

pub mod lda;
pub mod textrank;
pub mod tfidf;

use super::types::{Candidate, CorpusContext, ExtractionResult};
use crate::centrality::PageRank;
use crate::config::StatisticalConfig;
use crate::model::{ExtractionMethod, Paper, StrategyKind};
use crate::text::count_occurrences;
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct StatisticalStrategy {
    config: StatisticalConfig,
    max_phrase_words: usize,
}

impl StatisticalStrategy {
    pub fn new(config: StatisticalConfig, max_phrase_words: usize) -> Self {
        Self {
            config,
            max_phrase_words,
        }
    }

    pub fn extract(&self, paper: &Paper, corpus: &CorpusContext) -> ExtractionResult {
        let mut result = ExtractionResult::new(StrategyKind::Statistical, paper.id.clone());

        // (a) TF-IDF over the corpus, normalized by the batch best
        let terms = tfidf::paper_terms(paper, self.max_phrase_words, self.config.max_ngram);
        let scored = tfidf::score_terms(
            &terms,
            |t| corpus.idf(t),
            corpus.max_tfidf,
            self.config.max_candidates,
        );
        for (key, score) in scored {
            if let Some(tc) = terms.get(&key) {
                result.candidates.push(Candidate::new(
                    tc.surface.clone(),
                    score,
                    tc.count,
                    ExtractionMethod::Tfidf,
                    paper.id.clone(),
                ));
            }
        }

        // (b) TextRank
        let pagerank = PageRank::new(
            self.config.damping,
            self.config.max_iterations,
            self.config.tolerance,
        );
        let (ranked, rank) = textrank::rank_phrases(
            paper,
            self.max_phrase_words,
            self.config.textrank_window,
            &pagerank,
            self.config.max_candidates,
        );
        if !rank.converged {
            result.metadata.degraded = Some(format!(
                "textrank did not converge after {} iterations (delta {:.2e})",
                rank.iterations, rank.delta
            ));
        }
        result.candidates.extend(ranked.into_iter().map(|p| {
            Candidate::new(p.surface, p.score, p.frequency, ExtractionMethod::TextRank, paper.id.clone())
        }));

        // (c) Topic terms for the paper's dominant topics
        if let Some(model) = &corpus.topics {
            result.candidates.extend(self.topic_candidates(paper, model));
        }

        debug!(
            paper = %paper.id,
            candidates = result.candidates.len(),
            textrank_iterations = rank.iterations,
            "statistical extraction finished"
        );

        result.metadata = result
            .metadata
            .with_parameter("max_ngram", self.config.max_ngram)
            .with_parameter("textrank_window", self.config.textrank_window)
            .with_parameter("num_topics", self.config.num_topics)
            .with_parameter("documents", corpus.documents);
        result
    }

    fn topic_candidates(&self, paper: &Paper, model: &super::types::TopicModel) -> Vec<Candidate> {
        let Some(shares) = model.paper_topics.get(&paper.id) else {
            return Vec::new();
        };
        let min_share = 1.0 / self.config.num_topics.max(1) as f64;
        let body = paper.body();

        let mut best: BTreeMap<String, (f64, u32)> = BTreeMap::new();
        for (topic, share) in model.topics.iter().zip(shares) {
            if *share < min_share {
                continue;
            }
            for (term, weight) in topic {
                let count = count_occurrences(&body, term) as u32;
                if count == 0 {
                    continue;
                }
                let entry = best.entry(term.clone()).or_insert((0.0, count));
                entry.0 = entry.0.max(*weight);
            }
        }

        best.into_iter()
            .map(|(term, (weight, count))| {
                Candidate::new(term, weight, count, ExtractionMethod::TopicModel, paper.id.clone())
            })
            .collect()
    }
}
