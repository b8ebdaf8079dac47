//! Extraction strategies
//!
//! Independent algorithms that turn one paper into scored candidate
//! concepts. Each is a pure function of the paper, the corpus context and
//! its configuration, so they can run concurrently.

pub mod embedding;
pub mod rule_based;
pub mod statistical;
mod strategy;
mod types;

pub use embedding::EmbeddingStrategy;
pub use rule_based::RuleBasedStrategy;
pub use statistical::StatisticalStrategy;
pub use strategy::{check_length, ExtractionStrategy};
pub use types::{
    Candidate, CorpusContext, DocumentCluster, ExtractionError, ExtractionMetadata,
    ExtractionResult, HypernymPair, TopicModel,
};

use crate::config::StatisticalConfig;
use crate::model::Paper;
use crate::text::{chunk_sentence, content_words, split_sentences};
use std::collections::{BTreeSet, HashMap};

/// Corpus statistics shared by every paper of a run: document frequencies
/// of chunk n-grams, chunk phrases per paper and (optionally) a fitted topic
/// model. Document clusters are added separately since they need the
/// embedding provider.
pub fn build_corpus_context(
    papers: &[Paper],
    config: &StatisticalConfig,
    max_phrase_words: usize,
    seed: u64,
    fit_topics: bool,
) -> CorpusContext {
    let mut document_frequency: HashMap<String, usize> = HashMap::new();
    let mut paper_phrases = HashMap::new();
    let mut paper_terms = Vec::with_capacity(papers.len());

    for paper in papers {
        let terms = statistical::tfidf::paper_terms(paper, max_phrase_words, config.max_ngram);
        for key in terms.keys() {
            *document_frequency.entry(key.clone()).or_insert(0) += 1;
        }
        paper_terms.push(terms);

        let phrases: BTreeSet<String> = paper
            .pages()
            .into_iter()
            .flat_map(|(_, page)| {
                split_sentences(page)
                    .into_iter()
                    .flat_map(|s| chunk_sentence(s.text, max_phrase_words))
                    .map(|c| c.key)
                    .collect::<Vec<_>>()
            })
            .collect();
        paper_phrases.insert(paper.id.clone(), phrases);
    }

    let topics = fit_topics.then(|| {
        let documents: Vec<_> = papers
            .iter()
            .map(|p| (p.id.clone(), content_words(&p.body())))
            .collect();
        statistical::lda::fit(&documents, config, seed)
    });

    let mut corpus = CorpusContext {
        documents: papers.len(),
        document_frequency,
        max_tfidf: 0.0,
        paper_phrases,
        topics,
        document_clusters: Vec::new(),
        document_clustering_degraded: None,
    };
    corpus.max_tfidf = paper_terms
        .iter()
        .flat_map(|terms| statistical::tfidf::raw_scores(terms, |t| corpus.idf(t)))
        .map(|(_, score)| score)
        .fold(0.0, f64::max);
    corpus
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_frequency_counts_papers_not_occurrences() {
        let papers = vec![
            Paper::new("a", "", "Quantum cryptography. Quantum cryptography again."),
            Paper::new("b", "", "Quantum cryptography for satellites."),
        ];
        let ctx = build_corpus_context(&papers, &StatisticalConfig::default(), 4, 42, false);
        assert_eq!(ctx.documents, 2);
        assert_eq!(ctx.document_frequency["quantum cryptography"], 2);
        // "quantum" twice in "a", present in both papers: 2 * (ln(3/3) + 1)
        assert!((ctx.max_tfidf - 2.0).abs() < 1e-12, "{}", ctx.max_tfidf);
        assert!(ctx.topics.is_none());
        assert!(ctx.paper_phrases[&papers[1].id].contains("quantum cryptography"));
    }
}
