use crate::centrality::{PageRank, PageRankResult};
use crate::model::Paper;
use crate::text::{chunk_tokens, is_stopword, split_sentences, tokenize, TokenKind};
use std::collections::{BTreeMap, HashMap};

/// A scored phrase with its occurrence count
#[derive(Debug, Clone, PartialEq)]
pub struct RankedPhrase {
    pub key: String,
    pub surface: String,
    pub frequency: u32,
    pub score: f64,
}

/// Builds the word co-occurrence graph for TextRank.
///
/// Nodes are content words; each word links to the next `window - 1`
/// content words of the same sentence. Edges are undirected and weighted by
/// co-occurrence count, self-loops are skipped.
#[derive(Debug, Default)]
struct WordGraph {
    index: HashMap<String, usize>,
    words: Vec<String>,
    weights: BTreeMap<(usize, usize), f64>,
}

impl WordGraph {
    fn node(&mut self, word: &str) -> usize {
        if let Some(&i) = self.index.get(word) {
            return i;
        }
        let i = self.words.len();
        self.words.push(word.to_string());
        self.index.insert(word.to_string(), i);
        i
    }

    fn add_sentence(&mut self, words: &[String], window: usize) {
        let ids: Vec<usize> = words.iter().map(|w| self.node(w)).collect();
        for (i, &a) in ids.iter().enumerate() {
            for &b in ids.iter().skip(i + 1).take(window.saturating_sub(1)) {
                if a == b {
                    continue;
                }
                let key = (a.min(b), a.max(b));
                *self.weights.entry(key).or_insert(0.0) += 1.0;
            }
        }
    }

    fn rank(&self, pagerank: &PageRank) -> PageRankResult {
        let edges: Vec<(usize, usize, f64)> = self
            .weights
            .iter()
            .flat_map(|(&(a, b), &w)| [(a, b, w), (b, a, w)])
            .collect();
        pagerank.run(self.words.len(), &edges)
    }
}

/// Rank the paper's noun phrases by the mean TextRank score of their words,
/// normalized by the best phrase. Best first, ties by key.
pub fn rank_phrases(
    paper: &Paper,
    max_phrase_words: usize,
    window: usize,
    pagerank: &PageRank,
    limit: usize,
) -> (Vec<RankedPhrase>, PageRankResult) {
    let mut graph = WordGraph::default();
    let mut phrases: BTreeMap<String, (String, u32, Vec<String>)> = BTreeMap::new();

    for (_, page) in paper.pages() {
        for sentence in split_sentences(page) {
            let tokens = tokenize(sentence.text);
            let content: Vec<String> = tokens
                .iter()
                .filter(|t| t.kind == TokenKind::Word && !is_stopword(t.text))
                .map(|t| t.lower())
                .collect();
            graph.add_sentence(&content, window);

            for chunk in chunk_tokens(sentence.text, &tokens, max_phrase_words) {
                let entry = phrases
                    .entry(chunk.key.clone())
                    .or_insert_with(|| (chunk.text.clone(), 0, chunk.words.clone()));
                entry.1 += 1;
            }
        }
    }

    let result = graph.rank(pagerank);
    let mut ranked: Vec<RankedPhrase> = phrases
        .into_iter()
        .map(|(key, (surface, frequency, words))| {
            let total: f64 = words
                .iter()
                .map(|w| graph.index.get(w).map_or(0.0, |&i| result.scores[i]))
                .sum();
            RankedPhrase {
                key,
                surface,
                frequency,
                score: total / words.len().max(1) as f64,
            }
        })
        .collect();

    let max = ranked.iter().map(|p| p.score).fold(0.0_f64, f64::max);
    if max > 0.0 {
        for p in &mut ranked {
            p.score /= max;
        }
    }
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.key.cmp(&b.key)));
    ranked.truncate(limit);
    (ranked, result)
}
