//! Rule-based extraction: noun-phrase chunks, domain lexicon terms and
//! Hearst hypernym patterns

use super::types::{Candidate, ExtractionResult, HypernymPair};
use crate::config::RuleBasedConfig;
use crate::model::{ExtractionMethod, Paper, StrategyKind};
use crate::text::{
    canonical_key, chunk_tokens, find_word_bounded, split_sentences, tokenize, Chunk, Token,
    TokenKind,
};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone)]
pub struct RuleBasedStrategy {
    config: RuleBasedConfig,
    lexicon: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SpanKind {
    Lexicon,
    NounPhrase,
}

#[derive(Debug, Clone)]
struct Span {
    first_token: usize,
    last_token: usize,
    char_len: usize,
    text: String,
    kind: SpanKind,
}

impl Span {
    fn tokens(&self) -> usize {
        self.last_token - self.first_token
    }

    fn overlaps(&self, other: &Span) -> bool {
        self.first_token < other.last_token && other.first_token < self.last_token
    }
}

#[derive(Debug, Default)]
struct Tally {
    text: String,
    count: u32,
    lexicon: bool,
}

impl RuleBasedStrategy {
    pub fn new(config: RuleBasedConfig) -> Self {
        let mut lexicon: Vec<String> = config
            .lexicon
            .iter()
            .map(|t| canonical_key(t))
            .filter(|t| !t.is_empty())
            .collect();
        lexicon.sort();
        lexicon.dedup();
        Self { config, lexicon }
    }

    pub fn extract(&self, paper: &Paper) -> ExtractionResult {
        let mut result = ExtractionResult::new(StrategyKind::RuleBased, paper.id.clone());
        let mut tallies: BTreeMap<String, Tally> = BTreeMap::new();
        let mut participants: BTreeSet<String> = BTreeSet::new();

        for (_, page) in paper.pages() {
            for sentence in split_sentences(page) {
                let tokens = tokenize(sentence.text);
                let chunks = chunk_tokens(sentence.text, &tokens, self.config.max_phrase_words);

                for pair in hearst_pairs(&tokens, &chunks) {
                    participants.insert(pair.parent.key.clone());
                    participants.insert(pair.child.key.clone());
                    result.hypernyms.push(HypernymPair {
                        parent: pair.parent.key.clone(),
                        child: pair.child.key.clone(),
                        parent_text: pair.parent.text.clone(),
                        child_text: pair.child.text.clone(),
                        pattern: pair.pattern.to_string(),
                        paper_id: paper.id.clone(),
                        sentence: sentence.text.to_string(),
                    });
                }

                let mut spans: Vec<Span> = chunks
                    .iter()
                    .map(|c| Span {
                        first_token: c.first_token,
                        last_token: c.last_token,
                        char_len: c.end - c.start,
                        text: c.text.clone(),
                        kind: SpanKind::NounPhrase,
                    })
                    .collect();
                spans.extend(self.lexicon_spans(sentence.text, &tokens));

                for span in resolve_overlaps(spans) {
                    let key = canonical_key(&span.text);
                    let tally = tallies.entry(key).or_default();
                    if tally.count == 0 {
                        tally.text = span.text.clone();
                    }
                    tally.count += 1;
                    tally.lexicon |= span.kind == SpanKind::Lexicon;
                }
            }
        }

        // Hearst endpoints always surface, even when a longer span won
        // their position in the sentence.
        for pair in &result.hypernyms {
            for (key, text) in [(&pair.parent, &pair.parent_text), (&pair.child, &pair.child_text)] {
                let tally = tallies.entry(key.clone()).or_default();
                if tally.count == 0 {
                    tally.text = text.clone();
                    tally.count = 1;
                }
            }
        }

        let max_count = tallies.values().map(|t| t.count).max().unwrap_or(1).max(1) as f64;
        result.candidates = tallies
            .into_iter()
            .map(|(key, tally)| {
                let mut score = if tally.lexicon {
                    1.0
                } else {
                    0.5 + 0.5 * tally.count as f64 / max_count
                };
                if participants.contains(&key) {
                    score = score.max(self.config.hearst_score_floor);
                }
                Candidate::new(
                    tally.text,
                    score,
                    tally.count,
                    ExtractionMethod::RuleBased,
                    paper.id.clone(),
                )
            })
            .collect();

        result.metadata = result
            .metadata
            .with_parameter("max_phrase_words", self.config.max_phrase_words)
            .with_parameter("lexicon_terms", self.lexicon.len())
            .with_parameter("hearst_pairs", result.hypernyms.len());
        result
    }

    fn lexicon_spans(&self, sentence: &str, tokens: &[Token<'_>]) -> Vec<Span> {
        let mut spans = Vec::new();
        for term in &self.lexicon {
            for start in find_word_bounded(sentence, term) {
                let Some(first) = tokens.iter().position(|t| t.start >= start) else {
                    continue;
                };
                let words = term.split_whitespace().count();
                let mut last = first;
                let mut seen = 0;
                while last < tokens.len() && seen < words {
                    if tokens[last].kind != TokenKind::Punct {
                        seen += 1;
                    }
                    last += 1;
                }
                let end = tokens[last - 1].end();
                spans.push(Span {
                    first_token: first,
                    last_token: last,
                    char_len: end - start,
                    text: sentence[start..end].to_string(),
                    kind: SpanKind::Lexicon,
                });
            }
        }
        spans
    }
}

/// Longest match wins: more tokens, then more characters, then lexicon
/// over noun phrase, then the earlier start.
fn resolve_overlaps(mut spans: Vec<Span>) -> Vec<Span> {
    spans.sort_by(|a, b| {
        b.tokens()
            .cmp(&a.tokens())
            .then(b.char_len.cmp(&a.char_len))
            .then((a.kind != SpanKind::Lexicon).cmp(&(b.kind != SpanKind::Lexicon)))
            .then(a.first_token.cmp(&b.first_token))
    });
    let mut accepted: Vec<Span> = Vec::new();
    for span in spans {
        if !accepted.iter().any(|a| a.overlaps(&span)) {
            accepted.push(span);
        }
    }
    accepted.sort_by_key(|s| s.first_token);
    accepted
}

struct PatternMatch<'c> {
    parent: &'c Chunk,
    child: &'c Chunk,
    pattern: &'static str,
}

/// Lowercased tokens strictly between two token positions
fn gap(tokens: &[Token<'_>], from: usize, to: usize) -> Vec<String> {
    tokens[from..to].iter().map(|t| t.lower()).collect()
}

fn gap_is(gap: &[String], options: &[&[&str]]) -> bool {
    options
        .iter()
        .any(|o| o.len() == gap.len() && o.iter().zip(gap).all(|(a, b)| *a == b.as_str()))
}

const LIST_SEPARATORS: &[&[&str]] = &[&[","], &["and"], &["or"], &[",", "and"], &[",", "or"]];
const COMMA: &[&[&str]] = &[&[","]];
const SUCH_AS: &[&[&str]] = &[&["such", "as"], &[",", "such", "as"]];
const INCLUDING: &[&[&str]] = &[&["including"], &[",", "including"]];
const ESPECIALLY: &[&[&str]] = &[&["especially"], &[",", "especially"]];
const AS: &[&[&str]] = &[&["as"]];
const AND_OTHER: &[&[&str]] = &[
    &["and", "other"],
    &["or", "other"],
    &[",", "and", "other"],
    &[",", "or", "other"],
];

/// Chunks of a coordinated list starting at `start`, moving forward.
fn list_forward(tokens: &[Token<'_>], chunks: &[Chunk], start: usize) -> Vec<usize> {
    let mut items = vec![start];
    let mut k = start;
    while k + 1 < chunks.len() {
        let g = gap(tokens, chunks[k].last_token, chunks[k + 1].first_token);
        if !gap_is(&g, LIST_SEPARATORS) {
            break;
        }
        items.push(k + 1);
        k += 1;
        if g.iter().any(|t| t == "and" || t == "or") {
            break;
        }
    }
    items
}

/// Chunks of a comma-separated list ending at `end`, moving backward.
fn list_backward(tokens: &[Token<'_>], chunks: &[Chunk], end: usize) -> Vec<usize> {
    let mut items = vec![end];
    let mut k = end;
    while k > 0 {
        let g = gap(tokens, chunks[k - 1].last_token, chunks[k].first_token);
        if !gap_is(&g, COMMA) {
            break;
        }
        items.push(k - 1);
        k -= 1;
    }
    items.reverse();
    items
}

fn push_pairs<'c>(
    out: &mut Vec<PatternMatch<'c>>,
    chunks: &'c [Chunk],
    parent: usize,
    children: Vec<usize>,
    pattern: &'static str,
) {
    for child in children {
        if chunks[child].key != chunks[parent].key {
            out.push(PatternMatch {
                parent: &chunks[parent],
                child: &chunks[child],
                pattern,
            });
        }
    }
}

fn hearst_pairs<'c>(tokens: &[Token<'_>], chunks: &'c [Chunk]) -> Vec<PatternMatch<'c>> {
    let mut out = Vec::new();

    for i in 0..chunks.len() {
        let before = if i == 0 {
            gap(tokens, 0, chunks[0].first_token)
        } else {
            gap(tokens, chunks[i - 1].last_token, chunks[i].first_token)
        };
        if i + 1 >= chunks.len() {
            continue;
        }
        let after = gap(tokens, chunks[i].last_token, chunks[i + 1].first_token);

        if gap_is(&after, SUCH_AS) {
            push_pairs(&mut out, chunks, i, list_forward(tokens, chunks, i + 1), "such_as");
        } else if gap_is(&after, INCLUDING) {
            push_pairs(&mut out, chunks, i, list_forward(tokens, chunks, i + 1), "including");
        } else if gap_is(&after, ESPECIALLY) {
            push_pairs(&mut out, chunks, i, list_forward(tokens, chunks, i + 1), "especially");
        } else if before.last().map(String::as_str) == Some("such") && gap_is(&after, AS) {
            push_pairs(&mut out, chunks, i, list_forward(tokens, chunks, i + 1), "such_x_as");
        } else if gap_is(&after, AND_OTHER) {
            push_pairs(&mut out, chunks, i + 1, list_backward(tokens, chunks, i), "and_other");
        }
    }
    out
}
