use crate::model::Paper;
use crate::text::{chunk_tokens, split_sentences, tokenize};
use std::collections::BTreeMap;

/// Occurrences and first surface form of an n-gram within one paper
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermCount {
    pub count: u32,
    pub surface: String,
}

/// Contiguous 1..=`max_ngram` word n-grams inside the paper's noun-phrase
/// chunks. Single words shorter than three letters are skipped.
pub fn paper_terms(paper: &Paper, max_phrase_words: usize, max_ngram: usize) -> BTreeMap<String, TermCount> {
    let mut terms: BTreeMap<String, TermCount> = BTreeMap::new();
    for (_, page) in paper.pages() {
        for sentence in split_sentences(page) {
            let tokens = tokenize(sentence.text);
            for chunk in chunk_tokens(sentence.text, &tokens, max_phrase_words) {
                let words = &chunk.words;
                for n in 1..=max_ngram.min(words.len()) {
                    for offset in 0..=(words.len() - n) {
                        if n == 1 && words[offset].chars().count() < 3 {
                            continue;
                        }
                        let key = words[offset..offset + n].join(" ");
                        let first = &tokens[chunk.first_token + offset];
                        let last = &tokens[chunk.first_token + offset + n - 1];
                        let entry = terms.entry(key).or_insert_with(|| TermCount {
                            count: 0,
                            surface: sentence.text[first.start..last.end()].to_string(),
                        });
                        entry.count += 1;
                    }
                }
            }
        }
    }
    terms
}

/// In-paper count times inverse document frequency, per term.
pub fn raw_scores(terms: &BTreeMap<String, TermCount>, idf: impl Fn(&str) -> f64) -> Vec<(String, f64)> {
    terms
        .iter()
        .map(|(key, tc)| (key.clone(), tc.count as f64 * idf(key)))
        .collect()
}

/// TF-IDF scores divided by `batch_max`, the best raw score anywhere in the
/// batch, best first (ties by key). A `batch_max` of zero falls back to this
/// paper's own best term.
pub fn score_terms(
    terms: &BTreeMap<String, TermCount>,
    idf: impl Fn(&str) -> f64,
    batch_max: f64,
    limit: usize,
) -> Vec<(String, f64)> {
    let raw = raw_scores(terms, idf);
    let max = if batch_max > 0.0 {
        batch_max
    } else {
        raw.iter().map(|(_, s)| *s).fold(0.0_f64, f64::max)
    };
    if max <= 0.0 {
        return Vec::new();
    }
    let mut scored: Vec<(String, f64)> = raw
        .into_iter()
        .map(|(k, s)| (k, (s / max).clamp(0.0, 1.0)))
        .collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    scored.truncate(limit);
    scored
}
