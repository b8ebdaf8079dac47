//! Shared text processing: normalization, sentence splitting, tokenization
//! and noun-phrase chunking
//!
//! Every extraction strategy and the evidence linker see text through this
//! module, so canonical keys and phrase boundaries agree across the pipeline.

mod chunker;
mod normalize;
mod sentences;
mod stopwords;
mod tokenize;

pub use chunker::{chunk_sentence, chunk_tokens, Chunk};
pub use normalize::{canonical_key, fold_plural, lexical_signature};
pub use sentences::{split_sentences, Sentence};
pub use stopwords::is_stopword;
pub use tokenize::{tokenize, Token, TokenKind};

/// Content words of a text: lowercased word tokens that are not stopwords.
pub fn content_words(text: &str) -> Vec<String> {
    tokenize(text)
        .into_iter()
        .filter(|t| t.kind == TokenKind::Word && !is_stopword(t.text))
        .map(|t| t.lower())
        .collect()
}

/// Count non-overlapping, word-bounded occurrences of `needle` in `haystack`
/// (both compared case-insensitively, `needle` as a canonical key).
pub fn count_occurrences(haystack: &str, needle: &str) -> usize {
    find_word_bounded(haystack, needle).len()
}

/// Byte offsets of word-bounded, case-insensitive matches of `needle`.
///
/// Internal whitespace in `needle` matches any run of whitespace.
pub fn find_word_bounded(haystack: &str, needle: &str) -> Vec<usize> {
    match word_bounded_pattern(needle) {
        Some(re) => re.find_iter(haystack).map(|m| m.start()).collect(),
        None => Vec::new(),
    }
}

/// Compiled matcher behind [`find_word_bounded`], for callers that test one
/// needle against many texts. `None` for a blank needle.
pub fn word_bounded_pattern(needle: &str) -> Option<regex::Regex> {
    let words: Vec<&str> = needle.split_whitespace().collect();
    if words.is_empty() {
        return None;
    }
    let pattern = format!(
        r"(?i)\b{}\b",
        words
            .iter()
            .map(|w| regex::escape(w))
            .collect::<Vec<_>>()
            .join(r"\s+")
    );
    regex::Regex::new(&pattern).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_words_skip_function_words() {
        assert_eq!(
            content_words("Neural networks are used for intrusion detection."),
            vec!["neural", "networks", "intrusion", "detection"]
        );
    }

    #[test]
    fn occurrences_respect_word_boundaries() {
        let text = "Networks and neural networks; subnetworks are different.";
        assert_eq!(count_occurrences(text, "networks"), 2);
        assert_eq!(count_occurrences(text, "neural networks"), 1);
    }

    #[test]
    fn occurrences_match_across_line_breaks() {
        assert_eq!(count_occurrences("intrusion\ndetection", "intrusion detection"), 1);
    }
}
