use super::normalize::canonical_key;
use super::stopwords::is_stopword;
use super::tokenize::{tokenize, Token, TokenKind};

/// A candidate noun phrase: a maximal run of content words
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Verbatim surface text
    pub text: String,
    /// Canonical key of `text`
    pub key: String,
    /// Byte offset of the chunk in the chunked text
    pub start: usize,
    pub end: usize,
    /// Token index range `[first_token, last_token)` in the token stream
    pub first_token: usize,
    pub last_token: usize,
    /// Lowercased words
    pub words: Vec<String>,
}

impl Chunk {
    pub fn word_count(&self) -> usize {
        self.words.len()
    }
}

/// Chunk a single sentence (see [`chunk_tokens`]).
pub fn chunk_sentence(sentence: &str, max_words: usize) -> Vec<Chunk> {
    let tokens = tokenize(sentence);
    chunk_tokens(sentence, &tokens, max_words)
}

/// Group tokens into noun-phrase chunks.
///
/// A run is broken by any stopword, number or punctuation token. Runs longer
/// than `max_words` keep their trailing words, since English noun phrases put
/// the head last.
pub fn chunk_tokens(source: &str, tokens: &[Token<'_>], max_words: usize) -> Vec<Chunk> {
    let max_words = max_words.max(1);
    let mut chunks = Vec::new();
    let mut run_start: Option<usize> = None;

    for (i, token) in tokens.iter().enumerate() {
        let content = token.kind == TokenKind::Word && !is_stopword(token.text);
        match (content, run_start) {
            (true, None) => run_start = Some(i),
            (false, Some(s)) => {
                push_chunk(source, tokens, s, i, max_words, &mut chunks);
                run_start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = run_start {
        push_chunk(source, tokens, s, tokens.len(), max_words, &mut chunks);
    }
    chunks
}

fn push_chunk(
    source: &str,
    tokens: &[Token<'_>],
    from: usize,
    to: usize,
    max_words: usize,
    out: &mut Vec<Chunk>,
) {
    let from = if to - from > max_words { to - max_words } else { from };
    let run = &tokens[from..to];
    let letters: usize = run
        .iter()
        .map(|t| t.text.chars().filter(|c| c.is_alphabetic()).count())
        .sum();
    if letters < 3 {
        return;
    }
    let start = run[0].start;
    let end = run[run.len() - 1].end();
    let text = source[start..end].to_string();
    out.push(Chunk {
        key: canonical_key(&text),
        text,
        start,
        end,
        first_token: from,
        last_token: to,
        words: run.iter().map(|t| t.lower()).collect(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(text: &str) -> Vec<String> {
        chunk_sentence(text, 4).into_iter().map(|c| c.key).collect()
    }

    #[test]
    fn chunks_break_at_stopwords() {
        assert_eq!(
            keys("Neural networks are used for intrusion detection."),
            vec!["neural networks", "intrusion detection"]
        );
    }

    #[test]
    fn chunks_break_at_punctuation() {
        assert_eq!(
            keys("Cryptographic primitives such as hash functions, digital signatures and block ciphers"),
            vec!["cryptographic primitives", "hash functions", "digital signatures", "block ciphers"]
        );
    }

    #[test]
    fn long_runs_keep_trailing_words() {
        let chunks = chunk_sentence("large scale distributed deep neural network training", 4);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].key, "deep neural network training");
        assert_eq!(chunks[0].word_count(), 4);
    }

    #[test]
    fn chunk_text_is_verbatim() {
        let text = "We propose Quantum  Cryptography.";
        let chunks = chunk_sentence(text, 4);
        assert_eq!(chunks[0].text, "Quantum  Cryptography");
        assert_eq!(&text[chunks[0].start..chunks[0].end], "Quantum  Cryptography");
        assert_eq!(chunks[0].key, "quantum cryptography");
    }
}
