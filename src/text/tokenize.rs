use regex::Regex;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Alphabetic word, possibly with inner hyphens, digits or apostrophes
    Word,
    /// Digits, without letters
    Number,
    /// Any single non-space, non-word character
    Punct,
}

/// A token borrowed from the source text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub text: &'a str,
    pub start: usize,
    pub kind: TokenKind,
}

impl Token<'_> {
    pub fn end(&self) -> usize {
        self.start + self.text.len()
    }

    pub fn lower(&self) -> String {
        self.text.to_lowercase()
    }
}

fn token_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\p{L}\p{N}]+(?:[-'’][\p{L}\p{N}]+)*|[^\s\p{L}\p{N}]").ok())
        .as_ref()
}

/// Split text into word, number and punctuation tokens.
pub fn tokenize(text: &str) -> Vec<Token<'_>> {
    let Some(re) = token_regex() else {
        return Vec::new();
    };
    re.find_iter(text)
        .map(|m| {
            let s = m.as_str();
            let kind = if s.chars().any(|c| c.is_alphabetic()) {
                TokenKind::Word
            } else if s.chars().any(|c| c.is_alphanumeric()) {
                TokenKind::Number
            } else {
                TokenKind::Punct
            };
            Token {
                text: s,
                start: m.start(),
                kind,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn words_numbers_and_punctuation() {
        let tokens = tokenize("Hash functions, e.g. SHA-256 (2001).");
        let kinds: Vec<_> = tokens.iter().map(|t| (t.text, t.kind)).collect();
        assert_eq!(kinds[0], ("Hash", TokenKind::Word));
        assert_eq!(kinds[2], (",", TokenKind::Punct));
        assert!(kinds.contains(&("SHA-256", TokenKind::Word)));
        assert!(kinds.contains(&("2001", TokenKind::Number)));
    }

    #[test]
    fn offsets_point_into_source() {
        let text = "quantum  cryptography";
        let tokens = tokenize(text);
        assert_eq!(tokens.len(), 2);
        assert_eq!(&text[tokens[1].start..tokens[1].end()], "cryptography");
    }
}
