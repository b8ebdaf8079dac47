/// Canonical concept key: lowercase, whitespace collapsed, punctuation
/// trimmed from both ends.
pub fn canonical_key(text: &str) -> String {
    let collapsed = text
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    collapsed
        .trim_matches(|c: char| !c.is_alphanumeric())
        .to_string()
}

/// Strip a simple English plural suffix.
pub fn fold_plural(word: &str) -> String {
    let w = word.to_lowercase();
    if w.len() > 4 && w.ends_with("ies") {
        return format!("{}y", &w[..w.len() - 3]);
    }
    if w.len() > 3
        && w.ends_with('s')
        && !w.ends_with("ss")
        && !w.ends_with("us")
        && !w.ends_with("is")
    {
        return w[..w.len() - 1].to_string();
    }
    w
}

/// Key with every word plural-folded; equal signatures are lexical duplicates.
pub fn lexical_signature(text: &str) -> String {
    canonical_key(text)
        .split(' ')
        .filter(|w| !w.is_empty())
        .map(fold_plural)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_folds_case_whitespace_and_edge_punctuation() {
        assert_eq!(canonical_key("  \"Intrusion\t Detection,\" "), "intrusion detection");
        assert_eq!(canonical_key("state-of-the-art"), "state-of-the-art");
        assert_eq!(canonical_key("..."), "");
    }

    #[test]
    fn plural_folding() {
        assert_eq!(fold_plural("networks"), "network");
        assert_eq!(fold_plural("ontologies"), "ontology");
        assert_eq!(fold_plural("class"), "class");
        assert_eq!(fold_plural("corpus"), "corpus");
        assert_eq!(fold_plural("analysis"), "analysis");
        assert_eq!(fold_plural("gas"), "gas");
    }

    #[test]
    fn signature_matches_singular_and_plural() {
        assert_eq!(
            lexical_signature("Neural Networks"),
            lexical_signature("neural network")
        );
        assert_ne!(lexical_signature("hash function"), lexical_signature("hash"));
    }
}
