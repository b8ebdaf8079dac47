use std::collections::HashSet;
use std::sync::OnceLock;

/// Function words and reporting verbs that never start, end or sit inside a
/// candidate noun phrase. Curated for English scientific prose.
const STOPWORDS: &[&str] = &[
    // determiners, pronouns
    "a", "an", "the", "this", "that", "these", "those", "each", "every", "all", "any", "both",
    "some", "many", "much", "several", "various", "other", "others", "another", "such", "same",
    "own", "its", "it", "itself", "we", "our", "us", "they", "their", "them", "you", "your", "he",
    "she", "his", "her", "i", "one", "ones", "which", "who", "whom", "whose", "what", "there",
    "here",
    // prepositions, conjunctions
    "of", "in", "on", "at", "to", "for", "from", "by", "with", "without", "within", "into",
    "onto", "over", "under", "between", "among", "through", "via", "per", "about", "across",
    "after", "before", "during", "against", "toward", "towards", "upon", "as", "and", "or",
    "nor", "but", "if", "then", "than", "so", "because", "while", "when", "where", "whereas",
    "how", "why", "although", "though", "however", "thus", "therefore", "hence", "moreover",
    "furthermore", "also", "not", "no", "yet", "either", "neither", "whether", "like",
    "including", "especially", "particularly", "namely", "respectively",
    // auxiliaries
    "is", "are", "was", "were", "be", "been", "being", "am", "has", "have", "had", "having",
    "do", "does", "did", "can", "could", "may", "might", "must", "shall", "should", "will",
    "would",
    // reporting and light verbs common in abstracts
    "use", "uses", "used", "using", "based", "propose", "proposes", "proposed", "present",
    "presents", "presented", "show", "shows", "shown", "showed", "describe", "describes",
    "described", "introduce", "introduces", "introduced", "demonstrate", "demonstrates",
    "demonstrated", "evaluate", "evaluates", "evaluated", "provide", "provides", "provided",
    "achieve", "achieves", "achieved", "improve", "improves", "improved", "enable", "enables",
    "enabled", "allow", "allows", "allowed", "require", "requires", "required", "make", "makes",
    "made", "apply", "applies", "applied", "consider", "considers", "considered", "call",
    "called", "known", "include", "includes", "included", "monitor", "monitors", "monitored",
    "remain", "remains", "become", "becomes", "obtain", "obtains", "obtained", "perform",
    "performs", "performed", "yield", "yields",
    // adverbs and vague modifiers
    "very", "well", "more", "most", "less", "least", "often", "commonly", "widely", "typically",
    "usually", "recently", "recent", "new", "novel", "different", "existing", "significantly",
    "highly", "first", "second", "third", "two", "three", "etc",
];

fn stopword_set() -> &'static HashSet<&'static str> {
    static SET: OnceLock<HashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| STOPWORDS.iter().copied().collect())
}

/// Case-insensitive stopword check.
pub fn is_stopword(word: &str) -> bool {
    let set = stopword_set();
    if set.contains(word) {
        return true;
    }
    set.contains(word.to_lowercase().as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn function_words_are_stopwords() {
        for w in ["The", "are", "used", "for", "such", "as", "including", "monitor"] {
            assert!(is_stopword(w), "{w} should be a stopword");
        }
    }

    #[test]
    fn domain_nouns_are_not_stopwords() {
        for w in ["functions", "primitives", "networks", "detection", "signatures"] {
            assert!(!is_stopword(w), "{w} should not be a stopword");
        }
    }
}
