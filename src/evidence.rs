//! Evidence linker
//!
//! Attaches verbatim source sentences to each consolidated concept. A
//! sentence supports a concept when one of its surface forms occurs in it
//! (exact, word-bounded) or when enough of the form's plural-folded words
//! do (fuzzy).

use crate::config::{EvidenceConfig, UngroundedPolicy};
use crate::model::{Concept, ConceptId, EvidenceSentence, ExtractionMethod, Paper, PaperId};
use crate::text::{fold_plural, split_sentences, tokenize, word_bounded_pattern, TokenKind};
use regex::Regex;
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Fuzzy matches are never worth more than this fraction of an exact one.
const FUZZY_DISCOUNT: f64 = 0.8;

/// One source sentence, indexed once per run
#[derive(Debug, Clone)]
pub struct SourceSentence {
    pub paper_id: PaperId,
    pub page: Option<u32>,
    /// Byte offset within the page (or the whole text)
    pub offset: usize,
    pub text: String,
    words: BTreeSet<String>,
}

impl SourceSentence {
    fn new(paper_id: PaperId, page: Option<u32>, offset: usize, text: &str) -> Self {
        Self {
            paper_id,
            page,
            offset,
            text: text.to_string(),
            words: folded_words(text),
        }
    }
}

/// Split every paper into sentences with their locations.
pub fn index_sentences(papers: &[Paper]) -> Vec<SourceSentence> {
    papers
        .iter()
        .flat_map(|paper| {
            paper.pages().into_iter().flat_map(move |(page, text)| {
                split_sentences(text)
                    .into_iter()
                    .map(move |s| SourceSentence::new(paper.id.clone(), page, s.start, s.text))
            })
        })
        .collect()
}

fn folded_words(text: &str) -> BTreeSet<String> {
    tokenize(text)
        .into_iter()
        .filter(|t| t.kind == TokenKind::Word)
        .map(|t| fold_plural(t.text))
        .collect()
}

/// A compiled surface form
struct Form {
    exact: Option<Regex>,
    words: BTreeSet<String>,
}

/// Outcome counts of one linking pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkSummary {
    pub grounded: usize,
    /// Removed under the `drop` policy
    pub dropped: Vec<ConceptId>,
    /// Kept with `grounded = false` under `keep_ungrounded`
    pub ungrounded: Vec<ConceptId>,
}

pub struct EvidenceLinker {
    config: EvidenceConfig,
}

impl EvidenceLinker {
    pub fn new(config: EvidenceConfig) -> Self {
        Self { config }
    }

    /// Link evidence to every concept and apply the ungrounded policy.
    pub fn link(&self, concepts: Vec<Concept>, sentences: &[SourceSentence]) -> (Vec<Concept>, LinkSummary) {
        let mut summary = LinkSummary::default();
        let mut kept = Vec::with_capacity(concepts.len());

        for mut concept in concepts {
            concept.evidence = self.find_evidence(&concept, sentences);
            concept.grounded = !concept.evidence.is_empty();
            if concept.grounded {
                summary.grounded += 1;
                kept.push(concept);
                continue;
            }
            match self.config.policy {
                UngroundedPolicy::Drop => {
                    debug!(concept = %concept.id, "dropping concept without evidence");
                    summary.dropped.push(concept.id);
                }
                UngroundedPolicy::KeepUngrounded => {
                    summary.ungrounded.push(concept.id.clone());
                    kept.push(concept);
                }
            }
        }

        info!(
            grounded = summary.grounded,
            dropped = summary.dropped.len(),
            ungrounded = summary.ungrounded.len(),
            "evidence linked"
        );
        (kept, summary)
    }

    /// Best supporting sentences for one concept, at most `max_sentences`.
    ///
    /// Only the concept's source papers are searched when it has any.
    pub fn find_evidence(&self, concept: &Concept, sentences: &[SourceSentence]) -> Vec<EvidenceSentence> {
        let forms: Vec<Form> = concept
            .surface_forms()
            .iter()
            .map(|f| Form {
                exact: word_bounded_pattern(f),
                words: folded_words(f),
            })
            .filter(|f| !f.words.is_empty())
            .collect();
        if forms.is_empty() {
            return Vec::new();
        }
        let (method, strength) = concept
            .best_method()
            .unwrap_or((ExtractionMethod::RuleBased, concept.relevance));

        let mut found: Vec<EvidenceSentence> = sentences
            .iter()
            .filter(|s| concept.source_papers.is_empty() || concept.source_papers.contains(&s.paper_id))
            .filter_map(|s| {
                let quality = forms
                    .iter()
                    .filter_map(|f| self.match_quality(f, s))
                    .fold(0.0_f64, f64::max);
                (quality > 0.0).then(|| {
                    EvidenceSentence::new(s.text.clone(), s.paper_id.clone(), quality * strength, method)
                        .with_location(s.page, s.offset)
                })
            })
            .collect();

        found.sort_by(|a, b| {
            b.confidence
                .total_cmp(&a.confidence)
                .then_with(|| a.paper_id.cmp(&b.paper_id))
                .then_with(|| a.position().cmp(&b.position()))
        });
        found.truncate(self.config.max_sentences);
        found
    }

    fn match_quality(&self, form: &Form, sentence: &SourceSentence) -> Option<f64> {
        if form.exact.as_ref().is_some_and(|re| re.is_match(&sentence.text)) {
            return Some(1.0);
        }
        let shared = form.words.intersection(&sentence.words).count();
        let ratio = shared as f64 / form.words.len() as f64;
        (ratio > 0.0 && ratio >= 1.0 - self.config.fuzzy_tolerance).then_some(ratio * FUZZY_DISCOUNT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PageSegment;

    fn concept(key: &str, score: f64, paper: &str) -> Concept {
        Concept::new(ConceptId::new(key), key)
            .with_method(ExtractionMethod::Tfidf, score)
            .with_paper(paper)
    }

    fn linker(policy: UngroundedPolicy) -> EvidenceLinker {
        EvidenceLinker::new(EvidenceConfig {
            policy,
            ..Default::default()
        })
    }

    #[test]
    fn exact_matches_are_verbatim_with_full_quality() {
        let text = "Neural networks are used for intrusion detection. Intrusion detection systems monitor networks.";
        let sentences = index_sentences(&[Paper::new("p", "", text)]);
        let evidence = linker(UngroundedPolicy::Drop).find_evidence(&concept("intrusion detection", 0.9, "p"), &sentences);

        assert_eq!(evidence.len(), 2);
        for e in &evidence {
            assert!(text.contains(&e.text));
            assert!((e.confidence - 0.9).abs() < 1e-12);
            assert_eq!(e.method, ExtractionMethod::Tfidf);
        }
        assert_eq!(evidence[0].location.as_ref().map(|l| l.offset), Some(0));
    }

    #[test]
    fn fuzzy_matches_are_discounted() {
        let sentences = index_sentences(&[Paper::new("p", "", "Signatures that are digital verify authorship.")]);
        let evidence = linker(UngroundedPolicy::Drop).find_evidence(&concept("digital signature", 1.0, "p"), &sentences);
        assert_eq!(evidence.len(), 1);
        assert!((evidence[0].confidence - FUZZY_DISCOUNT).abs() < 1e-12);
    }

    #[test]
    fn evidence_is_capped_and_ordered() {
        let text = "Hash functions one. Hash functions two. Hash functions three. Hash functions four. \
                    Hash functions five. Hash functions six.";
        let sentences = index_sentences(&[Paper::new("p", "", text)]);
        let evidence = linker(UngroundedPolicy::Drop).find_evidence(&concept("hash functions", 0.5, "p"), &sentences);
        assert_eq!(evidence.len(), 5);
        let offsets: Vec<_> = evidence.iter().map(|e| e.position().1).collect();
        let mut sorted = offsets.clone();
        sorted.sort();
        assert_eq!(offsets, sorted);
    }

    #[test]
    fn only_source_papers_are_searched() {
        let sentences = index_sentences(&[
            Paper::new("a", "", "Lattice cryptography is studied here."),
            Paper::new("b", "", "Lattice cryptography appears here too."),
        ]);
        let evidence = linker(UngroundedPolicy::Drop).find_evidence(&concept("lattice cryptography", 1.0, "b"), &sentences);
        assert_eq!(evidence.len(), 1);
        assert_eq!(evidence[0].paper_id, PaperId::new("b"));
    }

    #[test]
    fn pages_are_recorded() {
        let paper = Paper::new("p", "", "").with_segments(vec![
            PageSegment { page: 1, text: "Nothing relevant.".into() },
            PageSegment { page: 2, text: "Prior work. Quantum cryptography resists attacks.".into() },
        ]);
        let sentences = index_sentences(&[paper]);
        let evidence = linker(UngroundedPolicy::Drop).find_evidence(&concept("quantum cryptography", 1.0, "p"), &sentences);
        let loc = evidence[0].location.clone().unwrap();
        assert_eq!(loc.page, Some(2));
        assert_eq!(loc.offset, 12);
    }

    #[test]
    fn ungrounded_policy_drops_or_marks() {
        let sentences = index_sentences(&[Paper::new("p", "", "Graph neural networks learn embeddings.")]);
        let concepts = vec![concept("graph neural networks", 0.8, "p"), concept("protein folding", 0.8, "p")];

        let (kept, summary) = linker(UngroundedPolicy::Drop).link(concepts.clone(), &sentences);
        assert_eq!(kept.len(), 1);
        assert_eq!(summary.dropped, vec![ConceptId::new("protein folding")]);

        let (kept, summary) = linker(UngroundedPolicy::KeepUngrounded).link(concepts, &sentences);
        assert_eq!(kept.len(), 2);
        assert!(!kept[1].grounded);
        assert!(kept[1].evidence.is_empty());
        assert_eq!(summary.ungrounded.len(), 1);
    }
}
