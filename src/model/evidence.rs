//! Verbatim evidence sentences backing a concept

use super::{ExtractionMethod, PaperId};
use serde::{Deserialize, Serialize};

/// Where in a paper an evidence sentence was found
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceLocation {
    /// Page number, when the paper was supplied page-indexed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    /// Byte offset of the sentence within the page (or the whole text)
    pub offset: usize,
}

/// A source sentence supporting a concept
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceSentence {
    /// The sentence exactly as it appears in the source
    pub text: String,
    pub paper_id: PaperId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<EvidenceLocation>,
    /// Match quality times originating strategy confidence, in [0, 1]
    pub confidence: f64,
    /// Extraction method whose confidence backs this sentence
    pub method: ExtractionMethod,
}

impl EvidenceSentence {
    pub fn new(
        text: impl Into<String>,
        paper_id: PaperId,
        confidence: f64,
        method: ExtractionMethod,
    ) -> Self {
        Self {
            text: text.into(),
            paper_id,
            location: None,
            confidence: confidence.clamp(0.0, 1.0),
            method,
        }
    }

    pub fn with_location(mut self, page: Option<u32>, offset: usize) -> Self {
        self.location = Some(EvidenceLocation { page, offset });
        self
    }

    /// Ordering key: page then offset, unpaged first
    pub(crate) fn position(&self) -> (u32, usize) {
        match &self.location {
            Some(loc) => (loc.page.unwrap_or(0), loc.offset),
            None => (0, 0),
        }
    }
}
