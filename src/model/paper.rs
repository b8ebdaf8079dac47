//! Paper records supplied by the upstream corpus provider

use serde::{Deserialize, Serialize};

/// Identifier of a source paper
///
/// Serializes as a plain string (DOI, arXiv id, or any opaque key).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaperId(String);

impl PaperId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PaperId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PaperId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for PaperId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A page-indexed slice of a paper's text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageSegment {
    pub page: u32,
    pub text: String,
}

/// A paper record: identifier, title, and abstract or full text
///
/// When `segments` is non-empty it is the authoritative, page-indexed form
/// of the body and `text` is ignored for analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paper {
    pub id: PaperId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub segments: Vec<PageSegment>,
}

impl Paper {
    pub fn new(id: impl Into<PaperId>, title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            text: text.into(),
            segments: Vec::new(),
        }
    }

    /// Attach page-indexed segments
    pub fn with_segments(mut self, segments: Vec<PageSegment>) -> Self {
        self.segments = segments;
        self
    }

    /// The analysable text as `(page, text)` pieces.
    pub fn pages(&self) -> Vec<(Option<u32>, &str)> {
        if self.segments.is_empty() {
            vec![(None, self.text.as_str())]
        } else {
            self.segments
                .iter()
                .map(|s| (Some(s.page), s.text.as_str()))
                .collect()
        }
    }

    /// The full body the strategies analyse.
    pub fn body(&self) -> String {
        if self.segments.is_empty() {
            self.text.clone()
        } else {
            self.segments
                .iter()
                .map(|s| s.text.as_str())
                .collect::<Vec<_>>()
                .join("\n")
        }
    }

    /// Title and body joined, used for whole-document embeddings.
    pub fn document_text(&self) -> String {
        let body = self.body();
        if self.title.trim().is_empty() {
            body
        } else {
            format!("{}. {}", self.title.trim(), body)
        }
    }
}
