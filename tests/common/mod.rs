//! Shared helpers for the integration tests
//!
//! Deterministic embedding providers and small paper fixtures.

#![allow(dead_code)]

pub mod corpus;
pub mod embedders;

pub use corpus::{crypto_corpus, paper, quantum_pair};
pub use embedders::{CancellingEmbedder, FailingEmbedder, HashingEmbedder};

use conceptgraph::{Concept, ConceptGraph};

/// Concept whose key or one of its aliases is `key`
pub fn find<'a>(graph: &'a ConceptGraph, key: &str) -> Option<&'a Concept> {
    graph
        .nodes()
        .into_iter()
        .find(|c| c.id.as_str() == key || c.aliases.contains(key))
}
