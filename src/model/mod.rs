//! Core data model: papers, concepts and evidence

mod concept;
mod evidence;
mod paper;

pub use concept::{Concept, ConceptId, ExtractionMethod, StrategyKind};
pub use evidence::{EvidenceLocation, EvidenceSentence};
pub use paper::{PageSegment, Paper, PaperId};
