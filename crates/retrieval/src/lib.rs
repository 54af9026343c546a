//! Multi-hop retrieval orchestration.
//!
//! Answers a question in two retrieval rounds over weighted similarity
//! sources: a first round on the question itself, then a round on
//! follow-up questions a provider derives from the first round's evidence.
//! The merged, deduplicated and budgeted evidence grounds the final answer.

pub mod budget;
pub mod context;
pub mod controller;
pub mod dedup;
pub mod followup;
pub mod fusion;
pub mod retriever;
pub mod source;
pub mod store;
pub mod types;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use budget::{apply_budget, truncate_text, TRUNCATION_MARKER};
pub use context::RagContext;
pub use controller::{MultiHopController, QueryStage};
pub use dedup::dedup_passages;
pub use followup::{parse_followups, FollowupParse, FollowupSynthesizer, ParseStage};
pub use fusion::{fuse, RankedList};
pub use retriever::Retriever;
pub use source::{SimilaritySource, WeightedSource};
pub use store::{JsonlCollection, PassageRecord, TrigramEmbedder};
pub use types::{
    format_evidence, AnswerResult, Collection, EvidenceSet, HopRecord, Passage, PassageKey,
    RetrievalRequest,
};
