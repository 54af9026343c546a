//! Local collection storage.

mod jsonl;
mod trigram;

pub use jsonl::{JsonlCollection, PassageRecord};
pub use trigram::{cosine_similarity, TrigramEmbedder, DEFAULT_DIMENSIONS};
