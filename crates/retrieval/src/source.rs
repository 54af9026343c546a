//! Similarity source abstraction.
//!
//! A source wraps one indexed collection and answers nearest-neighbour
//! queries against it. Sources are external collaborators: the
//! orchestration only ever sees ranked passages or an error.

use crate::types::{Collection, Passage};
use async_trait::async_trait;
use multihop_core::AppResult;
use std::sync::Arc;

/// Nearest-neighbour search over one collection.
#[async_trait]
pub trait SimilaritySource: Send + Sync {
    /// Collection this source serves.
    fn collection(&self) -> Collection;

    /// Up to `k` passages most similar to `query`, best first.
    async fn search(&self, query: &str, k: usize) -> AppResult<Vec<Passage>>;

    /// Number of passages the collection holds.
    async fn passage_count(&self) -> AppResult<usize>;
}

/// A source paired with its fusion weight.
#[derive(Clone)]
pub struct WeightedSource {
    pub source: Arc<dyn SimilaritySource>,
    pub weight: f64,
}

impl WeightedSource {
    pub fn new(source: Arc<dyn SimilaritySource>, weight: f64) -> Self {
        Self { source, weight }
    }

    pub fn collection(&self) -> Collection {
        self.source.collection()
    }
}

impl std::fmt::Debug for WeightedSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeightedSource")
            .field("collection", &self.collection())
            .field("weight", &self.weight)
            .finish()
    }
}
