//! Retriever selection and execution.
//!
//! The retriever is chosen once per query from collection availability:
//! one non-empty collection gives a single-source retriever, otherwise the
//! fused retriever interleaves every configured source. A failing source is
//! logged and contributes no passages; retrieval itself never fails.

use crate::fusion::{fuse, RankedList};
use crate::source::WeightedSource;
use crate::types::{Passage, RetrievalRequest};
use multihop_core::AppError;

/// Retrieval strategy fixed for the lifetime of one query.
#[derive(Debug, Clone)]
pub enum Retriever {
    /// Exactly one collection has passages
    Single(WeightedSource),
    /// Weighted interleave of several sources
    Fused(Vec<WeightedSource>),
}

impl Retriever {
    /// Pick a strategy from which collections currently hold passages.
    ///
    /// A source whose count cannot be read is treated as empty. When no
    /// collection holds anything the fused retriever is returned over all
    /// sources, which then yields empty results.
    pub async fn select(sources: &[WeightedSource]) -> Self {
        let counts =
            futures::future::join_all(sources.iter().map(|s| s.source.passage_count())).await;

        let mut available = Vec::new();
        for (source, count) in sources.iter().zip(counts) {
            match count {
                Ok(0) => {
                    tracing::debug!(collection = %source.collection(), "Collection is empty");
                }
                Ok(n) => {
                    tracing::debug!(
                        collection = %source.collection(),
                        passages = n,
                        "Collection available"
                    );
                    available.push(source.clone());
                }
                Err(e) => {
                    tracing::warn!(
                        collection = %source.collection(),
                        error = %e,
                        "Could not read collection size, treating as empty"
                    );
                }
            }
        }

        match available.len() {
            1 => {
                let only = available.remove(0);
                tracing::info!(collection = %only.collection(), "Using single-source retriever");
                Retriever::Single(only)
            }
            0 => {
                tracing::warn!("No collection holds passages");
                Retriever::Fused(sources.to_vec())
            }
            n => {
                tracing::info!(sources = n, "Using fused retriever");
                Retriever::Fused(available)
            }
        }
    }

    /// Run one retrieval request. At most `request.k` passages come back.
    pub async fn search(&self, request: &RetrievalRequest) -> Vec<Passage> {
        match self {
            Retriever::Single(source) => search_source(source, request).await,
            Retriever::Fused(sources) => {
                let lists = futures::future::join_all(sources.iter().map(|source| async move {
                    RankedList::new(
                        source.collection(),
                        source.weight,
                        search_source(source, request).await,
                    )
                }))
                .await;

                fuse(lists, request.k)
            }
        }
    }
}

/// Query one source, turning failure into an empty list.
async fn search_source(source: &WeightedSource, request: &RetrievalRequest) -> Vec<Passage> {
    match source.source.search(&request.query_text, request.k).await {
        Ok(mut passages) => {
            passages.truncate(request.k);
            passages
        }
        Err(e) => {
            let err = AppError::SourceUnavailable {
                collection: source.collection().to_string(),
                message: e.to_string(),
            };
            tracing::warn!(
                error = %err,
                query = %request.query_text,
                "Source failed, continuing without it"
            );
            Vec::new()
        }
    }
}
