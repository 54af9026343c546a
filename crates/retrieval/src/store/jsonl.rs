//! JSONL-backed collection.
//!
//! A collection lives under `.multihop/collections/<collection>/` as one or
//! more `*.jsonl` files, one passage per line:
//!
//! ```text
//! {"documentId":"handbook","chunkIndex":2,"text":"...","metadata":{"source":"handbook.pdf"}}
//! ```
//!
//! Files are read in name order and lines in file order; that load order
//! breaks similarity ties.

use super::trigram::{cosine_similarity, TrigramEmbedder};
use crate::source::SimilaritySource;
use crate::types::{Collection, Passage};
use async_trait::async_trait;
use multihop_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::io::{BufRead, BufReader};
use std::path::Path;
use walkdir::WalkDir;

/// One stored passage line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassageRecord {
    #[serde(rename = "documentId")]
    pub document_id: String,

    #[serde(rename = "chunkIndex")]
    pub chunk_index: u32,

    pub text: String,

    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl PassageRecord {
    fn into_passage(self, collection: Collection) -> Passage {
        Passage {
            text: self.text,
            source_collection: collection,
            document_id: self.document_id,
            chunk_index: self.chunk_index,
            metadata: self.metadata,
        }
    }
}

/// In-memory similarity index over one collection's passages.
#[derive(Debug, Clone)]
pub struct JsonlCollection {
    collection: Collection,
    passages: Vec<Passage>,
    vectors: Vec<Vec<f32>>,
    embedder: TrigramEmbedder,
}

impl JsonlCollection {
    /// Index passages already in memory.
    pub fn from_passages(collection: Collection, passages: Vec<Passage>) -> Self {
        let embedder = TrigramEmbedder::default();
        let vectors = passages.iter().map(|p| embedder.embed(&p.text)).collect();
        Self {
            collection,
            passages,
            vectors,
            embedder,
        }
    }

    /// Load `<collections_dir>/<collection>/*.jsonl`.
    ///
    /// A missing directory is an empty collection, not an error.
    pub fn load(collections_dir: &Path, collection: Collection) -> AppResult<Self> {
        let dir = collections_dir.join(collection.as_str());
        if !dir.exists() {
            tracing::debug!(collection = %collection, "No collection directory at {:?}", dir);
            return Ok(Self::from_passages(collection, Vec::new()));
        }

        let mut passages = Vec::new();
        for entry in WalkDir::new(&dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("jsonl") {
                passages.extend(read_records(path, collection)?);
            }
        }

        tracing::info!(
            collection = %collection,
            passages = passages.len(),
            "Loaded collection"
        );

        Ok(Self::from_passages(collection, passages))
    }

    pub fn len(&self) -> usize {
        self.passages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }

    /// Number of distinct documents the passages come from.
    pub fn document_count(&self) -> usize {
        self.passages
            .iter()
            .map(|p| p.document_id.as_str())
            .collect::<HashSet<_>>()
            .len()
    }

    /// Passages sharing vocabulary with `query`, best first.
    ///
    /// Each returned passage carries its similarity under the `score`
    /// metadata key.
    pub fn rank(&self, query: &str, k: usize) -> Vec<Passage> {
        let query_vector = self.embedder.embed(query);

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(i, vector)| (i, cosine_similarity(&query_vector, vector)))
            .filter(|(_, score)| *score > 0.0)
            .collect();

        // Stable: equal scores keep load order
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        scored
            .into_iter()
            .take(k)
            .map(|(i, score)| {
                self.passages[i]
                    .clone()
                    .with_metadata("score", format!("{:.4}", score))
            })
            .collect()
    }
}

#[async_trait]
impl SimilaritySource for JsonlCollection {
    fn collection(&self) -> Collection {
        self.collection
    }

    async fn search(&self, query: &str, k: usize) -> AppResult<Vec<Passage>> {
        Ok(self.rank(query, k))
    }

    async fn passage_count(&self) -> AppResult<usize> {
        Ok(self.passages.len())
    }
}

fn read_records(path: &Path, collection: Collection) -> AppResult<Vec<Passage>> {
    let file = std::fs::File::open(path).map_err(|e| {
        AppError::Retrieval(format!("Failed to open {:?}: {}", path, e))
    })?;

    let mut passages = Vec::new();
    for (line_no, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| {
            AppError::Retrieval(format!("Failed to read {:?}: {}", path, e))
        })?;

        if line.trim().is_empty() {
            continue;
        }

        let record: PassageRecord = serde_json::from_str(&line).map_err(|e| {
            AppError::Retrieval(format!(
                "Invalid passage at {:?} line {}: {}",
                path,
                line_no + 1,
                e
            ))
        })?;

        passages.push(record.into_passage(collection));
    }

    Ok(passages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_lines(dir: &Path, collection: &str, file: &str, lines: &[&str]) {
        let target = dir.join(collection);
        fs::create_dir_all(&target).unwrap();
        fs::write(target.join(file), lines.join("\n")).unwrap();
    }

    #[tokio::test]
    async fn test_load_and_search() {
        let temp = TempDir::new().unwrap();
        write_lines(
            temp.path(),
            "documents",
            "handbook.jsonl",
            &[
                r#"{"documentId":"handbook","chunkIndex":0,"text":"The cafeteria menu rotates weekly."}"#,
                "",
                r#"{"documentId":"handbook","chunkIndex":1,"text":"Complaint escalations are approved by the compliance officer.","metadata":{"source":"handbook.pdf"}}"#,
            ],
        );

        let store = JsonlCollection::load(temp.path(), Collection::Documents).unwrap();
        assert_eq!(store.passage_count().await.unwrap(), 2);
        assert_eq!(store.document_count(), 1);
        assert_eq!(store.collection(), Collection::Documents);

        let results = store.search("Who approves complaint escalations?", 5).await.unwrap();
        assert!(!results.is_empty());
        assert_eq!(results[0].chunk_index, 1);
        assert_eq!(results[0].source_collection, Collection::Documents);
        assert_eq!(results[0].metadata.get("source").map(String::as_str), Some("handbook.pdf"));
        assert!(results[0].metadata.contains_key("score"));
    }

    #[tokio::test]
    async fn test_missing_directory_is_empty() {
        let temp = TempDir::new().unwrap();
        let store = JsonlCollection::load(temp.path(), Collection::Transcripts).unwrap();

        assert!(store.is_empty());
        assert_eq!(store.passage_count().await.unwrap(), 0);
        assert!(store.search("anything at all", 5).await.unwrap().is_empty());
    }

    #[test]
    fn test_invalid_line_reports_location() {
        let temp = TempDir::new().unwrap();
        write_lines(
            temp.path(),
            "transcripts",
            "standup.jsonl",
            &[
                r#"{"documentId":"standup","chunkIndex":0,"text":"ok"}"#,
                r#"{"documentId":"standup","chunkIndex":"#,
            ],
        );

        let err = JsonlCollection::load(temp.path(), Collection::Transcripts).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_files_load_in_name_order() {
        let temp = TempDir::new().unwrap();
        write_lines(
            temp.path(),
            "documents",
            "b.jsonl",
            &[r#"{"documentId":"b","chunkIndex":0,"text":"refund policy details"}"#],
        );
        write_lines(
            temp.path(),
            "documents",
            "a.jsonl",
            &[r#"{"documentId":"a","chunkIndex":0,"text":"refund policy details"}"#],
        );

        let store = JsonlCollection::load(temp.path(), Collection::Documents).unwrap();
        let ranked = store.rank("refund policy", 2);
        let ids: Vec<&str> = ranked.iter().map(|p| p.document_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_rank_respects_k() {
        let passages = (0..10)
            .map(|i| {
                Passage::new(Collection::Documents, format!("d{i}"), 0, "quarterly audit report")
            })
            .collect();
        let store = JsonlCollection::from_passages(Collection::Documents, passages);

        assert_eq!(store.rank("audit report", 3).len(), 3);
    }
}
