//! Retrieval type definitions.

use multihop_llm::ProviderRole;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One of the independently indexed text collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    /// Curated general documents
    Documents,
    /// Free-form meeting transcripts
    Transcripts,
}

impl Collection {
    pub const ALL: [Collection; 2] = [Collection::Documents, Collection::Transcripts];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Documents => "documents",
            Self::Transcripts => "transcripts",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "documents" | "docs" => Some(Self::Documents),
            "transcripts" => Some(Self::Transcripts),
            _ => None,
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One retrievable unit of text with provenance.
///
/// Two passages with the same `(document_id, chunk_index)` are the same
/// evidence unit, whichever query retrieved them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    /// Text content
    pub text: String,

    /// Collection the passage was retrieved from
    #[serde(rename = "sourceCollection")]
    pub source_collection: Collection,

    /// Originating document
    #[serde(rename = "documentId")]
    pub document_id: String,

    /// Position of the chunk within its document
    #[serde(rename = "chunkIndex")]
    pub chunk_index: u32,

    /// Free-form provenance (file name, speaker, page, score...)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl Passage {
    pub fn new(
        source_collection: Collection,
        document_id: impl Into<String>,
        chunk_index: u32,
        text: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            source_collection,
            document_id: document_id.into(),
            chunk_index,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Identity key used for deduplication.
    pub fn key(&self) -> PassageKey {
        PassageKey {
            document_id: self.document_id.clone(),
            chunk_index: self.chunk_index,
        }
    }

    /// Provenance label, e.g. `documents: handbook #2 (handbook.pdf)`.
    pub fn label(&self) -> String {
        let label = format!(
            "{}: {} #{}",
            self.source_collection, self.document_id, self.chunk_index
        );
        match self.metadata.get("source") {
            Some(source) => format!("{} ({})", label, source),
            None => label,
        }
    }
}

/// Identity of a passage within an evidence set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PassageKey {
    pub document_id: String,
    pub chunk_index: u32,
}

/// Ordered passages; order reflects retrieval rank and is preserved.
pub type EvidenceSet = Vec<Passage>;

/// A query against the fused similarity sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievalRequest {
    pub query_text: String,
    /// Maximum passages in the fused result
    pub k: usize,
}

impl RetrievalRequest {
    pub fn new(query_text: impl Into<String>, k: usize) -> Self {
        Self {
            query_text: query_text.into(),
            k,
        }
    }
}

/// Trace of one retrieval round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HopRecord {
    #[serde(rename = "hopNumber")]
    pub hop_number: u32,

    pub queries: Vec<String>,

    /// Passages appended to the combined list in this hop, before dedup
    #[serde(rename = "passagesFound")]
    pub passages_found: usize,
}

/// Terminal output of one multi-hop query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerResult {
    #[serde(rename = "answerText")]
    pub answer_text: String,

    /// Slot that produced the final answer
    #[serde(rename = "providerUsed")]
    pub provider_used: ProviderRole,

    /// Passages handed to the provider, in rank order
    pub evidence: EvidenceSet,

    pub hops: Vec<HopRecord>,
}

/// Render passages as numbered evidence blocks for a prompt.
pub fn format_evidence(passages: &[Passage]) -> String {
    if passages.is_empty() {
        return "(no passages were retrieved)".to_string();
    }

    passages
        .iter()
        .enumerate()
        .map(|(i, passage)| format!("[{}] ({})\n{}", i + 1, passage.label(), passage.text))
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}
