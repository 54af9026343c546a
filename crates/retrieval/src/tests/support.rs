//! Shared fixtures for retrieval tests.

use crate::context::RagContext;
use crate::source::{SimilaritySource, WeightedSource};
use crate::types::{Collection, Passage};
use async_trait::async_trait;
use multihop_core::{AppError, AppResult, RetrievalConfig};
use multihop_llm::{GenerationInvoker, LlmRequest, ProviderRole, ProviderSlot, ScriptedClient};
use multihop_prompt::PromptTemplates;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const SLOT_TIMEOUT: Duration = Duration::from_secs(5);

pub fn passage(collection: Collection, document_id: &str, chunk_index: u32, text: &str) -> Passage {
    Passage::new(collection, document_id, chunk_index, text)
}

/// Source that answers from fixed lists instead of an index.
pub struct StaticSource {
    collection: Collection,
    default: Vec<Passage>,
    by_query: HashMap<String, Vec<Passage>>,
    delays: HashMap<String, Duration>,
    failing: bool,
    ignore_k: bool,
    searches: Mutex<Vec<String>>,
}

impl StaticSource {
    pub fn empty(collection: Collection) -> Self {
        Self::from_passages(collection, Vec::new())
    }

    pub fn from_passages(collection: Collection, passages: Vec<Passage>) -> Self {
        Self {
            collection,
            default: passages,
            by_query: HashMap::new(),
            delays: HashMap::new(),
            failing: false,
            ignore_k: false,
            searches: Mutex::new(Vec::new()),
        }
    }

    /// `n` passages with ids `<prefix>0..<prefix>n-1`.
    pub fn with_passages(collection: Collection, prefix: &str, n: usize) -> Self {
        let passages = (0..n)
            .map(|i| {
                passage(
                    collection,
                    &format!("{prefix}{i}"),
                    0,
                    &format!("Passage {i} on complaint supervision"),
                )
            })
            .collect();
        Self::from_passages(collection, passages)
    }

    /// Answer `query` with `passages` instead of the default list.
    pub fn on_query(mut self, query: &str, passages: Vec<Passage>) -> Self {
        self.by_query.insert(query.to_string(), passages);
        self
    }

    /// Sleep before answering `query`.
    pub fn delayed(mut self, query: &str, delay: Duration) -> Self {
        self.delays.insert(query.to_string(), delay);
        self
    }

    /// Every search fails; the size is still reported.
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    /// Return whole lists regardless of `k`.
    pub fn ignoring_k(mut self) -> Self {
        self.ignore_k = true;
        self
    }

    pub fn searches(&self) -> Vec<String> {
        self.searches
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl SimilaritySource for StaticSource {
    fn collection(&self) -> Collection {
        self.collection
    }

    async fn search(&self, query: &str, k: usize) -> AppResult<Vec<Passage>> {
        if let Ok(mut searches) = self.searches.lock() {
            searches.push(query.to_string());
        }

        if let Some(delay) = self.delays.get(query) {
            tokio::time::sleep(*delay).await;
        }

        if self.failing {
            return Err(AppError::Retrieval("index offline".to_string()));
        }

        let mut passages = self
            .by_query
            .get(query)
            .unwrap_or(&self.default)
            .clone();
        if !self.ignore_k {
            passages.truncate(k);
        }
        Ok(passages)
    }

    async fn passage_count(&self) -> AppResult<usize> {
        Ok(self.default.len() + self.by_query.values().map(Vec::len).sum::<usize>())
    }
}

/// Reply function that tells follow-up prompts from answer prompts.
pub fn reply_by_prompt(
    followup_reply: &str,
    answer_reply: &str,
) -> impl Fn(&LlmRequest) -> AppResult<String> + Send + Sync + 'static {
    let followup_reply = followup_reply.to_string();
    let answer_reply = answer_reply.to_string();
    move |request| {
        if is_followup_prompt(&request.prompt) {
            Ok(followup_reply.clone())
        } else {
            Ok(answer_reply.clone())
        }
    }
}

pub fn is_followup_prompt(prompt: &str) -> bool {
    prompt.contains("follow-up questions")
}

pub fn invoker(primary: Arc<ScriptedClient>, secondary: Arc<ScriptedClient>) -> GenerationInvoker {
    GenerationInvoker::new(
        ProviderSlot::new(ProviderRole::Primary, primary, "primary-model", SLOT_TIMEOUT),
        ProviderSlot::new(ProviderRole::Secondary, secondary, "secondary-model", SLOT_TIMEOUT),
    )
}

/// Documents at 0.6 and transcripts at 0.4 with the built-in prompts.
pub fn context(
    documents: Arc<StaticSource>,
    transcripts: Arc<StaticSource>,
    generator: GenerationInvoker,
    settings: RetrievalConfig,
) -> Arc<RagContext> {
    let sources = vec![
        WeightedSource::new(documents, settings.documents_weight),
        WeightedSource::new(transcripts, settings.transcripts_weight),
    ];
    let prompts = PromptTemplates::builtin().unwrap();
    Arc::new(RagContext::new(sources, generator, prompts, settings))
}
