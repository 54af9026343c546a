//! Query dependencies.

use crate::source::WeightedSource;
use crate::store::JsonlCollection;
use crate::types::Collection;
use multihop_core::{AppConfig, AppResult, RetrievalConfig};
use multihop_llm::GenerationInvoker;
use multihop_prompt::PromptTemplates;
use std::sync::Arc;

/// Everything a multi-hop query needs, built once at startup and shared
/// read-only by every query.
#[derive(Debug, Clone)]
pub struct RagContext {
    /// Similarity sources with their fusion weights, in declaration order
    pub sources: Vec<WeightedSource>,
    pub generator: GenerationInvoker,
    pub prompts: PromptTemplates,
    pub settings: RetrievalConfig,
}

impl RagContext {
    pub fn new(
        sources: Vec<WeightedSource>,
        generator: GenerationInvoker,
        prompts: PromptTemplates,
        settings: RetrievalConfig,
    ) -> Self {
        Self {
            sources,
            generator,
            prompts,
            settings,
        }
    }

    /// Wire the local collections, both providers and the prompt templates
    /// from configuration.
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        config.retrieval.validate()?;

        let collections_dir = config.collections_dir();
        let documents = JsonlCollection::load(&collections_dir, Collection::Documents)?;
        let transcripts = JsonlCollection::load(&collections_dir, Collection::Transcripts)?;

        let sources = vec![
            WeightedSource::new(Arc::new(documents), config.retrieval.documents_weight),
            WeightedSource::new(Arc::new(transcripts), config.retrieval.transcripts_weight),
        ];

        let generator = GenerationInvoker::from_settings(&config.primary, &config.secondary)?;
        let prompts = PromptTemplates::load(&config.prompts_dir())?;

        tracing::debug!(?generator, "Query context ready");

        Ok(Self::new(sources, generator, prompts, config.retrieval.clone()))
    }
}
