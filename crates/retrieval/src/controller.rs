//! Two-round retrieval state machine.
//!
//! ```text
//! INITIAL_RETRIEVAL -> FOLLOWUP_SYNTHESIS -> SECONDARY_RETRIEVAL -> MERGE_AND_DEDUP
//!                                  \______ no follow-ups ______________/
//!
//! MERGE_AND_DEDUP -> GENERATE_FINAL -> DONE
//! ```
//!
//! Every stage except final generation recovers from its own failures, so
//! the only ways a query ends in `FAILED` are an empty question or both
//! providers failing on the final answer.

use crate::budget::apply_budget;
use crate::context::RagContext;
use crate::dedup::dedup_passages;
use crate::followup::FollowupSynthesizer;
use crate::retriever::Retriever;
use crate::types::{format_evidence, AnswerResult, HopRecord, Passage, RetrievalRequest};
use futures::stream::{self, StreamExt};
use multihop_core::{AppError, AppResult};
use multihop_llm::{Generation, GenerationRequest};
use std::fmt;
use std::sync::Arc;
use tracing::Instrument;

const ANSWER_TEMPERATURE: f32 = 0.3;
const ANSWER_MAX_TOKENS: u32 = 1000;

/// Position of a query in the retrieval protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStage {
    InitialRetrieval,
    FollowupSynthesis,
    SecondaryRetrieval,
    MergeAndDedup,
    GenerateFinal,
    Done,
    Failed,
}

impl QueryStage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Stage after follow-up synthesis produced `followup_count` questions.
    pub fn after_synthesis(followup_count: usize) -> Self {
        if followup_count == 0 {
            Self::MergeAndDedup
        } else {
            Self::SecondaryRetrieval
        }
    }
}

impl fmt::Display for QueryStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::InitialRetrieval => "INITIAL_RETRIEVAL",
            Self::FollowupSynthesis => "FOLLOWUP_SYNTHESIS",
            Self::SecondaryRetrieval => "SECONDARY_RETRIEVAL",
            Self::MergeAndDedup => "MERGE_AND_DEDUP",
            Self::GenerateFinal => "GENERATE_FINAL",
            Self::Done => "DONE",
            Self::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

/// Per-query state, owned by exactly one query.
struct QueryRun {
    question: String,
    stage: QueryStage,
    retriever: Retriever,
    initial: Vec<Passage>,
    followups: Vec<String>,
    secondary: Vec<Passage>,
    evidence: Vec<Passage>,
    hops: Vec<HopRecord>,
    answer: Option<(Generation, Vec<Passage>)>,
}

impl QueryRun {
    fn new(question: String, retriever: Retriever) -> Self {
        Self {
            question,
            stage: QueryStage::InitialRetrieval,
            retriever,
            initial: Vec::new(),
            followups: Vec::new(),
            secondary: Vec::new(),
            evidence: Vec::new(),
            hops: Vec::new(),
            answer: None,
        }
    }

    fn merge_and_dedup(&mut self) -> QueryStage {
        let mut combined = std::mem::take(&mut self.initial);
        combined.append(&mut self.secondary);
        let before = combined.len();

        self.evidence = dedup_passages(combined);
        tracing::debug!(
            combined = before,
            unique = self.evidence.len(),
            "Merged evidence"
        );

        QueryStage::GenerateFinal
    }

    fn into_result(self) -> AppResult<AnswerResult> {
        let (generation, evidence) = self
            .answer
            .ok_or_else(|| AppError::Other("Query finished without an answer".to_string()))?;

        Ok(AnswerResult {
            answer_text: generation.text,
            provider_used: generation.provider_used,
            evidence,
            hops: self.hops,
        })
    }
}

/// Runs one question through the two-round protocol.
///
/// The controller holds no per-query state and can serve concurrent
/// queries.
#[derive(Debug, Clone)]
pub struct MultiHopController {
    context: Arc<RagContext>,
}

impl MultiHopController {
    pub fn new(context: Arc<RagContext>) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &RagContext {
        &self.context
    }

    /// Answer `question` from the collections.
    ///
    /// # Errors
    /// - `AppError::InvalidInput` for an empty question; nothing is retrieved
    /// - `AppError::GenerationFailed` when both providers fail on the final
    ///   answer
    pub async fn answer(&self, question: &str) -> AppResult<AnswerResult> {
        let question = question.trim();
        if question.is_empty() {
            return Err(AppError::InvalidInput(
                "Question must not be empty".to_string(),
            ));
        }

        let query_id = uuid::Uuid::new_v4();
        let span = tracing::info_span!("multihop_query", %query_id);

        self.run(question.to_string()).instrument(span).await
    }

    async fn run(&self, question: String) -> AppResult<AnswerResult> {
        tracing::info!(question = %question, "Starting multi-hop query");

        // Chosen once; both rounds use the same strategy
        let retriever = Retriever::select(&self.context.sources).await;
        let mut run = QueryRun::new(question, retriever);

        while !run.stage.is_terminal() {
            tracing::debug!(stage = %run.stage, "Entering stage");

            let next = match run.stage {
                QueryStage::InitialRetrieval => self.initial_retrieval(&mut run).await,
                QueryStage::FollowupSynthesis => self.followup_synthesis(&mut run).await,
                QueryStage::SecondaryRetrieval => self.secondary_retrieval(&mut run).await,
                QueryStage::MergeAndDedup => run.merge_and_dedup(),
                QueryStage::GenerateFinal => match self.generate_final(&mut run).await {
                    Ok(next) => next,
                    Err(e) => {
                        run.stage = QueryStage::Failed;
                        tracing::error!(stage = %run.stage, error = %e, "Query failed");
                        return Err(e);
                    }
                },
                QueryStage::Done | QueryStage::Failed => break,
            };

            run.stage = next;
        }

        let result = run.into_result()?;
        tracing::info!(
            provider = %result.provider_used,
            hops = result.hops.len(),
            evidence = result.evidence.len(),
            "Query complete"
        );
        Ok(result)
    }

    async fn initial_retrieval(&self, run: &mut QueryRun) -> QueryStage {
        let request = RetrievalRequest::new(run.question.clone(), self.context.settings.initial_k);
        run.initial = run.retriever.search(&request).await;

        tracing::info!(passages = run.initial.len(), "Hop 1 retrieval complete");
        run.hops.push(HopRecord {
            hop_number: 1,
            queries: vec![run.question.clone()],
            passages_found: run.initial.len(),
        });

        QueryStage::FollowupSynthesis
    }

    async fn followup_synthesis(&self, run: &mut QueryRun) -> QueryStage {
        let settings = &self.context.settings;
        let synthesizer = FollowupSynthesizer::new(
            &self.context.generator,
            &self.context.prompts,
            settings.followup_budget,
            settings.max_followups,
        );

        run.followups = synthesizer.synthesize(&run.question, &run.initial).await;
        if run.followups.is_empty() {
            tracing::info!("No follow-up questions, skipping hop 2");
        } else {
            tracing::info!(followups = ?run.followups, "Follow-up questions synthesized");
        }

        QueryStage::after_synthesis(run.followups.len())
    }

    async fn secondary_retrieval(&self, run: &mut QueryRun) -> QueryStage {
        let settings = &self.context.settings;
        let requests: Vec<RetrievalRequest> = run
            .followups
            .iter()
            .map(|q| RetrievalRequest::new(q.clone(), settings.followup_k))
            .collect();
        let limit = requests.len().min(settings.max_concurrency).max(1);

        // `buffered` yields in input order whatever the completion order
        let retriever = &run.retriever;
        let results: Vec<Vec<Passage>> = stream::iter(requests.iter())
            .map(|request| retriever.search(request))
            .buffered(limit)
            .collect()
            .await;

        run.secondary = results.into_iter().flatten().collect();

        tracing::info!(
            followups = requests.len(),
            passages = run.secondary.len(),
            "Hop 2 retrieval complete"
        );
        run.hops.push(HopRecord {
            hop_number: 2,
            queries: run.followups.clone(),
            passages_found: run.secondary.len(),
        });

        QueryStage::MergeAndDedup
    }

    async fn generate_final(&self, run: &mut QueryRun) -> AppResult<QueryStage> {
        let evidence = apply_budget(&run.evidence, self.context.settings.answer_budget);
        if evidence.is_empty() {
            tracing::warn!("No evidence retrieved, answering without passages");
        }

        let prompt = self
            .context
            .prompts
            .render_answer(&format_evidence(&evidence), &run.question)?;
        let request = GenerationRequest::new(prompt)
            .with_temperature(ANSWER_TEMPERATURE)
            .with_max_tokens(ANSWER_MAX_TOKENS);

        let generation = self.context.generator.generate(&request).await?;
        tracing::debug!(
            provider = %generation.provider_used,
            model = %generation.model,
            "Final answer generated"
        );

        run.answer = Some((generation, evidence));
        Ok(QueryStage::Done)
    }
}
