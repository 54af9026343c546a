//! Ask command handler.
//!
//! Runs one question through the multi-hop controller.

use clap::Args;
use multihop_core::{config::AppConfig, AppError, AppResult};
use multihop_retrieval::{AnswerResult, MultiHopController, RagContext};
use std::path::PathBuf;
use std::sync::Arc;

/// Answer a question from the collections
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub question: Option<String>,

    /// Read the question from a file
    #[arg(short, long, conflicts_with = "question")]
    pub file: Option<PathBuf>,

    /// Print the hop trace and evidence after the answer
    #[arg(long)]
    pub trace: bool,

    /// Output the full result as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    /// Execute the ask command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");
        tracing::debug!("Ask command options: {:?}", self);

        config.validate()?;
        let question = self.question_text()?;

        let context = RagContext::from_config(config)?;
        let controller = MultiHopController::new(Arc::new(context));

        let result = controller.answer(&question).await?;

        for hop in &result.hops {
            tracing::info!(
                hop = hop.hop_number,
                queries = hop.queries.len(),
                passages = hop.passages_found,
                "Hop summary"
            );
        }

        if self.json {
            println!("{}", serde_json::to_string_pretty(&result)?);
        } else {
            println!("{}", result.answer_text.trim());
            if self.trace {
                print!("{}", render_trace(&result));
            }
        }

        Ok(())
    }

    /// Get the question text from the argument or file.
    fn question_text(&self) -> AppResult<String> {
        if let Some(question) = &self.question {
            return Ok(question.clone());
        }

        if let Some(path) = &self.file {
            return std::fs::read_to_string(path).map_err(|e| {
                AppError::InvalidInput(format!("Failed to read question file {:?}: {}", path, e))
            });
        }

        Err(AppError::InvalidInput("No question provided".to_string()))
    }
}

/// Human-readable hop trace and evidence list.
fn render_trace(result: &AnswerResult) -> String {
    let mut out = format!("\nAnswered by: {}\n", result.provider_used);

    for hop in &result.hops {
        out.push_str(&format!(
            "\nHop {} ({} passages)\n",
            hop.hop_number, hop.passages_found
        ));
        for query in &hop.queries {
            out.push_str(&format!("  - {}\n", query));
        }
    }

    out.push_str(&format!("\nEvidence ({} passages)\n", result.evidence.len()));
    for (i, passage) in result.evidence.iter().enumerate() {
        out.push_str(&format!("  [{}] {}\n", i + 1, passage.label()));
    }

    out
}
