//! Collections command handler.
//!
//! Shows passage and document counts for every local collection.

use clap::Args;
use multihop_core::{config::AppConfig, AppResult};
use multihop_retrieval::{Collection, JsonlCollection};
use serde::Serialize;
use std::path::PathBuf;

/// Show what each collection holds
#[derive(Args, Debug)]
pub struct CollectionsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct CollectionSummary {
    collection: Collection,
    passages: usize,
    documents: usize,
    weight: f64,
    path: PathBuf,
}

impl CollectionsCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing collections command");

        let summaries = summarize(config)?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&summaries)?);
            return Ok(());
        }

        for summary in &summaries {
            println!(
                "{:<12} {:>6} passages {:>5} documents  weight {:.2}  {}",
                summary.collection.as_str(),
                summary.passages,
                summary.documents,
                summary.weight,
                summary.path.display()
            );
        }

        if summaries.iter().all(|s| s.passages == 0) {
            println!(
                "\nNo passages found. Add *.jsonl files under {}",
                config.collections_dir().display()
            );
        }

        Ok(())
    }
}

fn summarize(config: &AppConfig) -> AppResult<Vec<CollectionSummary>> {
    let collections_dir = config.collections_dir();

    Collection::ALL
        .into_iter()
        .map(|collection| {
            let store = JsonlCollection::load(&collections_dir, collection)?;
            let weight = match collection {
                Collection::Documents => config.retrieval.documents_weight,
                Collection::Transcripts => config.retrieval.transcripts_weight,
            };

            Ok(CollectionSummary {
                collection,
                passages: store.len(),
                documents: store.document_count(),
                weight,
                path: collections_dir.join(collection.as_str()),
            })
        })
        .collect()
}
