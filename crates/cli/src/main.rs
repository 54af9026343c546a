//! Multihop CLI
//!
//! Main entry point for the multihop command-line tool.
//! Answers questions from local document and transcript collections with
//! two rounds of retrieval.

mod commands;

use clap::{Parser, Subcommand};
use commands::{AskCommand, CollectionsCommand};
use multihop_core::{config::AppConfig, logging, AppResult};
use std::path::PathBuf;

/// Multihop - multi-hop question answering over local collections
#[derive(Parser, Debug)]
#[command(name = "multihop")]
#[command(about = "Multi-hop question answering over documents and transcripts", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "MULTIHOP_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "MULTIHOP_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// Primary provider as `provider[:model]` (ollama, openai)
    #[arg(long, global = true)]
    primary: Option<String>,

    /// Secondary provider as `provider[:model]`
    #[arg(long, global = true)]
    secondary: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Answer a question from the collections
    Ask(AskCommand),

    /// Show what each collection holds
    Collections(CollectionsCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    // Defaults, then config file and environment, then CLI flags
    let config = AppConfig::load_with(cli.workspace, cli.config)?.with_overrides(
        cli.primary,
        cli.secondary,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );

    // Initialize logging with final configuration
    logging::init_logging(config.log_level.as_deref(), config.no_color, config.log_json)?;

    tracing::info!("multihop starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!(
        "Primary: {}/{}, secondary: {}/{}",
        config.primary.provider,
        config.primary.model,
        config.secondary.provider,
        config.secondary.model
    );

    let command_name = match &cli.command {
        Commands::Ask(_) => "ask",
        Commands::Collections(_) => "collections",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    // Route to command handlers
    let result = match cli.command {
        Commands::Ask(cmd) => cmd.execute(&config).await,
        Commands::Collections(cmd) => cmd.execute(&config),
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
