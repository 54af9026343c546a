//! Generation provider integration for multihop.
//!
//! This crate provides a provider-agnostic abstraction for text generation
//! and the primary/secondary failover invoker the retrieval engine calls.
//!
//! # Providers
//! - **Ollama**: Local LLM runtime
//! - **OpenAI**: Hosted chat completions (and compatible endpoints)
//! - **Scripted**: Deterministic in-process client for tests and dry runs
//!
//! # Example
//! ```no_run
//! use multihop_llm::{GenerationInvoker, GenerationRequest};
//! use multihop_core::ProviderSettings;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let invoker = GenerationInvoker::from_settings(
//!     &ProviderSettings::new("ollama", "llama3.2"),
//!     &ProviderSettings::new("ollama", "qwen2.5"),
//! )?;
//! let generation = invoker.generate(&GenerationRequest::new("Hello, world!")).await?;
//! println!("{} (via {})", generation.text, generation.provider_used);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod failover;
pub mod providers;
pub mod types;

// Re-export main types
pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::create_client;
pub use failover::{Generation, GenerationInvoker, GenerationRequest, ProviderSlot};
pub use providers::{OllamaClient, OpenAiClient, ScriptedClient};
pub use types::{ProviderRole, ProviderType};
