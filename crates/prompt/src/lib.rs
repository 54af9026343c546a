//! Prompt templates for multihop.
//!
//! This crate provides:
//! - Built-in templates for final answers and follow-up synthesis
//! - YAML prompt definitions that override the built-ins per workspace
//! - Handlebars rendering without HTML escaping

pub mod builder;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::{render_template, PromptTemplates};
pub use loader::{list_prompts, load_prompt, try_load_prompt};
pub use types::{PromptDefinition, ANSWER_PROMPT_ID, FOLLOWUP_PROMPT_ID};
