//! Multihop Core Library
//!
//! This crate provides the foundational utilities shared by the multihop crates:
//! - Error handling (`AppError`, `AppResult`)
//! - Logging infrastructure
//! - Configuration management (providers, retrieval tuning, logging)

pub mod config;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use config::{AppConfig, EvidenceBudget, ProviderSettings, RetrievalConfig};
pub use error::{AppError, AppResult};
