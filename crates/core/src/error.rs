//! Error types for multihop.
//!
//! This module defines a unified error enum that covers all error categories
//! in the workspace: configuration, I/O, generation providers, retrieval,
//! prompts, and the two query-terminating failures (invalid input and total
//! generation failure).

use thiserror::Error;

/// Unified error type for multihop.
///
/// All fallible functions return `Result<T, AppError>`.
/// Library code never panics; errors are represented and propagated.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A single generation provider call failed
    #[error("LLM error: {0}")]
    Llm(String),

    /// Retrieval and collection errors
    #[error("Retrieval error: {0}")]
    Retrieval(String),

    /// Prompt system errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The caller's query was rejected before any retrieval began
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A similarity source could not be queried
    #[error("Source '{collection}' unavailable: {message}")]
    SourceUnavailable { collection: String, message: String },

    /// Both the primary and the secondary provider failed on one invocation
    #[error("Generation failed on both providers (primary: {primary}; secondary: {secondary})")]
    GenerationFailed { primary: String, secondary: String },

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Whether this error must terminate a query.
    ///
    /// Everything else is recovered locally by the orchestration layer.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AppError::InvalidInput(_) | AppError::GenerationFailed { .. }
        )
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_failed_names_both_providers() {
        let err = AppError::GenerationFailed {
            primary: "ollama: connection refused".to_string(),
            secondary: "openai: 429 Too Many Requests".to_string(),
        };

        let message = err.to_string();
        assert!(message.contains("connection refused"));
        assert!(message.contains("429"));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_recoverable_errors_are_not_fatal() {
        let source = AppError::SourceUnavailable {
            collection: "transcripts".to_string(),
            message: "index missing".to_string(),
        };
        assert!(!source.is_fatal());
        assert!(!AppError::Llm("timeout".to_string()).is_fatal());
        assert!(AppError::InvalidInput("empty question".to_string()).is_fatal());
    }
}
