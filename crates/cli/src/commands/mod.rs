//! Command handlers for the multihop CLI.

pub mod ask;
pub mod collections;

// Re-export command types for convenience
pub use ask::AskCommand;
pub use collections::CollectionsCommand;
