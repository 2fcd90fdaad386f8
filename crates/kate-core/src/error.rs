//! # AppError
//!
//! Failure taxonomy of the submission system. Duplicates are not errors:
//! they are reported as a regular outcome.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    /// Missing or blank input (e.g. no category selected)
    #[error("{0}")]
    ValidationError(String),

    /// Document store read or write failed
    #[error("store error: {0}")]
    Store(String),

    /// The moderation channel could not be posted to
    #[error("moderation channel unavailable: {0}")]
    ChannelUnavailable(String),

    /// Any other chat-platform call failed
    #[error("chat platform error: {0}")]
    Chat(String),

    /// The reaction event source failed while a vote was open
    #[error("vote collector error: {0}")]
    Collector(String),

    #[error("internal service error: {0}")]
    Internal(String),
}

impl AppError {
    /// Wraps an adapter failure, keeping the whole context chain.
    pub fn store(err: anyhow::Error) -> Self {
        Self::Store(format!("{err:#}"))
    }

    pub fn chat(err: anyhow::Error) -> Self {
        Self::Chat(format!("{err:#}"))
    }
}

/// A specialized Result type for Kate logic.
pub type Result<T> = std::result::Result<T, AppError>;
