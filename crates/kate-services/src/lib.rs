//! # kate-services
//!
//! Workflows behind the HTTP endpoints and the chat-platform events.

pub mod catalog;
pub mod duplicate;
pub mod mention;
pub mod submission;
pub mod votes;

pub use catalog::{CatalogService, DEFAULT_LEADERBOARD_LIMIT};
pub use duplicate::DuplicateChecker;
pub use mention::MentionResponder;
pub use submission::{AcceptancePublisher, SubmissionService, SubmitOutcome, DUPLICATE_INSULT};
pub use votes::{
    Acceptance, AcceptanceHandler, CollectorState, VoteCollector, VoteRegistry, VoteSettings,
};
